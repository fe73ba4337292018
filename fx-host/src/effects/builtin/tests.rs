//! # 内置效果测试
//!
//! 使用内存资源、脚本化音频后端与 headless 渲染表面驱动完整的生命周期。

use crate::audio::{
    AudioService, AudioSettings, PoolEvent, ReleaseReason, ScriptedBackend, SoundRequest,
};
use crate::effects::{EffectContext, EffectDeps, EffectFactory, EffectInstance, EffectState, Subject};
use crate::render::{HeadlessSurface, Primitive};
use crate::resources::MemorySource;
use anim_runtime::{ParamValue, Params};
use glam::Vec3;
use std::sync::Arc;
use std::time::Duration;

fn ms(millis: u64) -> Duration {
    Duration::from_millis(millis)
}

struct Rig {
    backend: ScriptedBackend,
    audio: AudioService,
    surface: HeadlessSurface,
    factory: EffectFactory,
}

impl Rig {
    fn new() -> Self {
        let source = MemorySource::new()
            .with_file("sounds/ambient/wind.ogg", vec![1])
            .with_file("sounds/step/grass.ogg", vec![1])
            .with_file("sounds/weather/thunder.ogg", vec![1]);
        let backend = ScriptedBackend::with_end_signals();
        Self {
            audio: AudioService::new(
                Arc::new(source),
                Box::new(backend.clone()),
                AudioSettings::default(),
            ),
            backend,
            surface: HeadlessSurface::new(),
            factory: EffectFactory::default(),
        }
    }

    fn create(&mut self, type_id: &str, options: &[(&str, ParamValue)]) -> EffectInstance {
        let options: Params = options
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect();
        self.factory.create(type_id, &options).unwrap()
    }

    /// 预先建立池，使后续获取立即完成
    fn warm(&mut self, key: &str) {
        let sound = self.audio.acquire_now(SoundRequest::new(key), Duration::ZERO).unwrap();
        self.audio.release(sound);
    }

    fn deps(&mut self, now: Duration) -> EffectDeps<'_> {
        EffectDeps::new(now)
            .with_audio(&mut self.audio)
            .with_surface(&mut self.surface)
    }
}

fn at_origin() -> EffectContext {
    EffectContext::new("test").with_source(Subject::Point(Vec3::ZERO))
}

// -------------------------------------------------------------------------
// sound
// -------------------------------------------------------------------------

#[test]
fn test_sound_completes_when_playback_ends() {
    let mut rig = Rig::new();
    let ctx = at_origin();
    rig.warm("step/grass");

    let mut sound = rig.create("sound", &[("sound", "step/grass".into()), ("volume", 0.5_f64.into())]);
    sound.execute(&ctx, &mut rig.deps(ms(0)));
    assert!(sound.is_running());
    assert_eq!(rig.backend.plays().len(), 1);
    assert_eq!(rig.backend.plays()[0].volume, 0.5);

    rig.backend.finish_playing("step/grass");
    rig.audio.update(ms(200));
    sound.poll(&ctx, &mut rig.deps(ms(200)));

    assert_eq!(sound.state(), EffectState::Completed);
    assert!(!sound.is_running());
    assert_eq!(rig.audio.in_use("step/grass"), 0);
}

#[test]
fn test_sound_waits_for_load() {
    let mut rig = Rig::new();
    let ctx = at_origin();

    let mut sound = rig.create("sound", &[("sound", "step/grass".into())]);
    sound.execute(&ctx, &mut rig.deps(ms(0)));
    assert_eq!(sound.state(), EffectState::Executing);
    assert!(rig.backend.plays().is_empty());

    rig.audio.update(ms(16));
    sound.poll(&ctx, &mut rig.deps(ms(16)));
    assert_eq!(rig.backend.plays().len(), 1);
    assert!(sound.is_running());
}

#[test]
fn test_stop_while_loading_never_acquires() {
    let mut rig = Rig::new();
    let ctx = at_origin();

    let mut sound = rig.create("sound", &[("sound", "step/grass".into())]);
    sound.execute(&ctx, &mut rig.deps(ms(0)));
    sound.stop(&mut rig.deps(ms(5)));

    rig.audio.update(ms(16));
    sound.poll(&ctx, &mut rig.deps(ms(16)));

    assert_eq!(sound.state(), EffectState::Completed);
    assert!(rig.audio.has_pool("step/grass"));
    assert_eq!(rig.audio.in_use("step/grass"), 0);
    assert!(rig.backend.plays().is_empty());
}

#[test]
fn test_result_arriving_after_cancel_is_released() {
    let mut rig = Rig::new();
    let ctx = at_origin();

    let mut sound = rig.create("sound", &[("sound", "step/grass".into())]);
    sound.execute(&ctx, &mut rig.deps(ms(0)));

    // 加载完成、条目已交付，但效果尚未轮询就被停止
    rig.audio.update(ms(16));
    assert_eq!(rig.audio.in_use("step/grass"), 1);
    sound.stop(&mut rig.deps(ms(20)));

    rig.audio.update(ms(32));
    assert_eq!(rig.audio.in_use("step/grass"), 0);
    assert!(rig.audio.drain_events().contains(&PoolEvent::Released {
        key: "step/grass".to_string(),
        index: 0,
        reason: ReleaseReason::Cancelled,
    }));
    assert!(rig.backend.plays().is_empty());
}

#[test]
fn test_sound_without_audio_is_contained() {
    let mut rig = Rig::new();
    let ctx = at_origin();
    let mut sound = rig.create("sound", &[("sound", "step/grass".into())]);

    sound.execute(&ctx, &mut EffectDeps::new(ms(0)));
    assert_eq!(sound.state(), EffectState::Completed);
}

#[test]
fn test_non_spatial_sound_is_force_completed() {
    let mut rig = Rig::new();
    // 没有来源坐标：非空间化
    let ctx = EffectContext::new("ui");
    rig.warm("step/grass");

    let mut sound = rig.create("sound", &[("sound", "step/grass".into())]);
    sound.execute(&ctx, &mut rig.deps(ms(0)));
    assert_eq!(rig.backend.plays()[0].emitter.and_then(|e| e.position), None);

    sound.poll(&ctx, &mut rig.deps(ms(9_999)));
    assert!(sound.is_running());
    sound.poll(&ctx, &mut rig.deps(ms(10_000)));
    assert_eq!(sound.state(), EffectState::Completed);
    assert_eq!(rig.audio.in_use("step/grass"), 0);
}

// -------------------------------------------------------------------------
// loop_sound
// -------------------------------------------------------------------------

#[test]
fn test_loop_sound_lifecycle() {
    let mut rig = Rig::new();
    let ctx = at_origin();
    rig.warm("ambient/wind");

    let mut wind = rig.create("loop_sound", &[("sound", "ambient/wind".into())]);
    assert!(wind.is_steady());

    wind.execute(&ctx, &mut rig.deps(ms(0)));
    assert!(wind.is_running());
    assert_eq!(wind.state(), EffectState::Running);
    assert!(rig.backend.plays()[0].looping);

    wind.parameter_changed("volume", &ParamValue::Number(0.5), &ctx, &mut rig.deps(ms(100)));
    assert_eq!(rig.backend.volume_changes().last(), Some(&0.5));

    wind.stop(&mut rig.deps(ms(200)));
    assert!(!wind.is_running());
    assert_eq!(rig.audio.in_use("ambient/wind"), 0);

    // 停止后的参数变更是 no-op
    let changes = rig.backend.volume_changes().len();
    wind.parameter_changed("volume", &ParamValue::Number(0.5), &ctx, &mut rig.deps(ms(300)));
    assert_eq!(rig.backend.volume_changes().len(), changes);

    // 重复停止是安全的
    wind.stop(&mut rig.deps(ms(400)));
    assert_eq!(wind.state(), EffectState::Stopped);
}

#[test]
fn test_loop_sound_runs_only_after_load() {
    let mut rig = Rig::new();
    let ctx = at_origin();

    let mut wind = rig.create("loop_sound", &[("sound", "ambient/wind".into())]);
    wind.execute(&ctx, &mut rig.deps(ms(0)));
    assert_eq!(wind.state(), EffectState::Executing);
    assert!(!wind.is_running());

    rig.audio.update(ms(16));
    wind.poll(&ctx, &mut rig.deps(ms(16)));
    assert_eq!(wind.state(), EffectState::Running);
    assert!(wind.is_running());
    assert!(rig.backend.plays()[0].looping);
}

#[test]
fn test_looping_items_survive_stuck_recovery() {
    let mut rig = Rig::new();
    let ctx = at_origin();

    let mut winds: Vec<EffectInstance> = (0..10)
        .map(|_| rig.create("loop_sound", &[("sound", "ambient/wind".into())]))
        .collect();
    rig.warm("ambient/wind");
    for wind in &mut winds {
        wind.execute(&ctx, &mut rig.deps(ms(0)));
    }
    assert_eq!(rig.audio.in_use("ambient/wind"), 10);

    // 池已满，循环条目不会被当作卡死回收
    let mut extra = rig.create("loop_sound", &[("sound", "ambient/wind".into())]);
    extra.execute(&ctx, &mut rig.deps(ms(5_000)));
    assert_eq!(extra.state(), EffectState::Stopped);
    assert!(winds.iter().all(EffectInstance::is_running));
}

// -------------------------------------------------------------------------
// beam
// -------------------------------------------------------------------------

#[test]
fn test_beam_retarget_and_stop() {
    let mut rig = Rig::new();
    let ctx = at_origin().with_target(Subject::Point(Vec3::new(0.0, 0.0, 10.0)));

    let mut beam = rig.create("beam", &[("color", "#ff0000".into())]);
    beam.execute(&ctx, &mut rig.deps(ms(0)));
    assert_eq!(beam.state(), EffectState::Running);
    assert_eq!(rig.surface.live_count(), 1);

    beam.parameter_changed("target", &ParamValue::Vector(Vec3::X), &ctx, &mut rig.deps(ms(10)));
    match &rig.surface.live()[0] {
        Primitive::Beam { to, .. } => assert_eq!(*to, Vec3::X),
        other => panic!("unexpected primitive: {:?}", other),
    }

    // 未知参数名是 no-op
    beam.parameter_changed("sparkle", &ParamValue::Bool(true), &ctx, &mut rig.deps(ms(20)));
    assert_eq!(rig.surface.updated(), 1);

    beam.stop(&mut rig.deps(ms(30)));
    beam.stop(&mut rig.deps(ms(40)));
    assert_eq!(rig.surface.live_count(), 0);
    assert_eq!(rig.surface.despawned(), 1);
}

#[test]
fn test_beam_without_surface_stops_cleanly() {
    let mut rig = Rig::new();
    let ctx = at_origin().with_target(Subject::Point(Vec3::X));

    let mut beam = rig.create("beam", &[]);
    beam.execute(&ctx, &mut EffectDeps::new(ms(0)).with_audio(&mut rig.audio));

    assert_eq!(beam.state(), EffectState::Stopped);
    assert!(!beam.is_running());
}

#[test]
fn test_beam_without_target_stops_cleanly() {
    let mut rig = Rig::new();
    let mut beam = rig.create("beam", &[]);

    beam.execute(&at_origin(), &mut rig.deps(ms(0)));
    assert_eq!(beam.state(), EffectState::Stopped);
    assert_eq!(rig.surface.live_count(), 0);
}

// -------------------------------------------------------------------------
// particles / lightning
// -------------------------------------------------------------------------

#[test]
fn test_particles_complete_after_lifetime() {
    let mut rig = Rig::new();
    let ctx = EffectContext::new("test").with_source(Subject::Block {
        pos: glam::IVec3::new(2, 64, -3),
    });

    let mut burst = rig.create("particles", &[("lifetime", 500.0_f64.into()), ("count", 8.0_f64.into())]);
    burst.execute(&ctx, &mut rig.deps(ms(1_000)));
    match &rig.surface.live()[0] {
        Primitive::Particles { origin, count, .. } => {
            assert_eq!(*origin, Vec3::new(2.5, 64.5, -2.5));
            assert_eq!(*count, 8);
        }
        other => panic!("unexpected primitive: {:?}", other),
    }

    burst.poll(&ctx, &mut rig.deps(ms(1_499)));
    assert!(burst.is_running());
    burst.poll(&ctx, &mut rig.deps(ms(1_500)));
    assert_eq!(burst.state(), EffectState::Completed);
    assert_eq!(rig.surface.live_count(), 0);
}

#[test]
fn test_lightning_flashes_then_waits_for_thunder() {
    let mut rig = Rig::new();
    let ctx = at_origin().with_target(Subject::Point(Vec3::new(5.0, 0.0, 5.0)));

    let mut strike = rig.create(
        "lightning",
        &[
            ("flashes", 2.0_f64.into()),
            ("flash_interval", 100.0_f64.into()),
            ("thunder", "weather/thunder".into()),
        ],
    );
    strike.execute(&ctx, &mut rig.deps(ms(0)));
    assert_eq!(rig.surface.spawned(), 1);

    // 雷声加载完成后开始播放
    rig.audio.update(ms(16));
    strike.poll(&ctx, &mut rig.deps(ms(16)));
    assert_eq!(rig.backend.plays().len(), 1);
    assert_eq!(
        rig.backend.plays()[0].emitter.and_then(|e| e.position),
        Some(Vec3::new(5.0, 0.0, 5.0))
    );

    strike.poll(&ctx, &mut rig.deps(ms(150)));
    assert_eq!(rig.surface.updated(), 1);

    // 闪烁结束，雷声仍在播放
    strike.poll(&ctx, &mut rig.deps(ms(250)));
    assert_eq!(rig.surface.live_count(), 0);
    assert!(strike.is_running());

    rig.backend.finish_playing("weather/thunder");
    rig.audio.update(ms(900));
    strike.poll(&ctx, &mut rig.deps(ms(900)));
    assert_eq!(strike.state(), EffectState::Completed);
}

#[test]
fn test_lightning_keeps_flashing_when_thunder_fails_to_load() {
    let mut rig = Rig::new();
    let ctx = at_origin().with_target(Subject::Point(Vec3::new(5.0, 0.0, 5.0)));

    let mut strike = rig.create(
        "lightning",
        &[
            ("flashes", 3.0_f64.into()),
            ("flash_interval", 100.0_f64.into()),
            ("thunder", "weather/missing".into()),
        ],
    );
    strike.execute(&ctx, &mut rig.deps(ms(0)));
    assert!(strike.is_running());

    // 加载失败只影响雷声
    rig.audio.update(ms(16));
    strike.poll(&ctx, &mut rig.deps(ms(16)));
    assert!(strike.is_running());
    assert_eq!(rig.surface.live_count(), 1);
    assert!(rig.backend.plays().is_empty());

    strike.poll(&ctx, &mut rig.deps(ms(150)));
    strike.poll(&ctx, &mut rig.deps(ms(250)));
    assert_eq!(rig.surface.updated(), 2);
    assert!(strike.is_running());

    strike.poll(&ctx, &mut rig.deps(ms(300)));
    assert_eq!(strike.state(), EffectState::Completed);
    assert_eq!(rig.surface.live_count(), 0);
}

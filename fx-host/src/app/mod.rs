//! # App 模块
//!
//! 宿主状态与帧推进。
//!
//! `FxHost` 持有配置、音效服务、渲染表面、效果工厂、时间轴播放器与模拟时钟。
//! 外部只需要每帧调用一次 [`FxHost::update`]。

mod init;

pub use init::*;

use crate::animation::{PlayError, PlaybackEvent, PlaybackId, TemplateLibrary, TimelinePlayer};
use crate::audio::{AudioBackend, AudioService, PoolEvent, PoolStats};
use crate::config::AppConfig;
use crate::effects::{EffectDeps, EffectFactory};
use crate::render::{HeadlessSurface, RenderSurface};
use crate::resources::AssetSource;
use anim_runtime::{Bindings, ParamValue, Timeline};
use glam::Vec3;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// 效果宿主
pub struct FxHost {
    config: AppConfig,
    source: Arc<dyn AssetSource>,
    /// 音频被禁用时为 None
    audio: Option<AudioService>,
    surface: Box<dyn RenderSurface>,
    factory: EffectFactory,
    player: TimelinePlayer,
    library: TemplateLibrary,
    /// 自宿主启动的模拟时间
    clock: Duration,
}

impl FxHost {
    /// 按配置创建：文件系统资源、默认音频后端、headless 渲染表面
    pub fn new(config: AppConfig) -> Self {
        let source = create_source(&config);
        Self::with_parts(config, source, create_backend(), Box::new(HeadlessSurface::new()))
    }

    /// 使用给定的资源来源、音频后端与渲染表面创建
    pub fn with_parts(
        config: AppConfig,
        source: Arc<dyn AssetSource>,
        backend: Box<dyn AudioBackend>,
        surface: Box<dyn RenderSurface>,
    ) -> Self {
        let audio = create_audio_service(&config, Arc::clone(&source), backend);
        let library = load_templates(&config, source.as_ref());

        Self {
            config,
            source,
            audio,
            surface,
            factory: EffectFactory::default(),
            player: TimelinePlayer::new(),
            library,
            clock: Duration::ZERO,
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn now(&self) -> Duration {
        self.clock
    }

    /// 帧推进
    pub fn update(&mut self, dt: Duration) {
        self.clock += dt;
        let now = self.clock;

        if let Some(audio) = self.audio.as_mut() {
            audio.update(now);
        }

        let (player, factory, mut deps) = self.parts();
        player.update(factory, &mut deps);
    }

    /// 拆出播放器、工厂与本帧的效果依赖
    fn parts(&mut self) -> (&mut TimelinePlayer, &mut EffectFactory, EffectDeps<'_>) {
        let mut deps = EffectDeps::new(self.clock).with_surface(&mut *self.surface);
        if let Some(audio) = self.audio.as_mut() {
            deps = deps.with_audio(audio);
        }
        (&mut self.player, &mut self.factory, deps)
    }

    // ============ 播放 ============

    /// 按模板名代入坐标并播放
    pub fn trigger(&mut self, template: &str, bindings: &Bindings) -> Result<PlaybackId, PlayError> {
        let timeline = self.library.instantiate(template, bindings)?;
        self.play(timeline)
    }

    /// 播放已绑定的时间轴
    pub fn play(&mut self, timeline: Timeline) -> Result<PlaybackId, PlayError> {
        self.player.play(timeline, self.clock)
    }

    pub fn retarget(
        &mut self,
        playback: PlaybackId,
        entry_id: &str,
        name: &str,
        value: ParamValue,
    ) -> Result<usize, PlayError> {
        let (player, _, mut deps) = self.parts();
        player.retarget(playback, entry_id, name, value, &mut deps)
    }

    pub fn stop(&mut self, playback: PlaybackId) -> bool {
        let (player, _, mut deps) = self.parts();
        player.stop(playback, &mut deps)
    }

    /// 停止全部播放并清空音效池
    pub fn shutdown(&mut self) {
        let (player, _, mut deps) = self.parts();
        player.stop_all(&mut deps);

        if let Some(audio) = self.audio.as_mut() {
            audio.clear();
        }
        debug!("宿主已关闭");
    }

    pub fn is_playing(&self, playback: PlaybackId) -> bool {
        self.player.is_playing(playback)
    }

    pub fn playback_count(&self) -> usize {
        self.player.playback_count()
    }

    pub fn drain_events(&mut self) -> Vec<PlaybackEvent> {
        self.player.drain_events()
    }

    // ============ 子系统 ============

    pub fn library(&self) -> &TemplateLibrary {
        &self.library
    }

    pub fn library_mut(&mut self) -> &mut TemplateLibrary {
        &mut self.library
    }

    /// 重新加载模板目录
    pub fn reload_templates(&mut self) -> usize {
        self.library = load_templates(&self.config, self.source.as_ref());
        self.library.len()
    }

    /// 用于注册自定义效果
    pub fn factory_mut(&mut self) -> &mut EffectFactory {
        &mut self.factory
    }

    pub fn audio(&self) -> Option<&AudioService> {
        self.audio.as_ref()
    }

    pub fn audio_mut(&mut self) -> Option<&mut AudioService> {
        self.audio.as_mut()
    }

    pub fn set_listener(&mut self, position: Vec3) {
        if let Some(audio) = self.audio.as_mut() {
            audio.set_listener(position);
        }
    }

    pub fn audio_stats(&self) -> Option<PoolStats> {
        self.audio.as_ref().map(AudioService::stats)
    }

    pub fn drain_audio_events(&mut self) -> Vec<PoolEvent> {
        self.audio
            .as_mut()
            .map(AudioService::drain_events)
            .unwrap_or_default()
    }
}

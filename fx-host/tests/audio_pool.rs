//! # 音效池集成测试
//!
//! 测试 AudioService 的容量上限、卡死回收、加载合并与失败传播。
//! 使用内存资源与脚本化后端，不依赖真实音频设备。

use fx_host::audio::{
    Acquire, AcquireError, AudioService, AudioSettings, PoolEvent, ScriptedBackend, SoundRequest,
    TicketPoll,
};
use fx_host::resources::{FetchMode, MemorySource, ReadRecord};
use std::sync::Arc;
use std::time::Duration;

const GRASS: &str = "sounds/step/grass.ogg";

fn ms(millis: u64) -> Duration {
    Duration::from_millis(millis)
}

fn service_with(source: MemorySource) -> (AudioService, Arc<MemorySource>, ScriptedBackend) {
    let source = Arc::new(source);
    let backend = ScriptedBackend::silent();
    let service = AudioService::new(
        source.clone(),
        Box::new(backend.clone()),
        AudioSettings::default(),
    );
    (service, source, backend)
}

fn grass_service() -> (AudioService, Arc<MemorySource>, ScriptedBackend) {
    service_with(MemorySource::new().with_file(GRASS, vec![0u8; 32]))
}

/// 10 次获取成功，第 11 次池满
#[test]
fn test_eleventh_acquisition_is_at_capacity() {
    let (mut audio, source, backend) = grass_service();

    let held: Vec<_> = (0..10)
        .map(|_| audio.acquire_now(SoundRequest::new("step/grass"), ms(0)).unwrap())
        .collect();
    assert_eq!(held.len(), 10);
    assert_eq!(audio.pool_size("step/grass"), 10);

    let err = audio
        .acquire_now(SoundRequest::new("step/grass"), ms(0))
        .unwrap_err();
    assert_eq!(
        err,
        AcquireError::PoolAtCapacity {
            key: "step/grass".to_string()
        }
    );
    insta::assert_snapshot!(err.to_string(), @"音效池已满: 'step/grass'");

    // 扩容复用已加载的字节，不重新读取
    assert_eq!(source.read_count(GRASS), 1);
    assert_eq!(backend.instantiated("step/grass"), 10);

    let stats = audio.stats();
    assert_eq!(stats.items, 10);
    assert_eq!(stats.in_use, 10);
    assert_eq!(stats.skipped, 1);
}

/// 池满时，占用超过阈值的条目被强制回收；恰好等于阈值的不算卡死
#[test]
fn test_stuck_items_are_recovered_past_threshold() {
    let (mut audio, _, _) = grass_service();

    for _ in 0..10 {
        audio
            .acquire_now(SoundRequest::new("step/grass"), ms(0))
            .unwrap();
    }

    let at_threshold = audio.acquire_now(SoundRequest::new("step/grass"), ms(1000));
    assert!(matches!(at_threshold, Err(AcquireError::PoolAtCapacity { .. })));

    let recovered = audio
        .acquire_now(SoundRequest::new("step/grass"), ms(1500))
        .unwrap();
    assert!(audio.is_held(&recovered));
    assert_eq!(audio.pool_size("step/grass"), 10);

    let events = audio.drain_events();
    let recovered_count = events
        .iter()
        .filter(|e| matches!(e, PoolEvent::Recovered { .. }))
        .count();
    assert_eq!(recovered_count, 10);
    assert_eq!(audio.stats().recovered, 10);
}

/// 被回收条目的旧持有者再释放是 no-op
#[test]
fn test_stale_holder_cannot_release_recovered_item() {
    let (mut audio, _, _) = grass_service();

    let stale: Vec<_> = (0..10)
        .map(|_| audio.acquire_now(SoundRequest::new("step/grass"), ms(0)).unwrap())
        .collect();
    let fresh = audio
        .acquire_now(SoundRequest::new("step/grass"), ms(2000))
        .unwrap();

    for sound in stale {
        assert!(!audio.is_held(&sound));
        assert!(!audio.release(sound));
    }
    assert!(audio.is_held(&fresh));
    assert_eq!(audio.in_use("step/grass"), 1);
}

/// N 个并发获取只触发一次读取
#[test]
fn test_concurrent_acquisitions_coalesce_into_one_load() {
    let (mut audio, source, _) = grass_service();

    let tickets: Vec<_> = (0..5)
        .map(|_| match audio.acquire(SoundRequest::new("step/grass"), ms(0)).unwrap() {
            Acquire::Pending(ticket) => ticket,
            Acquire::Ready(_) => panic!("pool should not exist yet"),
        })
        .collect();
    assert_eq!(source.read_count(GRASS), 0);
    assert_eq!(audio.stats().pending_loads, 1);

    audio.update(ms(16));
    assert_eq!(source.read_count(GRASS), 1);

    let mut indices: Vec<usize> = tickets
        .iter()
        .map(|ticket| match ticket.poll() {
            TicketPoll::Ready(sound) => sound.index(),
            other => panic!("unexpected poll result: {:?}", other),
        })
        .collect();
    indices.sort();
    assert_eq!(indices, vec![0, 1, 2, 3, 4]);
    assert_eq!(audio.in_use("step/grass"), 5);
}

/// 加载失败：一次绕过缓存的重试后，所有等待者收到同一个错误
#[test]
fn test_load_failure_reaches_every_waiter() {
    let (mut audio, source, _) = service_with(MemorySource::new());

    let tickets: Vec<_> = (0..3)
        .map(|_| match audio.acquire(SoundRequest::new("missing"), ms(0)).unwrap() {
            Acquire::Pending(ticket) => ticket,
            Acquire::Ready(_) => panic!("pool should not exist yet"),
        })
        .collect();
    audio.update(ms(16));

    assert_eq!(
        source.reads(),
        vec![
            ReadRecord {
                path: "sounds/missing.ogg".to_string(),
                mode: FetchMode::Normal,
            },
            ReadRecord {
                path: "sounds/missing.ogg".to_string(),
                mode: FetchMode::CacheBust,
            },
        ]
    );

    for ticket in &tickets {
        match ticket.poll() {
            TicketPoll::Failed(AcquireError::AssetLoadFailed { key, .. }) => {
                assert_eq!(key, "missing")
            }
            other => panic!("unexpected poll result: {:?}", other),
        }
    }
    assert!(!audio.has_pool("missing"));
    assert_eq!(audio.stats().load_failures, 1);
}

/// 无法通知播放结束的后端依赖兜底计时器
#[test]
fn test_silent_backend_falls_back_to_timer() {
    let (mut audio, _, _) = grass_service();

    let sound = audio
        .acquire_now(SoundRequest::new("step/grass"), ms(0))
        .unwrap();
    audio.play(&sound, 1.0).unwrap();

    audio.update(ms(9_999));
    assert!(audio.is_held(&sound));
    audio.update(ms(10_000));
    assert!(!audio.is_held(&sound));
}

#[test]
fn test_unload_disposes_pool() {
    let (mut audio, source, backend) = grass_service();

    let sound = audio
        .acquire_now(SoundRequest::new("step/grass"), ms(0))
        .unwrap();
    audio.play(&sound, 1.0).unwrap();
    assert!(audio.unload("step/grass"));

    assert!(!audio.release(sound));
    assert!(backend.stop_count() >= 1);

    // 再次获取重新加载
    audio
        .acquire_now(SoundRequest::new("step/grass"), ms(10))
        .unwrap();
    assert_eq!(source.read_count(GRASS), 2);
}

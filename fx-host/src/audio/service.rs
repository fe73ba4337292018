//! # Audio Service 模块
//!
//! 池化空间音效的资源管理器。
//!
//! ## 获取流程
//!
//! 1. 资源键没有池：发起（或合并进）一次在途加载，返回 [`AcquireTicket`]
//! 2. 有可用条目：直接使用
//! 3. 没有可用条目且未满：从已加载的字节再实例化一个句柄
//! 4. 已满：回收占用超过阈值的条目后再找一次，仍然没有则 `PoolAtCapacity`
//! 5. 占用条目、设置位置与听觉距离、布置结束释放（或兜底计时器）
//!
//! 加载与释放都在 [`AudioService::update`] 中推进，由帧驱动器每帧调用一次。

use super::backend::{AudioBackend, AudioError, Emitter, EndSignal, EndedItem};
use super::pool::{AudioPool, AudioPoolItem, BlockRequest};
use super::stats::{PoolEvent, PoolStats, ReleaseReason};
use crate::config::AppConfig;
use crate::resources::path::sound_candidates;
use crate::resources::{AssetSource, FetchMode, ResourceError};
use glam::Vec3;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, Sender};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

/// 音效服务设置
#[derive(Debug, Clone, PartialEq)]
pub struct AudioSettings {
    /// 音效目录（逻辑路径）
    pub sound_dir: String,
    pub max_pool_size: usize,
    pub stuck_threshold: Duration,
    pub release_fallback: Duration,
    pub narration_fallback: Duration,
    pub default_max_distance: f32,
    pub master_volume: f32,
    pub muted: bool,
}

impl Default for AudioSettings {
    fn default() -> Self {
        Self::from_config(&AppConfig::default())
    }
}

impl AudioSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        let audio = &config.audio;
        Self {
            sound_dir: config.sound_dir.clone(),
            max_pool_size: audio.max_pool_size,
            stuck_threshold: audio.stuck_threshold(),
            release_fallback: audio.release_fallback(),
            narration_fallback: audio.narration_fallback(),
            default_max_distance: audio.default_max_distance,
            master_volume: audio.master_volume,
            muted: audio.muted,
        }
    }
}

/// 一次获取请求
#[derive(Debug, Clone, PartialEq)]
pub struct SoundRequest {
    /// 资源键（如 `step/grass`）
    pub key: String,
    /// 世界坐标；`None` 表示非空间化
    pub position: Option<Vec3>,
    /// 最大听觉距离；`None` 使用默认值
    pub max_distance: Option<f32>,
    pub looping: bool,
    /// 长语音（旁白），兜底释放使用更长的时长
    pub long_form: bool,
}

impl SoundRequest {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            position: None,
            max_distance: None,
            looping: false,
            long_form: false,
        }
    }

    pub fn at(mut self, position: Option<Vec3>) -> Self {
        self.position = position;
        self
    }

    pub fn max_distance(mut self, distance: f32) -> Self {
        self.max_distance = Some(distance);
        self
    }

    pub fn looping(mut self, looping: bool) -> Self {
        self.looping = looping;
        self
    }

    pub fn long_form(mut self, long_form: bool) -> Self {
        self.long_form = long_form;
        self
    }
}

/// 已获取的池条目
///
/// 不可克隆：持有者恰好释放一次（[`AudioService::release`] 消耗它）。
#[derive(Debug, PartialEq, Eq)]
pub struct PooledSound {
    key: String,
    index: usize,
    generation: u64,
}

impl PooledSound {
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// 获取失败
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AcquireError {
    /// 池已满（软失败：本次播放被跳过，不排队）
    #[error("音效池已满: '{key}'")]
    PoolAtCapacity { key: String },

    /// 资源加载失败（已重试一次）
    #[error("音效资源加载失败: '{key}' - {source}")]
    AssetLoadFailed { key: String, source: ResourceError },

    /// 后端无法实例化句柄
    #[error("音效实例化失败: '{key}' - {source}")]
    Backend { key: String, source: AudioError },
}

impl AcquireError {
    pub fn key(&self) -> &str {
        match self {
            Self::PoolAtCapacity { key }
            | Self::AssetLoadFailed { key, .. }
            | Self::Backend { key, .. } => key,
        }
    }
}

#[derive(Debug)]
enum TicketState {
    Waiting,
    Ready(PooledSound),
    Failed(AcquireError),
    Taken,
    Cancelled,
    /// 结果已到达但持有者已取消，等待服务回收
    Abandoned(PooledSound),
}

/// 票据轮询结果
#[derive(Debug)]
pub enum TicketPoll {
    /// 加载尚未完成
    Pending,
    Ready(PooledSound),
    Failed(AcquireError),
    /// 结果已取走或票据已取消
    Closed,
}

/// 等待在途加载的获取请求
///
/// 丢弃票据等同于取消。取消后到达的结果会在下一次 `update` 中立即归还池。
#[derive(Debug)]
pub struct AcquireTicket {
    key: String,
    slot: Rc<RefCell<TicketState>>,
}

impl AcquireTicket {
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn is_pending(&self) -> bool {
        matches!(*self.slot.borrow(), TicketState::Waiting)
    }

    /// 取走结果（只能取一次）
    pub fn poll(&self) -> TicketPoll {
        let mut slot = self.slot.borrow_mut();
        match std::mem::replace(&mut *slot, TicketState::Taken) {
            TicketState::Waiting => {
                *slot = TicketState::Waiting;
                TicketPoll::Pending
            }
            TicketState::Ready(sound) => TicketPoll::Ready(sound),
            TicketState::Failed(error) => TicketPoll::Failed(error),
            other => {
                *slot = other;
                TicketPoll::Closed
            }
        }
    }

    /// 取消；幂等
    pub fn cancel(&self) {
        let mut slot = self.slot.borrow_mut();
        *slot = match std::mem::replace(&mut *slot, TicketState::Cancelled) {
            TicketState::Ready(sound) | TicketState::Abandoned(sound) => {
                TicketState::Abandoned(sound)
            }
            _ => TicketState::Cancelled,
        };
    }
}

impl Drop for AcquireTicket {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// 获取结果
#[derive(Debug)]
pub enum Acquire {
    /// 池已存在，立即得到条目
    Ready(PooledSound),
    /// 等待在途加载
    Pending(AcquireTicket),
}

struct Waiter {
    request: SoundRequest,
    slot: Rc<RefCell<TicketState>>,
}

struct PendingLoad {
    key: String,
    waiters: Vec<Waiter>,
}

#[derive(Debug, Default)]
struct Counters {
    acquired: u64,
    skipped: u64,
    recovered: u64,
    load_failures: u64,
}

/// 池化空间音效服务
pub struct AudioService {
    source: Arc<dyn AssetSource>,
    backend: Box<dyn AudioBackend>,
    settings: AudioSettings,
    pools: HashMap<String, AudioPool>,
    /// 在途加载（按发起顺序），每个资源键至多一个
    in_flight: Vec<PendingLoad>,
    /// 已交付但尚未被取走的票据
    delivered: Vec<Rc<RefCell<TicketState>>>,
    ended_tx: Sender<EndedItem>,
    ended_rx: Receiver<EndedItem>,
    events: Vec<PoolEvent>,
    next_generation: u64,
    counters: Counters,
}

impl AudioService {
    pub fn new(
        source: Arc<dyn AssetSource>,
        backend: Box<dyn AudioBackend>,
        settings: AudioSettings,
    ) -> Self {
        let (ended_tx, ended_rx) = mpsc::channel();
        Self {
            source,
            backend,
            settings,
            pools: HashMap::new(),
            in_flight: Vec::new(),
            delivered: Vec::new(),
            ended_tx,
            ended_rx,
            events: Vec::new(),
            next_generation: 0,
            counters: Counters::default(),
        }
    }

    pub fn settings(&self) -> &AudioSettings {
        &self.settings
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    // ============ 获取 ============

    /// 获取一个条目
    ///
    /// 池不存在时发起加载（同一资源键的并发请求合并为一次读取）并返回票据。
    pub fn acquire(&mut self, request: SoundRequest, now: Duration) -> Result<Acquire, AcquireError> {
        if self.pools.contains_key(&request.key) {
            return self.acquire_from_pool(&request, now).map(Acquire::Ready);
        }

        let key = request.key.clone();
        let slot = Rc::new(RefCell::new(TicketState::Waiting));
        let waiter = Waiter {
            request,
            slot: Rc::clone(&slot),
        };

        match self.in_flight.iter_mut().find(|load| load.key == key) {
            Some(load) => {
                debug!(key = %key, waiters = load.waiters.len() + 1, "合并到在途加载");
                load.waiters.push(waiter);
            }
            None => {
                debug!(key = %key, "发起音效加载");
                self.in_flight.push(PendingLoad {
                    key: key.clone(),
                    waiters: vec![waiter],
                });
            }
        }

        Ok(Acquire::Pending(AcquireTicket { key, slot }))
    }

    /// 同步获取
    ///
    /// 池不存在时立即完成加载；同一资源键已有在途加载时先完成它并按顺序满足其等待者。
    pub fn acquire_now(&mut self, request: SoundRequest, now: Duration) -> Result<PooledSound, AcquireError> {
        if !self.pools.contains_key(&request.key) {
            let waiters = match self.in_flight.iter().position(|load| load.key == request.key) {
                Some(position) => self.in_flight.remove(position).waiters,
                None => Vec::new(),
            };
            self.complete_load(&request.key, waiters, now)?;
        }

        self.acquire_from_pool(&request, now)
    }

    fn acquire_from_pool(&mut self, request: &SoundRequest, now: Duration) -> Result<PooledSound, AcquireError> {
        let key = request.key.as_str();
        let Some(pool) = self.pools.get_mut(key) else {
            return Err(AcquireError::AssetLoadFailed {
                key: key.to_string(),
                source: ResourceError::NotFound {
                    path: key.to_string(),
                },
            });
        };

        let index = match pool.find_available() {
            Some(index) => index,
            None if !pool.is_full() => {
                let index = pool
                    .grow(self.backend.as_mut())
                    .map_err(|source| AcquireError::Backend {
                        key: key.to_string(),
                        source,
                    })?;
                debug!(key = %key, size = pool.len(), "音效池扩容");
                self.events.push(PoolEvent::Grown {
                    key: key.to_string(),
                    size: pool.len(),
                });
                index
            }
            None => {
                for (index, blocked_for) in pool.recover_stuck(now, self.settings.stuck_threshold) {
                    warn!(
                        key = %key,
                        index,
                        blocked_ms = blocked_for.as_millis() as u64,
                        "回收卡死的音效条目"
                    );
                    self.counters.recovered += 1;
                    self.events.push(PoolEvent::Recovered {
                        key: key.to_string(),
                        index,
                        blocked_for,
                    });
                }

                match pool.find_available() {
                    Some(index) => index,
                    None => {
                        debug!(key = %key, size = pool.len(), "音效池已满，跳过本次播放");
                        self.counters.skipped += 1;
                        self.events.push(PoolEvent::Skipped {
                            key: key.to_string(),
                        });
                        return Err(AcquireError::PoolAtCapacity {
                            key: key.to_string(),
                        });
                    }
                }
            }
        };

        self.next_generation += 1;
        let generation = self.next_generation;

        let emitter = match request.position {
            Some(position) => Emitter::spatial(
                position,
                request
                    .max_distance
                    .unwrap_or(self.settings.default_max_distance),
            ),
            None => Emitter::non_spatial(),
        };
        let fallback = if request.long_form {
            self.settings.narration_fallback
        } else {
            self.settings.release_fallback
        };

        pool.block(
            index,
            now,
            BlockRequest {
                emitter,
                looping: request.looping,
                generation,
                fallback,
            },
        );

        self.counters.acquired += 1;
        self.events.push(PoolEvent::Acquired {
            key: key.to_string(),
            index,
        });

        Ok(PooledSound {
            key: key.to_string(),
            index,
            generation,
        })
    }

    // ============ 加载 ============

    fn complete_load(&mut self, key: &str, waiters: Vec<Waiter>, now: Duration) -> Result<(), AcquireError> {
        match self.load_pool(key, now) {
            Ok(()) => {
                for waiter in waiters {
                    self.resolve_waiter(waiter, now);
                }
                Ok(())
            }
            Err(error) => {
                warn!(key = %key, error = %error, waiters = waiters.len(), "音效加载失败");
                self.counters.load_failures += 1;
                self.events.push(PoolEvent::LoadFailed {
                    key: key.to_string(),
                    message: error.to_string(),
                });
                for waiter in waiters {
                    let mut slot = waiter.slot.borrow_mut();
                    if matches!(*slot, TicketState::Waiting) {
                        *slot = TicketState::Failed(error.clone());
                    }
                }
                Err(error)
            }
        }
    }

    fn resolve_waiter(&mut self, waiter: Waiter, now: Duration) {
        if !matches!(*waiter.slot.borrow(), TicketState::Waiting) {
            debug!(key = %waiter.request.key, "等待者已取消，跳过");
            return;
        }

        let state = match self.acquire_from_pool(&waiter.request, now) {
            Ok(sound) => {
                self.delivered.push(Rc::clone(&waiter.slot));
                TicketState::Ready(sound)
            }
            Err(error) => TicketState::Failed(error),
        };
        *waiter.slot.borrow_mut() = state;
    }

    fn load_pool(&mut self, key: &str, now: Duration) -> Result<(), AcquireError> {
        let asset = self.load_asset(key)?;
        let first = self
            .backend
            .instantiate(&asset)
            .map_err(|source| AcquireError::Backend {
                key: key.to_string(),
                source,
            })?;

        info!(
            key = %key,
            path = %asset.path,
            backend = self.backend.name(),
            "音效池已创建"
        );
        let pool = AudioPool::new(asset, first, now, self.settings.max_pool_size);
        self.pools.insert(key.to_string(), pool);
        self.events.push(PoolEvent::PoolCreated {
            key: key.to_string(),
        });
        Ok(())
    }

    /// 读取一次资源字节；失败后绕过缓存重试一次
    fn load_asset(&self, key: &str) -> Result<super::backend::SoundAsset, AcquireError> {
        let candidates = sound_candidates(&self.settings.sound_dir, key);
        let path = candidates
            .iter()
            .find(|path| self.source.exists(path))
            .or(candidates.first())
            .cloned()
            .unwrap_or_else(|| key.to_string());

        let bytes = match self.source.read(&path, FetchMode::Normal) {
            Ok(bytes) => bytes,
            Err(error) => {
                warn!(key = %key, path = %path, error = %error, "音效读取失败，绕过缓存重试");
                self.source
                    .read(&path, FetchMode::CacheBust)
                    .map_err(|source| AcquireError::AssetLoadFailed {
                        key: key.to_string(),
                        source,
                    })?
            }
        };

        Ok(super::backend::SoundAsset {
            key: key.to_string(),
            path,
            bytes: Arc::from(bytes),
        })
    }

    // ============ 播放控制 ============

    fn held_item_mut(&mut self, sound: &PooledSound) -> Option<&mut AudioPoolItem> {
        self.pools
            .get_mut(&sound.key)?
            .item_mut(sound.index)
            .filter(|item| item.is_held_by(sound.generation))
    }

    /// 条目是否仍被这次占用持有
    pub fn is_held(&self, sound: &PooledSound) -> bool {
        self.pools
            .get(&sound.key)
            .and_then(|pool| pool.item(sound.index))
            .is_some_and(|item| item.is_held_by(sound.generation))
    }

    fn effective_volume(&self, volume: f32) -> f32 {
        if self.settings.muted {
            0.0
        } else {
            (volume * self.settings.master_volume).clamp(0.0, 1.0)
        }
    }

    /// 设置音量并开始播放，同时布置"播放结束"信号
    ///
    /// 条目已被回收时为 no-op。
    pub fn play(&mut self, sound: &PooledSound, volume: f32) -> Result<(), AudioError> {
        let gain = self.effective_volume(volume);
        let signal = EndSignal::new(
            self.ended_tx.clone(),
            EndedItem {
                key: sound.key.clone(),
                index: sound.index,
                generation: sound.generation,
            },
        );

        let Some(item) = self.held_item_mut(sound) else {
            debug!(key = %sound.key, index = sound.index, "条目已被回收，忽略播放");
            return Ok(());
        };
        let looping = item.is_looping();
        let handle = item.handle_mut();
        handle.set_volume(gain);
        handle.play(looping, signal)
    }

    /// 调整音量；返回条目是否仍被持有
    pub fn set_volume(&mut self, sound: &PooledSound, volume: f32) -> bool {
        let gain = self.effective_volume(volume);
        match self.held_item_mut(sound) {
            Some(item) => {
                item.handle_mut().set_volume(gain);
                true
            }
            None => false,
        }
    }

    /// 调整位置；返回条目是否仍被持有
    pub fn set_emitter(&mut self, sound: &PooledSound, position: Option<Vec3>, max_distance: Option<f32>) -> bool {
        let default_distance = self.settings.default_max_distance;
        match self.held_item_mut(sound) {
            Some(item) => {
                let emitter = match position {
                    Some(position) => {
                        Emitter::spatial(position, max_distance.unwrap_or(default_distance))
                    }
                    None => Emitter::non_spatial(),
                };
                item.handle_mut().set_emitter(emitter);
                true
            }
            None => false,
        }
    }

    /// 显式释放；返回是否真的释放了（已被回收时为 false）
    pub fn release(&mut self, sound: PooledSound) -> bool {
        self.release_item(&sound.key, sound.index, sound.generation, ReleaseReason::Explicit)
    }

    fn release_item(&mut self, key: &str, index: usize, generation: u64, reason: ReleaseReason) -> bool {
        let released = self
            .pools
            .get_mut(key)
            .is_some_and(|pool| pool.release(index, generation));

        if released {
            self.events.push(PoolEvent::Released {
                key: key.to_string(),
                index,
                reason,
            });
        } else {
            debug!(key = %key, index, generation, ?reason, "过期的释放请求，忽略");
        }
        released
    }

    // ============ 帧推进 ============

    /// 推进加载、结束通知与兜底计时器
    pub fn update(&mut self, now: Duration) {
        for load in std::mem::take(&mut self.in_flight) {
            if self.pools.contains_key(&load.key) {
                for waiter in load.waiters {
                    self.resolve_waiter(waiter, now);
                }
            } else {
                let _ = self.complete_load(&load.key, load.waiters, now);
            }
        }

        let mut abandoned = Vec::new();
        self.delivered.retain(|slot| {
            let mut state = slot.borrow_mut();
            match std::mem::replace(&mut *state, TicketState::Cancelled) {
                TicketState::Abandoned(sound) => {
                    abandoned.push(sound);
                    false
                }
                TicketState::Ready(sound) => {
                    *state = TicketState::Ready(sound);
                    true
                }
                other => {
                    *state = other;
                    false
                }
            }
        });
        for sound in abandoned {
            self.release_item(&sound.key, sound.index, sound.generation, ReleaseReason::Cancelled);
        }

        while let Ok(ended) = self.ended_rx.try_recv() {
            self.release_item(
                &ended.key,
                ended.index,
                ended.generation,
                ReleaseReason::PlaybackEnded,
            );
        }

        for (key, pool) in &mut self.pools {
            for index in pool.expire_deadlines(now) {
                debug!(key = %key, index, "兜底计时器到期，释放音效条目");
                self.events.push(PoolEvent::Released {
                    key: key.clone(),
                    index,
                    reason: ReleaseReason::FallbackTimer,
                });
            }
        }
    }

    // ============ 全局 ============

    pub fn set_listener(&mut self, position: Vec3) {
        self.backend.set_listener(position);
    }

    pub fn listener(&self) -> Vec3 {
        self.backend.listener()
    }

    pub fn set_master_volume(&mut self, volume: f32) {
        self.settings.master_volume = volume.clamp(0.0, 1.0);
    }

    pub fn set_muted(&mut self, muted: bool) {
        self.settings.muted = muted;
    }

    /// 销毁某个资源键的池；旧的 [`PooledSound`] 全部失效
    pub fn unload(&mut self, key: &str) -> bool {
        match self.pools.remove(key) {
            Some(pool) => {
                info!(key = %key, items = pool.len(), "音效池已销毁");
                true
            }
            None => false,
        }
    }

    /// 销毁所有池并取消在途加载
    pub fn clear(&mut self) {
        for load in self.in_flight.drain(..) {
            for waiter in load.waiters {
                *waiter.slot.borrow_mut() = TicketState::Cancelled;
            }
        }
        self.delivered.clear();
        self.pools.clear();
    }

    pub fn has_pool(&self, key: &str) -> bool {
        self.pools.contains_key(key)
    }

    /// 池大小（条目数）
    pub fn pool_size(&self, key: &str) -> usize {
        self.pools.get(key).map_or(0, AudioPool::len)
    }

    /// 池创建时刻
    pub fn pool_created_at(&self, key: &str) -> Option<Duration> {
        self.pools.get(key).map(AudioPool::created_at)
    }

    pub fn in_use(&self, key: &str) -> usize {
        self.pools.get(key).map_or(0, AudioPool::in_use_count)
    }

    pub fn drain_events(&mut self) -> Vec<PoolEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn stats(&self) -> PoolStats {
        PoolStats {
            pools: self.pools.len(),
            items: self.pools.values().map(AudioPool::len).sum(),
            in_use: self.pools.values().map(AudioPool::in_use_count).sum(),
            pending_loads: self.in_flight.len(),
            acquired: self.counters.acquired,
            skipped: self.counters.skipped,
            recovered: self.counters.recovered,
            load_failures: self.counters.load_failures,
        }
    }
}

//! # Audio Backend 模块
//!
//! 音频后端抽象：把已加载的音频字节实例化为可播放的句柄。
//!
//! - [`NullBackend`]：headless 后端，不发声，也无法通知播放结束（依赖兜底计时器）
//! - [`ScriptedBackend`]：可脚本化的记录后端，测试中手动触发"播放结束"
//! - `RodioBackend`：真实输出（`rodio-backend` feature）

use glam::Vec3;
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;
use std::sync::mpsc::Sender;
use thiserror::Error;

/// 已加载的音效资源
///
/// 字节只读取一次，池扩容时从这里重新实例化，不会再次读取资源。
#[derive(Debug, Clone)]
pub struct SoundAsset {
    /// 资源键（如 `step/grass`）
    pub key: String,
    /// 实际读取的逻辑路径
    pub path: String,
    /// 原始字节
    pub bytes: Arc<[u8]>,
}

/// 发声体参数
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Emitter {
    /// 世界坐标；`None` 表示非空间化（直接输出到双声道）
    pub position: Option<Vec3>,
    /// 最大听觉距离
    pub max_distance: f32,
}

impl Emitter {
    pub fn spatial(position: Vec3, max_distance: f32) -> Self {
        Self {
            position: Some(position),
            max_distance,
        }
    }

    pub fn non_spatial() -> Self {
        Self {
            position: None,
            max_distance: 0.0,
        }
    }

    /// 按距离线性衰减的增益 (0.0 - 1.0)
    pub fn attenuation(&self, listener: Vec3) -> f32 {
        match self.position {
            Some(position) if self.max_distance > 0.0 => {
                let distance = position.distance(listener);
                (1.0 - distance / self.max_distance).clamp(0.0, 1.0)
            }
            _ => 1.0,
        }
    }
}

/// 播放结束通知的内容
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndedItem {
    pub key: String,
    pub index: usize,
    pub generation: u64,
}

/// 一次性的"播放结束"信号
///
/// 由服务在每次播放时生成，后端在音源播放完毕时调用 [`EndSignal::fire`]。
/// 服务关闭后发送失败会被忽略。
#[derive(Debug, Clone)]
pub struct EndSignal {
    tx: Sender<EndedItem>,
    item: EndedItem,
}

impl EndSignal {
    pub(crate) fn new(tx: Sender<EndedItem>, item: EndedItem) -> Self {
        Self { tx, item }
    }

    pub fn item(&self) -> &EndedItem {
        &self.item
    }

    pub fn fire(&self) {
        let _ = self.tx.send(self.item.clone());
    }
}

/// 音频错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AudioError {
    /// 解码失败
    #[error("无法解码音频 '{key}': {message}")]
    Decode { key: String, message: String },

    /// 输出设备不可用
    #[error("无法初始化音频输出: {0}")]
    Output(String),

    /// 播放失败
    #[error("无法播放音频 '{key}': {message}")]
    Playback { key: String, message: String },
}

/// 可播放的句柄（池中的一个条目持有一个）
pub trait PlaybackHandle {
    /// 设置位置与听觉距离
    fn set_emitter(&mut self, emitter: Emitter);

    /// 设置音量（已乘上主音量）
    fn set_volume(&mut self, volume: f32);

    /// 从头开始播放
    ///
    /// 非循环播放结束时必须调用 `on_end.fire()`（仅当 [`Self::signals_end`] 为 true）。
    fn play(&mut self, looping: bool, on_end: EndSignal) -> Result<(), AudioError>;

    /// 停止播放；未在播放时为 no-op
    fn stop(&mut self);

    /// 后端能否通知播放结束
    fn signals_end(&self) -> bool;
}

/// 音频后端
pub trait AudioBackend {
    /// 后端名称（用于日志）
    fn name(&self) -> &'static str;

    /// 从已加载的资源实例化一个新句柄
    fn instantiate(&mut self, asset: &SoundAsset) -> Result<Box<dyn PlaybackHandle>, AudioError>;

    /// 更新听者位置
    fn set_listener(&mut self, _position: Vec3) {}

    /// 当前听者位置
    fn listener(&self) -> Vec3 {
        Vec3::ZERO
    }
}

fn check_decodable(asset: &SoundAsset) -> Result<(), AudioError> {
    if asset.bytes.is_empty() {
        return Err(AudioError::Decode {
            key: asset.key.clone(),
            message: "空文件".to_string(),
        });
    }
    Ok(())
}

// ============ NullBackend ============

/// headless 后端
#[derive(Debug, Default)]
pub struct NullBackend {
    listener: Vec3,
}

impl NullBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

struct NullHandle;

impl PlaybackHandle for NullHandle {
    fn set_emitter(&mut self, _emitter: Emitter) {}
    fn set_volume(&mut self, _volume: f32) {}
    fn play(&mut self, _looping: bool, _on_end: EndSignal) -> Result<(), AudioError> {
        Ok(())
    }
    fn stop(&mut self) {}
    fn signals_end(&self) -> bool {
        false
    }
}

impl AudioBackend for NullBackend {
    fn name(&self) -> &'static str {
        "null"
    }

    fn instantiate(&mut self, asset: &SoundAsset) -> Result<Box<dyn PlaybackHandle>, AudioError> {
        check_decodable(asset)?;
        Ok(Box::new(NullHandle))
    }

    fn set_listener(&mut self, position: Vec3) {
        self.listener = position;
    }

    fn listener(&self) -> Vec3 {
        self.listener
    }
}

// ============ ScriptedBackend ============

/// 一次播放的记录
#[derive(Debug, Clone, PartialEq)]
pub struct PlayRecord {
    pub key: String,
    pub handle_id: usize,
    pub volume: f32,
    pub emitter: Option<Emitter>,
    pub looping: bool,
}

#[derive(Debug, Default)]
struct ScriptLog {
    next_handle: usize,
    instantiated: Vec<String>,
    plays: Vec<PlayRecord>,
    /// (handle_id, volume)
    volume_changes: Vec<(usize, f32)>,
    stops: usize,
    /// 正在播放、可以触发结束的信号：(handle_id, signal)
    playing: Vec<(usize, EndSignal)>,
}

/// 可脚本化的记录后端
///
/// 克隆共享同一份记录：把一个克隆交给服务，另一个留在测试里观察与驱动。
#[derive(Debug, Clone)]
pub struct ScriptedBackend {
    log: Rc<RefCell<ScriptLog>>,
    signals_end: bool,
    listener: Vec3,
}

impl ScriptedBackend {
    /// 能通知播放结束的后端
    pub fn with_end_signals() -> Self {
        Self {
            log: Rc::default(),
            signals_end: true,
            listener: Vec3::ZERO,
        }
    }

    /// 无法通知播放结束的后端
    pub fn silent() -> Self {
        Self {
            signals_end: false,
            ..Self::with_end_signals()
        }
    }

    /// 实例化过的句柄数量（按资源键）
    pub fn instantiated(&self, key: &str) -> usize {
        self.log
            .borrow()
            .instantiated
            .iter()
            .filter(|k| k.as_str() == key)
            .count()
    }

    pub fn plays(&self) -> Vec<PlayRecord> {
        self.log.borrow().plays.clone()
    }

    /// 全部音量设置（包括播放前的设置）
    pub fn volume_changes(&self) -> Vec<f32> {
        self.log
            .borrow()
            .volume_changes
            .iter()
            .map(|(_, volume)| *volume)
            .collect()
    }

    pub fn stop_count(&self) -> usize {
        self.log.borrow().stops
    }

    /// 正在播放（尚未结束或停止）的数量
    pub fn playing_count(&self) -> usize {
        self.log.borrow().playing.len()
    }

    /// 让某个资源键的所有播放结束，返回触发的数量
    pub fn finish_playing(&self, key: &str) -> usize {
        let finished: Vec<EndSignal> = {
            let mut log = self.log.borrow_mut();
            let (done, rest): (Vec<_>, Vec<_>) = log
                .playing
                .drain(..)
                .partition(|(_, signal)| signal.item().key == key);
            log.playing = rest;
            done.into_iter().map(|(_, signal)| signal).collect()
        };

        for signal in &finished {
            signal.fire();
        }
        finished.len()
    }
}

struct ScriptedHandle {
    id: usize,
    key: String,
    volume: f32,
    emitter: Option<Emitter>,
    signals_end: bool,
    log: Rc<RefCell<ScriptLog>>,
}

impl PlaybackHandle for ScriptedHandle {
    fn set_emitter(&mut self, emitter: Emitter) {
        self.emitter = Some(emitter);
    }

    fn set_volume(&mut self, volume: f32) {
        self.volume = volume;
        self.log.borrow_mut().volume_changes.push((self.id, volume));
    }

    fn play(&mut self, looping: bool, on_end: EndSignal) -> Result<(), AudioError> {
        let mut log = self.log.borrow_mut();
        log.plays.push(PlayRecord {
            key: self.key.clone(),
            handle_id: self.id,
            volume: self.volume,
            emitter: self.emitter,
            looping,
        });
        log.playing.retain(|(id, _)| *id != self.id);
        if self.signals_end && !looping {
            log.playing.push((self.id, on_end));
        }
        Ok(())
    }

    fn stop(&mut self) {
        let mut log = self.log.borrow_mut();
        log.stops += 1;
        log.playing.retain(|(id, _)| *id != self.id);
    }

    fn signals_end(&self) -> bool {
        self.signals_end
    }
}

impl AudioBackend for ScriptedBackend {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn instantiate(&mut self, asset: &SoundAsset) -> Result<Box<dyn PlaybackHandle>, AudioError> {
        check_decodable(asset)?;

        let id = {
            let mut log = self.log.borrow_mut();
            log.instantiated.push(asset.key.clone());
            log.next_handle += 1;
            log.next_handle
        };

        Ok(Box::new(ScriptedHandle {
            id,
            key: asset.key.clone(),
            volume: 1.0,
            emitter: None,
            signals_end: self.signals_end,
            log: Rc::clone(&self.log),
        }))
    }

    fn set_listener(&mut self, position: Vec3) {
        self.listener = position;
    }

    fn listener(&self) -> Vec3 {
        self.listener
    }
}

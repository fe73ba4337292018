//! # Audio 模块
//!
//! 池化空间音效系统。
//!
//! ## 功能特性
//!
//! - 每个音效资源一个句柄池，按需扩容，上限 `max_pool_size`
//! - 并发加载合并：同一资源键同时只有一次读取
//! - 播放结束自动释放；后端无法通知时使用兜底计时器
//! - 池满时回收卡死条目，仍无可用条目则跳过本次播放
//!
//! ## 后端
//!
//! - [`NullBackend`]：headless
//! - [`ScriptedBackend`]：测试
//! - `RodioBackend`：`rodio-backend` feature

mod backend;
mod pool;
mod service;
mod stats;

#[cfg(feature = "rodio-backend")]
mod rodio_backend;

pub use backend::{
    AudioBackend, AudioError, Emitter, EndSignal, EndedItem, NullBackend, PlayRecord,
    PlaybackHandle, ScriptedBackend, SoundAsset,
};
pub use service::{
    Acquire, AcquireError, AcquireTicket, AudioService, AudioSettings, PooledSound, SoundRequest,
    TicketPoll,
};
pub use stats::{PoolEvent, PoolStats, ReleaseReason};

#[cfg(feature = "rodio-backend")]
pub use rodio_backend::RodioBackend;

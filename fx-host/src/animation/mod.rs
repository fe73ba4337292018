//! # Animation 模块
//!
//! 时间轴播放与模板库。
//!
//! ## 核心概念
//!
//! - `TemplateLibrary`：从资源目录加载的具名模板
//! - `TimelinePlayer`：逐帧驱动已绑定的时间轴，按窗口生成/停止效果实例
//! - `PlaybackEvent`：播放过程中产生的事件，由宿主取走
//!
//! ## 使用示例
//!
//! ```rust,ignore
//! let timeline = library.instantiate("strike", &bindings)?;
//! let playback = player.play(timeline, now)?;
//!
//! // 每帧
//! player.update(&mut factory, &mut deps);
//! for event in player.drain_events() { /* ... */ }
//! ```

mod library;
mod player;

pub use library::TemplateLibrary;
pub use player::{PlaybackId, TimelinePlayer};

use anim_runtime::TimelineError;
use thiserror::Error;

/// 播放事件
#[derive(Debug, Clone, PartialEq)]
pub enum PlaybackEvent {
    /// 开始播放
    Started { playback: PlaybackId, name: String },
    /// 进入新的一轮（循环或重复播放）
    IterationStarted { playback: PlaybackId, iteration: u32 },
    /// 条目生成了效果实例
    EffectSpawned {
        playback: PlaybackId,
        entry: usize,
        type_id: String,
    },
    /// 条目无法生成效果实例（未知类型、构造失败）
    SpawnFailed {
        playback: PlaybackId,
        entry: usize,
        message: String,
    },
    /// 自然播放完毕
    Finished { playback: PlaybackId },
    /// 被显式停止
    Stopped { playback: PlaybackId },
}

/// 播放错误
///
/// 只有这些错误会传播给触发方；效果内部的失败都在播放器内被吞掉并记录日志。
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PlayError {
    /// 模板库中没有该模板
    #[error("未知的动画模板: '{0}'")]
    UnknownTemplate(String),

    /// 代入或校验失败
    #[error(transparent)]
    Timeline(#[from] TimelineError),

    /// 播放已结束或不存在
    #[error("播放 {0} 不存在")]
    UnknownPlayback(PlaybackId),

    /// 时间轴中没有该 ID 的条目
    #[error("动画 '{timeline}' 中没有 ID 为 '{entry}' 的条目")]
    UnknownEntry { timeline: String, entry: String },
}

//! # Schedule 模块
//!
//! 播放头：把"自播放开始经过的时间"换算为"第几轮、轮内时刻"。
//!
//! 处理 `loop` / `repeat`，不关心条目本身。

use crate::timeline::Timeline;

/// 播放头位置
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlayheadPosition {
    /// 当前轮次（从 0 开始）
    pub iteration: u32,
    /// 轮内时刻（毫秒，`0..=duration`）
    pub local_time: i64,
    /// 是否已播放完毕（循环播放时永远为 false）
    pub finished: bool,
}

/// 播放头
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Playhead {
    /// 单轮时长（毫秒）
    duration: i64,
    /// 播放轮数，`None` 表示无限循环
    plays: Option<u32>,
}

impl Playhead {
    /// 创建播放头
    ///
    /// 时长为 0 的时间轴无法循环，按单次播放处理。
    pub fn new(duration: i64, looping: bool, repeat: Option<u32>) -> Self {
        let duration = duration.max(0);
        let plays = if looping && duration > 0 {
            None
        } else {
            Some(repeat.unwrap_or(1).max(1))
        };
        Self { duration, plays }
    }

    /// 按时间轴的推导时长与循环设置创建
    pub fn for_timeline(timeline: &Timeline) -> Self {
        Self::new(
            timeline.calculate_duration(),
            timeline.looping,
            timeline.repeat,
        )
    }

    /// 单轮时长
    pub fn duration(&self) -> i64 {
        self.duration
    }

    /// 是否无限循环
    pub fn is_looping(&self) -> bool {
        self.plays.is_none()
    }

    /// 全部轮次的总时长；无限循环时为 None
    pub fn total_duration(&self) -> Option<i64> {
        self.plays.map(|n| self.duration.saturating_mul(n as i64))
    }

    /// 定位
    ///
    /// 轮次边界上的时刻归属下一轮；最后一轮结束时刻停在 `local_time == duration`。
    pub fn locate(&self, elapsed: i64) -> PlayheadPosition {
        let elapsed = elapsed.max(0);

        if let Some(total) = self.total_duration()
            && elapsed >= total
        {
            return PlayheadPosition {
                iteration: self.plays.unwrap_or(1).saturating_sub(1),
                local_time: self.duration,
                finished: true,
            };
        }

        // 走到这里时 duration > 0（时长为 0 的播放头总是已结束）
        PlayheadPosition {
            iteration: (elapsed / self.duration) as u32,
            local_time: elapsed % self.duration,
            finished: false,
        }
    }
}

//! # Sequence 模块
//!
//! 按 `blocking` 语义编排时间轴。
//!
//! 时间轴数据模型不强制 `blocking`：它只影响**编排**时如何计算 `startTime`。
//! 本模块就是把这层编排意图落到具体时间上的地方：
//!
//! - 加入的条目的 `startTime` / `endTime` 被视为相对于当前游标的偏移
//! - 非阻塞条目与游标处的其他条目并行
//! - 阻塞条目加入后，游标推进到它的窗口结束时刻，后续条目等待它
//!
//! ```rust,ignore
//! let timeline = SequenceBuilder::new("strike")
//!     .add(TimelineEffectEntry::new("lightning").lasting(300).blocking())
//!     .add(TimelineEffectEntry::new("sound").with_param("sound", "thunder"))
//!     .add(TimelineEffectEntry::new("particles").lasting(800))
//!     .build();
//! // sound 与 particles 都从 300ms 开始
//! ```

use crate::timeline::{Timeline, TimelineEffectEntry};

/// 时间轴编排器
#[derive(Debug, Clone)]
pub struct SequenceBuilder {
    timeline: Timeline,
    /// 下一个条目的起点（毫秒）
    cursor: i64,
}

impl SequenceBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            timeline: Timeline::new(name, Vec::new()),
            cursor: 0,
        }
    }

    /// 当前游标
    pub fn cursor(&self) -> i64 {
        self.cursor
    }

    /// 加入条目（时间相对于游标）
    pub fn add(mut self, mut entry: TimelineEffectEntry) -> Self {
        entry.start_time = entry.start_time.saturating_add(self.cursor);
        if let Some(end) = entry.end_time.as_mut() {
            *end = end.saturating_add(self.cursor);
        }

        if entry.blocking {
            self.cursor = self.cursor.max(entry.effective_end_time());
        }

        self.timeline.effects.push(entry);
        self
    }

    /// 游标后移一段空白
    pub fn wait(mut self, ms: i64) -> Self {
        self.cursor = self.cursor.saturating_add(ms.max(0));
        self
    }

    /// 声明模板占位符
    pub fn placeholders<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.timeline.placeholders = Some(names.into_iter().map(Into::into).collect());
        self
    }

    pub fn looping(mut self, looping: bool) -> Self {
        self.timeline.looping = looping;
        self
    }

    pub fn repeat(mut self, plays: u32) -> Self {
        self.timeline.repeat = Some(plays);
        self
    }

    pub fn build(self) -> Timeline {
        self.timeline
    }
}

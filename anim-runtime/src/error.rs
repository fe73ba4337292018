//! # Error 模块
//!
//! 定义 anim-runtime 中使用的错误类型。
//!
//! 这些错误只对"当前这一次触发"致命：调用方丢弃这次动画，不影响进程和其他动画。

use thiserror::Error;

/// 时间轴校验失败的具体原因
#[derive(Error, Debug, Clone, PartialEq)]
pub enum InvalidReason {
    /// 名称为空
    #[error("名称为空")]
    EmptyName,

    /// 没有任何效果条目
    #[error("没有任何效果条目")]
    NoEffects,

    /// 条目开始时间为负
    #[error("第 {index} 个条目的 startTime 为负数（{start_time}）")]
    NegativeStartTime { index: usize, start_time: i64 },

    /// 条目时长为负
    #[error("第 {index} 个条目的 duration 为负数（{duration}）")]
    NegativeDuration { index: usize, duration: i64 },

    /// 结束时间早于开始时间
    #[error("第 {index} 个条目的 endTime（{end_time}）早于 startTime（{start_time}）")]
    EndBeforeStart {
        index: usize,
        start_time: i64,
        end_time: i64,
    },

    /// 仍有未代入的占位符
    #[error("存在未解析的占位符: {}", .names.join(", "))]
    UnresolvedPlaceholders { names: Vec<String> },
}

/// 时间轴错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TimelineError {
    /// 代入时缺少占位符坐标
    #[error("动画 '{timeline}' 缺少占位符 '{name}' 的坐标")]
    MissingPlaceholder { timeline: String, name: String },

    /// 时间轴未通过校验
    #[error("动画 '{timeline}' 无效：{reason}")]
    InvalidTimeline {
        timeline: String,
        reason: InvalidReason,
    },

    /// 文档无法解析
    #[error("动画文档解析失败: {0}")]
    Malformed(String),
}

impl From<serde_json::Error> for TimelineError {
    fn from(e: serde_json::Error) -> Self {
        Self::Malformed(e.to_string())
    }
}

/// Result 类型别名
pub type TimelineResult<T> = Result<T, TimelineError>;

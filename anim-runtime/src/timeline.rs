//! # Timeline 模块
//!
//! 动画数据（AnimationData）：描述哪些效果在什么时间窗口内运行。
//!
//! ## 时间单位
//!
//! 所有时间字段均为**毫秒**，相对于时间轴开始时刻。
//!
//! ## 推导值
//!
//! 以下值都是现算的，不存储：
//! - 总时长：[`Timeline::calculate_duration`]
//! - 未解析占位符集合：[`Timeline::unresolved_placeholders`]
//!
//! 文档里显式写出的 `duration` 字段只是提示，与推导值不一致时以推导值为准。

use crate::error::{InvalidReason, TimelineError, TimelineResult};
use crate::position::PositionRef;
use crate::value::{ParamValue, Params};
use glam::Vec3;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// 时间轴效果条目
///
/// 生效窗口为 `[start_time, effective_end_time()]`（两端闭区间）。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineEffectEntry {
    /// 条目 ID（可选，用于运行中重定向参数）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// 效果类型 ID
    pub type_id: String,

    /// 坐标引用列表（第一个为源，其余为目标）
    #[serde(default)]
    pub positions: Vec<PositionRef>,

    /// 效果参数
    #[serde(default)]
    pub params: Params,

    /// 开始时间（毫秒）
    #[serde(default)]
    pub start_time: i64,

    /// 持续时间（毫秒）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<i64>,

    /// 结束时间（毫秒），优先于 `duration`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<i64>,

    /// 编排提示：之后串行编排的条目应等待本条目窗口结束
    ///
    /// 数据模型本身不强制执行，见 [`SequenceBuilder`](crate::SequenceBuilder)。
    #[serde(default)]
    pub blocking: bool,
}

impl TimelineEffectEntry {
    /// 创建瞬时条目（开始于 0，无持续时间）
    pub fn new(type_id: impl Into<String>) -> Self {
        Self {
            id: None,
            type_id: type_id.into(),
            positions: Vec::new(),
            params: Params::new(),
            start_time: 0,
            duration: None,
            end_time: None,
            blocking: false,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// 追加固定坐标
    pub fn at(mut self, position: Vec3) -> Self {
        self.positions.push(PositionRef::Fixed(position));
        self
    }

    /// 追加占位符坐标
    pub fn with_placeholder(mut self, name: impl Into<String>) -> Self {
        self.positions.push(PositionRef::Placeholder(name.into()));
        self
    }

    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    pub fn starting_at(mut self, start_time: i64) -> Self {
        self.start_time = start_time;
        self
    }

    pub fn lasting(mut self, duration: i64) -> Self {
        self.duration = Some(duration);
        self
    }

    pub fn ending_at(mut self, end_time: i64) -> Self {
        self.end_time = Some(end_time);
        self
    }

    pub fn blocking(mut self) -> Self {
        self.blocking = true;
        self
    }

    /// 实际结束时间
    ///
    /// `end_time` 优先；否则 `start_time + duration`；都没有时为瞬时条目（结束于开始时刻）。
    pub fn effective_end_time(&self) -> i64 {
        self.end_time
            .unwrap_or_else(|| self.start_time.saturating_add(self.duration.unwrap_or(0)))
    }

    /// 在时刻 `t` 是否处于生效窗口
    pub fn is_active_at(&self, t: i64) -> bool {
        self.start_time <= t && t <= self.effective_end_time()
    }

    /// 是否仍含占位符
    pub fn has_placeholders(&self) -> bool {
        self.positions.iter().any(PositionRef::is_placeholder)
    }
}

/// 时间轴（AnimationData）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Timeline {
    /// 动画名称
    pub name: String,

    /// 效果条目（顺序即同一帧内的求值顺序）
    pub effects: Vec<TimelineEffectEntry>,

    /// 模板声明的占位符名称
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholders: Option<Vec<String>>,

    /// 是否无限循环
    #[serde(default, rename = "loop", skip_serializing_if = "std::ops::Not::not")]
    pub looping: bool,

    /// 播放次数（含第一次）；`loop` 为 true 时忽略
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repeat: Option<u32>,

    /// 文档中存储的时长提示（毫秒），不参与任何计算
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<i64>,

    /// 服务端下发的时间轴，只含固定坐标
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub server_sourced: bool,
}

impl Timeline {
    /// 创建时间轴
    pub fn new(name: impl Into<String>, effects: Vec<TimelineEffectEntry>) -> Self {
        Self {
            name: name.into(),
            effects,
            placeholders: None,
            looping: false,
            repeat: None,
            duration: None,
            server_sourced: false,
        }
    }

    /// 从 JSON 文档解析
    pub fn from_json(json: &str) -> TimelineResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// 序列化为 JSON 文档
    pub fn to_json_pretty(&self) -> TimelineResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// 推导总时长（毫秒）
    ///
    /// 所有条目实际结束时间的最大值；没有条目时为 0。
    pub fn calculate_duration(&self) -> i64 {
        self.effects
            .iter()
            .map(TimelineEffectEntry::effective_end_time)
            .max()
            .unwrap_or(0)
            .max(0)
    }

    /// 存储的时长提示与推导值不一致时返回 `(stored, derived)`
    pub fn duration_mismatch(&self) -> Option<(i64, i64)> {
        let derived = self.calculate_duration();
        match self.duration {
            Some(stored) if stored != derived => Some((stored, derived)),
            _ => None,
        }
    }

    /// 所有仍被引用的占位符名称（有序）
    pub fn unresolved_placeholders(&self) -> BTreeSet<&str> {
        self.effects
            .iter()
            .flat_map(|e| e.positions.iter())
            .filter_map(PositionRef::placeholder_name)
            .collect()
    }

    /// 是否已绑定（不含任何占位符）
    pub fn is_bound(&self) -> bool {
        !self.effects.iter().any(TimelineEffectEntry::has_placeholders)
    }

    /// 时刻 `t` 处于生效窗口的条目（按列表顺序，附带下标）
    pub fn active_entries(&self, t: i64) -> impl Iterator<Item = (usize, &TimelineEffectEntry)> {
        self.effects
            .iter()
            .enumerate()
            .filter(move |(_, e)| e.is_active_at(t))
    }

    /// 按 ID 查找条目下标
    pub fn entry_index(&self, id: &str) -> Option<usize> {
        self.effects
            .iter()
            .position(|e| e.id.as_deref() == Some(id))
    }

    /// 派发前校验
    ///
    /// 规则：
    /// - 名称非空
    /// - 至少一个条目
    /// - 每个条目 `startTime >= 0`，`duration >= 0`
    /// - `endTime`（若有）不早于 `startTime`
    /// - 不含未解析占位符（`server_sourced` 的时间轴除外）
    pub fn validate(&self) -> TimelineResult<()> {
        let invalid = |reason| TimelineError::InvalidTimeline {
            timeline: self.name.clone(),
            reason,
        };

        if self.name.trim().is_empty() {
            return Err(invalid(InvalidReason::EmptyName));
        }

        if self.effects.is_empty() {
            return Err(invalid(InvalidReason::NoEffects));
        }

        for (index, entry) in self.effects.iter().enumerate() {
            if entry.start_time < 0 {
                return Err(invalid(InvalidReason::NegativeStartTime {
                    index,
                    start_time: entry.start_time,
                }));
            }

            if let Some(duration) = entry.duration
                && duration < 0
            {
                return Err(invalid(InvalidReason::NegativeDuration { index, duration }));
            }

            if let Some(end_time) = entry.end_time
                && end_time < entry.start_time
            {
                return Err(invalid(InvalidReason::EndBeforeStart {
                    index,
                    start_time: entry.start_time,
                    end_time,
                }));
            }
        }

        if !self.server_sourced {
            let names = self.unresolved_placeholders();
            if !names.is_empty() {
                return Err(invalid(InvalidReason::UnresolvedPlaceholders {
                    names: names.into_iter().map(str::to_string).collect(),
                }));
            }
        }

        Ok(())
    }
}

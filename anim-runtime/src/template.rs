//! # Template 模块
//!
//! 占位符代入：把含具名坐标槽位的模板时间轴，转换为绑定到具体世界坐标的新时间轴。
//!
//! 模板本身不会被修改，每次触发都产生一个新的不可变时间轴。

use crate::error::{TimelineError, TimelineResult};
use crate::position::PositionRef;
use crate::timeline::Timeline;
use glam::Vec3;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

/// 占位符名称 -> 世界坐标
pub type Bindings = HashMap<String, Vec3>;

/// 把模板中所有 `Placeholder(name)` 替换为 `Fixed(bindings[name])`
///
/// 模板引用的任一名称在 `bindings` 中缺失时返回 `MissingPlaceholder`
/// （按名称排序后报告第一个缺失项）。`bindings` 中多余的名称被忽略。
pub fn substitute(template: &Timeline, bindings: &Bindings) -> TimelineResult<Timeline> {
    if let Some(missing) = template
        .unresolved_placeholders()
        .into_iter()
        .find(|name| !bindings.contains_key(*name))
    {
        return Err(TimelineError::MissingPlaceholder {
            timeline: template.name.clone(),
            name: missing.to_string(),
        });
    }

    let mut bound = template.clone();
    for entry in &mut bound.effects {
        for position in &mut entry.positions {
            if let PositionRef::Placeholder(name) = position {
                // 上面已经检查过全部名称
                if let Some(p) = bindings.get(name.as_str()) {
                    *position = PositionRef::Fixed(*p);
                }
            }
        }
    }
    bound.placeholders = None;

    Ok(bound)
}

/// 动画模板
///
/// 包装一个（通常）含占位符的时间轴，按触发事件实例化。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnimationTemplate {
    timeline: Timeline,
}

impl AnimationTemplate {
    pub fn new(timeline: Timeline) -> Self {
        Self { timeline }
    }

    /// 从 JSON 文档解析
    pub fn from_json(json: &str) -> TimelineResult<Self> {
        Timeline::from_json(json).map(Self::new)
    }

    pub fn name(&self) -> &str {
        &self.timeline.name
    }

    pub fn timeline(&self) -> &Timeline {
        &self.timeline
    }

    /// 模板需要的占位符名称：声明的与实际引用的并集
    pub fn placeholder_names(&self) -> BTreeSet<String> {
        let mut names: BTreeSet<String> = self
            .timeline
            .unresolved_placeholders()
            .into_iter()
            .map(str::to_string)
            .collect();
        if let Some(declared) = &self.timeline.placeholders {
            names.extend(declared.iter().cloned());
        }
        names
    }

    /// 代入坐标，得到已绑定的新时间轴
    pub fn instantiate(&self, bindings: &Bindings) -> TimelineResult<Timeline> {
        substitute(&self.timeline, bindings)
    }
}

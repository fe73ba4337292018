//! # Anim Runtime
//!
//! 声明式动画时间轴的纯逻辑核心库。
//!
//! ## 架构概述
//!
//! `anim-runtime` 不依赖任何 IO、渲染或音频后端，只描述"什么效果在什么时间运行"：
//!
//! ```text
//! AnimationTemplate (含占位符)
//!   │  instantiate(bindings)
//!   ▼
//! Timeline (已绑定)
//!   │  validate()
//!   ▼
//! 外部驱动器（fx-host 的 TimelinePlayer）逐帧查询活跃条目
//! ```
//!
//! ## 核心类型
//!
//! - [`Timeline`]：动画数据（一组按时间排布的效果条目）
//! - [`TimelineEffectEntry`]：单个效果条目
//! - [`PositionRef`]：固定坐标或具名占位符
//! - [`AnimationTemplate`]：可复用的模板，按触发事件代入具体坐标
//! - [`Playhead`]：循环/重复播放的时间换算
//! - [`SequenceBuilder`]：按 `blocking` 语义编排串行/并行条目
//!
//! ## 模块结构
//!
//! - [`timeline`]：时间轴数据模型、时长推导、活跃窗口与校验
//! - [`template`]：占位符代入
//! - [`schedule`]：播放头
//! - [`sequence`]：编排辅助
//! - [`value`]：效果参数值
//! - [`error`]：错误类型定义

pub mod error;
pub mod position;
pub mod schedule;
pub mod sequence;
pub mod template;
pub mod timeline;
pub mod value;

// 重导出核心类型
pub use error::{InvalidReason, TimelineError, TimelineResult};
pub use glam::Vec3;
pub use position::PositionRef;
pub use schedule::{Playhead, PlayheadPosition};
pub use sequence::SequenceBuilder;
pub use template::{AnimationTemplate, Bindings, substitute};
pub use timeline::{Timeline, TimelineEffectEntry};
pub use value::{ParamValue, Params};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_api_accessible() {
        let entry = TimelineEffectEntry::new("sound").with_placeholder("origin");
        let timeline = Timeline::new("hit", vec![entry]);
        assert!(!timeline.is_bound());

        let mut bindings = Bindings::new();
        bindings.insert("origin".to_string(), Vec3::ZERO);
        let bound = substitute(&timeline, &bindings).unwrap();
        assert!(bound.is_bound());
    }
}

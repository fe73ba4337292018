//! # Effect Context 模块
//!
//! 效果执行时的上下文（触发者、来源、目标、变量）与外部协作者。

use crate::audio::AudioService;
use crate::render::RenderSurface;
use anim_runtime::{ParamValue, Params};
use glam::{IVec3, Vec3};
use std::time::Duration;

/// 上下文中的主体
#[derive(Debug, Clone, PartialEq)]
pub enum Subject {
    /// 纯坐标
    Point(Vec3),
    /// 实体（位置可能未知，例如尚未同步）
    Entity { id: u64, position: Option<Vec3> },
    /// 方块（整数坐标）
    Block { pos: IVec3 },
}

/// 主体的世界坐标
///
/// 方块取中心点。
pub fn resolve_position(subject: &Subject) -> Option<Vec3> {
    match subject {
        Subject::Point(position) => Some(*position),
        Subject::Entity { position, .. } => *position,
        Subject::Block { pos } => Some(pos.as_vec3() + Vec3::splat(0.5)),
    }
}

impl Subject {
    pub fn position(&self) -> Option<Vec3> {
        resolve_position(self)
    }

    pub fn entity_id(&self) -> Option<u64> {
        match self {
            Subject::Entity { id, .. } => Some(*id),
            _ => None,
        }
    }

    pub fn block(&self) -> Option<IVec3> {
        match self {
            Subject::Block { pos } => Some(*pos),
            _ => None,
        }
    }
}

/// 效果上下文
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EffectContext {
    /// 触发标识（动画名、脚本事件名等）
    pub trigger: String,
    /// 来源主体
    pub source: Option<Subject>,
    /// 目标主体
    pub targets: Vec<Subject>,
    /// 自由变量袋
    pub variables: Params,
}

impl EffectContext {
    pub fn new(trigger: impl Into<String>) -> Self {
        Self {
            trigger: trigger.into(),
            ..Self::default()
        }
    }

    pub fn with_source(mut self, source: Subject) -> Self {
        self.source = Some(source);
        self
    }

    pub fn with_target(mut self, target: Subject) -> Self {
        self.targets.push(target);
        self
    }

    pub fn with_variable(mut self, name: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.variables.insert(name.into(), value.into());
        self
    }

    pub fn source_position(&self) -> Option<Vec3> {
        self.source.as_ref().and_then(resolve_position)
    }

    /// 第一个能解析出坐标的目标
    pub fn target_position(&self) -> Option<Vec3> {
        self.targets.iter().find_map(resolve_position)
    }
}

/// 效果运行时依赖的外部协作者
///
/// 每帧由驱动器构造；任何一个都可能不可用。
pub struct EffectDeps<'a> {
    /// 当前时刻（自宿主启动）
    pub now: Duration,
    pub audio: Option<&'a mut AudioService>,
    pub surface: Option<&'a mut dyn RenderSurface>,
}

impl<'a> EffectDeps<'a> {
    pub fn new(now: Duration) -> Self {
        Self {
            now,
            audio: None,
            surface: None,
        }
    }

    pub fn with_audio(mut self, audio: &'a mut AudioService) -> Self {
        self.audio = Some(audio);
        self
    }

    pub fn with_surface(mut self, surface: &'a mut dyn RenderSurface) -> Self {
        self.surface = Some(surface);
        self
    }

    pub fn audio(&mut self) -> Option<&mut AudioService> {
        self.audio.as_deref_mut()
    }

    pub fn surface(&mut self) -> Option<&mut (dyn RenderSurface + 'a)> {
        self.surface.as_deref_mut()
    }
}

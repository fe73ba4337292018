//! # Render 模块
//!
//! 渲染表面边界。效果只通过 [`RenderSurface`] 生成、更新与销毁图元，
//! 不关心具体的渲染管线。

mod color;
mod headless;

pub use color::Color;
pub use headless::{HeadlessSurface, SurfaceLog};

use glam::Vec3;
use thiserror::Error;

/// 图元句柄
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RenderHandle(pub u64);

/// 效果可以请求的图元
#[derive(Debug, Clone, PartialEq)]
pub enum Primitive {
    /// 光束（从 `from` 到 `to`）
    Beam {
        from: Vec3,
        to: Vec3,
        color: Color,
        width: f32,
    },
    /// 粒子爆发
    Particles {
        origin: Vec3,
        count: u32,
        color: Color,
        /// 粒子寿命（毫秒）
        lifetime_ms: i64,
    },
    /// 闪电
    Bolt {
        from: Vec3,
        to: Vec3,
        color: Color,
    },
}

impl Primitive {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Beam { .. } => "beam",
            Self::Particles { .. } => "particles",
            Self::Bolt { .. } => "bolt",
        }
    }
}

/// 渲染错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RenderError {
    /// 图元不存在（已销毁）
    #[error("图元不存在: {0:?}")]
    UnknownHandle(RenderHandle),

    /// 表面拒绝了请求
    #[error("渲染表面拒绝了 {kind} 图元: {message}")]
    Rejected { kind: String, message: String },
}

/// 渲染表面
pub trait RenderSurface {
    /// 生成图元
    fn spawn(&mut self, primitive: Primitive) -> Result<RenderHandle, RenderError>;

    /// 替换图元
    fn update(&mut self, handle: RenderHandle, primitive: Primitive) -> Result<(), RenderError>;

    /// 销毁图元；句柄不存在时为 no-op
    fn despawn(&mut self, handle: RenderHandle);
}

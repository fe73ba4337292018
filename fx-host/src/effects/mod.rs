//! # Effects 模块
//!
//! 效果生命周期、注册表与工厂。
//!
//! ## 生命周期
//!
//! ```text
//! 持续效果: Created → Executing → Running → Stopped
//! 一次性效果: Created → Executing → Completed
//! ```
//!
//! - `execute` 只执行一次，可能停在 `Executing` 等待资源（由每帧 `poll` 推进）
//! - `stop` 幂等，任何状态下都安全，且保证资源恰好释放一次
//! - 效果内部的失败被捕获并记录日志，不会传播到驱动器
//!
//! ## 扩展
//!
//! 新效果实现 [`Effect`] trait，在启动时把构造函数注册到 [`EffectRegistry`]。

pub mod builtin;
pub(crate) mod context;
pub(crate) mod error;
mod factory;
pub(crate) mod lifecycle;
pub(crate) mod options;
mod registry;

pub use context::{EffectContext, EffectDeps, Subject, resolve_position};
pub use error::{EffectError, FactoryError, RegistryError};
pub use factory::{EffectDescriptor, EffectFactory};
pub use lifecycle::{Effect, EffectId, EffectInstance, EffectState, Progress};
pub use registry::{EffectConstructor, EffectRegistry};

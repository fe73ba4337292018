//! # Effect Error 模块
//!
//! 效果生命周期、注册表与工厂的错误类型。

use crate::audio::{AcquireError, AudioError};
use crate::render::RenderError;
use thiserror::Error;

/// 效果执行错误
///
/// 只在 [`super::EffectInstance`] 内部被捕获并记录，不会传播到驱动器。
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EffectError {
    /// 缺少外部协作者（渲染表面、音频子系统）
    #[error("缺少协作者: {0}")]
    MissingCollaborator(&'static str),

    /// 构造选项无效
    #[error("选项 '{name}' 无效: {message}")]
    InvalidOption { name: String, message: String },

    /// 上下文中没有可用的坐标
    #[error("上下文缺少位置信息")]
    MissingPosition,

    #[error(transparent)]
    Acquire(#[from] AcquireError),

    #[error(transparent)]
    Audio(#[from] AudioError),

    #[error(transparent)]
    Render(#[from] RenderError),
}

/// 注册表错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RegistryError {
    /// 同一类型 ID 重复注册
    #[error("效果类型 '{0}' 已注册")]
    AlreadyRegistered(String),
}

/// 工厂错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FactoryError {
    /// 未知的效果类型
    #[error("未知的效果类型: '{0}'")]
    UnknownEffectType(String),

    /// 构造函数拒绝了选项
    #[error("构造效果 '{type_id}' 失败: {source}")]
    ConstructionFailed { type_id: String, source: EffectError },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        insta::assert_snapshot!(
            EffectError::MissingCollaborator("render surface").to_string(),
            @"缺少协作者: render surface"
        );
        insta::assert_snapshot!(
            FactoryError::ConstructionFailed {
                type_id: "sound".to_string(),
                source: EffectError::InvalidOption {
                    name: "sound".to_string(),
                    message: "缺少必填项".to_string(),
                },
            }
            .to_string(),
            @"构造效果 'sound' 失败: 选项 'sound' 无效: 缺少必填项"
        );
    }
}

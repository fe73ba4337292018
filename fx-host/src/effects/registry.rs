//! # Effect Registry
//!
//! 类型 ID 到构造函数的映射。启动时显式注册，没有反射。

use super::builtin;
use super::error::{EffectError, RegistryError};
use super::lifecycle::Effect;
use anim_runtime::Params;
use std::collections::HashMap;
use tracing::debug;

/// 效果构造函数
///
/// 校验选项并构造效果；不执行。
pub type EffectConstructor = fn(&Params) -> Result<Box<dyn Effect>, EffectError>;

/// 效果注册表
#[derive(Debug, Clone, Default)]
pub struct EffectRegistry {
    constructors: HashMap<String, EffectConstructor>,
}

impl EffectRegistry {
    /// 空注册表
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册了全部内置效果的注册表
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        for &(type_id, constructor) in builtin::BUILTIN_EFFECTS {
            registry.constructors.insert(type_id.to_string(), constructor);
        }
        registry
    }

    /// 注册；同一类型 ID 重复注册时失败，已有的构造函数保持不变
    pub fn register(
        &mut self,
        type_id: impl Into<String>,
        constructor: EffectConstructor,
    ) -> Result<(), RegistryError> {
        let type_id = type_id.into();
        if self.constructors.contains_key(&type_id) {
            return Err(RegistryError::AlreadyRegistered(type_id));
        }

        debug!(type_id = %type_id, "注册效果类型");
        self.constructors.insert(type_id, constructor);
        Ok(())
    }

    pub fn get(&self, type_id: &str) -> Option<EffectConstructor> {
        self.constructors.get(type_id).copied()
    }

    pub fn contains(&self, type_id: &str) -> bool {
        self.constructors.contains_key(type_id)
    }

    /// 已注册的类型 ID（有序）
    pub fn type_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.constructors.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }
}

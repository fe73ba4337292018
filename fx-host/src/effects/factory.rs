//! # Effect Factory
//!
//! 按描述符构造效果实例。工厂不校验选项（由效果自己校验），也从不调用 `execute`。

use super::error::FactoryError;
use super::lifecycle::{EffectId, EffectInstance};
use super::registry::EffectRegistry;
use anim_runtime::Params;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// 效果描述符
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EffectDescriptor {
    pub type_id: String,
    #[serde(default)]
    pub options: Params,
}

impl EffectDescriptor {
    pub fn new(type_id: impl Into<String>, options: Params) -> Self {
        Self {
            type_id: type_id.into(),
            options,
        }
    }
}

/// 效果工厂
#[derive(Debug)]
pub struct EffectFactory {
    registry: EffectRegistry,
    next_id: u64,
}

impl EffectFactory {
    pub fn new(registry: EffectRegistry) -> Self {
        Self {
            registry,
            next_id: 0,
        }
    }

    pub fn registry(&self) -> &EffectRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut EffectRegistry {
        &mut self.registry
    }

    /// 创建实例
    pub fn create(&mut self, type_id: &str, options: &Params) -> Result<EffectInstance, FactoryError> {
        let constructor = self
            .registry
            .get(type_id)
            .ok_or_else(|| FactoryError::UnknownEffectType(type_id.to_string()))?;

        let effect = constructor(options).map_err(|source| FactoryError::ConstructionFailed {
            type_id: type_id.to_string(),
            source,
        })?;

        self.next_id += 1;
        let id = EffectId(self.next_id);
        debug!(id = id.0, type_id, "创建效果实例");
        Ok(EffectInstance::new(id, type_id, effect))
    }

    pub fn create_from(&mut self, descriptor: &EffectDescriptor) -> Result<EffectInstance, FactoryError> {
        self.create(&descriptor.type_id, &descriptor.options)
    }
}

impl Default for EffectFactory {
    fn default() -> Self {
        Self::new(EffectRegistry::with_builtin())
    }
}

//! # Position 模块
//!
//! 条目坐标引用：固定坐标或具名占位符。

use glam::Vec3;
use serde::{Deserialize, Serialize};

/// 坐标引用
///
/// JSON 形式：`{"fixed": [x, y, z]}` 或 `{"placeholder": "target"}`。
///
/// 占位符代入（[`substitute`](crate::substitute)）是唯一把 `Placeholder` 变为 `Fixed` 的操作。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PositionRef {
    /// 固定世界坐标
    Fixed(Vec3),
    /// 具名占位符
    Placeholder(String),
}

impl PositionRef {
    /// 获取固定坐标（占位符返回 None）
    pub fn fixed(&self) -> Option<Vec3> {
        match self {
            Self::Fixed(p) => Some(*p),
            Self::Placeholder(_) => None,
        }
    }

    /// 获取占位符名称
    pub fn placeholder_name(&self) -> Option<&str> {
        match self {
            Self::Fixed(_) => None,
            Self::Placeholder(name) => Some(name),
        }
    }

    pub fn is_placeholder(&self) -> bool {
        matches!(self, Self::Placeholder(_))
    }
}

impl From<Vec3> for PositionRef {
    fn from(p: Vec3) -> Self {
        Self::Fixed(p)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_shape() {
        let fixed: PositionRef = serde_json::from_str(r#"{"fixed":[1.0,2.0,3.0]}"#).unwrap();
        assert_eq!(fixed.fixed(), Some(Vec3::new(1.0, 2.0, 3.0)));

        let slot: PositionRef = serde_json::from_str(r#"{"placeholder":"target"}"#).unwrap();
        assert_eq!(slot.placeholder_name(), Some("target"));
        assert!(slot.is_placeholder());

        let json = serde_json::to_string(&PositionRef::Placeholder("origin".into())).unwrap();
        assert_eq!(json, r#"{"placeholder":"origin"}"#);
    }
}

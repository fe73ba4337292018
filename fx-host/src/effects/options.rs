//! 构造选项读取

use super::EffectError;
use crate::render::Color;
use anim_runtime::{ParamValue, Params};
use glam::Vec3;

fn invalid(name: &str, message: impl Into<String>) -> EffectError {
    EffectError::InvalidOption {
        name: name.to_string(),
        message: message.into(),
    }
}

fn wrong_type(name: &str, expected: &str, value: &ParamValue) -> EffectError {
    invalid(
        name,
        format!("期望 {}，实际为 {}", expected, value.type_name()),
    )
}

/// 按类型读取选项；存在但类型不符时报错
pub(crate) struct Options<'a> {
    params: &'a Params,
}

impl<'a> Options<'a> {
    pub fn new(params: &'a Params) -> Self {
        Self { params }
    }

    pub fn required_str(&self, name: &str) -> Result<String, EffectError> {
        self.str(name)?
            .ok_or_else(|| invalid(name, "缺少必填项"))
    }

    pub fn str(&self, name: &str) -> Result<Option<String>, EffectError> {
        match self.params.get(name) {
            None => Ok(None),
            Some(value) => value
                .as_str()
                .map(|s| Some(s.to_string()))
                .ok_or_else(|| wrong_type(name, "text", value)),
        }
    }

    pub fn f32(&self, name: &str) -> Result<Option<f32>, EffectError> {
        match self.params.get(name) {
            None => Ok(None),
            Some(value) => value
                .as_f32()
                .map(Some)
                .ok_or_else(|| wrong_type(name, "number", value)),
        }
    }

    pub fn f32_or(&self, name: &str, default: f32) -> Result<f32, EffectError> {
        Ok(self.f32(name)?.unwrap_or(default))
    }

    /// 0.0 - 1.0 之间的数值
    pub fn unit_or(&self, name: &str, default: f32) -> Result<f32, EffectError> {
        let value = self.f32_or(name, default)?;
        if (0.0..=1.0).contains(&value) {
            Ok(value)
        } else {
            Err(invalid(name, format!("必须在 0.0 - 1.0 之间，实际为 {}", value)))
        }
    }

    /// 非负整数（毫秒、数量）
    pub fn count_or(&self, name: &str, default: u32) -> Result<u32, EffectError> {
        match self.params.get(name) {
            None => Ok(default),
            Some(value) => match value.as_f64() {
                Some(n) if n >= 0.0 && n.fract() == 0.0 && n <= u32::MAX as f64 => Ok(n as u32),
                Some(n) => Err(invalid(name, format!("必须是非负整数，实际为 {}", n))),
                None => Err(wrong_type(name, "number", value)),
            },
        }
    }

    pub fn bool_or(&self, name: &str, default: bool) -> Result<bool, EffectError> {
        match self.params.get(name) {
            None => Ok(default),
            Some(value) => value
                .as_bool()
                .ok_or_else(|| wrong_type(name, "bool", value)),
        }
    }

    pub fn vec3(&self, name: &str) -> Result<Option<Vec3>, EffectError> {
        match self.params.get(name) {
            None => Ok(None),
            Some(value) => value
                .as_vec3()
                .map(Some)
                .ok_or_else(|| wrong_type(name, "vector", value)),
        }
    }

    pub fn color_or(&self, name: &str, default: Color) -> Result<Color, EffectError> {
        match self.str(name)? {
            None => Ok(default),
            Some(hex) => Color::from_hex(&hex).ok_or_else(|| invalid(name, format!("无效的颜色 '{}'", hex))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(entries: &[(&str, ParamValue)]) -> Params {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_typed_reads() {
        let p = params(&[
            ("sound", "step/grass".into()),
            ("volume", 0.5.into()),
            ("count", 12.0.into()),
            ("narration", true.into()),
            ("target", Vec3::Y.into()),
        ]);
        let options = Options::new(&p);

        assert_eq!(options.required_str("sound").unwrap(), "step/grass");
        assert_eq!(options.unit_or("volume", 1.0).unwrap(), 0.5);
        assert_eq!(options.count_or("count", 3).unwrap(), 12);
        assert_eq!(options.count_or("missing", 3).unwrap(), 3);
        assert!(options.bool_or("narration", false).unwrap());
        assert_eq!(options.vec3("target").unwrap(), Some(Vec3::Y));
    }

    #[test]
    fn test_invalid_reads() {
        let p = params(&[
            ("volume", 1.5.into()),
            ("count", (-1.0).into()),
            ("sound", 3.0.into()),
            ("color", "#zz".into()),
        ]);
        let options = Options::new(&p);

        assert!(options.unit_or("volume", 1.0).is_err());
        assert!(options.count_or("count", 1).is_err());
        assert!(options.color_or("color", Color::WHITE).is_err());
        insta::assert_snapshot!(
            options.required_str("sound").unwrap_err().to_string(),
            @"选项 'sound' 无效: 期望 text，实际为 number"
        );
    }
}

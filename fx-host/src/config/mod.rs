//! # Config 模块
//!
//! 运行时配置管理，集中管理所有配置项。
//!
//! ## 配置优先级
//!
//! 1. 命令行参数（最高）
//! 2. 配置文件 (config.json)
//! 3. 默认值（最低）

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

/// 应用配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// 资源根目录
    #[serde(default = "default_assets_root")]
    pub assets_root: PathBuf,

    /// 动画模板目录（相对于 assets_root）
    #[serde(default = "default_templates_dir")]
    pub templates_dir: String,

    /// 音效目录（相对于 assets_root）
    #[serde(default = "default_sound_dir")]
    pub sound_dir: String,

    /// 日志级别（trace/debug/info/warn/error）
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// 音频配置
    #[serde(default)]
    pub audio: AudioConfig,

    /// 时间轴驱动配置
    #[serde(default)]
    pub timeline: TimelineConfig,
}

/// 音频配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioConfig {
    /// 是否启用音频子系统
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// 主音量 (0.0 - 1.0)
    #[serde(default = "default_master_volume")]
    pub master_volume: f32,

    /// 是否静音
    #[serde(default)]
    pub muted: bool,

    /// 每个音效资源的最大池大小
    #[serde(default = "default_max_pool_size")]
    pub max_pool_size: usize,

    /// 占用超过该时长（毫秒）且池已满时，视为泄漏并强制回收
    #[serde(default = "default_stuck_threshold_ms")]
    pub stuck_threshold_ms: u64,

    /// 平台无法通知播放结束时，短音效的兜底释放时长（毫秒）
    #[serde(default = "default_release_fallback_ms")]
    pub release_fallback_ms: u64,

    /// 长语音（旁白）的兜底释放时长（毫秒）
    #[serde(default = "default_narration_fallback_ms")]
    pub narration_fallback_ms: u64,

    /// 默认最大听觉距离
    #[serde(default = "default_max_distance")]
    pub default_max_distance: f32,
}

/// 时间轴驱动配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimelineConfig {
    /// headless 驱动的帧率
    #[serde(default = "default_frame_rate")]
    pub frame_rate: u32,
}

// 默认值函数
fn default_assets_root() -> PathBuf {
    PathBuf::from("assets")
}

fn default_templates_dir() -> String {
    "animations".to_string()
}

fn default_sound_dir() -> String {
    "sounds".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

fn default_master_volume() -> f32 {
    1.0
}

fn default_max_pool_size() -> usize {
    10
}

fn default_stuck_threshold_ms() -> u64 {
    1000
}

fn default_release_fallback_ms() -> u64 {
    10_000
}

fn default_narration_fallback_ms() -> u64 {
    60_000
}

fn default_max_distance() -> f32 {
    16.0
}

fn default_frame_rate() -> u32 {
    60
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            assets_root: default_assets_root(),
            templates_dir: default_templates_dir(),
            sound_dir: default_sound_dir(),
            log_level: default_log_level(),
            audio: AudioConfig::default(),
            timeline: TimelineConfig::default(),
        }
    }
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            master_volume: default_master_volume(),
            muted: false,
            max_pool_size: default_max_pool_size(),
            stuck_threshold_ms: default_stuck_threshold_ms(),
            release_fallback_ms: default_release_fallback_ms(),
            narration_fallback_ms: default_narration_fallback_ms(),
            default_max_distance: default_max_distance(),
        }
    }
}

impl Default for TimelineConfig {
    fn default() -> Self {
        Self {
            frame_rate: default_frame_rate(),
        }
    }
}

impl AudioConfig {
    pub fn stuck_threshold(&self) -> Duration {
        Duration::from_millis(self.stuck_threshold_ms)
    }

    pub fn release_fallback(&self) -> Duration {
        Duration::from_millis(self.release_fallback_ms)
    }

    pub fn narration_fallback(&self) -> Duration {
        Duration::from_millis(self.narration_fallback_ms)
    }
}

impl AppConfig {
    /// 加载配置文件
    ///
    /// 如果文件不存在或解析失败，返回默认配置并打印警告。
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();

        if !path.exists() {
            warn!(path = %path.display(), "配置文件不存在，使用默认配置");
            return Self::default();
        }

        match fs::read_to_string(path) {
            Ok(content) => match serde_json::from_str(&content) {
                Ok(config) => {
                    info!(path = %path.display(), "配置文件加载成功");
                    config
                }
                Err(e) => {
                    warn!(error = %e, "配置文件解析失败，使用默认配置");
                    Self::default()
                }
            },
            Err(e) => {
                warn!(error = %e, "配置文件读取失败，使用默认配置");
                Self::default()
            }
        }
    }

    /// 保存配置到文件
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::SerializationFailed(e.to_string()))?;

        fs::write(path, json).map_err(|e| ConfigError::Io(e.to_string()))?;

        Ok(())
    }

    /// 验证配置有效性
    pub fn validate(&self) -> Result<(), ConfigError> {
        let audio = &self.audio;

        if !(0.0..=1.0).contains(&audio.master_volume) {
            return Err(ConfigError::ValidationFailed(
                "主音量必须在 0.0 - 1.0 之间".to_string(),
            ));
        }

        if audio.max_pool_size == 0 {
            return Err(ConfigError::ValidationFailed(
                "max_pool_size 必须大于 0".to_string(),
            ));
        }

        if audio.stuck_threshold_ms == 0 {
            return Err(ConfigError::ValidationFailed(
                "stuck_threshold_ms 必须大于 0".to_string(),
            ));
        }

        if audio.release_fallback_ms == 0 || audio.narration_fallback_ms == 0 {
            return Err(ConfigError::ValidationFailed(
                "兜底释放时长必须大于 0".to_string(),
            ));
        }

        if audio.default_max_distance <= 0.0 {
            return Err(ConfigError::ValidationFailed(
                "default_max_distance 必须大于 0".to_string(),
            ));
        }

        if self.timeline.frame_rate == 0 {
            return Err(ConfigError::ValidationFailed(
                "frame_rate 必须大于 0".to_string(),
            ));
        }

        if self.log_level.parse::<tracing::Level>().is_err() {
            return Err(ConfigError::ValidationFailed(format!(
                "无效的日志级别: {}",
                self.log_level
            )));
        }

        Ok(())
    }
}

/// 配置错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// 序列化失败
    #[error("配置序列化失败: {0}")]
    SerializationFailed(String),
    /// IO 错误
    #[error("配置 IO 错误: {0}")]
    Io(String),
    /// 验证失败
    #[error("配置验证失败: {0}")]
    ValidationFailed(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.audio.max_pool_size, 10);
        assert_eq!(config.audio.stuck_threshold(), Duration::from_secs(1));
        assert_eq!(config.audio.release_fallback(), Duration::from_secs(10));
        assert_eq!(config.audio.narration_fallback(), Duration::from_secs(60));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let config: AppConfig =
            serde_json::from_str(r#"{ "audio": { "max_pool_size": 4 } }"#).unwrap();
        assert_eq!(config.audio.max_pool_size, 4);
        assert_eq!(config.audio.stuck_threshold_ms, 1000);
        assert!(config.audio.enabled);
        assert_eq!(config.timeline.frame_rate, 60);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        let mut config = AppConfig::default();
        config.audio.master_volume = 0.25;
        config.save(&path).unwrap();

        let loaded = AppConfig::load(&path);
        assert_eq!(loaded.audio.master_volume, 0.25);
    }

    #[test]
    fn test_load_missing_or_broken_file() {
        let dir = tempfile::tempdir().unwrap();
        let missing = AppConfig::load(dir.path().join("nope.json"));
        assert_eq!(missing.audio.max_pool_size, 10);

        let broken = dir.path().join("broken.json");
        fs::write(&broken, "{ not json").unwrap();
        assert_eq!(AppConfig::load(&broken).log_level, "info");
    }

    #[test]
    fn test_config_validation() {
        let mut config = AppConfig::default();

        config.audio.master_volume = 2.0;
        assert!(config.validate().is_err());
        config.audio.master_volume = 0.5;

        config.audio.max_pool_size = 0;
        assert!(config.validate().is_err());
        config.audio.max_pool_size = 10;

        config.log_level = "loud".to_string();
        let err = config.validate().unwrap_err();
        insta::assert_snapshot!(err.to_string(), @"配置验证失败: 无效的日志级别: loud");
    }
}

//! FxHost 初始化拆分
//!
//! 资源来源、音频后端、音效服务与模板库按职责分别创建。

use crate::animation::TemplateLibrary;
use crate::audio::{AudioBackend, AudioService, AudioSettings, NullBackend};
use crate::config::AppConfig;
use crate::resources::{AssetSource, FsSource};
use std::sync::Arc;
use tracing::info;

pub fn create_source(config: &AppConfig) -> Arc<dyn AssetSource> {
    info!(assets_root = %config.assets_root.display(), "资源来源: 文件系统");
    Arc::new(FsSource::new(config.assets_root.clone()))
}

/// 创建音频后端
///
/// 启用 `rodio-backend` feature 时优先打开默认输出设备，失败则退回 headless 后端。
pub fn create_backend() -> Box<dyn AudioBackend> {
    #[cfg(feature = "rodio-backend")]
    {
        match crate::audio::RodioBackend::new() {
            Ok(backend) => return Box::new(backend),
            Err(e) => {
                tracing::warn!(error = %e, "音频输出初始化失败，使用 headless 后端");
            }
        }
    }

    Box::new(NullBackend::default())
}

pub fn create_audio_service(
    config: &AppConfig,
    source: Arc<dyn AssetSource>,
    backend: Box<dyn AudioBackend>,
) -> Option<AudioService> {
    if !config.audio.enabled {
        info!("音频子系统已禁用");
        return None;
    }

    let service = AudioService::new(source, backend, AudioSettings::from_config(config));
    info!(
        backend = service.backend_name(),
        max_pool_size = config.audio.max_pool_size,
        "音频子系统初始化成功"
    );
    Some(service)
}

pub fn load_templates(config: &AppConfig, source: &dyn AssetSource) -> TemplateLibrary {
    let mut library = TemplateLibrary::new();
    library.load_dir(source, &config.templates_dir);
    library
}

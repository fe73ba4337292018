//! # FX Host
//!
//! 时间驱动的效果宿主：效果生命周期、池化空间音效与声明式动画时间轴的运行时。
//!
//! ## 架构说明
//!
//! ```text
//! TemplateLibrary ──instantiate──▶ Timeline (已绑定)
//!                                     │ play
//!                                     ▼
//!                              TimelinePlayer ──create──▶ EffectFactory ──▶ EffectInstance
//!                                     │                                         │
//!                                     └──────────── EffectDeps ─────────────────┤
//!                                                   ├─ AudioService (音效池)    │
//!                                                   └─ RenderSurface            ◀
//! ```
//!
//! Host 不关心具体的渲染管线：效果只通过 [`RenderSurface`] 生成/更新/销毁图元。
//! 所有推进都发生在单线程的帧循环里（[`FxHost::update`]）。

pub mod animation;
pub mod app;
pub mod audio;
pub mod config;
pub mod effects;
pub mod render;
pub mod resources;

pub use animation::{PlayError, PlaybackEvent, PlaybackId, TemplateLibrary, TimelinePlayer};
pub use app::FxHost;
pub use audio::{
    Acquire, AcquireError, AudioBackend, AudioService, AudioSettings, NullBackend, PoolEvent,
    PoolStats, PooledSound, ReleaseReason, ScriptedBackend, SoundRequest,
};
pub use config::{AppConfig, AudioConfig, ConfigError, TimelineConfig};
pub use effects::{
    Effect, EffectContext, EffectDeps, EffectError, EffectFactory, EffectInstance, EffectRegistry,
    EffectState, FactoryError, Progress, RegistryError, Subject,
};
pub use render::{Color, HeadlessSurface, Primitive, RenderError, RenderHandle, RenderSurface};
pub use resources::{AssetSource, FetchMode, FsSource, MemorySource, ResourceError};

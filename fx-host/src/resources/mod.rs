//! # Resources 模块
//!
//! 资源来源与路径规范化。音频资源的缓存与池化在 [`crate::audio`] 中。

mod error;
pub mod path;
mod source;

pub use error::ResourceError;
pub use source::{AssetSource, FetchMode, FsSource, MemorySource, ReadRecord};

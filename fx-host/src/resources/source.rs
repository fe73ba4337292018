//! # Asset Source 模块
//!
//! 资源来源抽象层（资源解析器边界）：把逻辑路径映射为可读取的字节。
//!
//! - `FsSource`：从文件系统读取（开发模式）
//! - `MemorySource`：从内存表读取（测试、内嵌资源）
//!
//! 所有路径参数都是**逻辑路径**，由实现内部调用 `normalize_logical_path()`。

use super::ResourceError;
use super::path::normalize_logical_path;
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Mutex;

/// 读取模式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchMode {
    /// 常规读取（允许命中任何中间缓存）
    Normal,
    /// 绕过缓存重新读取（失败后的唯一一次重试）
    CacheBust,
}

/// 资源来源 trait
pub trait AssetSource: Send + Sync {
    /// 读取资源字节
    fn read(&self, path: &str, mode: FetchMode) -> Result<Vec<u8>, ResourceError>;

    /// 检查资源是否存在
    fn exists(&self, path: &str) -> bool;

    /// 获取资源的完整路径（用于调试/日志）
    fn full_path(&self, path: &str) -> String;

    /// 列出指定目录下的直接文件（逻辑路径）
    fn list_files(&self, dir_path: &str) -> Vec<String>;
}

/// 文件系统资源来源
#[derive(Debug, Clone)]
pub struct FsSource {
    /// 资源根目录
    base_path: PathBuf,
}

impl FsSource {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    fn resolve(&self, logical_path: &str) -> PathBuf {
        self.base_path.join(normalize_logical_path(logical_path))
    }
}

impl AssetSource for FsSource {
    // 文件系统没有中间缓存，CacheBust 等同于再读一次
    fn read(&self, path: &str, _mode: FetchMode) -> Result<Vec<u8>, ResourceError> {
        let full_path = self.resolve(path);

        std::fs::read(&full_path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ResourceError::NotFound {
                    path: full_path.to_string_lossy().to_string(),
                }
            } else {
                ResourceError::LoadFailed {
                    path: full_path.to_string_lossy().to_string(),
                    kind: "file".to_string(),
                    message: e.to_string(),
                }
            }
        })
    }

    fn exists(&self, path: &str) -> bool {
        self.resolve(path).is_file()
    }

    fn full_path(&self, path: &str) -> String {
        self.resolve(path).to_string_lossy().to_string()
    }

    fn list_files(&self, dir_path: &str) -> Vec<String> {
        let full_dir = self.resolve(dir_path);

        let mut files = Vec::new();
        if let Ok(entries) = std::fs::read_dir(&full_dir) {
            for entry in entries.flatten() {
                let path = entry.path();
                if path.is_file()
                    && let Ok(relative) = path.strip_prefix(&self.base_path)
                {
                    files.push(relative.to_string_lossy().replace('\\', "/"));
                }
            }
        }
        files.sort();
        files
    }
}

/// 读取记录
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadRecord {
    pub path: String,
    pub mode: FetchMode,
}

/// 内存资源来源
///
/// 记录每一次读取，可以把某个路径标记为"第一次常规读取失败"，用于验证重试逻辑。
#[derive(Debug, Default)]
pub struct MemorySource {
    files: HashMap<String, Vec<u8>>,
    flaky: Mutex<HashSet<String>>,
    reads: Mutex<Vec<ReadRecord>>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// 添加文件
    pub fn with_file(mut self, path: &str, bytes: impl Into<Vec<u8>>) -> Self {
        self.files.insert(normalize_logical_path(path), bytes.into());
        self
    }

    /// 该路径的下一次常规读取失败
    pub fn with_flaky(self, path: &str) -> Self {
        if let Ok(mut flaky) = self.flaky.lock() {
            flaky.insert(normalize_logical_path(path));
        }
        self
    }

    /// 读取记录快照
    pub fn reads(&self) -> Vec<ReadRecord> {
        self.reads.lock().map(|r| r.clone()).unwrap_or_default()
    }

    /// 某路径被读取的次数
    pub fn read_count(&self, path: &str) -> usize {
        let path = normalize_logical_path(path);
        self.reads().iter().filter(|r| r.path == path).count()
    }
}

impl AssetSource for MemorySource {
    fn read(&self, path: &str, mode: FetchMode) -> Result<Vec<u8>, ResourceError> {
        let path = normalize_logical_path(path);

        if let Ok(mut reads) = self.reads.lock() {
            reads.push(ReadRecord {
                path: path.clone(),
                mode,
            });
        }

        if mode == FetchMode::Normal
            && let Ok(mut flaky) = self.flaky.lock()
            && flaky.remove(&path)
        {
            return Err(ResourceError::LoadFailed {
                path,
                kind: "memory".to_string(),
                message: "模拟的读取失败".to_string(),
            });
        }

        self.files
            .get(&path)
            .cloned()
            .ok_or(ResourceError::NotFound { path })
    }

    fn exists(&self, path: &str) -> bool {
        self.files.contains_key(&normalize_logical_path(path))
    }

    fn full_path(&self, path: &str) -> String {
        format!("memory://{}", normalize_logical_path(path))
    }

    fn list_files(&self, dir_path: &str) -> Vec<String> {
        let dir = normalize_logical_path(dir_path);
        let prefix = if dir.is_empty() {
            dir
        } else {
            format!("{}/", dir)
        };

        let mut files: Vec<String> = self
            .files
            .keys()
            .filter(|path| {
                path.strip_prefix(&prefix)
                    .is_some_and(|relative| !relative.contains('/'))
            })
            .cloned()
            .collect();
        files.sort();
        files
    }
}

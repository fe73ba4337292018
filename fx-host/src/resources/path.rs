//! # 路径规范化模块
//!
//! 程序内部统一使用**相对于 assets_root 的逻辑路径**：
//! `/` 分隔，不含 `assets/` 前缀。

/// 音效资源在未写扩展名时依次尝试的扩展名
pub const SOUND_EXTENSIONS: &[&str] = &["ogg", "wav", "mp3", "flac"];

/// 规范化逻辑路径
///
/// - 统一使用 `/` 分隔符
/// - 处理 `.` 与 `..` 组件
/// - 移除 `assets/` 前缀（如果存在）
pub fn normalize_logical_path(path: &str) -> String {
    let normalized = path.replace('\\', "/");

    let mut components = Vec::new();
    for component in normalized.split('/') {
        match component {
            "" | "." => {}
            ".." => {
                components.pop();
            }
            _ => components.push(component),
        }
    }

    let result = components.join("/");
    match result.strip_prefix("assets/") {
        Some(rest) => rest.to_string(),
        None => result,
    }
}

/// 拼接目录与相对路径后规范化
pub fn join_logical(dir: &str, path: &str) -> String {
    if dir.is_empty() {
        normalize_logical_path(path)
    } else {
        normalize_logical_path(&format!("{}/{}", dir, path))
    }
}

/// 音效资源键（如 `step/grass`）对应的候选逻辑路径
///
/// 键已带扩展名时只有一个候选；否则按 [`SOUND_EXTENSIONS`] 顺序展开。
pub fn sound_candidates(sound_dir: &str, key: &str) -> Vec<String> {
    let base = join_logical(sound_dir, key);
    let file_name = base.rsplit('/').next().unwrap_or(&base);

    if file_name.contains('.') {
        vec![base]
    } else {
        SOUND_EXTENSIONS
            .iter()
            .map(|ext| format!("{}.{}", base, ext))
            .collect()
    }
}

/// 提取文件名（不含扩展名）
pub fn file_stem(path: &str) -> String {
    let normalized = normalize_logical_path(path);
    let filename = normalized.rsplit('/').next().unwrap_or(&normalized);

    match filename.rfind('.') {
        Some(dot_pos) => filename[..dot_pos].to_string(),
        None => filename.to_string(),
    }
}

//! 模板库：按名称保存可复用的动画模板。

use super::PlayError;
use crate::resources::{AssetSource, FetchMode};
use anim_runtime::{AnimationTemplate, Bindings, Timeline};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

/// 模板库
#[derive(Debug, Clone, Default)]
pub struct TemplateLibrary {
    templates: BTreeMap<String, AnimationTemplate>,
}

impl TemplateLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// 加载目录下所有 `.json` 模板文档
    ///
    /// 无法读取或解析的文件被跳过并记录警告。返回成功加载的数量。
    pub fn load_dir(&mut self, source: &dyn AssetSource, dir: &str) -> usize {
        let mut loaded = 0;

        for path in source.list_files(dir) {
            if !path.ends_with(".json") {
                continue;
            }

            let bytes = match source.read(&path, FetchMode::Normal) {
                Ok(bytes) => bytes,
                Err(e) => {
                    warn!(path = %path, error = %e, "无法读取动画模板");
                    continue;
                }
            };
            let text = match String::from_utf8(bytes) {
                Ok(text) => text,
                Err(e) => {
                    warn!(path = %path, error = %e, "动画模板不是有效的 UTF-8");
                    continue;
                }
            };

            match AnimationTemplate::from_json(&text) {
                Ok(template) => {
                    debug!(path = %path, name = template.name(), "加载动画模板");
                    self.insert(template);
                    loaded += 1;
                }
                Err(e) => warn!(path = %path, error = %e, "动画模板解析失败"),
            }
        }

        info!(
            dir = %source.full_path(dir),
            loaded,
            total = self.templates.len(),
            "动画模板库已加载"
        );
        loaded
    }

    /// 添加模板；同名模板被替换
    pub fn insert(&mut self, template: AnimationTemplate) {
        let name = template.name().to_string();
        if self.templates.insert(name.clone(), template).is_some() {
            warn!(name = %name, "同名动画模板被替换");
        }
    }

    pub fn get(&self, name: &str) -> Option<&AnimationTemplate> {
        self.templates.get(name)
    }

    /// 代入坐标，得到已绑定的时间轴
    pub fn instantiate(&self, name: &str, bindings: &Bindings) -> Result<Timeline, PlayError> {
        let template = self
            .get(name)
            .ok_or_else(|| PlayError::UnknownTemplate(name.to_string()))?;
        Ok(template.instantiate(bindings)?)
    }

    /// 所有模板名称（有序）
    pub fn names(&self) -> Vec<&str> {
        self.templates.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::MemorySource;
    use anim_runtime::Vec3;

    const STRIKE: &str = r#"{
        "name": "strike",
        "placeholders": ["target"],
        "effects": [
            { "typeId": "lightning", "positions": [{ "placeholder": "target" }] }
        ]
    }"#;

    #[test]
    fn test_load_dir_skips_broken_documents() {
        let source = MemorySource::new()
            .with_file("animations/strike.json", STRIKE)
            .with_file("animations/broken.json", "{ not json")
            .with_file("animations/readme.txt", "notes");

        let mut library = TemplateLibrary::new();
        assert_eq!(library.load_dir(&source, "animations"), 1);
        assert_eq!(library.names(), vec!["strike"]);
    }

    #[test]
    fn test_instantiate() {
        let mut library = TemplateLibrary::new();
        library.insert(AnimationTemplate::from_json(STRIKE).unwrap());

        let mut bindings = Bindings::new();
        bindings.insert("target".to_string(), Vec3::new(1.0, 2.0, 3.0));
        let timeline = library.instantiate("strike", &bindings).unwrap();
        assert!(timeline.is_bound());

        let err = library.instantiate("strike", &Bindings::new()).unwrap_err();
        insta::assert_snapshot!(err.to_string(), @"动画 'strike' 缺少占位符 'target' 的坐标");

        let err = library.instantiate("missing", &bindings).unwrap_err();
        insta::assert_snapshot!(err.to_string(), @"未知的动画模板: 'missing'");
    }
}

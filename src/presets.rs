//! # 命令预设
//!
//! 名称 -> 命令模板 的持久化映射。
//!
//! ## 功能
//! - 以 JSON 文件保存（缩进 4 格，保留非 ASCII 字符，按名称排序）
//! - 文件缺失或损坏时视为空集合，不报错
//! - 每次修改立即写回文件
//!
//! ## 依赖关系
//! - 被 `commands/preset.rs`, `commands/run.rs` 使用
//! - 使用 `serde_json`

use crate::error::{BatchError, Result};

use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_PRESETS_FILE: &str = "cmd_presets.json";

/// 预设存储
pub trait PresetStore {
    fn get(&self, name: &str) -> Option<&str>;
    fn set(&mut self, name: &str, template: &str) -> Result<()>;
    /// 返回是否确实删除了条目
    fn remove(&mut self, name: &str) -> Result<bool>;
    fn names(&self) -> Vec<&str>;
}

/// JSON 文件预设存储
#[derive(Debug)]
pub struct JsonPresetStore {
    path: PathBuf,
    presets: BTreeMap<String, String>,
    recovered: bool,
}

impl JsonPresetStore {
    /// 加载预设文件
    pub fn load(path: &Path) -> Self {
        let mut recovered = false;
        let presets = match fs::read_to_string(path) {
            Ok(text) => match serde_json::from_str(&text) {
                Ok(map) => map,
                Err(_) => {
                    recovered = true;
                    BTreeMap::new()
                }
            },
            Err(_) => BTreeMap::new(),
        };

        Self {
            path: path.to_path_buf(),
            presets,
            recovered,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 文件存在但无法解析，已按空集合加载
    pub fn was_recovered(&self) -> bool {
        self.recovered
    }

    fn persist(&self) -> Result<()> {
        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
        self.presets.serialize(&mut ser)?;

        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir).map_err(|e| BatchError::FileWriteError {
                path: dir.display().to_string(),
                source: e,
            })?;
        }
        fs::write(&self.path, buf).map_err(|e| BatchError::FileWriteError {
            path: self.path.display().to_string(),
            source: e,
        })
    }
}

impl PresetStore for JsonPresetStore {
    fn get(&self, name: &str) -> Option<&str> {
        self.presets.get(name).map(String::as_str)
    }

    fn set(&mut self, name: &str, template: &str) -> Result<()> {
        let name = name.trim();
        if name.is_empty() {
            return Err(BatchError::InvalidArgument(
                "Preset name must not be empty".to_string(),
            ));
        }
        self.presets.insert(name.to_string(), template.trim().to_string());
        self.recovered = false;
        self.persist()
    }

    fn remove(&mut self, name: &str) -> Result<bool> {
        if self.presets.remove(name).is_none() {
            return Ok(false);
        }
        self.persist()?;
        Ok(true)
    }

    fn names(&self) -> Vec<&str> {
        self.presets.keys().map(String::as_str).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonPresetStore::load(&dir.path().join(DEFAULT_PRESETS_FILE));
        assert!(store.names().is_empty());
        assert!(!store.was_recovered());
    }

    #[test]
    fn test_set_persists_and_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(DEFAULT_PRESETS_FILE);

        let mut store = JsonPresetStore::load(&path);
        store.set("hevc", "ffmpeg -i {input} -c:v libx265 {output}").unwrap();
        store.set("音频", "ffmpeg -i {input} -vn {output}").unwrap();
        store.set("aac", "ffmpeg -i {input} -c:a aac {output}").unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert!(text.contains("音频"));
        assert!(text.contains("\n    \"aac\""));

        let reloaded = JsonPresetStore::load(&path);
        assert_eq!(reloaded.names(), vec!["aac", "hevc", "音频"]);
        assert_eq!(
            reloaded.get("hevc"),
            Some("ffmpeg -i {input} -c:v libx265 {output}")
        );
    }

    #[test]
    fn test_set_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = JsonPresetStore::load(&dir.path().join(DEFAULT_PRESETS_FILE));
        store.set("x", "a {input} {output}").unwrap();
        store.set("x", "b {input} {output}").unwrap();
        assert_eq!(store.get("x"), Some("b {input} {output}"));
        assert_eq!(store.names().len(), 1);
    }

    #[test]
    fn test_empty_name_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = JsonPresetStore::load(&dir.path().join(DEFAULT_PRESETS_FILE));
        assert!(matches!(
            store.set("  ", "t"),
            Err(BatchError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_remove() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(DEFAULT_PRESETS_FILE);
        let mut store = JsonPresetStore::load(&path);
        store.set("x", "t").unwrap();

        assert!(store.remove("x").unwrap());
        assert!(!store.remove("x").unwrap());
        assert!(JsonPresetStore::load(&path).names().is_empty());
    }

    #[test]
    fn test_corrupt_file_recovered() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(DEFAULT_PRESETS_FILE);
        fs::write(&path, "{ not json").unwrap();

        let mut store = JsonPresetStore::load(&path);
        assert!(store.was_recovered());
        assert!(store.names().is_empty());

        store.set("x", "t").unwrap();
        assert!(!store.was_recovered());
        assert_eq!(JsonPresetStore::load(&path).get("x"), Some("t"));
    }
}

//! # 输出命名
//!
//! 根据命名规则、输出位置和冲突策略计算每个条目的输出路径。
//!
//! ## 命名规则
//! - `{name}`: 源文件名（不含扩展名）
//! - `{ext}`: 扩展名（含前导点，如 `.mp4`）
//!
//! ## 依赖关系
//! - 被 `batch/runner.rs` 调用
//! - 使用 `models/` 中的 `ConflictPolicy`, `OutputPlacement`, `QueueItem`

use crate::error::{BatchError, Result};
use crate::models::{ConflictPolicy, OutputPlacement, QueueItem};

use std::path::{Path, PathBuf};

pub const DEFAULT_NAMING_RULE: &str = "{name}_done{ext}";

/// 输出文件命名规则
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamingRule {
    pattern: String,
}

impl NamingRule {
    pub fn new(pattern: &str) -> Result<Self> {
        let pattern = pattern.trim();
        if pattern.is_empty() {
            return Err(BatchError::InvalidArgument(
                "naming rule must not be empty".to_string(),
            ));
        }
        Ok(NamingRule {
            pattern: pattern.to_string(),
        })
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// 对源文件名应用规则，返回输出文件名
    pub fn apply(&self, source: &Path) -> String {
        let (stem, ext) = split_name(source);
        self.pattern.replace("{name}", &stem).replace("{ext}", &ext)
    }
}

impl Default for NamingRule {
    fn default() -> Self {
        NamingRule {
            pattern: DEFAULT_NAMING_RULE.to_string(),
        }
    }
}

/// 命名解析结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// 输出到该路径
    Target(PathBuf),
    /// 目标已存在且策略为跳过
    Skip(PathBuf),
}

/// 输出路径解析器，一次运行内策略不变
#[derive(Debug, Clone)]
pub struct NamingResolver {
    rule: NamingRule,
    placement: OutputPlacement,
    conflict: ConflictPolicy,
}

impl NamingResolver {
    pub fn new(rule: NamingRule, placement: OutputPlacement, conflict: ConflictPolicy) -> Self {
        Self {
            rule,
            placement,
            conflict,
        }
    }

    /// 计算条目的输出路径
    pub fn resolve(&self, item: &QueueItem) -> Resolution {
        let dir = match &self.placement {
            OutputPlacement::CoLocated => item.parent_dir(),
            OutputPlacement::Fixed(dir) => dir.clone(),
        };
        let target = dir.join(self.rule.apply(&item.source_path));

        // 覆盖策略下直接使用原路径，不做重命名也不备份
        if target.exists() && self.conflict == ConflictPolicy::Skip {
            Resolution::Skip(target)
        } else {
            Resolution::Target(target)
        }
    }
}

/// 拆分文件名为 (主名, 含点扩展名)
fn split_name(path: &Path) -> (String, String) {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    let ext = path
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();
    (stem, ext)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_apply_rule() {
        let rule = NamingRule::new("{name}_done{ext}").unwrap();
        assert_eq!(rule.apply(Path::new("/media/clip.mp4")), "clip_done.mp4");

        let rule = NamingRule::new("{name}.hevc.mkv").unwrap();
        assert_eq!(rule.apply(Path::new("movie.part1.avi")), "movie.part1.hevc.mkv");
    }

    #[test]
    fn test_apply_rule_without_extension() {
        let rule = NamingRule::default();
        assert_eq!(rule.apply(Path::new("/media/README")), "README_done");
        assert_eq!(rule.apply(Path::new("/media/.hidden")), ".hidden_done");
    }

    #[test]
    fn test_empty_rule_rejected() {
        assert!(NamingRule::new("   ").is_err());
    }

    #[test]
    fn test_resolve_co_located() {
        let resolver = NamingResolver::new(
            NamingRule::new("{name}_x{ext}").unwrap(),
            OutputPlacement::CoLocated,
            ConflictPolicy::Skip,
        );
        let item = QueueItem::from_path(Path::new("/nonexistent/media/a.mp4"));
        assert_eq!(
            resolver.resolve(&item),
            Resolution::Target(PathBuf::from("/nonexistent/media/a_x.mp4"))
        );
    }

    #[test]
    fn test_resolve_fixed_dir() {
        let resolver = NamingResolver::new(
            NamingRule::default(),
            OutputPlacement::Fixed(PathBuf::from("/nonexistent/out")),
            ConflictPolicy::Skip,
        );
        let item = QueueItem::from_path(Path::new("/nonexistent/media/b.mkv"));
        assert_eq!(
            resolver.resolve(&item),
            Resolution::Target(PathBuf::from("/nonexistent/out/b_done.mkv"))
        );
    }

    #[test]
    fn test_resolve_conflict_policies() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("clip.mp4");
        let existing = dir.path().join("clip_done.mp4");
        fs::write(&source, b"src").unwrap();
        fs::write(&existing, b"old").unwrap();
        let item = QueueItem::from_path(&source);

        let skip = NamingResolver::new(
            NamingRule::default(),
            OutputPlacement::CoLocated,
            ConflictPolicy::Skip,
        );
        match skip.resolve(&item) {
            Resolution::Skip(path) => assert_eq!(path.file_name().unwrap(), "clip_done.mp4"),
            other => panic!("expected skip, got {:?}", other),
        }

        let overwrite = NamingResolver::new(
            NamingRule::default(),
            OutputPlacement::CoLocated,
            ConflictPolicy::Overwrite,
        );
        match overwrite.resolve(&item) {
            Resolution::Target(path) => assert_eq!(path.file_name().unwrap(), "clip_done.mp4"),
            other => panic!("expected target, got {:?}", other),
        }
    }
}

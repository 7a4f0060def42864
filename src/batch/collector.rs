//! # 文件收集器
//!
//! 根据输入路径收集待处理的媒体文件，填充队列。
//!
//! ## 功能
//! - 支持单文件、目录和 glob 模式输入
//! - 按扩展名白名单过滤（不区分大小写）
//! - 目录可递归搜索，遍历结果按路径排序
//!
//! ## 依赖关系
//! - 被 `commands/run.rs`, `commands/probe.rs` 调用
//! - 使用 `walkdir` 遍历目录，`glob` 展开模式

use crate::error::{BatchError, Result};

use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// 默认视频扩展名
pub const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mkv", "avi", "mpeg", "mpg", "wmv"];

/// 默认音频扩展名
pub const AUDIO_EXTENSIONS: &[&str] = &[
    "mp3", "aac", "mka", "mpa", "flac", "wav", "wma", "ogg", "ape",
];

/// 文件收集器
#[derive(Debug, Clone)]
pub struct FileCollector {
    /// 允许的扩展名（小写、无点）；为空表示不过滤
    extensions: Vec<String>,
    /// 是否递归
    recursive: bool,
}

impl Default for FileCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl FileCollector {
    /// 使用默认音视频白名单
    pub fn new() -> Self {
        Self {
            extensions: VIDEO_EXTENSIONS
                .iter()
                .chain(AUDIO_EXTENSIONS)
                .map(|e| e.to_string())
                .collect(),
            recursive: false,
        }
    }

    /// 设置扩展名白名单（逗号分隔，`*` 表示接受全部）
    pub fn with_extensions(mut self, list: &str) -> Self {
        let parsed: Vec<String> = list
            .split(',')
            .map(|s| s.trim().trim_start_matches('.').to_lowercase())
            .filter(|s| !s.is_empty())
            .collect();

        if parsed.iter().any(|e| e == "*") {
            self.extensions.clear();
        } else if !parsed.is_empty() {
            self.extensions = parsed;
        }
        self
    }

    /// 设置是否递归搜索
    pub fn recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    /// 检查文件扩展名是否在白名单中
    pub fn is_allowed(&self, path: &Path) -> bool {
        if self.extensions.is_empty() {
            return true;
        }
        path.extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .is_some_and(|e| self.extensions.iter().any(|allowed| *allowed == e))
    }

    /// 收集单个输入对应的文件
    pub fn collect(&self, input: &str) -> Result<Vec<PathBuf>> {
        let path = Path::new(input);

        if path.is_file() {
            return Ok(if self.is_allowed(path) {
                vec![path.to_path_buf()]
            } else {
                vec![]
            });
        }

        if path.is_dir() {
            return Ok(self.walk(path));
        }

        if input.contains(['*', '?', '[']) {
            return self.expand_pattern(input);
        }

        Err(BatchError::FileNotFound {
            path: input.to_string(),
        })
    }

    fn walk(&self, dir: &Path) -> Vec<PathBuf> {
        let max_depth = if self.recursive { usize::MAX } else { 1 };

        WalkDir::new(dir)
            .max_depth(max_depth)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .map(|e| e.into_path())
            .filter(|p| self.is_allowed(p))
            .collect()
    }

    fn expand_pattern(&self, pattern: &str) -> Result<Vec<PathBuf>> {
        let paths = glob::glob(pattern).map_err(|e| BatchError::InvalidPattern {
            pattern: pattern.to_string(),
            reason: e.msg.to_string(),
        })?;

        let mut files: Vec<PathBuf> = paths
            .filter_map(|p| p.ok())
            .filter(|p| p.is_file() && self.is_allowed(p))
            .collect();
        files.sort();
        Ok(files)
    }
}

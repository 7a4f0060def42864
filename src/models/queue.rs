//! # 队列数据模型
//!
//! 待处理媒体文件的有序队列。
//!
//! ## 规则
//! - 按绝对路径去重，插入顺序即执行顺序
//! - 条目创建后不可变
//!
//! ## 依赖关系
//! - 被 `batch/collector.rs` 填充
//! - 被 `batch/runner.rs` 只读遍历

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

/// 队列中的单个媒体文件
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueItem {
    /// 源文件绝对路径
    pub source_path: PathBuf,
    /// 显示名称（文件名）
    pub display_name: String,
}

impl QueueItem {
    /// 从路径创建条目，路径会被转换为绝对路径
    pub fn from_path(path: &Path) -> Self {
        let source_path = absolute_path(path);
        let display_name = source_path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| source_path.display().to_string());
        QueueItem {
            source_path,
            display_name,
        }
    }

    /// 源文件所在目录
    pub fn parent_dir(&self) -> PathBuf {
        self.source_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default()
    }
}

/// 有序、去重的文件队列
#[derive(Debug, Default, Clone)]
pub struct Queue {
    items: Vec<QueueItem>,
    seen: HashSet<PathBuf>,
}

impl Queue {
    pub fn new() -> Self {
        Self::default()
    }

    /// 追加文件，已存在时返回 false
    pub fn push(&mut self, path: &Path) -> bool {
        let item = QueueItem::from_path(path);
        if !self.seen.insert(item.source_path.clone()) {
            return false;
        }
        self.items.push(item);
        true
    }

    /// 批量追加，返回实际新增的数量
    pub fn extend<I, P>(&mut self, paths: I) -> usize
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        paths
            .into_iter()
            .filter(|p| self.push(p.as_ref()))
            .count()
    }

    pub fn items(&self) -> &[QueueItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// 第一个条目所在目录（未指定输出目录时的默认位置）
    pub fn first_dir(&self) -> Option<PathBuf> {
        self.items.first().map(QueueItem::parent_dir)
    }

    pub fn into_items(self) -> Vec<QueueItem> {
        self.items
    }
}

/// 规范化为绝对路径；文件不存在时退化为基于当前目录的拼接
fn absolute_path(path: &Path) -> PathBuf {
    if let Ok(canonical) = fs::canonicalize(path) {
        return canonical;
    }
    if path.is_absolute() {
        return path.to_path_buf();
    }
    std::env::current_dir()
        .map(|cwd| cwd.join(path))
        .unwrap_or_else(|_| path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_deduplicates() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.mp4");
        fs::write(&a, b"").unwrap();

        let mut queue = Queue::new();
        assert!(queue.push(&a));
        assert!(!queue.push(&a));
        // 同一文件的不同写法
        assert!(!queue.push(&dir.path().join(".").join("a.mp4")));
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.items()[0].display_name, "a.mp4");
    }

    #[test]
    fn test_insertion_order_is_kept() {
        let mut queue = Queue::new();
        let added = queue.extend(["/media/c.mp4", "/media/a.mp4", "/media/b.mp4", "/media/a.mp4"]);
        assert_eq!(added, 3);

        let names: Vec<_> = queue.items().iter().map(|i| i.display_name.as_str()).collect();
        assert_eq!(names, vec!["c.mp4", "a.mp4", "b.mp4"]);
        assert_eq!(queue.first_dir(), Some(PathBuf::from("/media")));
    }
}

//! # 拖放列表解析器
//!
//! 解析拖放格式的路径列表：含空格的路径写作 `{path with spaces}`，
//! 其余路径以空白分隔。
//!
//! ## 依赖关系
//! - 被 `commands/run.rs`, `commands/probe.rs` 使用（`--list` 参数）
//! - 使用 `regex`

use crate::error::{BatchError, Result};

use regex::Regex;
use std::fs;
use std::path::Path;
use std::sync::OnceLock;

fn entry_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\{.*?\}|\S+").expect("drop list pattern is valid"))
}

/// 解析拖放文本为路径列表
pub fn parse_drop_list(text: &str) -> Vec<String> {
    entry_regex()
        .find_iter(text)
        .map(|m| m.as_str().trim_matches(|c| c == '{' || c == '}').to_string())
        .filter(|p| !p.is_empty())
        .collect()
}

/// 读取拖放列表文件
pub fn read_drop_list(path: &Path) -> Result<Vec<String>> {
    let text = fs::read_to_string(path).map_err(|e| BatchError::FileReadError {
        path: path.display().to_string(),
        source: e,
    })?;
    Ok(parse_drop_list(&text))
}

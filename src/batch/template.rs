//! # 命令模板
//!
//! 校验并实例化包含 `{input}` / `{output}` 占位符的命令行模板。
//!
//! 模板是用户自己写的命令，会交给 shell 执行；这里只给路径加双引号，
//! 不做任何其他转义。
//!
//! ## 依赖关系
//! - 被 `batch/runner.rs` 调用

use crate::error::{BatchError, Result};

use std::path::Path;

pub const INPUT_PLACEHOLDER: &str = "{input}";
pub const OUTPUT_PLACEHOLDER: &str = "{output}";

/// 已校验的命令模板
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandTemplate {
    raw: String,
}

impl CommandTemplate {
    /// 校验模板，两个占位符缺一不可
    pub fn validate(raw: &str) -> Result<Self> {
        let raw = raw.trim();
        for placeholder in [INPUT_PLACEHOLDER, OUTPUT_PLACEHOLDER] {
            if !raw.contains(placeholder) {
                return Err(BatchError::MissingPlaceholder { placeholder });
            }
        }
        Ok(CommandTemplate {
            raw: raw.to_string(),
        })
    }

    /// 原始模板文本
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// 代入输入/输出路径（加双引号以支持带空格的路径）
    pub fn instantiate(&self, input: &Path, output: &Path) -> String {
        self.raw
            .replace(INPUT_PLACEHOLDER, &quote(input))
            .replace(OUTPUT_PLACEHOLDER, &quote(output))
    }
}

fn quote(path: &Path) -> String {
    format!("\"{}\"", path.display())
}

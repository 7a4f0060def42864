//! # preset 子命令 CLI 定义
//!
//! 管理保存的命令模板。
//!
//! ## 依赖关系
//! - 被 `cli/mod.rs` 使用
//! - 参数传递给 `commands/preset.rs`

use clap::{Args, Subcommand};

/// preset 子命令参数
#[derive(Args, Debug)]
pub struct PresetArgs {
    #[command(subcommand)]
    pub action: PresetAction,
}

#[derive(Subcommand, Debug)]
pub enum PresetAction {
    /// List saved presets
    List,

    /// Print the template of a preset
    Show {
        name: String,
    },

    /// Save (or replace) a preset
    Save {
        name: String,
        /// Command template; must contain {input} and {output}
        template: String,
    },

    /// Delete a preset
    Remove {
        name: String,
    },
}

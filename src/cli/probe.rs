//! # probe 子命令 CLI 定义
//!
//! ## 依赖关系
//! - 被 `cli/mod.rs` 使用
//! - 参数传递给 `commands/probe.rs`

use crate::cli::InputArgs;

use clap::Args;

/// probe 子命令参数
#[derive(Args, Debug)]
pub struct ProbeArgs {
    #[command(flatten)]
    pub input: InputArgs,

    /// Number of parallel ffprobe jobs (0 = auto)
    #[arg(short, long, default_value_t = 0)]
    pub jobs: usize,
}

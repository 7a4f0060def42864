//! # run 子命令 CLI 定义
//!
//! 对队列中的文件逐个执行命令模板。
//!
//! ## 依赖关系
//! - 被 `cli/mod.rs` 使用
//! - 参数传递给 `commands/run.rs`

use crate::batch::log::DEFAULT_LOG_FILE_NAME;
use crate::batch::naming::DEFAULT_NAMING_RULE;
use crate::batch::runner::SHUTDOWN_DELAY_SECS;
use crate::cli::InputArgs;
use crate::models::ConflictPolicy;

use clap::Args;
use std::path::PathBuf;

/// 未指定模板与预设时使用的命令
pub const DEFAULT_TEMPLATE: &str =
    "ffmpeg -i {input} -c:v hevc_nvenc -preset p4 -cq 16 -c:a copy {output}";

/// run 子命令参数
#[derive(Args, Debug)]
pub struct RunArgs {
    #[command(flatten)]
    pub input: InputArgs,

    /// Command template; must contain {input} and {output}
    #[arg(short, long, env = "CMDBATCH_TEMPLATE")]
    pub template: Option<String>,

    /// Load the command template from a saved preset (takes precedence over --template)
    #[arg(short, long)]
    pub preset: Option<String>,

    /// Output naming rule ({name} = stem, {ext} = extension with dot)
    #[arg(short, long, default_value = DEFAULT_NAMING_RULE)]
    pub naming: String,

    /// Write every output into this directory (created if missing)
    #[arg(short, long, value_name = "DIR", conflicts_with = "single_dir")]
    pub output_dir: Option<PathBuf>,

    /// Write every output into the first queued file's directory
    #[arg(long, default_value_t = false)]
    pub single_dir: bool,

    /// What to do when the output file already exists
    #[arg(long, value_enum, default_value_t = ConflictPolicy::Skip)]
    pub conflict: ConflictPolicy,

    /// Shut the machine down after a run that was not cancelled
    #[arg(long, default_value_t = false)]
    pub shutdown: bool,

    /// Seconds to wait before the scheduled shutdown
    #[arg(long, value_name = "SECS", default_value_t = SHUTDOWN_DELAY_SECS)]
    pub shutdown_delay: u64,

    /// Run log file name, written into the log directory
    #[arg(long, default_value = DEFAULT_LOG_FILE_NAME)]
    pub log_name: String,

    /// Do not write a run log file
    #[arg(long, default_value_t = false)]
    pub no_log_file: bool,

    /// Substring marking progress lines (repeatable, replaces the defaults)
    #[arg(long = "progress-marker", value_name = "MARKER")]
    pub progress_markers: Vec<String>,

    /// Substring marking error lines (repeatable, replaces the defaults)
    #[arg(long = "error-marker", value_name = "MARKER")]
    pub error_markers: Vec<String>,

    /// Write a CSV report of item outcomes
    #[arg(long, value_name = "CSV")]
    pub report: Option<PathBuf>,

    /// Hide raw command output on the terminal
    #[arg(short, long, default_value_t = false)]
    pub quiet: bool,
}

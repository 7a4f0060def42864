//! # CLI 模块
//!
//! 使用 `clap` 定义命令行参数和子命令。
//!
//! ## 命令结构
//! - `run`: 对队列中的文件逐个执行命令模板
//! - `probe`: 列出队列并显示媒体信息
//! - `preset`: 管理命令预设（嵌套子命令）
//!
//! ## 依赖关系
//! - 被 `main.rs` 使用
//! - 子模块: run, probe, preset

pub mod preset;
pub mod probe;
pub mod run;

use crate::presets::DEFAULT_PRESETS_FILE;

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// cmdbatch - 命令行批处理工具
#[derive(Parser)]
#[command(name = "cmdbatch")]
#[command(version)]
#[command(about = "Run a templated external command over a queue of media files", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Preset store file
    #[arg(long, global = true, env = "CMDBATCH_PRESETS", default_value = DEFAULT_PRESETS_FILE)]
    pub presets: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

/// 可用的子命令
#[derive(Subcommand)]
pub enum Commands {
    /// Run a command template over every queued file, one at a time
    Run(run::RunArgs),

    /// Show the queue with media information (requires ffprobe)
    Probe(probe::ProbeArgs),

    /// Manage saved command templates
    Preset(preset::PresetArgs),
}

/// 队列输入参数（run / probe 共用）
#[derive(Args, Debug, Clone)]
pub struct InputArgs {
    /// Files, directories or glob patterns to queue
    pub inputs: Vec<String>,

    /// Read additional paths from a drop list file ({path with spaces} or plain tokens)
    #[arg(long, value_name = "FILE")]
    pub list: Option<PathBuf>,

    /// Recurse into subdirectories
    #[arg(short, long, default_value_t = false)]
    pub recursive: bool,

    /// Comma-separated extension allow-list ('*' accepts everything)
    #[arg(long, value_name = "LIST")]
    pub ext: Option<String>,
}

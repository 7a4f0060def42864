//! # cmdbatch - 命令行批处理工具
//!
//! 对一组媒体文件逐个执行带 `{input}` / `{output}` 占位符的外部命令，
//! 支持取消、运行日志、冲突处理与运行统计。
//!
//! ## 子命令
//! - `run`    - 按队列顺序执行命令模板
//! - `probe`  - 显示队列文件的媒体信息
//! - `preset` - 管理命令预设
//!
//! ## 依赖关系
//! ```text
//! main.rs
//!   ├── cli/        (命令行参数定义)
//!   ├── commands/   (命令执行逻辑)
//!   │     ├── batch/     (批处理引擎)
//!   │     ├── parsers/   (外部工具输出解析)
//!   │     ├── presets.rs (预设存储)
//!   │     └── models/    (数据模型)
//!   ├── utils/      (输出、进度条、平台调用)
//!   └── error.rs    (错误处理)
//! ```

mod batch;
mod cli;
mod commands;
mod error;
mod models;
mod parsers;
mod presets;
mod utils;

use clap::Parser;
use cli::Cli;

fn main() {
    // Initialize colored output for Windows compatibility
    #[cfg(windows)]
    colored::control::set_virtual_terminal(true).ok();

    let cli = Cli::parse();

    if let Err(e) = commands::run(cli) {
        // 校验错误只是提示，不算失败
        if e.is_validation() {
            utils::output::print_warning(&format!("{}", e));
            return;
        }
        utils::output::print_error(&format!("{}", e));
        std::process::exit(1);
    }
}

//! # 命令执行模块
//!
//! 实现各子命令的业务逻辑。
//!
//! ## 依赖关系
//! - 被 `main.rs` 调用
//! - 使用 `cli/`, `batch/`, `parsers/`, `presets`, `utils/`
//! - 子模块: run, probe, preset

pub mod preset;
pub mod probe;
pub mod run;

use crate::batch::FileCollector;
use crate::cli::{Cli, Commands, InputArgs};
use crate::error::{BatchError, Result};
use crate::models::Queue;
use crate::parsers::droplist;
use crate::utils::output;

/// 执行命令
pub fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Run(args) => run::execute(args, &cli.presets),
        Commands::Probe(args) => probe::execute(args),
        Commands::Preset(args) => preset::execute(args, &cli.presets),
    }
}

/// 根据输入参数构建队列
///
/// 找不到的路径只给出警告并跳过，其余错误（如非法模式）直接返回。
pub(crate) fn build_queue(args: &InputArgs) -> Result<Queue> {
    let mut collector = FileCollector::new().recursive(args.recursive);
    if let Some(ref ext) = args.ext {
        collector = collector.with_extensions(ext);
    }

    let mut inputs = args.inputs.clone();
    if let Some(ref list) = args.list {
        inputs.extend(droplist::read_drop_list(list)?);
    }

    let mut queue = Queue::new();
    for input in &inputs {
        match collector.collect(input) {
            Ok(files) => {
                let found = files.len();
                let added = queue.extend(files);
                if found > added {
                    output::print_skip(&format!(
                        "{} duplicate file(s) from '{}' already queued",
                        found - added,
                        input
                    ));
                }
            }
            Err(BatchError::FileNotFound { path }) => {
                output::print_warning(&format!("Input not found, ignored: {}", path));
            }
            Err(e) => return Err(e),
        }
    }
    Ok(queue)
}

//! # preset 命令实现
//!
//! 列出、查看、保存和删除命令预设。
//!
//! ## 依赖关系
//! - 使用 `cli/preset.rs` 定义的参数
//! - 使用 `presets`, `batch/template.rs`

use crate::batch::CommandTemplate;
use crate::cli::preset::{PresetAction, PresetArgs};
use crate::error::{BatchError, Result};
use crate::presets::{JsonPresetStore, PresetStore};
use crate::utils::output;

use std::path::Path;

/// 执行 preset 命令
pub fn execute(args: PresetArgs, presets_path: &Path) -> Result<()> {
    let mut store = JsonPresetStore::load(presets_path);
    if store.was_recovered() {
        output::print_warning(&format!(
            "Preset file '{}' is unreadable, treated as empty",
            store.path().display()
        ));
    }
    apply(&mut store, args.action)
}

fn apply(store: &mut dyn PresetStore, action: PresetAction) -> Result<()> {
    match action {
        PresetAction::List => {
            let names = store.names();
            if names.is_empty() {
                output::print_info("No presets saved");
            }
            for name in names {
                println!("{}", name);
            }
        }
        PresetAction::Show { name } => match store.get(&name) {
            Some(template) => println!("{}", template),
            None => {
                return Err(BatchError::InvalidArgument(format!(
                    "Unknown preset '{}'",
                    name
                )))
            }
        },
        PresetAction::Save { name, template } => {
            // 保存前校验，避免存入无法运行的模板
            let template = CommandTemplate::validate(&template)?;
            store.set(&name, template.raw())?;
            output::print_success(&format!("Preset '{}' saved", name.trim()));
        }
        PresetAction::Remove { name } => {
            if store.remove(&name)? {
                output::print_success(&format!("Preset '{}' removed", name));
            } else {
                output::print_skip(&format!("Preset '{}' does not exist", name));
            }
        }
    }
    Ok(())
}

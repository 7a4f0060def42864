//! # 解析器模块
//!
//! 解析外部工具输出与输入列表。
//!
//! ## 依赖关系
//! - 被 `commands/` 模块使用
//! - 子模块: ffprobe, droplist

pub mod droplist;
pub mod ffprobe;

//! # 工具函数模块
//!
//! 提供美化输出、进度条和平台相关调用。
//!
//! ## 依赖关系
//! - 被 `commands/`, `batch/` 模块使用
//! - 子模块: output, progress, platform

pub mod output;
pub mod platform;
pub mod progress;

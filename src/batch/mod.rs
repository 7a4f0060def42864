//! # 批处理引擎
//!
//! 队列 -> 命令模板 -> 逐个执行外部进程。
//!
//! ## 功能
//! - 收集输入文件（`collector`）
//! - 命令模板校验与实例化（`template`）
//! - 输出命名与冲突处理（`naming`）
//! - 进程执行与取消（`process`）
//! - 顺序编排、统计与事件（`runner`, `events`）
//! - 运行日志与状态汇报（`log`, `status`）
//!
//! ## 依赖关系
//! - 被 `commands/` 模块使用
//! - 使用 `models/` 中的队列与统计类型

pub mod collector;
pub mod events;
pub mod log;
pub mod naming;
pub mod process;
pub mod runner;
pub mod status;
pub mod template;

pub use collector::FileCollector;
pub use events::{LogLevel, RunEvent};
pub use log::{ProgressMarkers, RunLog};
pub use naming::NamingRule;
pub use process::{LineClassifier, ShellProcessRunner};
pub use runner::{BatchOrchestrator, RunReport, RunRequest};
pub use status::StatusReporter;
pub use template::CommandTemplate;

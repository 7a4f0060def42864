//! # 数据模型模块
//!
//! 定义队列条目、运行策略、运行统计与运行状态。
//!
//! ## 依赖关系
//! - 被 `batch/` 和 `commands/` 使用
//! - 子模块: queue, run

pub mod queue;
pub mod run;

pub use queue::{Queue, QueueItem};
pub use run::{
    format_hms, ConflictPolicy, ItemFailure, ItemOutcome, OutputPlacement, RunState, RunStats,
    SharedRunState,
};

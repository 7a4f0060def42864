//! # 运行数据模型
//!
//! 一次批处理运行中使用的策略、统计与状态。
//!
//! ## 依赖关系
//! - 被 `batch/` 和 `commands/run.rs` 使用
//! - 使用 `clap::ValueEnum` 让冲突策略可直接作为命令行参数

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// 输出文件已存在时的处理策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
pub enum ConflictPolicy {
    /// Skip items whose output file already exists
    Skip,
    /// Overwrite existing output files in place
    Overwrite,
}

impl std::fmt::Display for ConflictPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConflictPolicy::Skip => write!(f, "skip"),
            ConflictPolicy::Overwrite => write!(f, "overwrite"),
        }
    }
}

/// 输出文件放置位置，每次运行开始时确定
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputPlacement {
    /// 与源文件放在同一目录
    CoLocated,
    /// 统一放到固定目录
    Fixed(PathBuf),
}

/// 单个条目的失败原因
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemFailure {
    /// 进程以非零退出码结束
    ExitCode(i32),
    /// 进程无法启动
    Launch(String),
}

impl std::fmt::Display for ItemFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ItemFailure::ExitCode(code) => write!(f, "exit code {}", code),
            ItemFailure::Launch(msg) => write!(f, "{}", msg),
        }
    }
}

/// 单个条目的处理结果，每次运行每个条目至多产生一次
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemOutcome {
    /// 跳过（目标文件已存在）
    Skipped(String),
    /// 成功 (输出路径, 耗时)
    Succeeded(PathBuf, Duration),
    /// 失败 (原因, 耗时)
    Failed(ItemFailure, Duration),
}

impl ItemOutcome {
    /// 简短状态名，用于报表
    pub fn status(&self) -> &'static str {
        match self {
            ItemOutcome::Skipped(_) => "skipped",
            ItemOutcome::Succeeded(..) => "succeeded",
            ItemOutcome::Failed(..) => "failed",
        }
    }
}

/// 运行统计
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunStats {
    /// 队列总数
    pub total: usize,
    /// 成功数量
    pub succeeded: usize,
    /// 失败数量
    pub failed: usize,
    /// 跳过数量
    pub skipped: usize,
    /// 累计耗时（只计实际执行的条目）
    pub elapsed: Duration,
}

impl RunStats {
    /// 新一轮运行的初始统计
    pub fn reset(total: usize) -> Self {
        RunStats {
            total,
            ..Default::default()
        }
    }

    /// 合并单个条目结果
    pub fn record(&mut self, outcome: &ItemOutcome) {
        match outcome {
            ItemOutcome::Skipped(_) => self.skipped += 1,
            ItemOutcome::Succeeded(_, elapsed) => {
                self.succeeded += 1;
                self.elapsed += *elapsed;
            }
            ItemOutcome::Failed(_, elapsed) => {
                self.failed += 1;
                self.elapsed += *elapsed;
            }
        }
    }

    /// 已处理数量
    pub fn processed(&self) -> usize {
        self.succeeded + self.failed + self.skipped
    }
}

/// 运行状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum RunState {
    Idle = 0,
    Running = 1,
    CancelRequested = 2,
    Finished = 3,
}

impl RunState {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => RunState::Running,
            2 => RunState::CancelRequested,
            3 => RunState::Finished,
            _ => RunState::Idle,
        }
    }
}

/// 控制端与工作线程共享的运行状态标志
///
/// 工作线程在条目边界和读取输出的循环中读取它；控制端只负责发起取消。
#[derive(Debug, Clone, Default)]
pub struct SharedRunState(Arc<AtomicU8>);

impl SharedRunState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> RunState {
        RunState::from_u8(self.0.load(Ordering::SeqCst))
    }

    /// Idle -> Running，已在运行时返回 false
    pub fn try_begin(&self) -> bool {
        self.transition(RunState::Idle, RunState::Running)
    }

    /// Running -> CancelRequested
    pub fn request_cancel(&self) -> bool {
        self.transition(RunState::Running, RunState::CancelRequested)
    }

    /// 循环退出后进入 Finished
    pub fn finish(&self) {
        self.0.store(RunState::Finished as u8, Ordering::SeqCst);
    }

    /// 回到 Idle，允许开始下一次运行
    pub fn reset(&self) {
        self.0.store(RunState::Idle as u8, Ordering::SeqCst);
    }

    pub fn is_cancel_requested(&self) -> bool {
        self.get() == RunState::CancelRequested
    }

    fn transition(&self, from: RunState, to: RunState) -> bool {
        self.0
            .compare_exchange(from as u8, to as u8, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }
}

/// 格式化为 H:MM:SS
pub fn format_hms(duration: Duration) -> String {
    let total = duration.as_secs();
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let seconds = total % 60;
    format!("{}:{:02}:{:02}", hours, minutes, seconds)
}

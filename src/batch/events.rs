//! # 运行事件
//!
//! 工作线程通过通道发给控制端的类型化事件。
//!
//! ## 依赖关系
//! - 由 `batch/runner.rs` 发送
//! - 由 `commands/run.rs` 消费，转交 `batch/log.rs` 和 `batch/status.rs`

use crate::models::RunStats;

use std::path::PathBuf;

/// 日志级别，`Command` 为最低级（外部命令原始输出）
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Command,
    Info,
    Result,
    Warning,
    Error,
}

impl LogLevel {
    /// 显示用标签
    pub fn tag(&self) -> &'static str {
        match self {
            LogLevel::Command => "CMD",
            LogLevel::Info => "INFO",
            LogLevel::Result => "RESULT",
            LogLevel::Warning => "WARN",
            LogLevel::Error => "ERROR",
        }
    }
}

/// 一条日志消息
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEvent {
    pub level: LogLevel,
    pub message: String,
}

/// 进度：已处理 current / total
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressEvent {
    pub current: usize,
    pub total: usize,
}

/// 运行结束
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunFinishedEvent {
    pub stats: RunStats,
    pub cancelled: bool,
}

/// 工作线程 -> 控制端事件
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunEvent {
    /// 运行开始；log_dir 为本次运行日志文件所在目录
    Started {
        total: usize,
        log_dir: Option<PathBuf>,
    },
    Log(LogEvent),
    Progress(ProgressEvent),
    Finished(RunFinishedEvent),
}

impl RunEvent {
    pub fn log(level: LogLevel, message: impl Into<String>) -> Self {
        RunEvent::Log(LogEvent {
            level,
            message: message.into(),
        })
    }
}

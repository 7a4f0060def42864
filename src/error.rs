//! # 统一错误处理模块
//!
//! 定义 cmdbatch 的所有错误类型，使用 `thiserror` 派生。
//!
//! ## 错误分类
//! - 校验错误：模板缺少占位符、队列为空、已有任务在运行（运行前拒绝，用户修正输入即可）
//! - I/O 错误：文件读写、CSV/JSON 序列化
//! - 平台错误：进程树终止、关机调度、外部命令
//!
//! 单个条目的执行失败不走错误通道，而是记录为 `ItemOutcome::Failed`。
//!
//! ## 依赖关系
//! - 被所有其他模块使用
//! - 无外部模块依赖

use thiserror::Error;

/// cmdbatch 统一错误类型
#[derive(Error, Debug)]
pub enum BatchError {
    // ─────────────────────────────────────────────────────────────
    // 校验错误
    // ─────────────────────────────────────────────────────────────
    #[error("Command template must contain {placeholder}")]
    MissingPlaceholder { placeholder: &'static str },

    #[error("The queue is empty, add some files first")]
    EmptyQueue,

    #[error("A batch is already running")]
    AlreadyRunning,

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Invalid pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    // ─────────────────────────────────────────────────────────────
    // I/O 错误
    // ─────────────────────────────────────────────────────────────
    #[error("Failed to read file: {path}")]
    FileReadError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write file: {path}")]
    FileWriteError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("File not found: {path}")]
    FileNotFound { path: String },

    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    // ─────────────────────────────────────────────────────────────
    // 平台 / 外部命令错误
    // ─────────────────────────────────────────────────────────────
    #[error("Failed to kill process {pid}: {reason}")]
    KillFailed { pid: u32, reason: String },

    #[error("Failed to schedule shutdown: {0}")]
    ShutdownFailed(String),

    #[error("External command '{command}' not found in PATH")]
    CommandNotFound { command: String },

    // ─────────────────────────────────────────────────────────────
    // 其他
    // ─────────────────────────────────────────────────────────────
    #[error("{0}")]
    Other(String),
}

impl BatchError {
    /// 是否为运行前的校验错误（提示用户修正输入，而不是按失败退出）
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            BatchError::MissingPlaceholder { .. }
                | BatchError::EmptyQueue
                | BatchError::AlreadyRunning
                | BatchError::InvalidArgument(_)
                | BatchError::InvalidPattern { .. }
        )
    }
}

/// Result 类型别名
pub type Result<T> = std::result::Result<T, BatchError>;

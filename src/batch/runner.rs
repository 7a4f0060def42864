//! # 批处理编排器
//!
//! 按队列顺序逐个执行外部命令，汇总统计并发出运行事件。
//!
//! ## 功能
//! - 运行前校验（队列非空、模板含占位符、没有正在进行的运行）
//! - 每个条目：命名解析 -> 跳过或构建命令 -> 执行 -> 记录结果与耗时
//! - 单个条目失败不会中断整个批次
//! - 协作式取消：在条目边界和读取输出的循环中检查运行状态
//! - 结束时输出汇总；未取消且要求关机时调度关机
//!
//! ## 依赖关系
//! - 被 `commands/run.rs` 调用
//! - 使用 `batch/template.rs`, `batch/naming.rs`, `batch/process.rs`, `batch/events.rs`
//! - 使用 `crossbeam-channel` 向控制端发送事件

use crate::batch::events::{LogLevel, ProgressEvent, RunEvent, RunFinishedEvent};
use crate::batch::naming::{NamingResolver, NamingRule, Resolution};
use crate::batch::process::{ExitOutcome, LineClassifier, ProcessControl, ProcessRunner};
use crate::batch::template::CommandTemplate;
use crate::error::{BatchError, Result};
use crate::models::{
    format_hms, ConflictPolicy, ItemFailure, ItemOutcome, OutputPlacement, QueueItem, RunState,
    RunStats, SharedRunState,
};
use crate::utils::platform;

use chrono::Local;
use crossbeam_channel::{unbounded, Receiver, Sender};
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;

/// 完成后关机的默认延迟（秒），留给用户取消的时间
pub const SHUTDOWN_DELAY_SECS: u64 = 60;

const SEPARATOR: &str = "-------------------------------------";

/// 关机调度
pub trait ShutdownScheduler: Send {
    fn schedule(&self, delay_secs: u64) -> Result<()>;
}

/// 调用系统 shutdown 命令
pub struct SystemShutdown;

impl ShutdownScheduler for SystemShutdown {
    fn schedule(&self, delay_secs: u64) -> Result<()> {
        platform::schedule_shutdown(delay_secs)
    }
}

/// 一次批处理请求
#[derive(Debug, Clone)]
pub struct RunRequest {
    pub queue: Vec<QueueItem>,
    pub template: String,
    pub naming: NamingRule,
    pub conflict: ConflictPolicy,
    pub placement: OutputPlacement,
    pub shutdown_on_finish: bool,
}

impl RunRequest {
    /// 运行前校验，返回已校验的模板
    pub fn validate(&self) -> Result<CommandTemplate> {
        if self.queue.is_empty() {
            return Err(BatchError::EmptyQueue);
        }
        CommandTemplate::validate(&self.template)
    }

    /// 日志文件目录：固定输出目录，或第一个条目所在目录
    pub fn log_dir(&self) -> Option<PathBuf> {
        match &self.placement {
            OutputPlacement::Fixed(dir) => Some(dir.clone()),
            OutputPlacement::CoLocated => self.queue.first().map(QueueItem::parent_dir),
        }
    }
}

/// 一次运行的最终结果
#[derive(Debug, Clone)]
pub struct RunReport {
    pub stats: RunStats,
    /// 按执行顺序记录的条目结果（被取消的条目不在其中）
    pub outcomes: Vec<(QueueItem, ItemOutcome)>,
    pub cancelled: bool,
}

/// 取消动作：置取消标志，并显式终止当前进程树
#[derive(Clone)]
pub struct Canceller {
    state: SharedRunState,
    control: Arc<dyn ProcessControl>,
    events: Sender<RunEvent>,
}

impl Canceller {
    /// 请求取消；没有正在运行的批次时返回 false
    pub fn cancel(&self) -> bool {
        if !self.state.request_cancel() {
            return false;
        }
        // 进程可能已自然退出
        if let Err(e) = self.control.terminate() {
            self.send(LogLevel::Warning, format!("Could not stop the running process: {}", e));
        }
        self.send(LogLevel::Error, "Task stopped by user".to_string());
        true
    }

    fn send(&self, level: LogLevel, message: String) {
        let _ = self.events.send(RunEvent::log(level, message));
    }
}

/// 后台运行句柄
pub struct RunHandle {
    canceller: Canceller,
    events: Receiver<RunEvent>,
    worker: JoinHandle<RunReport>,
}

impl RunHandle {
    pub fn events(&self) -> &Receiver<RunEvent> {
        &self.events
    }

    pub fn canceller(&self) -> Canceller {
        self.canceller.clone()
    }

    /// 等待工作线程结束
    pub fn join(self) -> Result<RunReport> {
        self.worker
            .join()
            .map_err(|_| BatchError::Other("batch worker panicked".to_string()))
    }
}

/// 批处理编排器
pub struct BatchOrchestrator {
    runner: Box<dyn ProcessRunner>,
    control: Arc<dyn ProcessControl>,
    shutdown: Box<dyn ShutdownScheduler>,
    classifier: LineClassifier,
    state: SharedRunState,
    shutdown_delay: u64,
    tx: Sender<RunEvent>,
    rx: Receiver<RunEvent>,
}

impl BatchOrchestrator {
    pub fn new(runner: Box<dyn ProcessRunner>) -> Self {
        let control = runner.control();
        let (tx, rx) = unbounded();
        Self {
            runner,
            control,
            shutdown: Box::new(SystemShutdown),
            classifier: LineClassifier::default(),
            state: SharedRunState::new(),
            shutdown_delay: SHUTDOWN_DELAY_SECS,
            tx,
            rx,
        }
    }

    pub fn classifier(mut self, classifier: LineClassifier) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn shutdown_delay(mut self, delay_secs: u64) -> Self {
        self.shutdown_delay = delay_secs;
        self
    }

    pub fn canceller(&self) -> Canceller {
        Canceller {
            state: self.state.clone(),
            control: self.control.clone(),
            events: self.tx.clone(),
        }
    }

    /// 在后台工作线程执行批次
    pub fn start(mut self, request: RunRequest) -> Result<RunHandle> {
        let template = self.begin(&request)?;
        let state = self.state.clone();
        let canceller = self.canceller();
        let events = self.rx.clone();

        let worker = thread::Builder::new()
            .name("cmdbatch-worker".to_string())
            .spawn(move || self.execute(request, template))
            .map_err(|e| {
                state.reset();
                BatchError::Other(format!("Failed to start batch worker: {}", e))
            })?;

        Ok(RunHandle {
            canceller,
            events,
            worker,
        })
    }

    /// 校验通过后才修改运行状态
    fn begin(&self, request: &RunRequest) -> Result<CommandTemplate> {
        let template = request.validate()?;
        if !self.state.try_begin() {
            return Err(BatchError::AlreadyRunning);
        }
        Ok(template)
    }

    fn execute(&mut self, request: RunRequest, template: CommandTemplate) -> RunReport {
        let total = request.queue.len();
        let mut stats = RunStats::reset(total);
        let mut outcomes = Vec::with_capacity(total);

        self.emit(RunEvent::Started {
            total,
            log_dir: request.log_dir(),
        });
        self.log(LogLevel::Info, format!("Launch command:\n {}", template.raw()));
        self.log(LogLevel::Info, SEPARATOR);

        if let OutputPlacement::Fixed(dir) = &request.placement {
            if let Err(e) = fs::create_dir_all(dir) {
                self.log(
                    LogLevel::Warning,
                    format!("Cannot create output directory {}: {}", dir.display(), e),
                );
            }
        }

        let resolver = NamingResolver::new(
            request.naming.clone(),
            request.placement.clone(),
            request.conflict,
        );

        for (index, item) in request.queue.iter().enumerate() {
            // 条目边界检查取消
            if self.state.get() != RunState::Running {
                break;
            }
            let number = index + 1;
            let Some(outcome) = self.process_item(&template, &resolver, item, number, total) else {
                break;
            };
            stats.record(&outcome);
            outcomes.push((item.clone(), outcome));
            self.emit(RunEvent::Progress(ProgressEvent {
                current: number,
                total,
            }));
        }

        let cancelled = self.state.is_cancel_requested();
        self.state.finish();

        if !cancelled {
            self.log(LogLevel::Result, "All batch tasks finished");
        }
        self.log_summary(&stats);

        if request.shutdown_on_finish && !cancelled {
            match self.shutdown.schedule(self.shutdown_delay) {
                Ok(()) => self.log(
                    LogLevel::Warning,
                    format!("System will shut down in {} seconds", self.shutdown_delay),
                ),
                Err(e) => self.log(LogLevel::Warning, format!("Could not schedule shutdown: {}", e)),
            }
        }

        self.control.release();
        self.state.reset();
        self.emit(RunEvent::Finished(RunFinishedEvent {
            stats: stats.clone(),
            cancelled,
        }));

        RunReport {
            stats,
            outcomes,
            cancelled,
        }
    }

    /// 处理单个条目；条目执行中被取消时返回 None
    fn process_item(
        &mut self,
        template: &CommandTemplate,
        resolver: &NamingResolver,
        item: &QueueItem,
        number: usize,
        total: usize,
    ) -> Option<ItemOutcome> {
        let target = match resolver.resolve(item) {
            Resolution::Skip(existing) => {
                self.log(
                    LogLevel::Info,
                    format!("Skipping existing file: {}", item.display_name),
                );
                return Some(ItemOutcome::Skipped(format!(
                    "{} already exists",
                    existing.display()
                )));
            }
            Resolution::Target(target) => target,
        };

        let command_line = template.instantiate(&item.source_path, &target);
        let clock = Instant::now();
        self.log(
            LogLevel::Info,
            format!(
                "Task {}/{} started: [{}] at {}",
                number,
                total,
                item.display_name,
                now()
            ),
        );

        let tx = self.tx.clone();
        let classifier = &self.classifier;
        let state = &self.state;
        let exit = self.runner.run(
            &command_line,
            &mut |line: &str| {
                let level = if classifier.is_error(line) {
                    LogLevel::Error
                } else {
                    LogLevel::Command
                };
                let _ = tx.send(RunEvent::log(level, line));
            },
            &|| state.is_cancel_requested(),
        );
        let elapsed = clock.elapsed();

        let outcome = match exit {
            ExitOutcome::Success => {
                self.log(
                    LogLevel::Info,
                    format!("Task {} succeeded: [{}]", number, target.display()),
                );
                ItemOutcome::Succeeded(target, elapsed)
            }
            ExitOutcome::NonZeroExit(code) => {
                self.log(
                    LogLevel::Error,
                    format!(
                        "Task {} failed: [{}] (exit code {})",
                        number, item.display_name, code
                    ),
                );
                ItemOutcome::Failed(ItemFailure::ExitCode(code), elapsed)
            }
            ExitOutcome::LaunchError(message) => {
                self.log(
                    LogLevel::Error,
                    format!("Task {} system error: {}", number, message),
                );
                ItemOutcome::Failed(ItemFailure::Launch(message), elapsed)
            }
            ExitOutcome::Cancelled => {
                // 控制端的终止请求可能晚于本线程返回，这里再终止一次
                if let Err(e) = self.control.terminate() {
                    self.log(
                        LogLevel::Warning,
                        format!("Could not stop the running process: {}", e),
                    );
                }
                self.log(
                    LogLevel::Warning,
                    format!("Task {} interrupted: [{}]", number, item.display_name),
                );
                return None;
            }
        };

        self.log(
            LogLevel::Info,
            format!("Task {}/{} finished at {}", number, total, now()),
        );
        self.log(
            LogLevel::Info,
            format!("Task {} elapsed: {}", number, format_hms(elapsed)),
        );
        self.log(LogLevel::Info, SEPARATOR);
        Some(outcome)
    }

    fn log_summary(&self, stats: &RunStats) {
        self.log(LogLevel::Result, "========= Summary =========");
        self.log(LogLevel::Result, format!("Total files: {}", stats.total));
        self.log(LogLevel::Result, format!("Succeeded:   {}", stats.succeeded));
        self.log(LogLevel::Result, format!("Skipped:     {}", stats.skipped));
        self.log(LogLevel::Result, format!("Failed:      {}", stats.failed));
        self.log(
            LogLevel::Result,
            format!("Elapsed:     {}", format_hms(stats.elapsed)),
        );
        self.log(LogLevel::Result, "===========================");
    }

    fn log(&self, level: LogLevel, message: impl Into<String>) {
        self.emit(RunEvent::log(level, message));
    }

    fn emit(&self, event: RunEvent) {
        let _ = self.tx.send(event);
    }
}

fn now() -> String {
    Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

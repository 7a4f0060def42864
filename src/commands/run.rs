//! # run 命令实现
//!
//! 构建队列，在后台线程运行批处理，并在终端实时展示日志与进度。
//!
//! ## 功能
//! - 模板来源：预设 > `--template` > 默认模板
//! - Ctrl-C 映射为取消动作（终止当前进程树）
//! - 进度行显示为进度条的消息，其他日志打印在进度条上方
//! - 运行日志文件写入日志目录
//! - 可选导出 CSV 报告
//!
//! ## 依赖关系
//! - 使用 `cli/run.rs` 定义的参数
//! - 使用 `batch/` 引擎, `presets`
//! - 使用 `utils/output.rs`, `utils/progress.rs`

use crate::batch::{
    BatchOrchestrator, LineClassifier, LogLevel, NamingRule, ProgressMarkers, RunEvent, RunLog,
    RunReport, RunRequest, ShellProcessRunner, StatusReporter,
};
use crate::cli::run::{RunArgs, DEFAULT_TEMPLATE};
use crate::commands::build_queue;
use crate::error::{BatchError, Result};
use crate::models::{format_hms, ItemOutcome, OutputPlacement, Queue};
use crate::presets::{JsonPresetStore, PresetStore};
use crate::utils::{output, progress};

use indicatif::ProgressBar;
use serde::Serialize;
use std::path::Path;

/// 执行 run 命令
pub fn execute(args: RunArgs, presets_path: &Path) -> Result<()> {
    output::print_header("Batch run");

    let template = resolve_template(&args, presets_path)?;
    let naming = NamingRule::new(&args.naming)?;
    let queue = build_queue(&args.input)?;
    output::print_info(&format!("Queued {} file(s)", queue.len()));
    output::print_info(&format!("Output naming: {}", naming.pattern()));

    let placement = placement_for(&args, &queue);
    let markers = if args.progress_markers.is_empty() {
        ProgressMarkers::default()
    } else {
        ProgressMarkers::new(args.progress_markers.clone())
    };
    let classifier = if args.error_markers.is_empty() {
        LineClassifier::default()
    } else {
        LineClassifier::new(args.error_markers.clone())
    };

    let request = RunRequest {
        queue: queue.into_items(),
        template,
        naming,
        conflict: args.conflict,
        placement,
        shutdown_on_finish: args.shutdown,
    };

    let orchestrator = BatchOrchestrator::new(Box::new(ShellProcessRunner::new()))
        .classifier(classifier)
        .shutdown_delay(args.shutdown_delay);
    let handle = orchestrator.start(request)?;

    let canceller = handle.canceller();
    ctrlc::set_handler(move || {
        canceller.cancel();
    })
    .map_err(|e| BatchError::Other(format!("Failed to install Ctrl-C handler: {}", e)))?;

    let mut view = RunView::new(RunLog::new(markers), args.quiet);
    let log_name = (!args.no_log_file).then_some(args.log_name.as_str());
    for event in handle.events().iter() {
        if view.handle(event, log_name) {
            break;
        }
    }
    let report = handle.join()?;

    if let Some(ref path) = args.report {
        write_report(&report, path)?;
        output::print_success(&format!("Report saved to '{}'", path.display()));
    }
    if let Some(path) = view.log.file_path() {
        output::print_info(&format!("Run log: {}", path.display()));
    }

    let stats = &report.stats;
    let summary = format!(
        "{}/{} processed: {} succeeded, {} skipped, {} failed in {}",
        stats.processed(),
        stats.total,
        stats.succeeded,
        stats.skipped,
        stats.failed,
        format_hms(stats.elapsed)
    );
    if report.cancelled {
        if let Some(status) = view.reporter.last() {
            output::print_info(&format!("Last status: {}", status.text));
        }
        output::print_warning(&format!("Batch cancelled: {}", summary));
    } else {
        output::print_done(&summary);
    }
    Ok(())
}

/// 模板来源：预设优先，其次命令行/环境变量，最后默认模板
fn resolve_template(args: &RunArgs, presets_path: &Path) -> Result<String> {
    if let Some(ref name) = args.preset {
        let store = JsonPresetStore::load(presets_path);
        if store.was_recovered() {
            output::print_warning(&format!(
                "Preset file '{}' is unreadable, treated as empty",
                store.path().display()
            ));
        }
        return store
            .get(name)
            .map(str::to_string)
            .ok_or_else(|| BatchError::InvalidArgument(format!("Unknown preset '{}'", name)));
    }
    Ok(args
        .template
        .clone()
        .unwrap_or_else(|| DEFAULT_TEMPLATE.to_string()))
}

/// 输出位置在运行开始前确定一次
fn placement_for(args: &RunArgs, queue: &Queue) -> OutputPlacement {
    if let Some(ref dir) = args.output_dir {
        return OutputPlacement::Fixed(dir.clone());
    }
    if args.single_dir {
        if let Some(dir) = queue.first_dir() {
            return OutputPlacement::Fixed(dir);
        }
    }
    OutputPlacement::CoLocated
}

/// 终端视图：运行日志 + 状态汇报 + 进度条
struct RunView {
    log: RunLog,
    reporter: StatusReporter,
    pb: Option<ProgressBar>,
    quiet: bool,
}

impl RunView {
    fn new(log: RunLog, quiet: bool) -> Self {
        Self {
            log,
            reporter: StatusReporter::new(),
            pb: None,
            quiet,
        }
    }

    /// 处理一个事件，收到结束事件时返回 true
    fn handle(&mut self, event: RunEvent, log_name: Option<&str>) -> bool {
        match event {
            RunEvent::Started { total, log_dir } => {
                self.log.clear();
                if let (Some(name), Some(dir)) = (log_name, log_dir) {
                    if let Err(e) = self.log.start_file(&dir.join(name)) {
                        output::print_warning(&format!("Run log file disabled: {}", e));
                    }
                }
                let pb = progress::create_run_bar(total as u64);
                pb.set_prefix(self.reporter.update(0, total).text);
                self.pb = Some(pb);
            }
            RunEvent::Log(entry) => self.show_log(entry.level, &entry.message),
            RunEvent::Progress(p) => {
                let status = self.reporter.update(p.current, p.total);
                if let Some(ref pb) = self.pb {
                    pb.set_position(p.current as u64);
                    pb.set_prefix(status.text);
                }
            }
            RunEvent::Finished(_) => {
                if let Some(pb) = self.pb.take() {
                    pb.finish_and_clear();
                }
                return true;
            }
        }
        false
    }

    fn show_log(&mut self, level: LogLevel, message: &str) {
        self.log.append(level, message);
        let warning = self.log.take_file_warning();

        // 文件写入失败时改为打印本行和警告；进度行从不写文件
        let progress_line = match (&warning, self.log.last()) {
            (None, Some(entry)) if entry.is_progress => Some(entry.message.clone()),
            _ => None,
        };
        match progress_line {
            Some(line) => {
                if let Some(ref pb) = self.pb {
                    pb.set_message(line);
                }
            }
            None if self.quiet && level == LogLevel::Command => {}
            None => self.println(&output::format_log_line(level, message.trim())),
        }

        if let Some(w) = warning {
            self.println(&output::format_log_line(LogLevel::Warning, &w));
        }
    }

    fn println(&self, line: &str) {
        match self.pb {
            Some(ref pb) => pb.println(line),
            None => println!("{}", line),
        }
    }
}

/// CSV 报告行
#[derive(Debug, Serialize)]
struct ReportRow<'a> {
    index: usize,
    source: String,
    status: &'a str,
    output: String,
    detail: String,
    seconds: String,
}

fn write_report(report: &RunReport, path: &Path) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;

    for (i, (item, outcome)) in report.outcomes.iter().enumerate() {
        let (output, detail, seconds) = match outcome {
            ItemOutcome::Skipped(reason) => (String::new(), reason.clone(), String::new()),
            ItemOutcome::Succeeded(target, elapsed) => (
                target.display().to_string(),
                String::new(),
                format!("{:.1}", elapsed.as_secs_f64()),
            ),
            ItemOutcome::Failed(failure, elapsed) => (
                String::new(),
                failure.to_string(),
                format!("{:.1}", elapsed.as_secs_f64()),
            ),
        };
        wtr.serialize(ReportRow {
            index: i + 1,
            source: item.source_path.display().to_string(),
            status: outcome.status(),
            output,
            detail,
            seconds,
        })?;
    }

    wtr.flush().map_err(|e| BatchError::FileWriteError {
        path: path.display().to_string(),
        source: e,
    })
}

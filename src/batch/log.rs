//! # 运行日志
//!
//! 只追加的文本日志，连续的进度行原地折叠，并同步写入每次运行的日志文件。
//!
//! ## 规则
//! - 含任一进度标记的行视为进度行；连续进度行只保留最新一条
//! - 非进度行打断折叠，之前的进度行被定格保留
//! - 非 `Command` 级别且非进度行的消息写入日志文件，每行带时间戳
//! - 日志文件写入失败只提示一次，之后停止写文件，不影响运行
//!
//! ## 依赖关系
//! - 被 `commands/run.rs` 使用
//! - 使用 `batch/events.rs` 的 `LogLevel`
//! - 使用 `chrono` 生成时间戳

use crate::batch::events::LogLevel;
use crate::error::{BatchError, Result};

use chrono::Local;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

pub const DEFAULT_LOG_FILE_NAME: &str = "batch_cmd.log";

/// 进度行识别标记
#[derive(Debug, Clone)]
pub struct ProgressMarkers {
    markers: Vec<String>,
}

impl ProgressMarkers {
    pub fn new(markers: Vec<String>) -> Self {
        Self { markers }
    }

    pub fn matches(&self, line: &str) -> bool {
        self.markers.iter().any(|m| line.contains(m.as_str()))
    }
}

impl Default for ProgressMarkers {
    fn default() -> Self {
        Self::new(vec![
            "frame=".to_string(),
            "time=".to_string(),
            "正在处理视频：".to_string(),
        ])
    }
}

/// 一条可见日志
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub level: LogLevel,
    pub message: String,
    pub is_progress: bool,
}

/// 一次追加对可见日志的影响
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogUpdate {
    /// 新增一条
    Appended,
    /// 替换了上一条进度行
    Replaced,
}

/// 运行日志
#[derive(Default)]
pub struct RunLog {
    markers: ProgressMarkers,
    entries: Vec<LogEntry>,
    last_is_progress: bool,
    file: Option<(PathBuf, Box<dyn Write + Send>)>,
    file_warning: Option<String>,
}

impl RunLog {
    pub fn new(markers: ProgressMarkers) -> Self {
        Self {
            markers,
            ..Default::default()
        }
    }

    /// 追加一条消息
    pub fn append(&mut self, level: LogLevel, message: &str) -> LogUpdate {
        let message = message.trim().to_string();
        let is_progress = self.markers.matches(&message);

        let update = if is_progress && self.last_is_progress {
            if let Some(last) = self.entries.last_mut() {
                *last = LogEntry {
                    level,
                    message,
                    is_progress,
                };
            }
            LogUpdate::Replaced
        } else {
            if !is_progress && level != LogLevel::Command {
                self.write_file_line(&message);
            }
            self.entries.push(LogEntry {
                level,
                message,
                is_progress,
            });
            LogUpdate::Appended
        };

        self.last_is_progress = is_progress;
        update
    }

    /// 可见日志
    #[cfg(test)]
    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    pub fn last(&self) -> Option<&LogEntry> {
        self.entries.last()
    }

    /// 清空可见日志（不影响日志文件）
    pub fn clear(&mut self) {
        self.entries.clear();
        self.last_is_progress = false;
    }

    /// 开始新一次运行的日志文件：截断并写入首行
    pub fn start_file(&mut self, path: &Path) -> Result<()> {
        self.file = None;
        self.file_warning = None;

        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir).map_err(|e| BatchError::FileWriteError {
                path: dir.display().to_string(),
                source: e,
            })?;
        }
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)
            .map_err(|e| BatchError::FileWriteError {
                path: path.display().to_string(),
                source: e,
            })?;
        self.attach(path, Box::new(file))
    }

    /// 写入首行后接管写入端
    fn attach(&mut self, path: &Path, mut writer: Box<dyn Write + Send>) -> Result<()> {
        writeln!(writer, "{}", timestamped("Batch run started")).map_err(|e| {
            BatchError::FileWriteError {
                path: path.display().to_string(),
                source: e,
            }
        })?;
        self.file = Some((path.to_path_buf(), writer));
        Ok(())
    }

    /// 当前日志文件路径
    pub fn file_path(&self) -> Option<&Path> {
        self.file.as_ref().map(|(p, _)| p.as_path())
    }

    /// 取出尚未展示的文件写入警告
    pub fn take_file_warning(&mut self) -> Option<String> {
        self.file_warning.take()
    }

    fn write_file_line(&mut self, message: &str) {
        let Some((path, writer)) = self.file.as_mut() else {
            return;
        };
        if let Err(e) = writeln!(writer, "{}", timestamped(message)) {
            let warning = format!("Cannot save log to {}: {}", path.display(), e);
            self.file = None;
            self.entries.push(LogEntry {
                level: LogLevel::Warning,
                message: warning.clone(),
                is_progress: false,
            });
            self.file_warning = Some(warning);
        }
    }
}

fn timestamped(message: &str) -> String {
    format!("[{}] {}", Local::now().format("%Y-%m-%d %H:%M:%S"), message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    /// 在 `full` 置位后拒绝写入，模拟磁盘写满
    struct FillingWriter {
        full: Arc<AtomicBool>,
    }

    impl Write for FillingWriter {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            if self.full.load(Ordering::SeqCst) {
                return Err(io::Error::new(io::ErrorKind::Other, "No space left on device"));
            }
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn messages(log: &RunLog) -> Vec<&str> {
        log.entries().iter().map(|e| e.message.as_str()).collect()
    }

    #[test]
    fn test_progress_lines_collapse() {
        let mut log = RunLog::new(ProgressMarkers::default());
        assert_eq!(log.append(LogLevel::Command, "frame=10"), LogUpdate::Appended);
        assert_eq!(log.append(LogLevel::Command, "frame=20"), LogUpdate::Replaced);

        assert_eq!(messages(&log), vec!["frame=20"]);
        assert!(log.last().unwrap().is_progress);
    }

    #[test]
    fn test_non_progress_line_breaks_streak() {
        let mut log = RunLog::new(ProgressMarkers::default());
        log.append(LogLevel::Command, "frame=10");
        log.append(LogLevel::Command, "frame=20");
        assert_eq!(log.append(LogLevel::Info, "done"), LogUpdate::Appended);
        assert_eq!(log.append(LogLevel::Command, "frame=30"), LogUpdate::Appended);

        assert_eq!(messages(&log), vec!["frame=20", "done", "frame=30"]);
    }

    #[test]
    fn test_custom_markers() {
        let mut log = RunLog::new(ProgressMarkers::new(vec!["%".to_string()]));
        log.append(LogLevel::Command, "10%");
        log.append(LogLevel::Command, "frame=1");
        log.append(LogLevel::Command, "frame=2");
        assert_eq!(messages(&log), vec!["10%", "frame=1", "frame=2"]);
    }

    #[test]
    fn test_clear_resets_streak() {
        let mut log = RunLog::new(ProgressMarkers::default());
        log.append(LogLevel::Command, "time=00:00:01");
        log.clear();
        assert!(log.entries().is_empty());
        assert_eq!(log.append(LogLevel::Command, "time=00:00:02"), LogUpdate::Appended);
    }

    #[test]
    fn test_file_receives_non_command_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs").join(DEFAULT_LOG_FILE_NAME);

        let mut log = RunLog::new(ProgressMarkers::default());
        log.start_file(&path).unwrap();
        log.append(LogLevel::Info, "Task 1 started");
        log.append(LogLevel::Command, "raw encoder output");
        log.append(LogLevel::Command, "frame=10");
        log.append(LogLevel::Error, "Task 1 failed");
        assert_eq!(log.file_path(), Some(path.as_path()));

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = content.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].ends_with("] Batch run started"));
        assert!(lines[1].ends_with("] Task 1 started"));
        assert!(lines[2].ends_with("] Task 1 failed"));
        // [YYYY-MM-DD HH:MM:SS]
        assert_eq!(&lines[1][0..1], "[");
        assert_eq!(&lines[1][20..22], "] ");
    }

    #[test]
    fn test_start_file_truncates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(DEFAULT_LOG_FILE_NAME);
        fs::write(&path, "old run\nold run\n").unwrap();

        let mut log = RunLog::new(ProgressMarkers::default());
        log.start_file(&path).unwrap();
        log.append(LogLevel::Result, "summary");

        let content = fs::read_to_string(&path).unwrap();
        assert!(!content.contains("old run"));
        assert_eq!(content.lines().count(), 2);
    }

    #[test]
    fn test_start_file_failure_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        // 父路径是普通文件，无法创建目录
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, b"").unwrap();

        let mut log = RunLog::new(ProgressMarkers::default());
        let err = log.start_file(&blocker.join(DEFAULT_LOG_FILE_NAME));
        assert!(matches!(err, Err(BatchError::FileWriteError { .. })));
        assert!(log.file_path().is_none());

        // 没有日志文件时仍可正常追加
        assert_eq!(log.append(LogLevel::Info, "still works"), LogUpdate::Appended);
        assert!(log.take_file_warning().is_none());
    }

    #[test]
    fn test_write_failure_mid_run_warns_once() {
        let full = Arc::new(AtomicBool::new(false));
        let writer = FillingWriter { full: full.clone() };
        let path = PathBuf::from("run.log");

        let mut log = RunLog::new(ProgressMarkers::default());
        log.attach(&path, Box::new(writer)).unwrap();
        assert_eq!(log.append(LogLevel::Info, "Task 1 started"), LogUpdate::Appended);
        assert!(log.take_file_warning().is_none());

        full.store(true, Ordering::SeqCst);
        assert_eq!(log.append(LogLevel::Info, "Task 1 succeeded"), LogUpdate::Appended);
        assert_eq!(log.append(LogLevel::Result, "Total files: 1"), LogUpdate::Appended);

        let warnings: Vec<_> = log
            .entries()
            .iter()
            .filter(|e| e.level == LogLevel::Warning)
            .collect();
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].message.contains("run.log"));
        assert!(log.file_path().is_none());

        let warning = log.take_file_warning().unwrap();
        assert!(warning.contains("No space left on device"));
        assert!(log.take_file_warning().is_none());

        // 停止写文件后照常追加
        assert_eq!(log.append(LogLevel::Error, "Task 2 failed"), LogUpdate::Appended);
        assert!(log.take_file_warning().is_none());
        assert_eq!(log.last().unwrap().message, "Task 2 failed");
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_full_device_rejected_at_start() {
        let mut log = RunLog::new(ProgressMarkers::default());
        let err = log.start_file(Path::new("/dev/full"));
        assert!(matches!(err, Err(BatchError::FileWriteError { .. })));
        assert!(log.file_path().is_none());
        assert_eq!(log.append(LogLevel::Info, "still works"), LogUpdate::Appended);
    }
}

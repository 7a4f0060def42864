//! # 外部进程执行器
//!
//! 为每个队列条目启动一个外部进程，逐行转发合并后的 stdout/stderr 输出。
//!
//! ## 功能
//! - 通过 shell 执行命令行（`sh -c` / `cmd /C`）
//! - 两个读线程把 stdout、stderr 合并到同一通道，按 `\n` 和 `\r` 切行
//! - 非法字节按 UTF-8 有损解码，不会中断读取
//! - 读循环中轮询取消谓词；取消时只停止读取，不负责结束进程
//! - 进程终止由 `ProcessControl::terminate` 单独执行（进程树级别）
//! - 取消后留下的子进程由 `ProcessControl::release` 回收
//!
//! ## 依赖关系
//! - 被 `batch/runner.rs` 调用
//! - 使用 `utils/platform.rs` 终止进程树
//! - 使用 `crossbeam-channel` 合并输出流

use crate::error::Result;
use crate::utils::platform;

use crossbeam_channel::{unbounded, RecvTimeoutError, Sender};
use std::io::{BufRead, BufReader, ErrorKind, Read};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

/// 读循环在无输出时检查取消标志的间隔
const CANCEL_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// 回收已终止子进程的最长等待时间
const REAP_TIMEOUT: Duration = Duration::from_secs(2);
const REAP_POLL_INTERVAL: Duration = Duration::from_millis(20);

/// 外部进程的结束方式
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExitOutcome {
    /// 退出码为 0
    Success,
    /// 非零退出码（Unix 下被信号终止时为 128 + 信号值）
    NonZeroExit(i32),
    /// 无法启动进程
    LaunchError(String),
    /// 读循环因取消而提前结束
    Cancelled,
}

/// 对正在运行的进程发起终止，控制端线程使用
pub trait ProcessControl: Send + Sync {
    /// 终止当前进程（含子进程）；没有运行中的进程时返回 `Ok(false)`
    fn terminate(&self) -> Result<bool>;

    /// 运行结束后清除进程引用，并回收已终止的子进程
    fn release(&self) {}
}

/// 执行单条命令
pub trait ProcessRunner: Send {
    fn run(
        &mut self,
        command_line: &str,
        on_line: &mut dyn FnMut(&str),
        cancelled: &dyn Fn() -> bool,
    ) -> ExitOutcome;

    /// 与本执行器关联的终止句柄
    fn control(&self) -> Arc<dyn ProcessControl>;
}

/// 输出行分类：包含任一错误标记的行视为错误
#[derive(Debug, Clone)]
pub struct LineClassifier {
    error_markers: Vec<String>,
}

impl LineClassifier {
    pub fn new(error_markers: Vec<String>) -> Self {
        Self { error_markers }
    }

    pub fn is_error(&self, line: &str) -> bool {
        self.error_markers.iter().any(|m| line.contains(m.as_str()))
    }
}

impl Default for LineClassifier {
    fn default() -> Self {
        Self::new(vec!["Error".to_string(), "Failed".to_string()])
    }
}

/// 当前活动进程的 PID（0 表示没有）
#[derive(Debug, Default)]
pub struct ActiveProcess {
    pid: AtomicU32,
    /// 因取消提前返回、尚未回收的子进程
    abandoned: Mutex<Option<Child>>,
}

impl ActiveProcess {
    pub fn pid(&self) -> Option<u32> {
        match self.pid.load(Ordering::SeqCst) {
            0 => None,
            pid => Some(pid),
        }
    }

    fn set(&self, pid: u32) {
        self.pid.store(pid, Ordering::SeqCst);
    }

    fn clear(&self) {
        self.pid.store(0, Ordering::SeqCst);
    }

    /// 保留子进程句柄，PID 留给 terminate()
    fn abandon(&self, child: Child) {
        if let Ok(mut slot) = self.abandoned.lock() {
            *slot = Some(child);
        }
    }

    /// 等待已被终止的子进程退出；超时则放弃
    fn reap(&self) {
        let child = match self.abandoned.lock() {
            Ok(mut slot) => slot.take(),
            Err(_) => None,
        };
        let Some(mut child) = child else {
            return;
        };
        let deadline = Instant::now() + REAP_TIMEOUT;
        while Instant::now() < deadline {
            match child.try_wait() {
                Ok(None) => thread::sleep(REAP_POLL_INTERVAL),
                _ => return,
            }
        }
    }
}

impl ProcessControl for ActiveProcess {
    fn terminate(&self) -> Result<bool> {
        let Some(pid) = self.pid() else {
            return Ok(false);
        };
        match platform::kill_process_tree(pid) {
            Ok(killed) => Ok(killed),
            Err(_) => platform::terminate_process(pid),
        }
    }

    fn release(&self) {
        self.clear();
        self.reap();
    }
}

/// 通过系统 shell 执行命令行
pub struct ShellProcessRunner {
    active: Arc<ActiveProcess>,
}

impl ShellProcessRunner {
    pub fn new() -> Self {
        Self {
            active: Arc::new(ActiveProcess::default()),
        }
    }

    fn shell_command(command_line: &str) -> Command {
        #[cfg(windows)]
        {
            let mut cmd = Command::new("cmd");
            cmd.args(["/C", command_line]);
            cmd
        }

        #[cfg(not(windows))]
        {
            use std::os::unix::process::CommandExt;
            let mut cmd = Command::new("sh");
            cmd.args(["-c", command_line]);
            // 新进程组，便于整体终止
            cmd.process_group(0);
            cmd
        }
    }
}

impl Default for ShellProcessRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessRunner for ShellProcessRunner {
    fn run(
        &mut self,
        command_line: &str,
        on_line: &mut dyn FnMut(&str),
        cancelled: &dyn Fn() -> bool,
    ) -> ExitOutcome {
        let mut child = match Self::shell_command(command_line)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
        {
            Ok(child) => child,
            Err(e) => return ExitOutcome::LaunchError(e.to_string()),
        };
        self.active.set(child.id());
        // 取消可能发生在 spawn 与登记 PID 之间
        if cancelled() {
            self.active.abandon(child);
            return ExitOutcome::Cancelled;
        }

        let (tx, rx) = unbounded();
        let mut readers = Vec::new();
        if let Some(stdout) = child.stdout.take() {
            readers.push(spawn_reader(stdout, tx.clone()));
        }
        if let Some(stderr) = child.stderr.take() {
            readers.push(spawn_reader(stderr, tx.clone()));
        }
        drop(tx);

        let mut was_cancelled = false;
        loop {
            if cancelled() {
                was_cancelled = true;
                break;
            }
            match rx.recv_timeout(CANCEL_POLL_INTERVAL) {
                Ok(line) => on_line(&line),
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }

        if was_cancelled {
            // 进程由终止请求结束，这里不等待；PID 与子进程保留到 release()
            self.active.abandon(child);
            return ExitOutcome::Cancelled;
        }

        for reader in readers {
            let _ = reader.join();
        }
        let outcome = match child.wait() {
            Ok(status) => exit_outcome(status),
            Err(e) => ExitOutcome::LaunchError(e.to_string()),
        };
        self.active.clear();
        outcome
    }

    fn control(&self) -> Arc<dyn ProcessControl> {
        self.active.clone()
    }
}

fn exit_outcome(status: ExitStatus) -> ExitOutcome {
    if status.success() {
        return ExitOutcome::Success;
    }
    if let Some(code) = status.code() {
        return ExitOutcome::NonZeroExit(code);
    }

    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return ExitOutcome::NonZeroExit(128 + signal);
        }
    }

    ExitOutcome::NonZeroExit(-1)
}

/// 读取流并按行发送
fn spawn_reader<R: Read + Send + 'static>(stream: R, tx: Sender<String>) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let mut reader = BufReader::new(stream);
        let mut splitter = LineSplitter::default();
        loop {
            let lines = match reader.fill_buf() {
                Ok([]) => break,
                Ok(chunk) => {
                    let len = chunk.len();
                    let lines = splitter.push(chunk);
                    reader.consume(len);
                    lines
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(_) => break,
            };
            for line in lines {
                if tx.send(line).is_err() {
                    return;
                }
            }
        }
        if let Some(line) = splitter.finish() {
            let _ = tx.send(line);
        }
    })
}

/// 按 `\r` / `\n` 切行；编码器用 `\r` 刷新进度，不能只等 `\n`
#[derive(Debug, Default)]
struct LineSplitter {
    pending: Vec<u8>,
}

impl LineSplitter {
    /// 追加字节，返回已完成的非空行
    fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        let mut lines = Vec::new();
        for &byte in bytes {
            if byte == b'\n' || byte == b'\r' {
                lines.extend(self.take_line());
            } else {
                self.pending.push(byte);
            }
        }
        lines
    }

    /// 流结束时取出最后一行
    fn finish(mut self) -> Option<String> {
        self.take_line()
    }

    fn take_line(&mut self) -> Option<String> {
        let line = String::from_utf8_lossy(&self.pending).trim_end().to_string();
        self.pending.clear();
        if line.trim().is_empty() {
            None
        } else {
            Some(line)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_splitter() {
        let mut splitter = LineSplitter::default();
        let lines = splitter.push(b"frame=1\rframe=2\r\nhello  \n\n   \npart");
        assert_eq!(lines, vec!["frame=1", "frame=2", "hello"]);

        // 跨块拼接
        assert_eq!(splitter.push(b"ial\rtail"), vec!["partial"]);
        assert_eq!(splitter.finish(), Some("tail".to_string()));
    }

    #[test]
    fn test_line_splitter_invalid_utf8() {
        let mut splitter = LineSplitter::default();
        let lines = splitter.push(b"bad \xff byte\n");
        assert_eq!(lines.len(), 1);
        assert!(lines[0].starts_with("bad "));
        assert!(lines[0].ends_with(" byte"));
        assert_eq!(splitter.finish(), None);
    }

    #[test]
    fn test_line_classifier() {
        let classifier = LineClassifier::default();
        assert!(classifier.is_error("Error opening input file"));
        assert!(classifier.is_error("Conversion Failed!"));
        assert!(!classifier.is_error("error in lowercase is not matched"));
        assert!(!classifier.is_error("frame=100 fps=30"));

        let custom = LineClassifier::new(vec!["fatal".to_string()]);
        assert!(custom.is_error("fatal: oops"));
        assert!(!custom.is_error("Error"));
    }

    #[test]
    fn test_terminate_without_process() {
        let active = ActiveProcess::default();
        assert!(active.pid().is_none());
        assert!(!active.terminate().unwrap());
    }

    #[cfg(unix)]
    #[test]
    fn test_run_streams_merged_output() {
        let mut runner = ShellProcessRunner::new();
        let mut lines = Vec::new();
        let outcome = runner.run(
            "echo one; echo two 1>&2; echo; echo three",
            &mut |line: &str| lines.push(line.to_string()),
            &|| false,
        );
        assert_eq!(outcome, ExitOutcome::Success);
        lines.sort();
        assert_eq!(lines, vec!["one", "three", "two"]);
        assert!(runner.active.pid().is_none());
    }

    #[cfg(unix)]
    #[test]
    fn test_run_non_zero_exit() {
        let mut runner = ShellProcessRunner::new();
        let outcome = runner.run("exit 3", &mut |_| {}, &|| false);
        assert_eq!(outcome, ExitOutcome::NonZeroExit(3));
    }

    #[cfg(unix)]
    #[test]
    fn test_run_missing_executable() {
        let mut runner = ShellProcessRunner::new();
        let outcome = runner.run("definitely-not-a-real-tool-xyz", &mut |_| {}, &|| false);
        // shell 找不到命令时返回 127
        assert_eq!(outcome, ExitOutcome::NonZeroExit(127));
    }

    #[cfg(unix)]
    #[test]
    fn test_cancel_then_terminate() {
        use std::sync::atomic::AtomicBool;
        use std::time::Instant;

        let mut runner = ShellProcessRunner::new();
        let control = runner.control();
        let cancel = Arc::new(AtomicBool::new(false));

        let flag = cancel.clone();
        let trigger = thread::spawn(move || {
            thread::sleep(Duration::from_millis(300));
            flag.store(true, Ordering::SeqCst);
        });

        let started = Instant::now();
        let outcome = runner.run("sleep 30", &mut |_| {}, &|| cancel.load(Ordering::SeqCst));
        trigger.join().unwrap();

        assert_eq!(outcome, ExitOutcome::Cancelled);
        assert!(started.elapsed() < Duration::from_secs(10));
        let pid = runner.active.pid().unwrap();
        // 取消只停止读取，进程仍需显式终止
        assert!(control.terminate().unwrap());
        control.release();
        assert!(!control.terminate().unwrap());
        assert_reaped(pid);
    }

    #[cfg(unix)]
    #[test]
    fn test_cancel_requested_before_spawn_keeps_pid() {
        let mut runner = ShellProcessRunner::new();
        let control = runner.control();

        let outcome = runner.run("sleep 30", &mut |_| {}, &|| true);
        assert_eq!(outcome, ExitOutcome::Cancelled);

        // 已启动的进程仍可被终止，release() 之后不留僵尸进程
        let pid = runner.active.pid().unwrap();
        assert!(control.terminate().unwrap());
        control.release();
        assert!(runner.active.pid().is_none());
        assert_reaped(pid);
    }

    /// 进程已被回收：kill(pid, 0) 对僵尸进程仍会成功
    #[cfg(unix)]
    fn assert_reaped(pid: u32) {
        let alive = unsafe { libc::kill(pid as libc::pid_t, 0) };
        assert_eq!(alive, -1);
    }

    #[cfg(unix)]
    #[test]
    fn test_control_kills_running_process() {
        let mut runner = ShellProcessRunner::new();
        let control = runner.control();

        let killer = thread::spawn(move || {
            // 等待进程启动
            for _ in 0..50 {
                thread::sleep(Duration::from_millis(50));
                if control.terminate().unwrap_or(false) {
                    return true;
                }
            }
            false
        });

        let outcome = runner.run("echo started; sleep 30", &mut |_| {}, &|| false);
        assert!(killer.join().unwrap());
        assert_eq!(outcome, ExitOutcome::NonZeroExit(128 + libc::SIGKILL));
    }
}

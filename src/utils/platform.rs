//! # 平台调用
//!
//! 进程树终止与定时关机。
//!
//! ## 说明
//! - Unix: 子进程以自身为进程组组长启动，终止时向整个进程组发送信号
//! - Windows: 使用 `taskkill /T` 终止进程树，`shutdown /s /t` 定时关机
//!
//! ## 依赖关系
//! - 被 `batch/process.rs`, `batch/runner.rs` 使用
//! - Unix 下使用 `libc`

use crate::error::{BatchError, Result};

/// 强制终止进程及其全部子进程
///
/// 返回 `Ok(false)` 表示进程已经退出。
pub fn kill_process_tree(pid: u32) -> Result<bool> {
    #[cfg(unix)]
    {
        signal_group(pid, libc::SIGKILL)
    }

    #[cfg(windows)]
    {
        taskkill(pid, true)
    }
}

/// 普通终止信号，作为强制终止失败后的回退
pub fn terminate_process(pid: u32) -> Result<bool> {
    #[cfg(unix)]
    {
        let raw = to_raw_pid(pid)?;
        // SAFETY: kill() 只发送信号，不访问内存
        let rc = unsafe { libc::kill(raw, libc::SIGTERM) };
        check_signal_result(pid, rc)
    }

    #[cfg(windows)]
    {
        taskkill(pid, false)
    }
}

/// 在 delay_secs 秒后关机
pub fn schedule_shutdown(delay_secs: u64) -> Result<()> {
    #[cfg(windows)]
    let (program, args) = ("shutdown", vec!["/s".to_string(), "/t".to_string(), delay_secs.to_string()]);

    #[cfg(not(windows))]
    let (program, args) = ("shutdown", vec!["-h".to_string(), format!("+{}", delay_minutes(delay_secs))]);

    let output = std::process::Command::new(program)
        .args(&args)
        .output()
        .map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => BatchError::CommandNotFound {
                command: program.to_string(),
            },
            _ => BatchError::ShutdownFailed(format!("{}: {}", program, e)),
        })?;

    if output.status.success() {
        Ok(())
    } else {
        Err(BatchError::ShutdownFailed(
            String::from_utf8_lossy(&output.stderr).trim().to_string(),
        ))
    }
}

/// Unix `shutdown` 以分钟为单位，向上取整且至少 1 分钟
#[cfg_attr(windows, allow(dead_code))]
fn delay_minutes(delay_secs: u64) -> u64 {
    delay_secs.div_ceil(60).max(1)
}

#[cfg(unix)]
fn to_raw_pid(pid: u32) -> Result<libc::pid_t> {
    libc::pid_t::try_from(pid)
        .ok()
        .filter(|p| *p > 0)
        .ok_or_else(|| BatchError::KillFailed {
            pid,
            reason: "invalid pid".to_string(),
        })
}

#[cfg(unix)]
fn signal_group(pid: u32, signal: libc::c_int) -> Result<bool> {
    let raw = to_raw_pid(pid)?;
    // SAFETY: 负 pid 表示向进程组发送信号，不涉及内存访问
    let rc = unsafe { libc::kill(-raw, signal) };
    check_signal_result(pid, rc)
}

#[cfg(unix)]
fn check_signal_result(pid: u32, rc: libc::c_int) -> Result<bool> {
    if rc == 0 {
        return Ok(true);
    }
    let err = std::io::Error::last_os_error();
    if err.raw_os_error() == Some(libc::ESRCH) {
        // 进程已退出
        return Ok(false);
    }
    Err(BatchError::KillFailed {
        pid,
        reason: err.to_string(),
    })
}

#[cfg(windows)]
fn taskkill(pid: u32, force_tree: bool) -> Result<bool> {
    let pid_arg = pid.to_string();
    let mut args = vec!["/PID", pid_arg.as_str()];
    if force_tree {
        args.extend(["/F", "/T"]);
    }
    let output = std::process::Command::new("taskkill")
        .args(&args)
        .output()
        .map_err(|_| BatchError::CommandNotFound {
            command: "taskkill".to_string(),
        })?;

    if output.status.success() {
        return Ok(true);
    }
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    // 128: 找不到进程
    if output.status.code() == Some(128) {
        return Ok(false);
    }
    Err(BatchError::KillFailed {
        pid,
        reason: stderr.trim().to_string(),
    })
}

//! # 美化输出工具
//!
//! 提供统一的终端输出样式，以及运行日志条目的着色渲染。
//!
//! ## 依赖关系
//! - 被所有 `commands/` 模块使用
//! - 使用 `colored` crate

use crate::batch::events::LogLevel;

use colored::Colorize;

/// 打印成功消息
pub fn print_success(msg: &str) {
    println!("{} {}", "[OK]".green().bold(), msg);
}

/// 打印错误消息
pub fn print_error(msg: &str) {
    eprintln!("{} {}", "[ERR]".red().bold(), msg);
}

/// 打印警告消息
pub fn print_warning(msg: &str) {
    println!("{} {}", "[WARN]".yellow().bold(), msg);
}

/// 打印信息消息
pub fn print_info(msg: &str) {
    println!("{} {}", "[*]".blue().bold(), msg);
}

/// 打印跳过消息
pub fn print_skip(msg: &str) {
    println!("{} {}", "[SKIP]".dimmed(), msg);
}

/// 打印完成消息
pub fn print_done(msg: &str) {
    println!("{} {}", "[DONE]".green().bold(), msg);
}

/// 渲染一条运行日志：按级别着色
pub fn format_log_line(level: LogLevel, message: &str) -> String {
    match level {
        LogLevel::Command => message.dimmed().to_string(),
        LogLevel::Info => message.to_string(),
        LogLevel::Result => message.green().bold().to_string(),
        LogLevel::Warning => format!(
            "{} {}",
            format!("[{}]", level.tag()).yellow().bold(),
            message.yellow()
        ),
        LogLevel::Error => format!(
            "{} {}",
            format!("[{}]", level.tag()).red().bold(),
            message.red()
        ),
    }
}

/// 打印标题栏
pub fn print_header(title: &str) {
    let line = "─".repeat(60);
    println!("\n{}", line.dimmed());
    println!("  {}", title.bold());
    println!("{}\n", line.dimmed());
}

/// 打印分隔线
pub fn print_separator() {
    println!("{}", "─".repeat(60).dimmed());
}

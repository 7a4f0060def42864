//! # 状态汇报
//!
//! 把进度事件换算为百分比和简短状态文本。
//!
//! ## 依赖关系
//! - 被 `commands/run.rs` 使用，驱动 `indicatif` 进度条

/// 一次状态更新
#[derive(Debug, Clone, PartialEq)]
pub struct Status {
    pub percent: f64,
    pub text: String,
}

/// 状态汇报器，只记住最近一次展示的值
#[derive(Debug, Default)]
pub struct StatusReporter {
    last: Option<Status>,
}

impl StatusReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, current: usize, total: usize) -> Status {
        let percent = if total == 0 {
            0.0
        } else {
            (current as f64 / total as f64 * 100.0).clamp(0.0, 100.0)
        };
        let status = Status {
            percent,
            text: format!("processed {}/{} ({:.1}%)", current, total, percent),
        };
        self.last = Some(status.clone());
        status
    }

    pub fn last(&self) -> Option<&Status> {
        self.last.as_ref()
    }
}

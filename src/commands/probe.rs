//! # probe 命令实现
//!
//! 构建队列并用 `ffprobe` 读取每个文件的媒体信息，以表格展示。
//!
//! ## 依赖关系
//! - 使用 `cli/probe.rs` 定义的参数
//! - 使用 `parsers/ffprobe.rs`
//! - 使用 `rayon` 并行探测，`tabled` 输出表格

use crate::cli::probe::ProbeArgs;
use crate::commands::build_queue;
use crate::error::Result;
use crate::models::QueueItem;
use crate::parsers::ffprobe::{self, MediaInfo};
use crate::utils::{output, progress};

use rayon::prelude::*;
use tabled::{Table, Tabled};

/// 表格行
#[derive(Debug, Clone, Tabled)]
struct ProbeRow {
    #[tabled(rename = "#")]
    index: usize,
    #[tabled(rename = "File")]
    name: String,
    #[tabled(rename = "Size")]
    size: String,
    #[tabled(rename = "Duration")]
    duration: String,
    #[tabled(rename = "Video")]
    video_codec: String,
    #[tabled(rename = "V-Bitrate")]
    video_bitrate: String,
    #[tabled(rename = "Audio")]
    audio_codec: String,
    #[tabled(rename = "A-Bitrate")]
    audio_bitrate: String,
}

impl ProbeRow {
    fn new(index: usize, item: &QueueItem, info: MediaInfo) -> Self {
        Self {
            index,
            name: item.display_name.clone(),
            size: info.size,
            duration: info.duration,
            video_codec: info.video_codec,
            video_bitrate: info.video_bitrate,
            audio_codec: info.audio_codec,
            audio_bitrate: info.audio_bitrate,
        }
    }
}

/// 执行 probe 命令
pub fn execute(args: ProbeArgs) -> Result<()> {
    output::print_header("Media info");

    let queue = build_queue(&args.input)?;
    if queue.is_empty() {
        output::print_warning("No media files matched the given inputs");
        return Ok(());
    }

    // 设置并行度
    let num_threads = if args.jobs == 0 {
        num_cpus::get()
    } else {
        args.jobs
    };
    rayon::ThreadPoolBuilder::new()
        .num_threads(num_threads)
        .build_global()
        .ok();

    let pb = progress::create_progress_bar(queue.len() as u64, "Probing");
    let infos: Vec<MediaInfo> = queue
        .items()
        .par_iter()
        .map(|item| {
            let info = ffprobe::describe(&item.source_path);
            pb.inc(1);
            info
        })
        .collect();
    pb.finish_and_clear();

    let failed = infos
        .iter()
        .filter(|i| **i == MediaInfo::unavailable())
        .count();
    let rows: Vec<ProbeRow> = queue
        .items()
        .iter()
        .zip(infos)
        .enumerate()
        .map(|(i, (item, info))| ProbeRow::new(i + 1, item, info))
        .collect();

    println!("{}", Table::new(&rows));
    output::print_separator();

    if failed > 0 {
        output::print_warning(&format!(
            "{} of {} file(s) could not be probed (is ffprobe on PATH?)",
            failed,
            rows.len()
        ));
    } else {
        output::print_success(&format!("Probed {} file(s)", rows.len()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_table_row_order_and_headers() {
        let item = QueueItem {
            source_path: PathBuf::from("/media/a.mp4"),
            display_name: "a.mp4".to_string(),
        };
        let row = ProbeRow::new(1, &item, MediaInfo::unavailable());
        let table = Table::new(vec![row]).to_string();

        assert!(table.contains("File"));
        assert!(table.contains("V-Bitrate"));
        assert!(table.contains("a.mp4"));
        assert!(table.contains("Error"));
    }
}

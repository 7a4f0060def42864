//! # ffprobe 输出解析器
//!
//! 调用 `ffprobe` 读取媒体文件信息，并解析其 JSON 输出。
//!
//! ## 输出格式
//! - 大小: `"12.34 MB"`
//! - 时长: `HH:MM:SS`
//! - 编码: 最后一个视频流 / 音频流的 `codec_name`
//! - 码率: `"{kbps}k"`
//!
//! 任何失败都返回 `MediaInfo::unavailable()`，不阻塞入队。
//!
//! ## 依赖关系
//! - 被 `commands/probe.rs` 使用
//! - 使用 `serde_json` 解析 JSON

use crate::error::Result;

use serde::Deserialize;
use std::path::Path;
use std::process::Command;

const NOT_AVAILABLE: &str = "N/A";

/// 媒体文件信息（已格式化为展示文本）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaInfo {
    pub size: String,
    pub duration: String,
    pub video_codec: String,
    pub video_bitrate: String,
    pub audio_codec: String,
    pub audio_bitrate: String,
}

impl MediaInfo {
    /// 无法读取时的占位信息
    pub fn unavailable() -> Self {
        Self {
            size: "Error".to_string(),
            duration: NOT_AVAILABLE.to_string(),
            video_codec: NOT_AVAILABLE.to_string(),
            video_bitrate: NOT_AVAILABLE.to_string(),
            audio_codec: NOT_AVAILABLE.to_string(),
            audio_bitrate: NOT_AVAILABLE.to_string(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    format: ProbeFormat,
    #[serde(default)]
    streams: Vec<ProbeStream>,
}

#[derive(Debug, Default, Deserialize)]
struct ProbeFormat {
    size: Option<String>,
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    codec_type: Option<String>,
    codec_name: Option<String>,
    bit_rate: Option<String>,
}

/// 读取媒体信息
pub fn describe(path: &Path) -> MediaInfo {
    let output = Command::new("ffprobe")
        .args(["-v", "quiet", "-print_format", "json", "-show_format", "-show_streams"])
        .arg(path)
        .output();

    match output {
        Ok(out) if out.status.success() => parse_probe_json(&String::from_utf8_lossy(&out.stdout))
            .unwrap_or_else(|_| MediaInfo::unavailable()),
        _ => MediaInfo::unavailable(),
    }
}

/// 解析 `ffprobe -print_format json` 的输出
pub fn parse_probe_json(text: &str) -> Result<MediaInfo> {
    let probe: ProbeOutput = serde_json::from_str(text)?;

    let size_bytes = parse_number(probe.format.size.as_deref()).unwrap_or(0.0);
    let duration_secs = parse_number(probe.format.duration.as_deref()).unwrap_or(0.0);

    let mut info = MediaInfo {
        size: format!("{:.2} MB", size_bytes / (1024.0 * 1024.0)),
        duration: format_clock(duration_secs),
        video_codec: NOT_AVAILABLE.to_string(),
        video_bitrate: NOT_AVAILABLE.to_string(),
        audio_codec: NOT_AVAILABLE.to_string(),
        audio_bitrate: NOT_AVAILABLE.to_string(),
    };

    // 同类流取最后一个
    for stream in &probe.streams {
        let codec = stream
            .codec_name
            .clone()
            .unwrap_or_else(|| "unknown".to_string());
        let bitrate = format_bitrate(stream.bit_rate.as_deref());

        match stream.codec_type.as_deref() {
            Some("video") => {
                info.video_codec = codec;
                info.video_bitrate = bitrate;
            }
            Some("audio") => {
                info.audio_codec = codec;
                info.audio_bitrate = bitrate;
            }
            _ => {}
        }
    }

    Ok(info)
}

fn parse_number(value: Option<&str>) -> Option<f64> {
    value.and_then(|v| v.trim().parse::<f64>().ok())
}

fn format_bitrate(value: Option<&str>) -> String {
    match value.and_then(|v| v.trim().parse::<u64>().ok()) {
        Some(bps) => format!("{}k", bps / 1000),
        None => NOT_AVAILABLE.to_string(),
    }
}

/// 秒数 -> HH:MM:SS
fn format_clock(seconds: f64) -> String {
    let total = if seconds.is_finite() && seconds > 0.0 {
        seconds as u64
    } else {
        0
    };
    format!(
        "{:02}:{:02}:{:02}",
        total / 3600,
        (total % 3600) / 60,
        total % 60
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "streams": [
            {"index": 0, "codec_name": "h264", "codec_type": "video", "bit_rate": "4500000"},
            {"index": 1, "codec_name": "aac", "codec_type": "audio", "bit_rate": "128000"},
            {"index": 2, "codec_name": "mov_text", "codec_type": "subtitle"}
        ],
        "format": {
            "filename": "clip.mp4",
            "size": "52428800",
            "duration": "3725.480000"
        }
    }"#;

    #[test]
    fn test_parse_probe_json() {
        let info = parse_probe_json(SAMPLE).unwrap();
        assert_eq!(info.size, "50.00 MB");
        assert_eq!(info.duration, "01:02:05");
        assert_eq!(info.video_codec, "h264");
        assert_eq!(info.video_bitrate, "4500k");
        assert_eq!(info.audio_codec, "aac");
        assert_eq!(info.audio_bitrate, "128k");
    }

    #[test]
    fn test_missing_fields() {
        let json = r#"{"streams": [{"codec_type": "audio"}], "format": {}}"#;
        let info = parse_probe_json(json).unwrap();
        assert_eq!(info.size, "0.00 MB");
        assert_eq!(info.duration, "00:00:00");
        assert_eq!(info.video_codec, "N/A");
        assert_eq!(info.audio_codec, "unknown");
        assert_eq!(info.audio_bitrate, "N/A");
    }

    #[test]
    fn test_last_stream_wins() {
        let json = r#"{"streams": [
            {"codec_type": "audio", "codec_name": "aac", "bit_rate": "96000"},
            {"codec_type": "audio", "codec_name": "opus", "bit_rate": "64000"}
        ]}"#;
        let info = parse_probe_json(json).unwrap();
        assert_eq!(info.audio_codec, "opus");
        assert_eq!(info.audio_bitrate, "64k");
    }

    #[test]
    fn test_invalid_json() {
        assert!(parse_probe_json("").is_err());
        assert!(parse_probe_json("not json").is_err());
    }

    #[test]
    fn test_unavailable() {
        let info = MediaInfo::unavailable();
        assert_eq!(info.size, "Error");
        assert_eq!(info.duration, "N/A");
        assert_eq!(info.audio_bitrate, "N/A");
    }

    #[test]
    fn test_describe_missing_file() {
        // 没有 ffprobe 或文件不存在时都返回占位信息
        let info = describe(Path::new("/definitely/not/here.mp4"));
        assert_eq!(info, MediaInfo::unavailable());
    }
}

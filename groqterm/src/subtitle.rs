//! SRT and WebVTT rendering of transcript segments.

use crate::types::Segment;

/// Format seconds as SRT timestamp: HH:MM:SS,mmm
pub fn format_srt_time(seconds: f64) -> String {
    format_timestamp(seconds, ',')
}

/// Format seconds as VTT timestamp: HH:MM:SS.mmm
pub fn format_vtt_time(seconds: f64) -> String {
    format_timestamp(seconds, '.')
}

// Each field is truncated independently, so 61.9999 renders as 00:01:01,999.
fn format_timestamp(seconds: f64, millis_sep: char) -> String {
    let seconds = seconds.max(0.0);
    let h = (seconds / 3600.0).floor() as u64;
    let m = ((seconds % 3600.0) / 60.0).floor() as u64;
    let s = (seconds % 60.0).floor() as u64;
    let ms = ((seconds % 1.0) * 1000.0).floor() as u64;
    format!("{h:02}:{m:02}:{s:02}{millis_sep}{ms:03}")
}

/// Format segments as SRT subtitles. No segments yields an empty string.
pub fn to_srt(segments: &[Segment]) -> String {
    let mut out = String::new();
    for (i, seg) in segments.iter().enumerate() {
        out.push_str(&format!("{}\n", i + 1));
        out.push_str(&format!(
            "{} --> {}\n",
            format_srt_time(seg.start),
            format_srt_time(seg.end)
        ));
        out.push_str(seg.text.trim());
        out.push_str("\n\n");
    }
    out
}

/// Format segments as WebVTT subtitles. No segments yields just the header.
pub fn to_vtt(segments: &[Segment]) -> String {
    let mut out = String::from("WEBVTT\n\n");
    for seg in segments {
        out.push_str(&format!(
            "{} --> {}\n",
            format_vtt_time(seg.start),
            format_vtt_time(seg.end)
        ));
        out.push_str(seg.text.trim());
        out.push_str("\n\n");
    }
    out
}

//! Convert a saved verbose JSON transcript into SRT and WebVTT.
//!
//! Usage: cargo run --example subtitles -- path/to/transcript.json

use groqterm::TranscriptRecord;

fn main() -> groqterm::Result<()> {
    let path = std::env::args()
        .nth(1)
        .expect("usage: subtitles <transcript.json>");

    let json = std::fs::read_to_string(&path)?;
    let transcript: TranscriptRecord = serde_json::from_str(&json)?;

    println!("=== SRT ===\n{}", transcript.to_srt());
    println!("=== WebVTT ===\n{}", transcript.to_vtt());

    Ok(())
}

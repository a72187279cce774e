//! Transcribe an audio file with a specific language and print timed segments.
//!
//! Usage: GROQ_API_KEY=... cargo run --example transcribe -- path/to/audio.mp3

use groqterm::{GroqClient, TranscribeOptions, Transcriber};

#[tokio::main]
async fn main() -> groqterm::Result<()> {
    let path = std::env::args()
        .nth(1)
        .expect("usage: transcribe <audio-file>");

    let client = GroqClient::new(groqterm::resolve_api_key(None)?);
    let opts = TranscribeOptions::new()
        .model("whisper-large-v3")
        .language(Some("en".into()))?;

    let transcript = Transcriber::new(client).transcribe_file(&path, &opts).await?;

    for segment in &transcript.segments {
        println!("[{:.1}s - {:.1}s] {}", segment.start, segment.end, segment.text.trim());
    }

    Ok(())
}

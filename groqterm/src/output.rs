//! Transcript output formats and saving transcripts to disk.

use std::fmt;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::config::ResponseFormat;
use crate::error::Result;
use crate::types::TranscriptRecord;

/// Format a transcript is printed or saved in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
    Srt,
    Vtt,
}

impl OutputFormat {
    /// File extension, without the dot.
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Text => "txt",
            OutputFormat::Json => "json",
            OutputFormat::Srt => "srt",
            OutputFormat::Vtt => "vtt",
        }
    }

    /// Timed formats need segments, which only verbose JSON carries.
    pub fn preferred_response_format(self) -> ResponseFormat {
        match self {
            OutputFormat::Text => ResponseFormat::Text,
            OutputFormat::Json | OutputFormat::Srt | OutputFormat::Vtt => ResponseFormat::VerboseJson,
        }
    }

    pub fn needs_timestamps(self) -> bool {
        self != OutputFormat::Text
    }

    pub fn render(self, record: &TranscriptRecord) -> Result<String> {
        match self {
            OutputFormat::Text => Ok(record.text.clone()),
            OutputFormat::Json => record.to_json_pretty(),
            OutputFormat::Srt => Ok(record.to_srt()),
            OutputFormat::Vtt => Ok(record.to_vtt()),
        }
    }

    /// Audio path with this format's extension, e.g. `talk.mp3` → `talk.srt`.
    pub fn default_output_path(self, audio: &Path) -> PathBuf {
        audio.with_extension(self.extension())
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Srt => write!(f, "srt"),
            OutputFormat::Vtt => write!(f, "vtt"),
        }
    }
}

/// Write the transcript as UTF-8 in the given format and return the path.
pub fn save_transcript(record: &TranscriptRecord, path: &Path, format: OutputFormat) -> Result<PathBuf> {
    let content = format.render(record)?;
    std::fs::write(path, content)?;
    info!(path = %path.display(), %format, "transcript saved");
    Ok(path.to_path_buf())
}

//! Local checks on audio files, run before anything is uploaded.

use std::path::Path;

use tracing::debug;

use crate::config::Tier;
use crate::error::{Error, Result};

/// Extensions the transcription endpoint accepts.
pub const SUPPORTED_EXTENSIONS: &[&str] = &[
    ".flac", ".mp3", ".mp4", ".mpeg", ".mpga", ".m4a", ".ogg", ".wav", ".webm",
];

/// Whether the file extension is one the endpoint accepts (case-insensitive).
pub fn is_supported_audio_format(path: &Path) -> bool {
    let ext = dotted_extension(path);
    SUPPORTED_EXTENSIONS.contains(&ext.as_str())
}

fn dotted_extension(path: &Path) -> String {
    path.extension()
        .map(|e| format!(".{}", e.to_string_lossy().to_lowercase()))
        .unwrap_or_default()
}

/// Check existence, format and size. Returns the file size in bytes.
pub fn validate_audio_file(path: &Path, tier: Tier) -> Result<u64> {
    let metadata = match std::fs::metadata(path) {
        Ok(m) if m.is_file() => m,
        Ok(_) => {
            return Err(Error::AudioNotFound {
                path: path.to_path_buf(),
            })
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(Error::AudioNotFound {
                path: path.to_path_buf(),
            })
        }
        Err(e) => return Err(e.into()),
    };

    if !is_supported_audio_format(path) {
        return Err(Error::UnsupportedFormat {
            extension: dotted_extension(path),
        });
    }

    let size = metadata.len();
    let limit = tier.max_file_size();
    if size > limit {
        return Err(Error::FileTooLarge {
            size,
            limit,
            tier: tier.to_string(),
        });
    }

    debug!(path = %path.display(), size, %tier, "audio file validated");
    Ok(size)
}

/// Human-readable byte count (1024-based).
pub fn format_file_size(bytes: u64) -> String {
    let mut size = bytes as f64;
    for unit in ["B", "KB", "MB", "GB"] {
        if size < 1024.0 {
            return format!("{size:.1} {unit}");
        }
        size /= 1024.0;
    }
    format!("{size:.1} TB")
}

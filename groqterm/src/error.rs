use std::path::PathBuf;

/// All errors that can occur in groqterm.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("rate limit exceeded: {message}")]
    RateLimited {
        message: String,
        /// Seconds from the `retry-after` header, when the server sent one.
        retry_after: Option<u64>,
    },

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("GROQ_API_KEY not found — set it in the environment, a .env file, or pass --api-key")]
    MissingApiKey,

    #[error("audio file not found: {path}")]
    AudioNotFound { path: PathBuf },

    #[error("unsupported format: \"{extension}\" — supported formats: {}", crate::audio::SUPPORTED_EXTENSIONS.join(", "))]
    UnsupportedFormat { extension: String },

    #[error("file too large: {:.1}MB — maximum size for {tier} tier: {}MB", megabytes(.size), whole_megabytes(.limit))]
    FileTooLarge { size: u64, limit: u64, tier: String },

    #[error("invalid option: {0}")]
    InvalidOption(String),

    #[error("malformed stream: {0}")]
    Stream(String),

    #[error("unexpected error: {0}")]
    Unexpected(String),

    #[error("invalid .env file: {0}")]
    EnvFile(#[from] dotenvy::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Whether this error was raised by a local check before any request was sent.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Error::MissingApiKey
                | Error::AudioNotFound { .. }
                | Error::UnsupportedFormat { .. }
                | Error::FileTooLarge { .. }
                | Error::InvalidOption(_)
        )
    }

    /// One-line message shown to the user when a request fails.
    pub fn diagnostic(&self) -> String {
        match self {
            Error::RateLimited {
                retry_after: Some(secs),
                ..
            } => format!("Rate limit exceeded. Please wait {secs}s and try again."),
            Error::RateLimited { .. } => "Rate limit exceeded. Please wait and try again.".into(),
            Error::Api { .. } | Error::Http(_) => format!("API Error: {self}"),
            e if e.is_validation() => format!("Error: {e}"),
            e => format!("Unexpected error: {e}"),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

fn megabytes(bytes: &u64) -> f64 {
    *bytes as f64 / (1024.0 * 1024.0)
}

fn whole_megabytes(bytes: &u64) -> u64 {
    bytes / (1024 * 1024)
}

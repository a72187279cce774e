use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::render::RenderMode;

pub const DEFAULT_BASE_URL: &str = "https://api.groq.com/openai/v1";
pub const DEFAULT_CHAT_MODEL: &str = "groq/compound";
pub const DEFAULT_WHISPER_MODEL: &str = "whisper-large-v3-turbo";

pub const API_KEY_VAR: &str = "GROQ_API_KEY";

const ENV_TEMPLATE: &str = "# Groq API Configuration
GROQ_API_KEY=your_api_key_here

# Optional settings
# GROQ_DEFAULT_MODEL=groq/compound
# GROQ_DEFAULT_WHISPER_MODEL=whisper-large-v3-turbo
# GROQ_ACCOUNT_TIER=free
";

/// Account class, which bounds the size of uploaded audio.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    #[default]
    Free,
    Developer,
}

impl Tier {
    /// Maximum upload size in bytes.
    pub fn max_file_size(self) -> u64 {
        match self {
            Tier::Free => 25 * 1024 * 1024,
            Tier::Developer => 100 * 1024 * 1024,
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tier::Free => write!(f, "free"),
            Tier::Developer => write!(f, "developer"),
        }
    }
}

/// Body format requested from the transcription endpoint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseFormat {
    Text,
    Json,
    #[default]
    VerboseJson,
    Srt,
    Vtt,
}

impl ResponseFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            ResponseFormat::Text => "text",
            ResponseFormat::Json => "json",
            ResponseFormat::VerboseJson => "verbose_json",
            ResponseFormat::Srt => "srt",
            ResponseFormat::Vtt => "vtt",
        }
    }

    /// Whether the server answers with a JSON document rather than bare text.
    pub fn is_json(self) -> bool {
        matches!(self, ResponseFormat::Json | ResponseFormat::VerboseJson)
    }
}

impl fmt::Display for ResponseFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Builder for chat requests.
#[derive(Debug, Clone)]
pub struct ChatOptions {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub system_prompt: Option<String>,
    pub include_domains: Vec<String>,
    pub exclude_domains: Vec<String>,
    pub render_mode: RenderMode,
}

impl Default for ChatOptions {
    fn default() -> Self {
        Self {
            model: DEFAULT_CHAT_MODEL.into(),
            temperature: 0.7,
            max_tokens: 2000,
            system_prompt: None,
            include_domains: Vec::new(),
            exclude_domains: Vec::new(),
            render_mode: RenderMode::Raw,
        }
    }
}

impl ChatOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set the sampling temperature. Must be within 0.0..=2.0.
    pub fn temperature(mut self, temp: f32) -> Result<Self> {
        if !(0.0..=2.0).contains(&temp) {
            return Err(Error::InvalidOption(format!(
                "temperature must be between 0.0 and 2.0, got {temp}"
            )));
        }
        self.temperature = temp;
        Ok(self)
    }

    pub fn max_tokens(mut self, n: u32) -> Result<Self> {
        if n == 0 {
            return Err(Error::InvalidOption("max_tokens must be at least 1".into()));
        }
        self.max_tokens = n;
        Ok(self)
    }

    pub fn system_prompt(mut self, prompt: Option<String>) -> Self {
        self.system_prompt = prompt.filter(|p| !p.trim().is_empty());
        self
    }

    pub fn include_domains(mut self, domains: Vec<String>) -> Self {
        self.include_domains = domains;
        self
    }

    pub fn exclude_domains(mut self, domains: Vec<String>) -> Self {
        self.exclude_domains = domains;
        self
    }

    pub fn render_mode(mut self, mode: RenderMode) -> Self {
        self.render_mode = mode;
        self
    }

    /// Compound models run server-side tools and accept domain filters.
    pub fn is_compound(&self) -> bool {
        self.model.contains("compound")
    }
}

/// Builder for transcription requests.
#[derive(Debug, Clone)]
pub struct TranscribeOptions {
    pub model: String,
    pub language: Option<String>,
    pub response_format: ResponseFormat,
    pub temperature: f32,
    pub timestamps: bool,
    pub tier: Tier,
    pub progress: bool,
}

impl Default for TranscribeOptions {
    fn default() -> Self {
        Self {
            model: DEFAULT_WHISPER_MODEL.into(),
            language: None,
            response_format: ResponseFormat::VerboseJson,
            temperature: 0.0,
            timestamps: true,
            tier: Tier::Free,
            progress: true,
        }
    }
}

impl TranscribeOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// ISO-639-1 code such as "en"; `None` lets the server detect it.
    pub fn language(mut self, lang: Option<String>) -> Result<Self> {
        if let Some(code) = &lang {
            if code.len() < 2 || !code.chars().all(|c| c.is_ascii_alphabetic()) {
                return Err(Error::InvalidOption(format!(
                    "language must be an ISO-639-1 code such as \"en\", got \"{code}\""
                )));
            }
        }
        self.language = lang.map(|l| l.to_ascii_lowercase());
        Ok(self)
    }

    pub fn response_format(mut self, format: ResponseFormat) -> Self {
        self.response_format = format;
        self
    }

    /// Set the sampling temperature. Must be within 0.0..=1.0.
    pub fn temperature(mut self, temp: f32) -> Result<Self> {
        if !(0.0..=1.0).contains(&temp) {
            return Err(Error::InvalidOption(format!(
                "temperature must be between 0.0 and 1.0, got {temp}"
            )));
        }
        self.temperature = temp;
        Ok(self)
    }

    pub fn timestamps(mut self, enabled: bool) -> Self {
        self.timestamps = enabled;
        self
    }

    pub fn tier(mut self, tier: Tier) -> Self {
        self.tier = tier;
        self
    }

    pub fn progress(mut self, enabled: bool) -> Self {
        self.progress = enabled;
        self
    }

    /// Granularities to request; only meaningful for verbose JSON.
    pub fn timestamp_granularities(&self) -> &'static [&'static str] {
        if self.timestamps && self.response_format == ResponseFormat::VerboseJson {
            &["word", "segment"]
        } else {
            &[]
        }
    }
}

/// Return the API key, or [`Error::MissingApiKey`] when it is absent or blank.
pub fn resolve_api_key(explicit: Option<String>) -> Result<String> {
    explicit
        .or_else(|| std::env::var(API_KEY_VAR).ok())
        .map(|k| k.trim().to_string())
        .filter(|k| !k.is_empty())
        .ok_or(Error::MissingApiKey)
}

/// Locations searched for a `.env` file, in priority order.
pub fn env_file_candidates() -> Vec<PathBuf> {
    let mut candidates = vec![PathBuf::from(".env")];
    if let Some(dir) = dirs::config_dir() {
        candidates.push(dir.join("groqterm").join(".env"));
    }
    candidates
}

/// Load a `.env` file into the process environment.
///
/// Variables already set are left alone. Returns whether the file existed.
pub fn load_env_file(path: &Path) -> Result<bool> {
    match dotenvy::from_path(path) {
        Ok(()) => {
            debug!(path = %path.display(), "loaded env file");
            Ok(true)
        }
        Err(e) if e.not_found() => Ok(false),
        Err(dotenvy::Error::Io(e)) => Err(e.into()),
        Err(e) => Err(Error::EnvFile(e)),
    }
}

/// Load every `.env` file from [`env_file_candidates`]; returns how many
/// were found.
pub fn load_default_env_files() -> Result<usize> {
    let mut loaded = 0;
    for path in env_file_candidates() {
        if load_env_file(&path)? {
            loaded += 1;
        }
    }
    Ok(loaded)
}

/// Write a template `.env` file, refusing to overwrite an existing one.
pub fn write_env_template(path: &Path) -> Result<()> {
    if path.exists() {
        return Err(Error::InvalidOption(format!(
            "{} already exists",
            path.display()
        )));
    }
    std::fs::write(path, ENV_TEMPLATE)?;
    Ok(())
}

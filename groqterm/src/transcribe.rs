use std::path::Path;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use crate::audio;
use crate::client::{GroqClient, TranscriptionRequest};
use crate::config::TranscribeOptions;
use crate::error::Result;
use crate::types::TranscriptRecord;

/// Uploads audio files to the transcription endpoint.
#[derive(Debug, Clone)]
pub struct Transcriber {
    client: GroqClient,
}

impl Transcriber {
    pub fn new(client: GroqClient) -> Self {
        Self { client }
    }

    /// Validate, upload and transcribe a local audio file.
    ///
    /// Missing, unsupported or oversize files fail before any request is made.
    pub async fn transcribe_file(
        &self,
        path: impl AsRef<Path>,
        options: &TranscribeOptions,
    ) -> Result<TranscriptRecord> {
        let path = path.as_ref();
        let size = audio::validate_audio_file(path, options.tier)?;

        let audio = tokio::fs::read(path).await?;
        let filename = path
            .file_name()
            .map(|f| f.to_string_lossy().into_owned())
            .unwrap_or_else(|| "audio".into());

        info!(
            file = %filename,
            size = %audio::format_file_size(size),
            model = %options.model,
            "transcribing"
        );

        let request = TranscriptionRequest {
            audio,
            filename,
            model: options.model.clone(),
            language: options.language.clone(),
            response_format: options.response_format,
            temperature: options.temperature,
            timestamp_granularities: options
                .timestamp_granularities()
                .iter()
                .map(|g| g.to_string())
                .collect(),
        };

        let spinner = options.progress.then(upload_spinner);
        let result = self.client.transcribe(request).await;
        if let Some(pb) = spinner {
            match &result {
                Ok(_) => pb.finish_with_message("Transcription complete"),
                Err(_) => pb.abandon_with_message("Transcription failed"),
            }
        }

        let record = result?;
        info!(
            segments = record.segments.len(),
            language = record.language.as_deref().unwrap_or("unknown"),
            "transcription received"
        );
        Ok(record)
    }
}

fn upload_spinner() -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {msg}")
            .expect("valid template"),
    );
    pb.set_message("Uploading and processing...");
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

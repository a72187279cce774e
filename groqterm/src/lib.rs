//! Groq chat and transcription client. Streamed replies in, terminal text out;
//! audio in, transcript with timestamps out.
//!
//! **groqterm** talks to the Groq OpenAI-compatible API: chat completions are
//! streamed fragment by fragment through a [`StreamRenderer`] (raw or
//! live-refreshing), and transcriptions are normalised into a
//! [`TranscriptRecord`] that can be written as plain text, JSON, SRT or WebVTT.
//!
//! # Quick start
//!
//! ```rust,no_run
//! # #[tokio::main]
//! # async fn main() -> groqterm::Result<()> {
//! use groqterm::{ChatOptions, GroqClient, TerminalSink};
//!
//! let client = GroqClient::new(groqterm::resolve_api_key(None)?);
//!
//! // Stream a reply to stdout
//! let mut sink = TerminalSink::stdout();
//! let reply = groqterm::complete_once(&client, &ChatOptions::default(), "Hello!", &mut sink).await?;
//! println!("\n{} tools used", reply.tools_used.len());
//!
//! // Transcribe a file and print SRT subtitles
//! let transcript = groqterm::Transcriber::new(client)
//!     .transcribe_file("meeting.mp3", &groqterm::TranscribeOptions::default())
//!     .await?;
//! println!("{}", transcript.to_srt());
//! # Ok(())
//! # }
//! ```

pub mod audio;
pub mod chat;
pub mod client;
pub mod config;
pub mod error;
pub mod history;
pub mod output;
pub mod render;
pub mod subtitle;
pub(crate) mod transcribe;
pub mod types;

pub use chat::{complete_blocking, complete_once, ChatSession};
pub use client::{ChatRequest, CompletionSource, FragmentStream, GroqClient};
pub use config::{resolve_api_key, ChatOptions, ResponseFormat, Tier, TranscribeOptions};
pub use error::{Error, Result};
pub use history::{History, HISTORY_LIMIT};
pub use output::{save_transcript, OutputFormat};
pub use render::{LiveSink, OutputSink, RenderMode, StreamRenderer, TerminalSink};
pub use transcribe::Transcriber;
pub use types::{ChatMessage, CompletionResult, Fragment, Role, Segment, TranscriptRecord, Word};

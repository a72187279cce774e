use std::fmt;

use serde::{Deserialize, Serialize};

/// Speaker of a conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::System => write!(f, "system"),
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
        }
    }
}

/// One turn of a conversation, in the shape the chat API expects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// A piece of a streamed reply.
///
/// Fragments carry no boundary semantics: a word or a multi-byte sequence of
/// words may be split across any number of them. `tool_names` is set only on
/// the chunks where the server reports the tools it executed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Fragment {
    pub text: String,
    pub tool_names: Option<Vec<String>>,
}

impl Fragment {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            tool_names: None,
        }
    }

    pub fn with_tools(mut self, tools: Vec<String>) -> Self {
        self.tool_names = Some(tools);
        self
    }
}

/// Complete reply to a chat request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionResult {
    pub text: String,
    pub tools_used: Vec<String>,
}

/// A single word with timing, present when word granularity was requested.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Word {
    pub word: String,
    pub start: f64,
    pub end: f64,
}

/// A transcript segment (sentence/phrase).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u32>,
    pub start: f64,
    pub end: f64,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avg_logprob: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compression_ratio: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub no_speech_prob: Option<f64>,
    /// Fields the server sent that have no typed counterpart (`seek`, `tokens`, ...).
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Segment {
    pub fn new(start: f64, end: f64, text: impl Into<String>) -> Self {
        Self {
            start,
            end,
            text: text.into(),
            ..Self::default()
        }
    }
}

/// Transcription result, normalised from whatever shape the server returned.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TranscriptRecord {
    pub text: String,
    #[serde(default)]
    pub segments: Vec<Segment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub words: Option<Vec<Word>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task: Option<String>,
    /// Untyped top-level fields such as `x_groq`, kept so JSON output is lossless.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl TranscriptRecord {
    /// Record holding only plain text, as returned for `text`/`srt`/`vtt` response formats.
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    /// Format as SRT subtitles.
    pub fn to_srt(&self) -> String {
        crate::subtitle::to_srt(&self.segments)
    }

    /// Format as WebVTT subtitles.
    pub fn to_vtt(&self) -> String {
        crate::subtitle::to_vtt(&self.segments)
    }

    /// Format as JSON.
    pub fn to_json(&self) -> crate::Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Format as pretty-printed JSON.
    pub fn to_json_pretty(&self) -> crate::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_message_wire_shape() {
        let json = serde_json::to_value(ChatMessage::assistant("hi")).unwrap();
        assert_eq!(json, serde_json::json!({"role": "assistant", "content": "hi"}));
    }

    #[test]
    fn test_role_display_matches_wire() {
        for role in [Role::System, Role::User, Role::Assistant] {
            let wire = serde_json::to_value(role).unwrap();
            assert_eq!(wire, serde_json::Value::String(role.to_string()));
        }
    }

    #[test]
    fn test_transcript_json_round_trip() {
        let record = TranscriptRecord {
            text: "Hello World".into(),
            segments: vec![
                Segment {
                    id: Some(0),
                    avg_logprob: Some(-0.21),
                    no_speech_prob: Some(0.01),
                    ..Segment::new(0.0, 1.0, " Hello")
                },
                Segment::new(1.0, 2.5, " World"),
            ],
            language: Some("English".into()),
            duration: Some(2.5),
            words: Some(vec![Word {
                word: "Hello".into(),
                start: 0.0,
                end: 0.4,
            }]),
            task: Some("transcribe".into()),
            extra: [("x_groq".to_string(), serde_json::json!({"id": "req_01"}))]
                .into_iter()
                .collect(),
        };

        let json = record.to_json_pretty().unwrap();
        let parsed: TranscriptRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, record);
    }

    #[test]
    fn test_transcript_parses_verbose_json_with_extra_fields() {
        let body = r#"{
            "task": "transcribe",
            "language": "English",
            "duration": 3.2,
            "text": "Hi there.",
            "segments": [{
                "id": 0, "seek": 0, "start": 0.0, "end": 3.2, "text": " Hi there.",
                "tokens": [50364, 2421], "temperature": 0.0,
                "avg_logprob": -0.3, "compression_ratio": 0.8, "no_speech_prob": 0.02
            }],
            "x_groq": {"id": "req_01"}
        }"#;
        let record: TranscriptRecord = serde_json::from_str(body).unwrap();
        assert_eq!(record.segments.len(), 1);
        assert_eq!(record.segments[0].end, 3.2);
        assert_eq!(record.language.as_deref(), Some("English"));
        assert!(record.words.is_none());
        assert_eq!(record.segments[0].extra["tokens"], serde_json::json!([50364, 2421]));
        assert_eq!(record.segments[0].extra["seek"], 0);
        assert_eq!(record.extra["x_groq"]["id"], "req_01");
    }

    #[test]
    fn test_transcript_without_segments_defaults_empty() {
        let record: TranscriptRecord = serde_json::from_str(r#"{"text":"plain"}"#).unwrap();
        assert!(record.segments.is_empty());
        assert_eq!(record.to_vtt(), "WEBVTT\n\n");
        assert_eq!(record.to_srt(), "");
    }
}

//! HTTP client for the Groq OpenAI-compatible API.

use std::future::Future;
use std::pin::Pin;

use eventsource_stream::{Event, EventStreamError, Eventsource};
use futures_util::{Stream, StreamExt};
use reqwest::multipart::{Form, Part};
use reqwest::{Response, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::{ResponseFormat, DEFAULT_BASE_URL};
use crate::error::{Error, Result};
use crate::types::{ChatMessage, CompletionResult, Fragment, TranscriptRecord};

/// Fragments of a streamed reply, in arrival order.
pub type FragmentStream = Pin<Box<dyn Stream<Item = Result<Fragment>> + Send>>;

/// Body of a `/chat/completions` request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatRequest {
    pub messages: Vec<ChatMessage>,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub include_domains: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exclude_domains: Option<Vec<String>>,
}

/// Anything that can answer a chat request.
pub trait CompletionSource {
    /// Start a streamed completion.
    fn stream(&self, request: &ChatRequest) -> impl Future<Output = Result<FragmentStream>> + Send;

    /// Run a completion and wait for the whole reply.
    fn complete(&self, request: &ChatRequest)
        -> impl Future<Output = Result<CompletionResult>> + Send;
}

impl<T: CompletionSource + Sync> CompletionSource for &T {
    fn stream(&self, request: &ChatRequest) -> impl Future<Output = Result<FragmentStream>> + Send {
        (**self).stream(request)
    }

    fn complete(&self, request: &ChatRequest)
        -> impl Future<Output = Result<CompletionResult>> + Send {
        (**self).complete(request)
    }
}

/// Audio upload for `/audio/transcriptions`.
#[derive(Debug, Clone)]
pub struct TranscriptionRequest {
    pub audio: Vec<u8>,
    pub filename: String,
    pub model: String,
    pub language: Option<String>,
    pub response_format: ResponseFormat,
    pub temperature: f32,
    pub timestamp_granularities: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct GroqClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl GroqClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_base_url(api_key, DEFAULT_BASE_URL)
    }

    pub fn with_base_url(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn post_chat(&self, request: &ChatRequest) -> Result<Response> {
        let url = format!("{}/chat/completions", self.base_url);
        debug!(
            model = %request.model,
            messages = request.messages.len(),
            stream = request.stream,
            "sending chat request"
        );
        let response = self
            .http
            .post(url)
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await?;
        check_status(response).await
    }

    /// Upload audio and normalise the reply into a [`TranscriptRecord`].
    pub async fn transcribe(&self, request: TranscriptionRequest) -> Result<TranscriptRecord> {
        let url = format!("{}/audio/transcriptions", self.base_url);
        let format = request.response_format;
        debug!(
            model = %request.model,
            file = %request.filename,
            bytes = request.audio.len(),
            format = %format,
            "sending transcription request"
        );

        let mut form = Form::new()
            .part(
                "file",
                Part::bytes(request.audio).file_name(request.filename),
            )
            .text("model", request.model)
            .text("response_format", format.as_str())
            .text("temperature", request.temperature.to_string());
        if let Some(language) = request.language {
            form = form.text("language", language);
        }
        for granularity in request.timestamp_granularities {
            form = form.text("timestamp_granularities[]", granularity);
        }

        let response = self
            .http
            .post(url)
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .await?;
        let body = check_status(response).await?.text().await?;
        parse_transcription(&body, format)
    }
}

impl CompletionSource for GroqClient {
    async fn stream(&self, request: &ChatRequest) -> Result<FragmentStream> {
        let mut request = request.clone();
        request.stream = true;
        let response = self.post_chat(&request).await?;
        Ok(fragment_stream(response.bytes_stream()))
    }

    async fn complete(&self, request: &ChatRequest) -> Result<CompletionResult> {
        let mut request = request.clone();
        request.stream = false;
        let response: ChatResponse = self.post_chat(&request).await?.json().await?;
        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| Error::Unexpected("response contained no choices".into()))?;
        Ok(CompletionResult {
            text: choice.message.content.unwrap_or_default(),
            tools_used: tool_names(choice.message.executed_tools.unwrap_or_default()),
        })
    }
}

/// Map non-success statuses onto [`Error::RateLimited`] / [`Error::Api`].
async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let retry_after = response
        .headers()
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse().ok());
    let body = response.text().await.unwrap_or_default();
    let message = error_message(&body).unwrap_or_else(|| {
        if body.trim().is_empty() {
            status
                .canonical_reason()
                .unwrap_or("request failed")
                .to_string()
        } else {
            body.trim().to_string()
        }
    });
    warn!(status = status.as_u16(), %message, "request rejected");

    if status == StatusCode::TOO_MANY_REQUESTS {
        Err(Error::RateLimited {
            message,
            retry_after,
        })
    } else {
        Err(Error::Api {
            status: status.as_u16(),
            message,
        })
    }
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

fn error_message(body: &str) -> Option<String> {
    serde_json::from_str::<ErrorEnvelope>(body)
        .ok()
        .map(|e| e.error.message)
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ResponseChoice>,
}

#[derive(Deserialize)]
struct ResponseChoice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
    executed_tools: Option<Vec<ExecutedTool>>,
}

#[derive(Deserialize)]
struct ChatChunk {
    #[serde(default)]
    choices: Vec<ChunkChoice>,
    error: Option<ErrorBody>,
}

#[derive(Deserialize)]
struct ChunkChoice {
    #[serde(default)]
    delta: Delta,
}

#[derive(Deserialize, Default)]
struct Delta {
    content: Option<String>,
    executed_tools: Option<Vec<ExecutedTool>>,
}

/// Executed tools are reported either by name or as objects with a `type`.
#[derive(Deserialize)]
#[serde(untagged)]
enum ExecutedTool {
    Name(String),
    Detail {
        #[serde(rename = "type")]
        kind: Option<String>,
        name: Option<String>,
    },
}

fn tool_names(tools: Vec<ExecutedTool>) -> Vec<String> {
    tools
        .into_iter()
        .filter_map(|tool| match tool {
            ExecutedTool::Name(name) => Some(name),
            ExecutedTool::Detail { kind, name } => name.or(kind),
        })
        .collect()
}

/// Turn one `data:` payload into a fragment; `None` for chunks that carry
/// neither text nor tools (role announcements, usage trailers).
fn parse_chunk(data: &str) -> Result<Option<Fragment>> {
    let chunk: ChatChunk = serde_json::from_str(data)?;
    if let Some(error) = chunk.error {
        return Err(Error::Api {
            status: 200,
            message: error.message,
        });
    }

    let Some(choice) = chunk.choices.into_iter().next() else {
        return Ok(None);
    };
    let text = choice.delta.content.unwrap_or_default();
    let tool_names = choice.delta.executed_tools.map(tool_names);
    if text.is_empty() && tool_names.is_none() {
        return Ok(None);
    }
    Ok(Some(Fragment { text, tool_names }))
}

/// Pull the next fragment out of a decoded event stream; `Ok(None)` at
/// `[DONE]` or when the body ends.
async fn next_fragment<S, E>(events: &mut S) -> Result<Option<Fragment>>
where
    S: Stream<Item = std::result::Result<Event, EventStreamError<E>>> + Unpin,
    Error: From<E>,
{
    while let Some(event) = events.next().await {
        let event = match event {
            Ok(event) => event,
            Err(EventStreamError::Transport(e)) => return Err(e.into()),
            Err(EventStreamError::Utf8(e)) => return Err(Error::Stream(e.to_string())),
            Err(EventStreamError::Parser(e)) => return Err(Error::Stream(e.to_string())),
        };
        if event.data.trim() == "[DONE]" {
            return Ok(None);
        }
        match parse_chunk(&event.data) {
            Ok(Some(fragment)) => return Ok(Some(fragment)),
            Ok(None) => continue,
            Err(e @ Error::Api { .. }) => return Err(e),
            Err(e) => {
                warn!(error = %e, "undecodable stream chunk");
                return Err(Error::Stream(format!("invalid chunk: {e}")));
            }
        }
    }
    Ok(None)
}

/// Decode a streamed chat body into fragments.
///
/// Ends at `data: [DONE]` or when the body ends; a transport error or a
/// malformed chunk ends the stream with that error.
pub fn fragment_stream<B, C, E>(body: B) -> FragmentStream
where
    B: Stream<Item = std::result::Result<C, E>> + Send + 'static,
    C: AsRef<[u8]> + Send + 'static,
    E: Send + 'static,
    Error: From<E>,
{
    let events = Box::pin(body.eventsource());

    let stream = futures_util::stream::try_unfold(events, |mut events| async move {
        match next_fragment(&mut events).await {
            Ok(Some(fragment)) => Ok(Some((fragment, events))),
            Ok(None) => Ok(None),
            Err(e) => Err(e),
        }
    });

    Box::pin(stream)
}

fn parse_transcription(body: &str, format: ResponseFormat) -> Result<TranscriptRecord> {
    if format.is_json() {
        Ok(serde_json::from_str(body)?)
    } else {
        Ok(TranscriptRecord::from_text(body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::stream;

    fn body(chunks: &[&str]) -> impl Stream<Item = std::result::Result<Vec<u8>, Error>> + Send + 'static {
        stream::iter(
            chunks
                .iter()
                .map(|c| Ok(c.as_bytes().to_vec()))
                .collect::<Vec<_>>(),
        )
    }

    async fn collect(chunks: &[&str]) -> Vec<Result<Fragment>> {
        fragment_stream(body(chunks)).collect().await
    }

    #[tokio::test]
    async fn test_stream_yields_content_deltas() {
        let items = collect(&[
            "data: {\"choices\":[{\"delta\":{\"role\":\"assistant\"}}]}\n\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"Hel\"}}]}\n\ndata: {\"choices\":[{\"delta\":{\"content\":\"lo\"}}]}\n\n",
            "data: [DONE]\n\n",
        ])
        .await;
        let texts: Vec<String> = items.into_iter().map(|f| f.unwrap().text).collect();
        assert_eq!(texts, vec!["Hel", "lo"]);
    }

    #[tokio::test]
    async fn test_stream_stops_at_done() {
        let items = collect(&[
            "data: {\"choices\":[{\"delta\":{\"content\":\"a\"}}]}\n\n",
            "data: [DONE]\n\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"ignored\"}}]}\n\n",
        ])
        .await;
        assert_eq!(items.len(), 1);
    }

    #[tokio::test]
    async fn test_stream_reads_executed_tools() {
        let items = collect(&[
            "data: {\"choices\":[{\"delta\":{\"content\":\"x\"}}]}\n\n",
            "data: {\"choices\":[{\"delta\":{\"executed_tools\":[{\"index\":0,\"type\":\"search\",\"arguments\":\"{}\"},\"python\"]}}]}\n\n",
        ])
        .await;
        let last = items.into_iter().last().unwrap().unwrap();
        assert_eq!(last.text, "");
        assert_eq!(last.tool_names, Some(vec!["search".into(), "python".into()]));
    }

    #[tokio::test]
    async fn test_stream_ends_without_done() {
        let items = collect(&["data: {\"choices\":[{\"delta\":{\"content\":\"tail\"}}]}\n\n"]).await;
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].as_ref().unwrap().text, "tail");
    }

    #[tokio::test]
    async fn test_stream_event_split_across_chunks() {
        let items = collect(&[
            "da",
            "ta: {\"choices\":[{\"delta\":",
            "{\"content\":\"café\"}}]}\n",
            "\ndata: [DONE]\n\n",
        ])
        .await;
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].as_ref().unwrap().text, "café");
    }

    #[tokio::test]
    async fn test_stream_skips_comments_and_accepts_crlf() {
        let items = collect(&[
            ": keep-alive\r\n\r\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"one\"}}]}\r\n\r\n",
            "data: [DONE]\r\n\r\n",
        ])
        .await;
        let texts: Vec<String> = items.into_iter().map(|f| f.unwrap().text).collect();
        assert_eq!(texts, vec!["one"]);
    }

    #[tokio::test]
    async fn test_stream_accepts_bare_cr_line_endings() {
        let items = collect(&[
            "data: {\"choices\":[{\"delta\":{\"content\":\"one\"}}]}\r\rdata: {\"choices\":[{\"delta\":{\"content\":\"two\"}}]}\r\r",
            "data: [DONE]\r\r",
        ])
        .await;
        let texts: Vec<String> = items.into_iter().map(|f| f.unwrap().text).collect();
        assert_eq!(texts, vec!["one", "two"]);
    }

    #[tokio::test]
    async fn test_stream_error_chunk_becomes_api_error() {
        let items = collect(&[
            "data: {\"choices\":[{\"delta\":{\"content\":\"a\"}}]}\n\n",
            "data: {\"error\":{\"message\":\"model overloaded\",\"type\":\"server_error\"}}\n\n",
        ])
        .await;
        assert_eq!(items.len(), 2);
        assert!(matches!(&items[1], Err(Error::Api { message, .. }) if message == "model overloaded"));
    }

    #[tokio::test]
    async fn test_stream_malformed_chunk_is_stream_error() {
        let items = collect(&["data: {not json\n\n"]).await;
        assert!(matches!(items.as_slice(), [Err(Error::Stream(_))]));
    }

    #[tokio::test]
    async fn test_stream_transport_error_ends_stream() {
        let chunks: Vec<std::result::Result<Vec<u8>, Error>> = vec![
            Ok(b"data: {\"choices\":[{\"delta\":{\"content\":\"a\"}}]}\n\n".to_vec()),
            Err(Error::Unexpected("connection reset".into())),
        ];
        let items: Vec<_> = fragment_stream(stream::iter(chunks)).collect().await;
        assert_eq!(items.len(), 2);
        assert!(items[0].is_ok());
        assert!(matches!(items[1], Err(Error::Unexpected(_))));
    }

    #[test]
    fn test_chat_request_omits_absent_domains() {
        let request = ChatRequest {
            messages: vec![ChatMessage::user("hi")],
            model: "llama-3.3-70b-versatile".into(),
            temperature: 0.7,
            max_tokens: 100,
            stream: true,
            include_domains: None,
            exclude_domains: Some(vec!["example.com".into()]),
        };
        let json = serde_json::to_value(&request).unwrap();
        assert!(json.get("include_domains").is_none());
        assert_eq!(json["exclude_domains"][0], "example.com");
        assert_eq!(json["messages"][0]["role"], "user");
    }

    #[test]
    fn test_error_message_from_envelope() {
        let body = r#"{"error":{"message":"Invalid API Key","type":"invalid_request_error"}}"#;
        assert_eq!(error_message(body).as_deref(), Some("Invalid API Key"));
        assert_eq!(error_message("<html>"), None);
    }

    #[test]
    fn test_parse_transcription_text_formats() {
        let record = parse_transcription("1\n00:00:00,000 --> 00:00:01,000\nHi\n", ResponseFormat::Srt).unwrap();
        assert!(record.segments.is_empty());
        assert!(record.text.starts_with("1\n"));

        let record = parse_transcription(r#"{"text":"hello"}"#, ResponseFormat::Json).unwrap();
        assert_eq!(record.text, "hello");

        assert!(parse_transcription("not json", ResponseFormat::VerboseJson).is_err());
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let client = GroqClient::with_base_url("key", "http://localhost:8080/v1/");
        assert_eq!(client.base_url(), "http://localhost:8080/v1");
    }
}

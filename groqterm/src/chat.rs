//! Chat completions: single-shot requests and history-keeping sessions.

use tracing::debug;

use crate::client::{ChatRequest, CompletionSource};
use crate::config::ChatOptions;
use crate::error::Result;
use crate::history::History;
use crate::render::{report, OutputSink, StreamRenderer};
use crate::types::{ChatMessage, CompletionResult};

/// Build the request body for `messages` under `options`.
///
/// Domain filters are only sent to compound models, and only when non-empty.
pub fn build_request(options: &ChatOptions, messages: Vec<ChatMessage>, stream: bool) -> ChatRequest {
    let domains = |list: &[String]| {
        (options.is_compound() && !list.is_empty()).then(|| list.to_vec())
    };
    ChatRequest {
        messages,
        model: options.model.clone(),
        temperature: options.temperature,
        max_tokens: options.max_tokens,
        stream,
        include_domains: domains(&options.include_domains),
        exclude_domains: domains(&options.exclude_domains),
    }
}

fn single_turn(options: &ChatOptions, query: &str) -> Vec<ChatMessage> {
    let mut messages = Vec::with_capacity(2);
    if let Some(system) = &options.system_prompt {
        messages.push(ChatMessage::system(system.as_str()));
    }
    messages.push(ChatMessage::user(query));
    messages
}

/// Stream a one-off reply (optional system prompt plus the query) into `sink`.
pub async fn complete_once<C, S>(
    source: &C,
    options: &ChatOptions,
    query: &str,
    sink: &mut S,
) -> Result<CompletionResult>
where
    C: CompletionSource,
    S: OutputSink + ?Sized,
{
    let request = build_request(options, single_turn(options, query), true);
    let stream = match source.stream(&request).await {
        Ok(stream) => stream,
        Err(e) => {
            report(sink, &e);
            return Err(e);
        }
    };
    StreamRenderer::new(sink, options.render_mode)
        .render(stream)
        .await
}

/// Fetch a one-off reply without streaming.
pub async fn complete_blocking<C: CompletionSource>(
    source: &C,
    options: &ChatOptions,
    query: &str,
) -> Result<CompletionResult> {
    let request = build_request(options, single_turn(options, query), false);
    source.complete(&request).await
}

/// Interactive conversation that resends its history with every query.
pub struct ChatSession<C> {
    source: C,
    options: ChatOptions,
    history: History,
}

impl<C: CompletionSource> ChatSession<C> {
    /// New session; the system prompt, if any, becomes the first history turn.
    pub fn new(source: C, options: ChatOptions) -> Self {
        let history = History::with_system(options.system_prompt.as_deref());
        Self {
            source,
            options,
            history,
        }
    }

    pub fn options(&self) -> &ChatOptions {
        &self.options
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    /// Reset to just the system prompt.
    pub fn clear(&mut self) {
        self.history = History::with_system(self.options.system_prompt.as_deref());
    }

    /// Send `query` with the conversation so far and stream the reply.
    ///
    /// The exchange is recorded only once the reply completes; a failed or
    /// dropped request leaves the history untouched.
    pub async fn send<S>(&mut self, query: &str, sink: &mut S) -> Result<CompletionResult>
    where
        S: OutputSink + ?Sized,
    {
        let mut messages = self.history.messages().to_vec();
        messages.push(ChatMessage::user(query));
        let request = build_request(&self.options, messages, true);

        let stream = match self.source.stream(&request).await {
            Ok(stream) => stream,
            Err(e) => {
                report(sink, &e);
                return Err(e);
            }
        };
        let result = StreamRenderer::new(sink, self.options.render_mode)
            .render(stream)
            .await?;

        self.history.push_exchange(query, result.text.as_str());
        debug!(turns = self.history.len(), "history updated");
        Ok(result)
    }
}

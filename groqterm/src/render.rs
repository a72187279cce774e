//! Incremental display of streamed replies.
//!
//! A [`StreamRenderer`] drains a fragment stream into an [`OutputSink`]. In
//! [`RenderMode::Raw`] every fragment is written as it arrives; in
//! [`RenderMode::Live`] the whole accumulated reply is re-rendered into a
//! refreshing region at a bounded rate.

use std::io::{self, Write};
use std::time::{Duration, Instant};

use futures_util::{Stream, StreamExt};
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use tracing::warn;

use crate::error::{Error, Result};
use crate::types::{CompletionResult, Fragment};

/// Default pause between two live repaints (about ten updates per second).
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_millis(100);

/// How streamed text reaches the sink.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RenderMode {
    /// Write each fragment as soon as it arrives.
    #[default]
    Raw,
    /// Repaint the full accumulated text, throttled.
    Live,
}

/// Destination for rendered text.
pub trait OutputSink {
    /// Append text to what is already visible.
    fn write(&mut self, text: &str) -> io::Result<()>;

    /// Replace the visible region with `text`.
    fn replace(&mut self, text: &str) -> io::Result<()>;

    /// Show a user-facing error line.
    fn diagnostic(&mut self, message: &str) -> io::Result<()> {
        writeln!(io::stderr(), "\n{message}")
    }

    /// Called once a reply is complete or has failed.
    fn finish(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<S: OutputSink + ?Sized> OutputSink for Box<S> {
    fn write(&mut self, text: &str) -> io::Result<()> {
        (**self).write(text)
    }

    fn replace(&mut self, text: &str) -> io::Result<()> {
        (**self).replace(text)
    }

    fn diagnostic(&mut self, message: &str) -> io::Result<()> {
        (**self).diagnostic(message)
    }

    fn finish(&mut self) -> io::Result<()> {
        (**self).finish()
    }
}

/// Plain writer sink, flushed after every write.
///
/// A plain terminal cannot redraw, so `replace` only emits the part of the new
/// text that extends what was already shown, and starts a new line otherwise.
pub struct TerminalSink<W: Write = io::Stdout> {
    out: W,
    shown: String,
}

impl TerminalSink<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> TerminalSink<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            shown: String::new(),
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> OutputSink for TerminalSink<W> {
    fn write(&mut self, text: &str) -> io::Result<()> {
        self.out.write_all(text.as_bytes())?;
        self.shown.push_str(text);
        self.out.flush()
    }

    fn replace(&mut self, text: &str) -> io::Result<()> {
        match text.strip_prefix(self.shown.as_str()) {
            Some(rest) => self.out.write_all(rest.as_bytes())?,
            None => {
                self.out.write_all(b"\n")?;
                self.out.write_all(text.as_bytes())?;
            }
        }
        self.shown.clear();
        self.shown.push_str(text);
        self.out.flush()
    }

    fn finish(&mut self) -> io::Result<()> {
        self.shown.clear();
        self.out.flush()
    }
}

/// Refreshing terminal region backed by an indicatif progress bar whose
/// message is the whole reply so far.
pub struct LiveSink {
    bar: ProgressBar,
    text: String,
}

impl LiveSink {
    pub fn new() -> Self {
        Self {
            bar: live_bar(),
            text: String::new(),
        }
    }
}

impl Default for LiveSink {
    fn default() -> Self {
        Self::new()
    }
}

fn live_bar() -> ProgressBar {
    let bar = ProgressBar::with_draw_target(None, ProgressDrawTarget::stdout_with_hz(10));
    bar.set_style(ProgressStyle::with_template("{msg}").expect("valid template"));
    bar
}

impl OutputSink for LiveSink {
    fn write(&mut self, text: &str) -> io::Result<()> {
        self.text.push_str(text);
        self.bar.set_message(self.text.clone());
        Ok(())
    }

    fn replace(&mut self, text: &str) -> io::Result<()> {
        self.text.clear();
        self.text.push_str(text);
        self.bar.set_message(self.text.clone());
        Ok(())
    }

    fn diagnostic(&mut self, message: &str) -> io::Result<()> {
        self.bar.suspend(|| writeln!(io::stderr(), "\n{message}"))
    }

    fn finish(&mut self) -> io::Result<()> {
        // Not a terminal: indicatif draws nothing, so print the reply once.
        if self.bar.is_hidden() && !self.text.is_empty() {
            let mut out = io::stdout();
            out.write_all(self.text.as_bytes())?;
            out.flush()?;
        }
        self.bar.finish();
        self.bar = live_bar();
        self.text.clear();
        Ok(())
    }
}

/// Drains a fragment stream into a sink.
pub struct StreamRenderer<'a, S: OutputSink + ?Sized> {
    sink: &'a mut S,
    mode: RenderMode,
    refresh_interval: Duration,
}

impl<'a, S: OutputSink + ?Sized> StreamRenderer<'a, S> {
    pub fn new(sink: &'a mut S, mode: RenderMode) -> Self {
        Self {
            sink,
            mode,
            refresh_interval: DEFAULT_REFRESH_INTERVAL,
        }
    }

    /// Minimum pause between two live repaints.
    pub fn refresh_interval(mut self, interval: Duration) -> Self {
        self.refresh_interval = interval;
        self
    }

    /// Render every fragment, then return the full text and the tools the
    /// server reported.
    ///
    /// A stream error is reported on the sink and returned; text already
    /// shown stays on screen.
    pub async fn render<St>(&mut self, mut stream: St) -> Result<CompletionResult>
    where
        St: Stream<Item = Result<Fragment>> + Unpin,
    {
        let mut text = String::new();
        let mut tools_used = Vec::new();
        let mut last_paint: Option<Instant> = None;
        let mut dirty = false;

        while let Some(item) = stream.next().await {
            let fragment = match item {
                Ok(fragment) => fragment,
                Err(e) => {
                    self.abort(&text, dirty, &e);
                    return Err(e);
                }
            };

            // The server attaches the final list once; later lists win.
            if let Some(tools) = fragment.tool_names {
                if !tools.is_empty() {
                    tools_used = tools;
                }
            }

            if fragment.text.is_empty() {
                continue;
            }
            text.push_str(&fragment.text);

            match self.mode {
                RenderMode::Raw => self.sink.write(&fragment.text)?,
                RenderMode::Live => {
                    dirty = true;
                    let due = last_paint.map_or(true, |at| at.elapsed() >= self.refresh_interval);
                    if due {
                        self.sink.replace(&text)?;
                        last_paint = Some(Instant::now());
                        dirty = false;
                    }
                }
            }
        }

        if dirty {
            self.sink.replace(&text)?;
        }
        self.sink.finish()?;

        Ok(CompletionResult { text, tools_used })
    }

    fn abort(&mut self, text: &str, dirty: bool, error: &Error) {
        let shown = if dirty { self.sink.replace(text) } else { Ok(()) };
        if let Err(e) = shown.and_then(|_| self.sink.finish()) {
            warn!(error = %e, "failed to flush partial reply");
        }
        report(&mut *self.sink, error);
    }
}

/// Show the user-facing line for `error` on the sink.
pub fn report<S: OutputSink + ?Sized>(sink: &mut S, error: &Error) {
    if let Err(e) = sink.diagnostic(&error.diagnostic()) {
        warn!(error = %e, "failed to report error");
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use futures_util::stream;

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub(crate) enum Event {
        Write(String),
        Replace(String),
        Diagnostic(String),
        Finish,
    }

    /// Sink that records every call.
    #[derive(Default)]
    pub(crate) struct RecordingSink {
        pub events: Vec<Event>,
    }

    impl RecordingSink {
        pub fn written(&self) -> String {
            self.events
                .iter()
                .filter_map(|e| match e {
                    Event::Write(t) => Some(t.as_str()),
                    _ => None,
                })
                .collect()
        }

        pub fn replaces(&self) -> Vec<&str> {
            self.events
                .iter()
                .filter_map(|e| match e {
                    Event::Replace(t) => Some(t.as_str()),
                    _ => None,
                })
                .collect()
        }
    }

    impl OutputSink for RecordingSink {
        fn write(&mut self, text: &str) -> io::Result<()> {
            self.events.push(Event::Write(text.into()));
            Ok(())
        }

        fn replace(&mut self, text: &str) -> io::Result<()> {
            self.events.push(Event::Replace(text.into()));
            Ok(())
        }

        fn diagnostic(&mut self, message: &str) -> io::Result<()> {
            self.events.push(Event::Diagnostic(message.into()));
            Ok(())
        }

        fn finish(&mut self) -> io::Result<()> {
            self.events.push(Event::Finish);
            Ok(())
        }
    }

    fn fragments(parts: &[&str]) -> Vec<Result<Fragment>> {
        parts.iter().map(|p| Ok(Fragment::text(*p))).collect()
    }

    #[tokio::test]
    async fn test_raw_writes_each_fragment_in_order() {
        let mut sink = RecordingSink::default();
        let result = StreamRenderer::new(&mut sink, RenderMode::Raw)
            .render(stream::iter(fragments(&["Hel", "lo, ", "wor", "ld"])))
            .await
            .unwrap();

        assert_eq!(result.text, "Hello, world");
        assert_eq!(
            sink.events,
            vec![
                Event::Write("Hel".into()),
                Event::Write("lo, ".into()),
                Event::Write("wor".into()),
                Event::Write("ld".into()),
                Event::Finish,
            ]
        );
    }

    #[tokio::test]
    async fn test_accumulator_same_in_both_modes() {
        let parts = ["a", "", "bc", "d\n", "é", "f"];
        for mode in [RenderMode::Raw, RenderMode::Live] {
            let mut sink = RecordingSink::default();
            let result = StreamRenderer::new(&mut sink, mode)
                .render(stream::iter(fragments(&parts)))
                .await
                .unwrap();
            assert_eq!(result.text, parts.concat(), "mode {mode:?}");
        }
    }

    #[tokio::test]
    async fn test_live_unthrottled_repaints_whole_text() {
        let mut sink = RecordingSink::default();
        StreamRenderer::new(&mut sink, RenderMode::Live)
            .refresh_interval(Duration::ZERO)
            .render(stream::iter(fragments(&["one ", "two ", "three"])))
            .await
            .unwrap();

        assert_eq!(sink.replaces(), vec!["one ", "one two ", "one two three"]);
        assert_eq!(sink.events.last(), Some(&Event::Finish));
    }

    #[tokio::test]
    async fn test_live_throttled_still_ends_with_full_text() {
        let mut sink = RecordingSink::default();
        StreamRenderer::new(&mut sink, RenderMode::Live)
            .refresh_interval(Duration::from_secs(3600))
            .render(stream::iter(fragments(&["one ", "two ", "three"])))
            .await
            .unwrap();

        // First fragment paints immediately, the rest is held until the end.
        assert_eq!(sink.replaces(), vec!["one ", "one two three"]);
        assert!(sink.written().is_empty());
    }

    #[tokio::test]
    async fn test_tools_last_non_empty_list_wins() {
        let items = vec![
            Ok(Fragment::text("a").with_tools(vec!["search".into()])),
            Ok(Fragment::text("b")),
            Ok(Fragment::text("").with_tools(vec!["search".into(), "python".into()])),
            Ok(Fragment::text("c").with_tools(vec![])),
        ];
        let mut sink = RecordingSink::default();
        let result = StreamRenderer::new(&mut sink, RenderMode::Raw)
            .render(stream::iter(items))
            .await
            .unwrap();

        assert_eq!(result.text, "abc");
        assert_eq!(result.tools_used, vec!["search", "python"]);
    }

    #[tokio::test]
    async fn test_no_tools_reported_yields_empty_list() {
        let mut sink = RecordingSink::default();
        let result = StreamRenderer::new(&mut sink, RenderMode::Raw)
            .render(stream::iter(fragments(&["x"])))
            .await
            .unwrap();
        assert!(result.tools_used.is_empty());
    }

    #[tokio::test]
    async fn test_error_mid_stream_keeps_partial_output_and_reports() {
        let items = vec![
            Ok(Fragment::text("partial ")),
            Ok(Fragment::text("answer")),
            Err(Error::RateLimited {
                message: "too many requests".into(),
                retry_after: None,
            }),
            Ok(Fragment::text("never seen")),
        ];
        let mut sink = RecordingSink::default();
        let err = StreamRenderer::new(&mut sink, RenderMode::Raw)
            .render(stream::iter(items))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::RateLimited { .. }));
        assert_eq!(sink.written(), "partial answer");
        assert_eq!(
            sink.events.last(),
            Some(&Event::Diagnostic(
                "Rate limit exceeded. Please wait and try again.".into()
            ))
        );
    }

    #[tokio::test]
    async fn test_live_error_paints_pending_text_before_diagnostic() {
        let items = vec![
            Ok(Fragment::text("first ")),
            Ok(Fragment::text("second")),
            Err(Error::Stream("connection reset".into())),
        ];
        let mut sink = RecordingSink::default();
        let err = StreamRenderer::new(&mut sink, RenderMode::Live)
            .refresh_interval(Duration::from_secs(3600))
            .render(stream::iter(items))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Stream(_)));
        assert_eq!(sink.replaces(), vec!["first ", "first second"]);
        assert!(matches!(sink.events.last(), Some(Event::Diagnostic(m)) if m.starts_with("Unexpected error")));
    }

    #[test]
    fn test_terminal_sink_write_and_replace() {
        let mut sink = TerminalSink::new(Vec::new());
        sink.write("Hello").unwrap();
        sink.replace("Hello, world").unwrap();
        sink.replace("Different").unwrap();
        let out = String::from_utf8(sink.into_inner()).unwrap();
        assert_eq!(out, "Hello, world\nDifferent");
    }
}

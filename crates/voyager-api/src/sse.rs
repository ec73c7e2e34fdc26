// Server-sent event decoding
//
// A chat reply arrives as `text/event-stream`. Each `data:` payload is
// normally a self-contained JSON object:
//
//   data: {"event":"conversation.message.delta","data":"Hel","messageId":"m1"}
//   data: {"event":"done"}
//
// or the bare `[DONE]` sentinel. Payloads that are not complete on one line
// are buffered and joined at the next blank line, as plain SSE requires; a
// complete payload arriving first flushes the buffer as its own message.
//
// The decoder guarantees at most one terminal notification (done, or the
// error that ended the stream) and nothing after it.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use bytes::{Buf, Bytes, BytesMut};
use futures_util::{Stream, StreamExt};
use serde_json::Value;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::error::Error;

const DONE_SENTINEL: &str = "[DONE]";

// ── Events ──────────────────────────────────────────────────────────

/// Discriminator carried in a payload's `event` field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SseEventKind {
    MessageDelta,
    Done,
    Error,
    Other(String),
}

impl SseEventKind {
    fn from_wire(event: &str) -> Self {
        match event {
            "conversation.message.delta" => Self::MessageDelta,
            "done" => Self::Done,
            "error" => Self::Error,
            other => Self::Other(other.to_owned()),
        }
    }
}

/// One structured payload from the chat stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseEvent {
    pub kind: SseEventKind,
    pub data: String,
    pub message_id: Option<String>,
}

impl SseEvent {
    /// Parse a JSON object with a string `event` field.
    ///
    /// `data` is taken verbatim when it is a string and re-serialized
    /// otherwise. Returns `None` for anything that is not such an object.
    pub fn parse(payload: &str) -> Option<Self> {
        let Value::Object(map) = serde_json::from_str::<Value>(payload).ok()? else {
            return None;
        };
        let kind = SseEventKind::from_wire(map.get("event")?.as_str()?);
        let data = match map.get("data") {
            None | Some(Value::Null) => String::new(),
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
        };
        let message_id = map
            .get("messageId")
            .and_then(Value::as_str)
            .map(str::to_owned);
        Some(Self {
            kind,
            data,
            message_id,
        })
    }
}

// ── Handler ─────────────────────────────────────────────────────────

/// Receives decoded stream output, in wire order.
pub trait SseHandler: Send {
    fn on_message(&mut self, chunk: String);
    fn on_done(&mut self);
    fn on_error(&mut self, error: Error);
}

type MessageFn = Box<dyn FnMut(String) + Send>;
type DoneFn = Box<dyn FnMut() + Send>;
type ErrorFn = Box<dyn FnMut(Error) + Send>;

/// Closure-based [`SseHandler`]. Unset callbacks are no-ops.
pub struct StreamCallbacks {
    on_message: MessageFn,
    on_done: Option<DoneFn>,
    on_error: Option<ErrorFn>,
}

impl StreamCallbacks {
    pub fn new(on_message: impl FnMut(String) + Send + 'static) -> Self {
        Self {
            on_message: Box::new(on_message),
            on_done: None,
            on_error: None,
        }
    }

    pub fn with_done(mut self, on_done: impl FnMut() + Send + 'static) -> Self {
        self.on_done = Some(Box::new(on_done));
        self
    }

    pub fn with_error(mut self, on_error: impl FnMut(Error) + Send + 'static) -> Self {
        self.on_error = Some(Box::new(on_error));
        self
    }
}

impl std::fmt::Debug for StreamCallbacks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamCallbacks")
            .field("on_done", &self.on_done.is_some())
            .field("on_error", &self.on_error.is_some())
            .finish_non_exhaustive()
    }
}

impl SseHandler for StreamCallbacks {
    fn on_message(&mut self, chunk: String) {
        (self.on_message)(chunk);
    }

    fn on_done(&mut self) {
        if let Some(f) = self.on_done.as_mut() {
            f();
        }
    }

    fn on_error(&mut self, error: Error) {
        if let Some(f) = self.on_error.as_mut() {
            f(error);
        }
    }
}

// ── Session state ───────────────────────────────────────────────────

/// Lifecycle flags for one streaming call, shared with its handle.
#[derive(Debug, Default)]
pub struct StreamSession {
    connected: AtomicBool,
    done: AtomicBool,
}

impl StreamSession {
    /// The response headers arrived and the body is being read.
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    /// A terminal notification was dispatched, or the stream was abandoned.
    pub fn is_done(&self) -> bool {
        self.done.load(Ordering::Acquire)
    }

    pub(crate) fn mark_connected(&self) {
        self.connected.store(true, Ordering::Release);
    }

    /// Returns `true` only for the call that performed the transition.
    fn mark_done(&self) -> bool {
        let first = !self.done.swap(true, Ordering::AcqRel);
        self.connected.store(false, Ordering::Release);
        first
    }
}

// ── Line splitting ──────────────────────────────────────────────────

/// Reassembles newline-terminated lines from arbitrary byte chunks.
#[derive(Debug, Default)]
pub struct LineSplitter {
    buf: BytesMut,
}

impl LineSplitter {
    /// Append a chunk and return every line it completed, without the
    /// `\n` / `\r\n` terminator.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buf.extend_from_slice(chunk);
        let mut lines = Vec::new();
        while let Some(pos) = self.buf.iter().position(|&b| b == b'\n') {
            let line = self.buf.split_to(pos);
            self.buf.advance(1);
            lines.push(decode_line(&line));
        }
        lines
    }

    /// Whatever is left after the source closed, if non-empty.
    pub fn finish(&mut self) -> Option<String> {
        if self.buf.is_empty() {
            return None;
        }
        let rest = self.buf.split();
        Some(decode_line(&rest))
    }
}

fn decode_line(raw: &[u8]) -> String {
    let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
    String::from_utf8_lossy(raw).into_owned()
}

// ── Decoder ─────────────────────────────────────────────────────────

/// Line-driven state machine: `Streaming` until a terminal notification,
/// then `Done`, after which all input is ignored.
pub struct SseDecoder<H> {
    handler: H,
    session: Arc<StreamSession>,
    pending: Vec<String>,
}

impl<H: SseHandler> SseDecoder<H> {
    pub fn new(handler: H) -> Self {
        Self::with_session(handler, Arc::new(StreamSession::default()))
    }

    pub fn with_session(handler: H, session: Arc<StreamSession>) -> Self {
        Self {
            handler,
            session,
            pending: Vec::new(),
        }
    }

    pub fn session(&self) -> &Arc<StreamSession> {
        &self.session
    }

    pub fn is_done(&self) -> bool {
        self.session.is_done()
    }

    pub fn into_handler(self) -> H {
        self.handler
    }

    /// Feed one line (terminator already stripped).
    pub fn feed_line(&mut self, line: &str) {
        if self.is_done() {
            return;
        }

        let line = line.trim();
        if line.is_empty() {
            self.flush();
            return;
        }
        if line.starts_with(':') {
            return;
        }
        // Some servers send the sentinel without a `data:` prefix.
        if line == DONE_SENTINEL {
            self.flush();
            self.complete();
            return;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };

        match field {
            "data" => {
                // A complete payload ends whatever was buffered before it.
                if is_self_contained(value) {
                    self.flush();
                    self.dispatch(value);
                } else {
                    self.pending.push(value.to_owned());
                }
            }
            "event" | "id" | "retry" => trace!(field, value, "ignoring sse field"),
            _ => trace!(line, "ignoring unrecognised sse line"),
        }
    }

    /// The source closed. Flushes buffered data, then reports an abrupt
    /// close if no terminal notification was dispatched.
    pub fn finish(&mut self) {
        if self.is_done() {
            return;
        }
        self.flush();
        if self.session.mark_done() {
            debug!("event stream closed without a done marker");
            self.handler.on_error(Error::stream_closed());
        }
    }

    /// The source failed. Silent once done.
    pub fn fail(&mut self, error: Error) {
        if self.session.mark_done() {
            self.pending.clear();
            self.handler.on_error(error);
        }
    }

    /// Stop without any further notification (caller cancelled).
    pub fn abandon(&mut self) {
        self.pending.clear();
        self.session.mark_done();
    }

    fn flush(&mut self) {
        if self.pending.is_empty() {
            return;
        }
        let payload = self.pending.join("\n");
        self.pending.clear();
        self.dispatch(&payload);
    }

    fn complete(&mut self) {
        if self.session.mark_done() {
            self.handler.on_done();
        }
    }

    fn dispatch(&mut self, payload: &str) {
        trace!(len = payload.len(), "sse payload");
        if payload == DONE_SENTINEL {
            self.complete();
            return;
        }

        match SseEvent::parse(payload) {
            Some(SseEvent {
                kind: SseEventKind::MessageDelta,
                data,
                ..
            }) => self.handler.on_message(data),
            Some(SseEvent {
                kind: SseEventKind::Done,
                ..
            }) => self.complete(),
            Some(SseEvent {
                kind: SseEventKind::Error,
                data,
                ..
            }) => self.handler.on_error(Error::Server {
                status: 500,
                message: if data.is_empty() {
                    "stream reported an error".into()
                } else {
                    data
                },
                details: None,
            }),
            Some(SseEvent {
                kind: SseEventKind::Other(_),
                ..
            })
            | None => self.handler.on_message(payload.to_owned()),
        }
    }
}

/// A `data:` payload that can be dispatched without waiting for the
/// frame's blank line.
fn is_self_contained(payload: &str) -> bool {
    payload == DONE_SENTINEL
        || serde_json::from_str::<Value>(payload).is_ok_and(|v| v.is_object())
}

// ── Async driver ────────────────────────────────────────────────────

/// Read `stream` to completion through `decoder`.
///
/// Returns early once the decoder is done (dropping the stream closes the
/// connection) or when `cancel` fires.
pub async fn pump<H, S, E>(
    mut decoder: SseDecoder<H>,
    stream: S,
    cancel: &CancellationToken,
) -> SseDecoder<H>
where
    H: SseHandler,
    S: Stream<Item = Result<Bytes, E>>,
    E: Into<Error>,
{
    let mut stream = std::pin::pin!(stream);
    let mut lines = LineSplitter::default();

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => {
                debug!("event stream cancelled");
                decoder.abandon();
                break;
            }
            chunk = stream.next() => match chunk {
                Some(Ok(bytes)) => {
                    for line in lines.push(&bytes) {
                        if cancel.is_cancelled() {
                            debug!("event stream cancelled mid-chunk");
                            decoder.abandon();
                            break;
                        }
                        decoder.feed_line(&line);
                        if decoder.is_done() {
                            break;
                        }
                    }
                    if decoder.is_done() {
                        break;
                    }
                }
                Some(Err(err)) => {
                    decoder.fail(err.into());
                    break;
                }
                None => {
                    if let Some(rest) = lines.finish() {
                        decoder.feed_line(&rest);
                    }
                    decoder.finish();
                    break;
                }
            }
        }
    }

    decoder
}

// ── Handle ──────────────────────────────────────────────────────────

/// Owner-side view of a background streaming call.
#[derive(Debug)]
pub struct StreamHandle {
    cancel: CancellationToken,
    session: Arc<StreamSession>,
    task: JoinHandle<()>,
}

impl StreamHandle {
    pub(crate) fn new(
        cancel: CancellationToken,
        session: Arc<StreamSession>,
        task: JoinHandle<()>,
    ) -> Self {
        Self {
            cancel,
            session,
            task,
        }
    }

    /// Stop reading and close the connection. No callback fires after
    /// this returns, unless one was already running.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_connected(&self) -> bool {
        self.session.is_connected()
    }

    pub fn is_done(&self) -> bool {
        self.session.is_done()
    }

    /// Wait for the background task to finish.
    pub async fn join(self) {
        if let Err(e) = self.task.await {
            debug!(error = %e, "stream task ended abnormally");
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::error::ErrorCategory;

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Call {
        Message(String),
        Done,
        Error(ErrorCategory),
    }

    #[derive(Debug, Default)]
    struct Recorder(Vec<Call>);

    impl SseHandler for Recorder {
        fn on_message(&mut self, chunk: String) {
            self.0.push(Call::Message(chunk));
        }
        fn on_done(&mut self) {
            self.0.push(Call::Done);
        }
        fn on_error(&mut self, error: Error) {
            self.0.push(Call::Error(error.category()));
        }
    }

    fn decode(lines: &[&str], close: bool) -> Vec<Call> {
        let mut decoder = SseDecoder::new(Recorder::default());
        for line in lines {
            decoder.feed_line(line);
        }
        if close {
            decoder.finish();
        }
        decoder.into_handler().0
    }

    fn msg(s: &str) -> Call {
        Call::Message(s.into())
    }

    #[test]
    fn deltas_then_done_sentinel() {
        let calls = decode(
            &[
                r#"data: {"event":"conversation.message.delta","data":"A"}"#,
                r#"data: {"event":"conversation.message.delta","data":"B"}"#,
                "data: [DONE]",
                r#"data: {"event":"conversation.message.delta","data":"late"}"#,
                "data: [DONE]",
            ],
            true,
        );
        assert_eq!(calls, vec![msg("A"), msg("B"), Call::Done]);
    }

    #[test]
    fn done_event_object_terminates() {
        let calls = decode(
            &[
                r#"data: {"event":"conversation.message.delta","data":"hi","messageId":"m1"}"#,
                "",
                r#"data: {"event":"done"}"#,
            ],
            true,
        );
        assert_eq!(calls, vec![msg("hi"), Call::Done]);
    }

    #[test]
    fn plain_text_degrades_to_message() {
        let calls = decode(&["data: plain text", ""], false);
        assert_eq!(calls, vec![msg("plain text")]);
    }

    #[test]
    fn early_close_reports_exactly_one_error() {
        let calls = decode(
            &[r#"data: {"event":"conversation.message.delta","data":"A"}"#],
            true,
        );
        assert_eq!(calls, vec![msg("A"), Call::Error(ErrorCategory::Network)]);
    }

    #[test]
    fn finish_twice_is_idempotent() {
        let mut decoder = SseDecoder::new(Recorder::default());
        decoder.finish();
        decoder.finish();
        decoder.fail(Error::stream_closed());
        assert_eq!(decoder.into_handler().0.len(), 1);
    }

    #[test]
    fn error_event_does_not_terminate() {
        let calls = decode(
            &[
                r#"data: {"event":"error","data":"model overloaded"}"#,
                r#"data: {"event":"conversation.message.delta","data":"x"}"#,
                "data: [DONE]",
            ],
            true,
        );
        assert_eq!(
            calls,
            vec![Call::Error(ErrorCategory::Server), msg("x"), Call::Done]
        );
    }

    #[test]
    fn unknown_event_passes_raw_payload() {
        let raw = r#"{"event":"conversation.chat.created","data":{"id":1}}"#;
        let line = format!("data: {raw}");
        let calls = decode(&[line.as_str()], false);
        assert_eq!(calls, vec![msg(raw)]);
    }

    #[test]
    fn multi_line_data_is_joined_at_blank_line() {
        let calls = decode(
            &[
                "event: message",
                "id: 7",
                ": keep-alive",
                "data: {",
                r#"data: "event":"conversation.message.delta","data":"joined"}"#,
                "",
                "data: [DONE]",
            ],
            true,
        );
        assert_eq!(calls, vec![msg("joined"), Call::Done]);
    }

    #[test]
    fn buffered_text_is_flushed_on_close() {
        let calls = decode(&["data: tail without blank line"], true);
        assert_eq!(
            calls,
            vec![
                msg("tail without blank line"),
                Call::Error(ErrorCategory::Network)
            ]
        );
    }

    #[test]
    fn plain_text_then_done_without_blank_line() {
        let calls = decode(&["data: plain text", "data: [DONE]"], true);
        assert_eq!(calls, vec![msg("plain text"), Call::Done]);
    }

    #[test]
    fn plain_text_is_flushed_before_json_delta() {
        let calls = decode(
            &[
                "data: hello",
                r#"data: {"event":"conversation.message.delta","data":"A"}"#,
                "",
            ],
            false,
        );
        assert_eq!(calls, vec![msg("hello"), msg("A")]);
    }

    #[test]
    fn bare_done_line_terminates() {
        let calls = decode(
            &[
                r#"data: {"event":"conversation.message.delta","data":"A"}"#,
                "data: partial",
                "[DONE]",
                "data: late",
            ],
            true,
        );
        assert_eq!(calls, vec![msg("A"), msg("partial"), Call::Done]);
    }

    #[test]
    fn event_parse_reads_message_id_and_non_string_data() {
        let event = SseEvent::parse(r#"{"event":"done","data":{"n":1},"messageId":"m9"}"#)
            .expect("structured");
        assert_eq!(event.kind, SseEventKind::Done);
        assert_eq!(event.data, r#"{"n":1}"#);
        assert_eq!(event.message_id.as_deref(), Some("m9"));
        assert!(SseEvent::parse("[1,2]").is_none());
        assert!(SseEvent::parse(r#"{"data":"no event"}"#).is_none());
    }

    #[test]
    fn line_splitter_handles_crlf_and_split_chunks() {
        let mut splitter = LineSplitter::default();
        assert!(splitter.push(b"data: hel").is_empty());
        assert_eq!(splitter.push(b"lo\r\n\r\ndata: x"), vec!["data: hello", ""]);
        assert_eq!(splitter.finish().as_deref(), Some("data: x"));
        assert_eq!(splitter.finish(), None);
    }

    fn chunks(parts: Vec<Result<&'static str, Error>>) -> impl Stream<Item = Result<Bytes, Error>> {
        futures_util::stream::iter(
            parts
                .into_iter()
                .map(|p| p.map(|s| Bytes::from_static(s.as_bytes()))),
        )
    }

    #[tokio::test]
    async fn pump_stops_after_done_and_ignores_later_faults() {
        let stream = chunks(vec![
            Ok("data: {\"event\":\"conversation.message.delta\",\"data\":\"A\"}\n"),
            Ok("data: [DO"),
            Ok("NE]\n\n"),
            Err(Error::stream_closed()),
        ]);
        let decoder = pump(
            SseDecoder::new(Recorder::default()),
            stream,
            &CancellationToken::new(),
        )
        .await;
        assert_eq!(decoder.into_handler().0, vec![msg("A"), Call::Done]);
    }

    #[tokio::test]
    async fn pump_reports_read_fault() {
        let stream = chunks(vec![
            Ok("data: {\"event\":\"conversation.message.delta\",\"data\":\"A\"}\n"),
            Err(Error::timeout("read timed out")),
        ]);
        let decoder = pump(
            SseDecoder::new(Recorder::default()),
            stream,
            &CancellationToken::new(),
        )
        .await;
        assert_eq!(
            decoder.into_handler().0,
            vec![msg("A"), Call::Error(ErrorCategory::Network)]
        );
    }

    /// Cancels the stream from inside its first message callback.
    struct CancelOnFirst {
        calls: Vec<Call>,
        cancel: CancellationToken,
    }

    impl SseHandler for CancelOnFirst {
        fn on_message(&mut self, chunk: String) {
            self.calls.push(Call::Message(chunk));
            self.cancel.cancel();
        }
        fn on_done(&mut self) {
            self.calls.push(Call::Done);
        }
        fn on_error(&mut self, error: Error) {
            self.calls.push(Call::Error(error.category()));
        }
    }

    #[tokio::test]
    async fn pump_stops_mid_chunk_once_cancelled() {
        let cancel = CancellationToken::new();
        let handler = CancelOnFirst {
            calls: Vec::new(),
            cancel: cancel.clone(),
        };
        let stream = chunks(vec![Ok(concat!(
            "data: {\"event\":\"conversation.message.delta\",\"data\":\"A\"}\n",
            "data: {\"event\":\"conversation.message.delta\",\"data\":\"B\"}\n",
            "data: [DONE]\n",
        ))]);
        let decoder = pump(SseDecoder::new(handler), stream, &cancel).await;
        assert!(decoder.is_done());
        assert_eq!(decoder.into_handler().calls, vec![msg("A")]);
    }

    #[tokio::test]
    async fn pump_cancel_is_silent() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let stream = chunks(vec![Ok("data: [DONE]\n")]);
        let decoder = pump(SseDecoder::new(Recorder::default()), stream, &cancel).await;
        assert!(decoder.is_done());
        assert!(decoder.into_handler().0.is_empty());
    }
}

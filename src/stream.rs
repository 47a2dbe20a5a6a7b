use futures_util::StreamExt;
use reqwest::Client;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use url::Url;

use wadoru_core::{decode, StreamMessage};

use crate::error::ApiError;
use crate::session::{SessionCmd, StreamEvent};

/// Incremental server-sent-events framing. Bytes go in as they arrive off
/// the wire; complete `data:` payloads come out. Partial frames stay
/// buffered until the blank-line terminator shows up in a later chunk.
#[derive(Debug, Default)]
pub struct SseBuffer {
    buf: Vec<u8>,
}

impl SseBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one transport chunk; returns the payloads of every frame the
    /// chunk completed, in arrival order.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buf.extend_from_slice(chunk);
        let mut payloads = Vec::new();
        while let Some((end, term)) = find_frame_end(&self.buf) {
            let frame: Vec<u8> = self.buf.drain(..end + term).collect();
            if let Some(payload) = frame_payload(&frame[..end]) {
                payloads.push(payload);
            }
        }
        payloads
    }
}

/// Locate the blank-line terminator, bare LF or CRLF, whichever comes
/// first. Returns the frame length and the terminator length.
fn find_frame_end(buf: &[u8]) -> Option<(usize, usize)> {
    let lf = buf.windows(2).position(|w| w == b"\n\n");
    let crlf = buf.windows(4).position(|w| w == b"\r\n\r\n");
    match (lf, crlf) {
        (Some(l), Some(c)) if c < l => Some((c, 4)),
        (Some(l), _) => Some((l, 2)),
        (None, Some(c)) => Some((c, 4)),
        (None, None) => None,
    }
}

/// Concatenate the frame's `data:` lines. Comment lines (`:` prefix) and
/// unknown fields are skipped per the SSE grammar.
fn frame_payload(frame: &[u8]) -> Option<String> {
    let text = String::from_utf8_lossy(frame);
    let mut data_lines = Vec::new();
    for line in text.lines() {
        let line = line.strip_suffix('\r').unwrap_or(line);
        if let Some(rest) = line.strip_prefix("data:") {
            data_lines.push(rest.strip_prefix(' ').unwrap_or(rest));
        }
    }
    if data_lines.is_empty() {
        None
    } else {
        Some(data_lines.join("\n"))
    }
}

/// Decode one frame payload into a stream message. Garbage from the wire
/// is logged and skipped so a single bad frame never takes the stream down.
fn decode_payload(payload: &str) -> Option<StreamMessage> {
    let message = decode::<StreamMessage>(payload.as_bytes());
    if message.is_none() {
        tracing::warn!(len = payload.len(), "dropping undecodable stream payload");
    }
    message
}

/// A live push stream. Dropping the handle aborts the reader task;
/// the session also closes it explicitly on fallback or teardown.
#[derive(Debug)]
pub struct StreamHandle {
    task: JoinHandle<()>,
}

impl StreamHandle {
    /// Wrap an externally spawned reader task. Custom [`crate::api::Backend`]
    /// implementations use this from `open_stream`.
    pub fn from_task(task: JoinHandle<()>) -> Self {
        Self { task }
    }

    pub fn close(&self) {
        self.task.abort();
    }
}

impl Drop for StreamHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Open the push stream and spawn a reader that forwards each decoded
/// message into the session mailbox. A payload that fails to decode is
/// logged and dropped; the stream stays open. Transport errors and normal
/// end-of-stream both surface as a single terminal [`StreamEvent::Closed`].
pub async fn open_stream(
    client: &Client,
    url: Url,
    tx: UnboundedSender<SessionCmd>,
) -> Result<StreamHandle, ApiError> {
    let response = client.get(url).send().await?;
    if response.status() == reqwest::StatusCode::NOT_FOUND {
        return Err(ApiError::LobbyGone);
    }
    if !response.status().is_success() {
        return Err(ApiError::StreamUnsupported);
    }

    let task = tokio::spawn(async move {
        let mut body = response.bytes_stream();
        let mut frames = SseBuffer::new();
        loop {
            match body.next().await {
                Some(Ok(chunk)) => {
                    for payload in frames.push(&chunk) {
                        if let Some(message) = decode_payload(&payload) {
                            if tx
                                .send(SessionCmd::StreamEvent(StreamEvent::Message(message)))
                                .is_err()
                            {
                                return;
                            }
                        }
                    }
                }
                Some(Err(err)) => {
                    tracing::warn!(%err, "push stream transport error");
                    break;
                }
                None => break,
            }
        }
        let _ = tx.send(SessionCmd::StreamEvent(StreamEvent::Closed));
    });

    Ok(StreamHandle { task })
}

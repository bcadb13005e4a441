//! Streaming client for the completion proxy.
//!
//! The proxy answers a `{model, messages}` POST with newline-delimited SSE
//! records:
//!
//! ```text
//! data: {"choices":[{"delta":{"content":"Hel"}}]}
//! data: {"choices":[{"delta":{"content":"lo"}}]}
//! data: [DONE]
//! ```
//!
//! Callers receive *cumulative* snapshots ("Hel", "Hello"), never bare deltas;
//! the transcript overwrites the in-progress turn with each one.
//!
//! `[DONE]` ends processing of the read it arrived in. Frames delivered by a
//! later read are still decoded, and the body is read until it closes.

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tokio_stream::StreamExt;
use tracing::{debug, trace};

use crate::error::ChatError;
use crate::providers::{ChatMessage, CompletionRequest, ErrorBody, StreamChunk};

/// Final text of a stream that produced no content.
pub const NO_RESPONSE: &str = "No response";

const DATA_PREFIX: &str = "data: ";
const DONE_SENTINEL: &str = "[DONE]";

// ---------------------------------------------------------------------------
// Frame decoder
// ---------------------------------------------------------------------------

/// Incremental SSE decoder.
///
/// Bytes are buffered until a `\n` arrives, so lines (and multi-byte UTF-8
/// characters) split across reads are reassembled before parsing.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
    accumulated: String,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn accumulated(&self) -> &str {
        &self.accumulated
    }

    /// Feed raw bytes, invoking `on_snapshot` with the full accumulated text
    /// after every content delta.
    pub fn feed(&mut self, bytes: &[u8], on_snapshot: &mut dyn FnMut(&str)) {
        self.buffer.extend_from_slice(bytes);

        while let Some(line_end) = self.buffer.iter().position(|b| *b == b'\n') {
            let raw: Vec<u8> = self.buffer.drain(..=line_end).collect();
            let line = String::from_utf8_lossy(&raw);
            let line = line.trim();

            let Some(data) = line.strip_prefix(DATA_PREFIX) else {
                continue;
            };
            if data == DONE_SENTINEL {
                // The rest of this read is dropped.
                self.buffer.clear();
                break;
            }
            match serde_json::from_str::<StreamChunk>(data) {
                Ok(chunk) => {
                    if let Some(content) = chunk.first_content() {
                        self.accumulated.push_str(content);
                        on_snapshot(&self.accumulated);
                    }
                }
                Err(e) => {
                    debug!(error = %e, "skipping malformed stream frame");
                }
            }
        }
    }

    /// Final text, or [`NO_RESPONSE`] when nothing was accumulated.
    pub fn finish(self) -> String {
        if self.accumulated.is_empty() {
            NO_RESPONSE.to_string()
        } else {
            self.accumulated
        }
    }
}

// ---------------------------------------------------------------------------
// Completion source seam
// ---------------------------------------------------------------------------

/// Something that can stream a completion for a prompt view.
///
/// `on_snapshot` receives monotonically growing cumulative text. The returned
/// string is the final text, [`NO_RESPONSE`] when the stream was empty.
#[async_trait]
pub trait CompletionSource: Send + Sync {
    async fn stream_completion(
        &self,
        model: &str,
        messages: &[ChatMessage],
        on_snapshot: &mut (dyn for<'a> FnMut(&'a str) + Send),
    ) -> Result<String, ChatError>;
}

// ---------------------------------------------------------------------------
// HTTP client
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct StreamingClientConfig {
    pub endpoint: String,
    pub connect_timeout: Duration,
}

impl StreamingClientConfig {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            connect_timeout: Duration::from_secs(10),
        }
    }
}

pub struct StreamingClient {
    client: Client,
    endpoint: String,
}

impl StreamingClient {
    pub fn new(config: &StreamingClientConfig) -> Result<Self, ChatError> {
        // No overall timeout: a conversation turn may stream for a long time.
        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self::with_client(client, config.endpoint.clone()))
    }

    pub fn with_client(client: Client, endpoint: impl Into<String>) -> Self {
        StreamingClient {
            client,
            endpoint: endpoint.into(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl CompletionSource for StreamingClient {
    async fn stream_completion(
        &self,
        model: &str,
        messages: &[ChatMessage],
        on_snapshot: &mut (dyn for<'a> FnMut(&'a str) + Send),
    ) -> Result<String, ChatError> {
        let request = CompletionRequest { model, messages };

        let response = self
            .client
            .post(&self.endpoint)
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.json::<ErrorBody>().await.unwrap_or_default();
            return Err(ChatError::request_failed(status.as_u16(), body.error));
        }

        // The body stream is owned here and dropped on every exit path.
        let mut stream = response.bytes_stream();
        let mut decoder = SseDecoder::new();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| ChatError::UnreadableStream(e.to_string()))?;
            decoder.feed(&chunk, &mut |snapshot: &str| {
                trace!(len = snapshot.len(), "snapshot");
                on_snapshot(snapshot);
            });
        }

        Ok(decoder.finish())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect(decoder: &mut SseDecoder, input: &[u8]) -> Vec<String> {
        let mut out = Vec::new();
        decoder.feed(input, &mut |s: &str| out.push(s.to_string()));
        out
    }

    #[test]
    fn test_cumulative_snapshots() {
        let mut d = SseDecoder::new();
        let snaps = collect(
            &mut d,
            b"data: {\"choices\":[{\"delta\":{\"content\":\"Hel\"}}]}\n\
              data: {\"choices\":[{\"delta\":{\"content\":\"lo\"}}]}\n",
        );
        assert_eq!(snaps, vec!["Hel", "Hello"]);
        assert_eq!(d.finish(), "Hello");
    }

    #[test]
    fn test_partial_line_is_retained() {
        let mut d = SseDecoder::new();
        assert!(collect(&mut d, b"data: {\"choices\":[{\"delta\":").is_empty());
        let snaps = collect(&mut d, b"{\"content\":\"Hi\"}}]}\n");
        assert_eq!(snaps, vec!["Hi"]);
    }

    #[test]
    fn test_utf8_split_across_reads() {
        let line = "data: {\"choices\":[{\"delta\":{\"content\":\"caf\u{e9}\"}}]}\n";
        let bytes = line.as_bytes();
        let split = line.find('\u{e9}').expect("char") + 1;
        let mut d = SseDecoder::new();
        assert!(collect(&mut d, &bytes[..split]).is_empty());
        assert_eq!(collect(&mut d, &bytes[split..]), vec!["caf\u{e9}"]);
    }

    #[test]
    fn test_malformed_json_is_skipped() {
        let mut d = SseDecoder::new();
        let snaps = collect(
            &mut d,
            b"data: {not json\n\
              data: {\"choices\":[{\"delta\":{\"content\":\"ok\"}}]}\n",
        );
        assert_eq!(snaps, vec!["ok"]);
    }

    #[test]
    fn test_non_data_lines_ignored() {
        let mut d = SseDecoder::new();
        let snaps = collect(
            &mut d,
            b": keep-alive\n\nevent: message\r\ndata: {\"choices\":[{\"delta\":{\"content\":\"x\"}}]}\r\n",
        );
        assert_eq!(snaps, vec!["x"]);
    }

    #[test]
    fn test_done_ends_the_current_read_only() {
        let mut d = SseDecoder::new();
        let snaps = collect(
            &mut d,
            b"data: {\"choices\":[{\"delta\":{\"content\":\"a\"}}]}\n\
              data: [DONE]\n\
              data: {\"choices\":[{\"delta\":{\"content\":\"b\"}}]}\n",
        );
        assert_eq!(snaps, vec!["a"]);
        let snaps = collect(&mut d, b"data: {\"choices\":[{\"delta\":{\"content\":\"c\"}}]}\n");
        assert_eq!(snaps, vec!["ac"]);
        assert_eq!(d.finish(), "ac");
    }

    #[test]
    fn test_done_drops_partial_line_of_same_read() {
        let mut d = SseDecoder::new();
        collect(&mut d, b"data: {\"choices\":[{\"delta\":{\"content\":\"a\"}}]}\ndata: [DONE]\ndata: {\"cho");
        let snaps = collect(&mut d, b"data: {\"choices\":[{\"delta\":{\"content\":\"b\"}}]}\n");
        assert_eq!(snaps, vec!["ab"]);
    }

    #[test]
    fn test_empty_stream_yields_no_response() {
        let mut d = SseDecoder::new();
        collect(&mut d, b"data: {\"choices\":[{\"delta\":{}}]}\ndata: [DONE]\n");
        assert_eq!(d.finish(), NO_RESPONSE);
    }

    #[test]
    fn test_empty_delta_does_not_fire_callback() {
        let mut d = SseDecoder::new();
        let snaps = collect(&mut d, b"data: {\"choices\":[{\"delta\":{\"content\":\"\"}}]}\n");
        assert!(snaps.is_empty());
    }

    #[test]
    fn test_client_config_defaults() {
        let cfg = StreamingClientConfig::new("http://localhost:3000/api/chat");
        assert_eq!(cfg.connect_timeout, Duration::from_secs(10));
        let client = StreamingClient::new(&cfg).expect("client");
        assert_eq!(client.endpoint(), "http://localhost:3000/api/chat");
    }
}

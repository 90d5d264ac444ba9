//! Stream consumer for the relay endpoint.
//!
//! One task per exchange: POST the conversation snapshot, then read the
//! response body chunk by chunk and forward decoded text over an unbounded
//! channel. The channel is the ordering guarantee: a single writer sends
//! fragments in receive order, and the session applies them synchronously.

use futures_util::StreamExt;
use tokio::sync::mpsc;

use crate::api::{RelayErrorBody, RelayRequest};
use crate::utils::url::construct_api_url;

#[derive(Clone, Debug, PartialEq)]
pub enum StreamMessage {
    Chunk(String),
    Error(String),
    End,
}

/// Everything one exchange needs. Captured before the request starts so a
/// config edit mid-flight cannot leak into the running exchange.
#[derive(Debug)]
pub struct StreamParams {
    pub client: reqwest::Client,
    pub relay_base_url: String,
    pub request: RelayRequest,
}

#[derive(Clone)]
pub struct ChatStreamService {
    tx: mpsc::UnboundedSender<StreamMessage>,
}

impl ChatStreamService {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<StreamMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Issue the relay request on a background task. Every outcome ends with
    /// a `StreamMessage::End`; errors are reported first as
    /// `StreamMessage::Error`. There is no retry and no cancellation; the
    /// receiver side simply stops listening if the UI goes away.
    pub fn spawn_stream(&self, params: StreamParams) {
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let StreamParams {
                client,
                relay_base_url,
                request,
            } = params;

            let relay_url = construct_api_url(&relay_base_url, "api/chat");
            let response = match client.post(relay_url).json(&request).send().await {
                Ok(response) => response,
                Err(err) => {
                    let _ = tx.send(StreamMessage::Error(format!("Request failed: {err}")));
                    let _ = tx.send(StreamMessage::End);
                    return;
                }
            };

            if !response.status().is_success() {
                let status = response.status();
                let body = response
                    .text()
                    .await
                    .unwrap_or_else(|_| "<no body>".to_string());
                let _ = tx.send(StreamMessage::Error(format_relay_error(status, &body)));
                let _ = tx.send(StreamMessage::End);
                return;
            }

            let mut stream = response.bytes_stream();
            let mut decoder = Utf8StreamDecoder::new();

            while let Some(chunk) = stream.next().await {
                match chunk {
                    Ok(bytes) => {
                        let text = decoder.push(&bytes);
                        if !text.is_empty() {
                            let _ = tx.send(StreamMessage::Chunk(text));
                        }
                    }
                    Err(err) => {
                        let _ = tx.send(StreamMessage::Error(format!("Stream failed: {err}")));
                        let _ = tx.send(StreamMessage::End);
                        return;
                    }
                }
            }

            let remainder = decoder.finish();
            if !remainder.is_empty() {
                let _ = tx.send(StreamMessage::Chunk(remainder));
            }
            let _ = tx.send(StreamMessage::End);
        });
    }
}

/// Incremental UTF-8 decoder. The relay slices on character boundaries, but
/// the transport may still hand us a chunk that ends mid-sequence; the
/// undecodable tail is held back until the next chunk arrives.
#[derive(Debug, Default)]
pub struct Utf8StreamDecoder {
    pending: Vec<u8>,
}

impl Utf8StreamDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, bytes: &[u8]) -> String {
        self.pending.extend_from_slice(bytes);
        match std::str::from_utf8(&self.pending) {
            Ok(_) => {
                let text = String::from_utf8_lossy(&self.pending).into_owned();
                self.pending.clear();
                text
            }
            Err(err) if err.error_len().is_none() => {
                // Incomplete trailing sequence: emit the valid prefix only.
                let valid = err.valid_up_to();
                let text = String::from_utf8_lossy(&self.pending[..valid]).into_owned();
                self.pending.drain(..valid);
                text
            }
            Err(_) => {
                // Truly invalid bytes; replace and resynchronize.
                let text = String::from_utf8_lossy(&self.pending).into_owned();
                self.pending.clear();
                text
            }
        }
    }

    /// Flush whatever is left, lossily. Called at end of stream, where an
    /// incomplete sequence can no longer be completed.
    pub fn finish(&mut self) -> String {
        let text = String::from_utf8_lossy(&self.pending).into_owned();
        self.pending.clear();
        text
    }
}

/// Render a non-2xx relay response for the error banner. The relay sends
/// `{error, details?}` JSON; anything else is shown verbatim.
pub fn format_relay_error(status: reqwest::StatusCode, body: &str) -> String {
    if let Ok(parsed) = serde_json::from_str::<RelayErrorBody>(body) {
        return match parsed.details {
            Some(details) => format!("{} ({})", parsed.error, details),
            None => parsed.error,
        };
    }

    let trimmed = body.trim();
    if trimmed.is_empty() {
        format!("Request failed with status {status}")
    } else {
        format!("Request failed with status {status}: {trimmed}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decoder_passes_whole_chunks_through() {
        let mut decoder = Utf8StreamDecoder::new();
        assert_eq!(decoder.push(b"Hel"), "Hel");
        assert_eq!(decoder.push(b"lo "), "lo ");
        assert_eq!(decoder.finish(), "");
    }

    #[test]
    fn decoder_holds_back_split_multibyte_sequence() {
        let text = "héllo";
        let bytes = text.as_bytes();
        // Split inside the two-byte 'é'.
        let mut decoder = Utf8StreamDecoder::new();
        let first = decoder.push(&bytes[..2]);
        let second = decoder.push(&bytes[2..]);
        assert_eq!(first, "h");
        assert_eq!(format!("{first}{second}"), text);
    }

    #[test]
    fn decoder_replaces_invalid_bytes() {
        let mut decoder = Utf8StreamDecoder::new();
        let text = decoder.push(&[0x68, 0xFF, 0x69]);
        assert!(text.starts_with('h'));
        assert!(text.ends_with('i'));
    }

    #[test]
    fn finish_flushes_incomplete_tail_lossily() {
        let mut decoder = Utf8StreamDecoder::new();
        let bytes = "é".as_bytes();
        assert_eq!(decoder.push(&bytes[..1]), "");
        assert_eq!(decoder.finish(), "\u{FFFD}");
    }

    #[test]
    fn relay_error_body_is_summarized() {
        let body = r#"{"error": "Internal server error", "details": "model overloaded"}"#;
        let formatted = format_relay_error(reqwest::StatusCode::INTERNAL_SERVER_ERROR, body);
        assert_eq!(formatted, "Internal server error (model overloaded)");
    }

    #[test]
    fn missing_credentials_body_has_no_details() {
        let body = r#"{"error": "API key and model are required"}"#;
        let formatted = format_relay_error(reqwest::StatusCode::BAD_REQUEST, body);
        assert_eq!(formatted, "API key and model are required");
    }

    #[test]
    fn non_json_bodies_are_shown_verbatim() {
        let formatted = format_relay_error(reqwest::StatusCode::BAD_GATEWAY, "upstream gone");
        assert!(formatted.contains("502"));
        assert!(formatted.contains("upstream gone"));
    }
}

//! Timed chunk emission.
//!
//! The backend hands the relay a complete text; the "stream" the client sees
//! is synthesized here by slicing that text into fixed-size character chunks
//! and yielding between writes. The produced stream is finite, single
//! consumer, and not restartable.

use std::convert::Infallible;
use std::time::Duration;

use axum::body::Bytes;
use futures_util::{stream, Stream};
use tokio::time::Instant;

/// Characters per emitted chunk.
pub const CHUNK_SIZE: usize = 3;

/// Pause between consecutive chunk writes.
pub const STREAM_DELAY: Duration = Duration::from_millis(10);

/// Upper bound on how long one relay response may keep streaming. Past the
/// deadline the stream ends mid-text with no marker, so clients cannot tell
/// truncation from natural completion.
pub const MAX_STREAM_DURATION: Duration = Duration::from_secs(30);

/// Split on character boundaries, `size` characters per slice.
pub fn chunk_text(text: &str, size: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    for ch in text.chars() {
        current.push(ch);
        if current.chars().count() == size {
            chunks.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

/// Lazily emit `text` as paced byte chunks. The first chunk goes out
/// immediately; each subsequent chunk waits [`STREAM_DELAY`]-style `delay`.
/// Emission stops silently once `deadline` has passed.
pub fn paced_stream(
    text: String,
    delay: Duration,
    deadline: Instant,
) -> impl Stream<Item = Result<Bytes, Infallible>> + Send {
    let chunks: std::collections::VecDeque<String> = chunk_text(&text, CHUNK_SIZE).into();
    stream::unfold((chunks, true), move |(mut chunks, first)| async move {
        if !first {
            tokio::time::sleep(delay).await;
        }
        if Instant::now() >= deadline {
            return None;
        }
        let chunk = chunks.pop_front()?;
        Some((Ok(Bytes::from(chunk)), (chunks, false)))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::StreamExt;

    #[test]
    fn hello_world_slices_as_documented() {
        assert_eq!(
            chunk_text("Hello world", CHUNK_SIZE),
            vec!["Hel", "lo ", "wor", "ld"]
        );
    }

    #[test]
    fn chunk_count_is_ceil_of_length_over_size() {
        for text in ["", "a", "ab", "abc", "abcd", "The quick brown fox jumps"] {
            let expected = text.chars().count().div_ceil(CHUNK_SIZE);
            assert_eq!(chunk_text(text, CHUNK_SIZE).len(), expected, "text: {text:?}");
        }
    }

    #[test]
    fn concatenated_chunks_reconstruct_the_text() {
        let text = "Streaming is wholly synthetic here.";
        assert_eq!(chunk_text(text, CHUNK_SIZE).concat(), text);
    }

    #[test]
    fn chunking_respects_character_boundaries() {
        let text = "héllo wörld ✓";
        let chunks = chunk_text(text, CHUNK_SIZE);
        assert_eq!(chunks.concat(), text);
        for chunk in &chunks {
            assert!(chunk.chars().count() <= CHUNK_SIZE);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn stream_emits_all_chunks_in_order() {
        let deadline = Instant::now() + MAX_STREAM_DURATION;
        let stream = paced_stream("Hello world".to_string(), STREAM_DELAY, deadline);
        let collected: Vec<_> = stream.map(|item| item.expect("infallible")).collect().await;

        let texts: Vec<String> = collected
            .iter()
            .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
            .collect();
        assert_eq!(texts, vec!["Hel", "lo ", "wor", "ld"]);
    }

    #[tokio::test(start_paused = true)]
    async fn expired_deadline_truncates_the_stream() {
        let deadline = Instant::now();
        tokio::time::advance(Duration::from_millis(1)).await;
        let stream = paced_stream("never delivered".to_string(), STREAM_DELAY, deadline);
        let collected: Vec<_> = stream.collect().await;
        assert!(collected.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn mid_stream_deadline_cuts_without_error() {
        // Deadline between the second and third chunk.
        let deadline = Instant::now() + Duration::from_millis(15);
        let stream = paced_stream("Hello world".to_string(), STREAM_DELAY, deadline);
        let collected: Vec<_> = stream.map(|item| item.expect("infallible")).collect().await;
        assert_eq!(collected.len(), 2);
    }
}

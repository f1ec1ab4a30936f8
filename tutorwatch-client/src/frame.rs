//! Splits the raw stream body into message frames.
//!
//! Server-Sent Events bodies go through `eventsource-stream`; each event's
//! `data` is one frame. A bare JSON line between SSE events is a frame of
//! its own. Any other body is read as newline-delimited JSON.

use std::collections::VecDeque;
use std::fmt::Display;

use eventsource_stream::Eventsource;
use futures_util::stream::{self, BoxStream, Stream, StreamExt};
use tracing::trace;

/// Decoded frames, or the read error that ended the body.
pub type FrameStream = BoxStream<'static, Result<String, String>>;

/// Frames of an SSE body. Comments and events without data are skipped.
pub fn sse_frames<S, B, E>(body: S) -> FrameStream
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: Display + Send + 'static,
{
    let mut normalizer = SseLineNormalizer::default();
    lines(body)
        .map(move |line| line.map(|line| normalizer.rewrite(&line)))
        .eventsource()
        .filter_map(|event| async move {
            match event {
                Ok(event) if event.data.is_empty() => {
                    trace!(event = %event.event, "Skipping event without data");
                    None
                }
                Ok(event) => Some(Ok(event.data)),
                Err(e) => Some(Err(e.to_string())),
            }
        })
        .boxed()
}

/// Frames of a newline-delimited JSON body.
pub fn ndjson_frames<S, B, E>(body: S) -> FrameStream
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: Display + Send + 'static,
{
    lines(body)
        .filter_map(|line| async move {
            match line {
                Ok(line) => {
                    let line = line.trim();
                    (!line.is_empty()).then(|| Ok(line.to_string()))
                }
                Err(e) => Some(Err(e)),
            }
        })
        .boxed()
}

/// Complete lines of a body, terminators removed, blank lines kept.
fn lines<S, B, E>(body: S) -> FrameStream
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: Display + Send + 'static,
{
    let state = (body.boxed(), LineDecoder::new(), VecDeque::new(), false);
    stream::unfold(state, |(mut body, mut decoder, mut ready, mut done)| async move {
        loop {
            if let Some(line) = ready.pop_front() {
                return Some((Ok(line), (body, decoder, ready, done)));
            }
            if done {
                return None;
            }
            match body.next().await {
                Some(Ok(chunk)) => ready.extend(decoder.push(chunk.as_ref())),
                Some(Err(e)) => {
                    done = true;
                    return Some((Err(e.to_string()), (body, decoder, ready, done)));
                }
                None => {
                    done = true;
                    ready.extend(decoder.finish());
                }
            }
        }
    })
    .boxed()
}

/// Rewrites a bare JSON line outside any SSE event into a one-line event,
/// and passes every other line through unchanged.
#[derive(Debug, Default)]
struct SseLineNormalizer {
    in_event: bool,
}

impl SseLineNormalizer {
    fn rewrite(&mut self, line: &str) -> String {
        if line.is_empty() {
            self.in_event = false;
        } else if line.starts_with(':') {
            // comments neither open nor close an event
        } else if !self.in_event && line.trim_start().starts_with('{') {
            trace!("Accepting bare JSON line as a frame");
            return format!("data: {}\n\n", line.trim());
        } else {
            self.in_event = true;
        }
        format!("{line}\n")
    }
}

/// Incremental line splitter fed with arbitrary byte chunks.
///
/// A line is only decoded once complete, so multi-byte characters split
/// across chunks survive. `\n` and `\r\n` both end a line.
#[derive(Debug, Default)]
pub struct LineDecoder {
    pending: Vec<u8>,
}

impl LineDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds a chunk and returns every line it completes.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(chunk);

        let mut lines = Vec::new();
        while let Some(pos) = self.pending.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=pos).collect();
            lines.push(Self::decode(&line[..line.len() - 1]));
        }
        lines
    }

    /// Returns the unterminated last line once the body has ended.
    pub fn finish(&mut self) -> Option<String> {
        if self.pending.is_empty() {
            return None;
        }
        let rest = std::mem::take(&mut self.pending);
        Some(Self::decode(&rest))
    }

    fn decode(line: &[u8]) -> String {
        let line = line.strip_suffix(b"\r").unwrap_or(line);
        String::from_utf8_lossy(line).into_owned()
    }
}

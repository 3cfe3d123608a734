use std::borrow::Cow;

use bytes::Bytes;
use futures::{Stream, StreamExt};
use serde_json::Value;
use tracing::{debug, warn};

use crate::errors::CurioResult;
use crate::types::{SearchResult, StreamMetadata};

const DATA_PREFIX: &str = "data: ";
const DONE_SENTINEL: &str = "[DONE]";

/// Fully assembled assistant text plus the metadata that arrived alongside it
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DecodedStream {
    pub content: String,
    pub metadata: StreamMetadata,
}

/// Incremental decoder for a `data: `-line event stream of chat-completion chunks.
///
/// Bytes may be pushed in arbitrary pieces; lines are reassembled across
/// chunk boundaries before they are interpreted.
#[derive(Debug, Default)]
pub struct StreamDecoder {
    buffer: Vec<u8>,
    content: String,
    metadata: StreamMetadata,
    finished: bool,
    skipped_payloads: usize,
    lossy_lines: usize,
}

impl StreamDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// True once the `[DONE]` sentinel has been seen
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// The content accumulated so far
    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn metadata(&self) -> &StreamMetadata {
        &self.metadata
    }

    /// Number of payloads dropped because they were not valid JSON
    pub fn skipped_payloads(&self) -> usize {
        self.skipped_payloads
    }

    /// Number of lines that held invalid UTF-8. Such lines are still decoded,
    /// with the bad bytes replaced by U+FFFD.
    pub fn lossy_lines(&self) -> usize {
        self.lossy_lines
    }

    /// Feeds a chunk of the response body. `on_content` receives the whole
    /// accumulated content each time a fragment is appended.
    pub fn push(&mut self, chunk: &[u8], mut on_content: impl FnMut(&str)) {
        if self.finished {
            return;
        }
        self.buffer.extend_from_slice(chunk);

        while let Some(newline_pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=newline_pos).collect();
            if self.process_line(&line[..newline_pos]) {
                on_content(&self.content);
            }
            if self.finished {
                self.buffer.clear();
                return;
            }
        }
    }

    /// Processes a trailing line left without a newline and returns the result
    pub fn finish(mut self, mut on_content: impl FnMut(&str)) -> DecodedStream {
        if !self.finished && !self.buffer.is_empty() {
            let line = std::mem::take(&mut self.buffer);
            if self.process_line(&line) {
                on_content(&self.content);
            }
        }

        DecodedStream {
            content: self.content,
            metadata: self.metadata,
        }
    }

    /// Returns true when the line appended content
    fn process_line(&mut self, raw: &[u8]) -> bool {
        let line = String::from_utf8_lossy(raw);
        if let Cow::Owned(_) = line {
            warn!("Stream line is not valid UTF-8, decoding it with replacement characters");
            self.lossy_lines += 1;
        }
        let line = line.strip_suffix('\r').unwrap_or(&line);

        let payload = match line.strip_prefix(DATA_PREFIX) {
            Some(payload) => payload,
            None => return false,
        };

        if payload == DONE_SENTINEL {
            self.finished = true;
            return false;
        }

        match serde_json::from_str::<Value>(payload) {
            Ok(chunk) => self.apply_chunk(&chunk),
            Err(e) => {
                debug!(error = %e, "Skipping malformed stream payload");
                self.skipped_payloads += 1;
                false
            }
        }
    }

    fn apply_chunk(&mut self, chunk: &Value) -> bool {
        let Some(object) = chunk.as_object() else {
            debug!("Ignoring non-object stream payload");
            return false;
        };

        let mut appended = false;
        let piece = object
            .get("choices")
            .and_then(|choices| choices.get(0))
            .and_then(|choice| choice.get("delta"))
            .and_then(|delta| delta.get("content"))
            .and_then(Value::as_str);
        if let Some(piece) = piece {
            if !piece.is_empty() {
                self.content.push_str(piece);
                appended = true;
            }
        }

        if let Some(results) = object.get("search_results") {
            match serde_json::from_value::<Option<Vec<SearchResult>>>(results.clone()) {
                Ok(results) => self.metadata.search_results = results,
                Err(e) => warn!(error = %e, "Ignoring unreadable search_results"),
            }
        }

        if let Some(usage) = object.get("usage") {
            self.metadata.usage = if usage.is_null() {
                None
            } else {
                Some(usage.clone())
            };
        }

        appended
    }
}

/// Drives a [`StreamDecoder`] over a byte stream until `[DONE]` or end of stream.
///
/// `observer`, when given, is called with the partial content after every
/// appended fragment. A read error aborts decoding.
pub async fn decode_stream<S>(
    mut stream: S,
    mut observer: Option<&mut dyn FnMut(&str)>,
) -> CurioResult<DecodedStream>
where
    S: Stream<Item = CurioResult<Bytes>> + Unpin,
{
    let mut decoder = StreamDecoder::new();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        decoder.push(&chunk, |content| notify(&mut observer, content));
        if decoder.is_finished() {
            debug!("Received end-of-stream sentinel");
            break;
        }
    }

    if decoder.skipped_payloads() > 0 {
        debug!(skipped = decoder.skipped_payloads(), "Finished decoding with skipped payloads");
    }

    Ok(decoder.finish(|content| notify(&mut observer, content)))
}

fn notify(observer: &mut Option<&mut dyn FnMut(&str)>, content: &str) {
    if let Some(observer) = observer.as_mut() {
        observer(content);
    }
}

//! Incremental decoder for `data: <json>` framed completion streams.
use log::trace;
use serde::Deserialize;
use thiserror::Error;

pub const DONE_SENTINEL: &str = "[DONE]";
const DATA_PREFIX: &str = "data: ";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StreamError {
    #[error("stream ended before the [DONE] sentinel")]
    MissingSentinel,
    #[error("stream ended with an undecodable line: {line}")]
    Truncated { line: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    Delta(String),
    Done,
}

#[derive(Debug, Deserialize)]
struct Chunk {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    #[serde(default)]
    delta: Delta,
}

#[derive(Debug, Deserialize, Default)]
struct Delta {
    #[serde(default)]
    content: Option<String>,
}

/// Buffers raw text until whole lines are available.
///
/// A `data:` line whose payload is not yet valid JSON is pushed back and
/// retried once more text arrives.
#[derive(Debug, Default, Clone)]
pub struct StreamDecoder {
    buffer: String,
    done: bool,
}

impl StreamDecoder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn is_done(&self) -> bool {
        self.done
    }

    /// Unconsumed bytes, including any re-buffered partial payload.
    #[must_use]
    pub fn pending(&self) -> &str {
        &self.buffer
    }

    pub fn feed(&mut self, text: &str) -> Vec<StreamEvent> {
        let mut events = Vec::new();
        if self.done {
            return events;
        }
        self.buffer.push_str(text);

        while let Some(newline) = self.buffer.find('\n') {
            let raw: String = self.buffer.drain(..=newline).collect();
            let line = raw.trim_end_matches('\n').trim_end_matches('\r');
            if line.starts_with(':') || line.trim().is_empty() {
                continue;
            }
            let Some(payload) = line.strip_prefix(DATA_PREFIX) else {
                continue;
            };
            let payload = payload.trim();
            if payload == DONE_SENTINEL {
                self.done = true;
                events.push(StreamEvent::Done);
                break;
            }
            match serde_json::from_str::<Chunk>(payload) {
                Ok(chunk) => {
                    if let Some(content) = chunk
                        .choices
                        .into_iter()
                        .next()
                        .and_then(|choice| choice.delta.content)
                        .filter(|content| !content.is_empty())
                    {
                        events.push(StreamEvent::Delta(content));
                    }
                }
                Err(err) => {
                    trace!("re-buffering partial stream line: {err}");
                    self.buffer.insert_str(0, &raw);
                    break;
                }
            }
        }
        events
    }

    /// Close the stream once the source has no more bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the sentinel never arrived.
    pub fn finish(self) -> Result<(), StreamError> {
        if self.done {
            return Ok(());
        }
        let leftover = self.buffer.trim();
        if leftover.is_empty() {
            Err(StreamError::MissingSentinel)
        } else {
            Err(StreamError::Truncated {
                line: leftover.to_string(),
            })
        }
    }
}

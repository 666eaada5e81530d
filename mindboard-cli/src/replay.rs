//! Offline text generator that replays recorded completion streams.
use std::collections::VecDeque;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use thiserror::Error;

use mindboard_game::chat::{ChatRequest, TextGenerator};
use mindboard_game::stream::{DONE_SENTINEL, StreamDecoder, StreamError, StreamEvent};

#[derive(Debug, Error)]
pub enum ReplayError {
    #[error("recorded transcript has no replies left")]
    Exhausted,
    #[error(transparent)]
    Stream(#[from] StreamError),
}

/// Each reply is the raw stream text up to and including its `[DONE]` line.
#[derive(Debug, Clone, Default)]
pub struct ReplayGenerator {
    replies: VecDeque<String>,
    chunk_size: usize,
}

impl ReplayGenerator {
    pub const DEFAULT_CHUNK: usize = 24;

    pub fn from_recording(recording: &str) -> Self {
        let mut replies = VecDeque::new();
        let mut current = String::new();
        for line in recording.split_inclusive('\n') {
            current.push_str(line);
            let payload = line.trim().strip_prefix("data:").map(str::trim);
            if payload == Some(DONE_SENTINEL) {
                replies.push_back(std::mem::take(&mut current));
            }
        }
        if !current.trim().is_empty() {
            replies.push_back(current);
        }
        Self {
            replies,
            chunk_size: Self::DEFAULT_CHUNK,
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let recording = fs::read_to_string(path)
            .with_context(|| format!("failed to read chat replay {}", path.display()))?;
        Ok(Self::from_recording(&recording))
    }

    #[cfg(test)]
    #[must_use]
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    pub fn remaining(&self) -> usize {
        self.replies.len()
    }
}

/// Split on char boundaries into pieces of at most `size` bytes.
fn chunks(text: &str, size: usize) -> impl Iterator<Item = &str> {
    let mut rest = text;
    std::iter::from_fn(move || {
        if rest.is_empty() {
            return None;
        }
        let mut end = size.min(rest.len());
        while !rest.is_char_boundary(end) {
            end += 1;
        }
        let (head, tail) = rest.split_at(end);
        rest = tail;
        Some(head)
    })
}

impl TextGenerator for ReplayGenerator {
    type Error = ReplayError;

    fn stream(
        &mut self,
        _request: &ChatRequest,
        on_delta: &mut dyn FnMut(&str),
    ) -> Result<(), Self::Error> {
        let reply = self.replies.pop_front().ok_or(ReplayError::Exhausted)?;
        let mut decoder = StreamDecoder::new();
        for piece in chunks(&reply, self.chunk_size) {
            for event in decoder.feed(piece) {
                if let StreamEvent::Delta(text) = event {
                    on_delta(&text);
                }
            }
        }
        decoder.finish()?;
        Ok(())
    }
}

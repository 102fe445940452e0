//! Recording and replay of chunk sequences.

use std::time::Instant;

use serde::{Deserialize, Serialize};
use weft_types::StreamChunk;

/// One recorded chunk with its arrival time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordedChunk {
    /// The chunk as received.
    pub chunk: StreamChunk,
    /// Milliseconds since recording started.
    pub relative_timestamp_ms: u64,
}

/// An ordered chunk log that replays into an identical processor state.
///
/// Serialises as `{"entries": [{"chunk": …, "relativeTimestampMs": n}]}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Recording {
    /// Chunks in arrival order.
    pub entries: Vec<RecordedChunk>,
}

impl Recording {
    /// The recorded chunks in order.
    pub fn chunks(&self) -> impl Iterator<Item = &StreamChunk> {
        self.entries.iter().map(|entry| &entry.chunk)
    }

    /// Number of recorded chunks.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<StreamChunk> for Recording {
    /// Build a recording with zero relative timestamps.
    fn from_iter<I: IntoIterator<Item = StreamChunk>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|chunk| RecordedChunk {
                    chunk,
                    relative_timestamp_ms: 0,
                })
                .collect(),
        }
    }
}

/// Appends chunks to a recording, timing them from creation.
#[derive(Debug)]
pub(crate) struct Recorder {
    started: Instant,
    recording: Recording,
}

impl Recorder {
    pub(crate) fn new() -> Self {
        Self {
            started: Instant::now(),
            recording: Recording::default(),
        }
    }

    pub(crate) fn record(&mut self, chunk: &StreamChunk) {
        let elapsed = u64::try_from(self.started.elapsed().as_millis()).unwrap_or(u64::MAX);
        self.recording.entries.push(RecordedChunk {
            chunk: chunk.clone(),
            relative_timestamp_ms: elapsed,
        });
    }

    pub(crate) fn recording(&self) -> &Recording {
        &self.recording
    }
}

//! Chunk sources for testing.
//!
//! Available behind the `test-utils` feature flag.

use std::collections::VecDeque;
use std::future::Future;
use std::sync::{Mutex, PoisonError};

use weft_types::StreamChunk;

use crate::source::{ChunkSource, ChunkStream, ModelRequest, SourceError};

/// A source that replays pre-scripted rounds in order and records every
/// request it receives.
///
/// Running out of rounds is a [`SourceError::RequestFailed`].
#[derive(Debug, Default)]
pub struct ScriptedSource {
    rounds: Mutex<VecDeque<Vec<StreamChunk>>>,
    requests: Mutex<Vec<ModelRequest>>,
}

impl ScriptedSource {
    /// A source answering with `rounds`, one per request.
    pub fn new(rounds: impl IntoIterator<Item = Vec<StreamChunk>>) -> Self {
        Self {
            rounds: Mutex::new(rounds.into_iter().collect()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Requests received so far.
    pub fn requests(&self) -> Vec<ModelRequest> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Rounds not yet handed out.
    pub fn remaining(&self) -> usize {
        self.rounds.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

impl ChunkSource for ScriptedSource {
    fn stream(
        &self,
        request: ModelRequest,
    ) -> impl Future<Output = Result<ChunkStream, SourceError>> + Send {
        let round = self
            .rounds
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front();
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request);
        async move {
            match round {
                Some(chunks) => Ok(Box::pin(futures::stream::iter(chunks)) as ChunkStream),
                None => Err(SourceError::RequestFailed("no scripted round left".into())),
            }
        }
    }
}

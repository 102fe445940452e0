//! Where model rounds come from.
//!
//! The [`ChunkSource`] trait uses RPITIT and is not object-safe;
//! [`AgentLoop`](crate::AgentLoop) is generic over it instead.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use futures::Stream;
use thiserror::Error;
use weft_tool::ToolDefinition;
use weft_types::{ModelMessage, StreamChunk};

/// One model round as a stream of chunks.
///
/// Upstream failures after the stream started arrive as `error` chunks.
pub type ChunkStream = Pin<Box<dyn Stream<Item = StreamChunk> + Send>>;

/// Everything a source needs to start one model round.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelRequest {
    /// Model identifier. Empty means the source's default.
    pub model: String,
    /// System prompt, if any.
    pub system_prompt: Option<String>,
    /// Conversation so far.
    pub messages: Vec<ModelMessage>,
    /// Tools the model may call.
    pub tools: Vec<ToolDefinition>,
}

/// Errors from a chunk source before any chunk was produced.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum SourceError {
    /// The request could not be sent.
    #[error("request failed: {0}")]
    RequestFailed(String),

    /// Catch-all for other errors.
    #[error("{0}")]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

/// Produces one chunk stream per model round.
pub trait ChunkSource: Send + Sync {
    /// Start a round for `request`.
    fn stream(
        &self,
        request: ModelRequest,
    ) -> impl Future<Output = Result<ChunkStream, SourceError>> + Send;
}

impl<T: ChunkSource> ChunkSource for Arc<T> {
    fn stream(
        &self,
        request: ModelRequest,
    ) -> impl Future<Output = Result<ChunkStream, SourceError>> + Send {
        (**self).stream(request)
    }
}

//! Loop errors.

use thiserror::Error;
use weft_stream::ProcessorError;

use crate::source::SourceError;

/// Errors that stop an agent loop call.
///
/// Tool failures and upstream `error` chunks are not errors here; they end
/// up in the conversation and in [`LoopStop`](crate::LoopStop).
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum LoopError {
    /// The chunk source failed to start a round.
    #[error("chunk source failed: {0}")]
    Source(#[from] SourceError),

    /// An approval or tool result was rejected by the processor.
    #[error(transparent)]
    Processor(#[from] ProcessorError),

    /// `resume` was called while the loop was not waiting for input.
    #[error("loop is not awaiting input")]
    NotAwaitingInput,
}

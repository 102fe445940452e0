//! Processor errors.

use thiserror::Error;
use weft_types::ToolCallState;

/// Errors from externally driven processor operations.
///
/// Chunk processing itself never fails: malformed or out-of-order chunks
/// are logged and ignored.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProcessorError {
    /// No tool-call part has this id.
    #[error("tool call not found: {0}")]
    ToolCallNotFound(String),

    /// No tool-call part carries this approval id.
    #[error("approval not found: {0}")]
    ApprovalNotFound(String),

    /// The approval was already answered.
    #[error("approval {0} already resolved")]
    ApprovalAlreadyResolved(String),

    /// The tool call cannot move to the requested state.
    #[error("tool call {id} cannot move from {from:?} to {to:?}")]
    InvalidTransition {
        /// The tool call.
        id: String,
        /// Current state.
        from: ToolCallState,
        /// Requested state.
        to: ToolCallState,
    },
}

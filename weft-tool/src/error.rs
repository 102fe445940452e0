//! Tool errors.
//!
//! Every variant ends up as data: [`ToolCallManager`](crate::ToolCallManager)
//! turns it into an error tool result instead of propagating it.

use thiserror::Error;

/// Errors from resolving, validating or running a tool call.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum ToolError {
    /// No tool with this name is available this turn.
    #[error("tool not found: {0}")]
    NotFound(String),

    /// The accumulated arguments are not valid JSON.
    #[error("invalid tool arguments: {0}")]
    Parse(String),

    /// The input validator rejected the arguments.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The executor failed.
    #[error("execution failed: {0}")]
    ExecutionFailed(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// The output validator rejected the executor's output.
    #[error("invalid output: {0}")]
    InvalidOutput(String),
}

impl ToolError {
    /// An execution failure with a plain message.
    pub fn failed(message: impl Into<String>) -> Self {
        ToolError::ExecutionFailed(message.into().into())
    }
}

/// A validator's rejection.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ValidationError {
    /// What was wrong.
    pub message: String,
}

impl ValidationError {
    /// Create a validation error.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

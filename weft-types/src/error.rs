//! Errors shared across the weft crates.

use thiserror::Error;

/// Tool-call accumulation errors.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AccumulatorError {
    /// An index already bound to one call id was reused for another
    /// within the same turn.
    #[error("tool call index {index} already bound to {existing}, got {incoming}")]
    IndexConflict {
        /// The reused index.
        index: usize,
        /// Id the index is bound to.
        existing: String,
        /// Id carried by the rejected fragment.
        incoming: String,
    },
}

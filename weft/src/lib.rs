#![deny(missing_docs)]
//! # weft: umbrella crate
//!
//! A single import surface for the weft crates. Re-exports each crate
//! behind a feature flag, plus a `prelude` for the common path.
//!
//! | Feature | Crates |
//! |---------|--------|
//! | `core` (default) | `weft-types`, `weft-stream` |
//! | `tools` | adds `weft-tool` |
//! | `agent` | adds `weft-loop` |

#[cfg(feature = "agent")]
pub use weft_loop;
#[cfg(feature = "core")]
pub use weft_stream;
#[cfg(feature = "tools")]
pub use weft_tool;
#[cfg(feature = "core")]
pub use weft_types;

/// Common imports for streaming conversations.
pub mod prelude {
    #[cfg(feature = "core")]
    pub use weft_types::{
        ChunkKind, FinishReason, MessagePart, ModelMessage, StreamChunk, ToolCallPart,
        ToolCallState, UIMessage, model_to_ui_messages, ui_to_model_messages,
    };

    #[cfg(feature = "core")]
    pub use weft_stream::{
        ChunkStrategy, ProcessorConfig, ProcessorError, Recording, StreamObserver,
        StreamProcessor, parse_partial_json,
    };

    #[cfg(feature = "tools")]
    pub use weft_tool::{Tool, ToolCallManager, ToolError, ToolExecutionEvent};

    #[cfg(feature = "agent")]
    pub use weft_loop::{
        AgentLoop, AgentLoopStrategy, ChunkSource, LoopConfig, LoopError, LoopOutcome, LoopStop,
        ModelRequest, combine_strategies, max_iterations, until_finish_reason,
    };
}

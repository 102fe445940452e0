//! # weft-types: Protocol types for streamed conversations
//!
//! The vocabulary every other weft crate speaks:
//!
//! | Type | What it is |
//! |------|-----------|
//! | [`StreamChunk`] | One typed event of a model response |
//! | [`UIMessage`], [`MessagePart`] | Renderable conversation state |
//! | [`ToolCallState`] | The monotonic tool-call lifecycle |
//! | [`ModelMessage`] | The shape a model consumes |
//! | [`ToolCallAccumulator`] | Per-turn reassembly of tool-call fragments |
//!
//! Conversion between the UI and model shapes lives in [`convert`].
//! Chunk builders for tests live in `test_utils` behind the `test-utils`
//! feature.

#![deny(missing_docs)]

pub mod accumulator;
pub mod chunk;
pub mod convert;
pub mod error;
pub mod message;

#[cfg(feature = "test-utils")]
pub mod test_utils;

pub use accumulator::{AccumulatedToolCall, ToolCallAccumulator};
pub use chunk::{
    ApprovalMeta, ChunkKind, ChunkRole, FinishReason, StreamChunk, ToolCallFragment, Usage,
    now_millis,
};
pub use convert::{model_to_ui_messages, output_to_text, ui_to_model_messages};
pub use error::AccumulatorError;
pub use message::{
    ApprovalRequest, MessagePart, ModelMessage, ModelRole, ModelToolCall, ToolCallPart,
    ToolCallState, ToolResultPart, ToolResultState, UIMessage, UiRole,
};

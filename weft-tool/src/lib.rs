//! # weft-tool: Tools and the tool-call manager
//!
//! A [`Tool`] describes something the model can call: its definition, an
//! optional approval gate, optional input/output [`Validator`]s and an
//! optional [`ToolExecutor`]. Tools without an executor are resolved by the
//! client.
//!
//! [`ToolCallManager`] reassembles streamed tool-call fragments for one
//! turn and executes the resulting calls, reporting every outcome, failures
//! included, as chunks plus tool-role messages.

#![deny(missing_docs)]

pub mod error;
pub mod manager;
pub mod tool;

pub use error::{ToolError, ValidationError};
pub use manager::{
    ToolCallManager, ToolExecutionEvent, ToolManagerConfig, approval_id, parse_arguments,
};
pub use tool::{Tool, ToolDefinition, ToolExecutor, Validator, tool_fn};

//! # weft-loop: The agent loop
//!
//! [`AgentLoop`] alternates model rounds and tool execution over one
//! conversation, parking when a call needs a human decision or a
//! client-side result.
//!
//! | Module | What it does |
//! |--------|-------------|
//! | [`strategy`] | Whether to run another round ([`AgentLoopStrategy`]) |
//! | [`source`] | Where rounds come from ([`ChunkSource`]) |
//! | [`agent`] | The driver and its outcome types |
//! | [`config`] | Static loop configuration |

#![deny(missing_docs)]

pub mod agent;
pub mod config;
pub mod error;
pub mod source;
pub mod strategy;

#[cfg(feature = "test-utils")]
pub mod test_utils;

pub use agent::{AgentLoop, DEFAULT_MAX_ITERATIONS, LoopOutcome, LoopStop};
pub use config::LoopConfig;
pub use error::LoopError;
pub use source::{ChunkSource, ChunkStream, ModelRequest, SourceError};
pub use strategy::{
    AgentLoopStrategy, AllOf, LoopState, MaxIterations, UntilFinishReason, combine_strategies,
    max_iterations, until_finish_reason,
};

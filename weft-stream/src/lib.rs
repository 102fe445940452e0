//! # weft-stream: Chunk streams to conversation state
//!
//! [`StreamProcessor`] is the state machine at the centre of weft: feed it
//! [`StreamChunk`](weft_types::StreamChunk)s and read back
//! [`UIMessage`](weft_types::UIMessage)s that are consistent after every
//! chunk.
//!
//! Around it:
//!
//! | Module | What it does |
//! |--------|-------------|
//! | [`strategy`] | When text updates reach observers |
//! | [`json`] | Preview parsing of incomplete tool arguments |
//! | [`observer`] | The notification interface |
//! | [`recording`] | Chunk logs for deterministic replay |

#![deny(missing_docs)]

pub mod config;
pub mod error;
pub mod json;
pub mod observer;
pub mod processor;
pub mod recording;
pub mod strategy;

#[cfg(feature = "test-utils")]
pub mod test_utils;

pub use config::ProcessorConfig;
pub use error::ProcessorError;
pub use json::parse_partial_json;
pub use observer::StreamObserver;
pub use processor::StreamProcessor;
pub use recording::{RecordedChunk, Recording};
pub use strategy::{
    BatchStrategy, ChunkStrategy, CompositeStrategy, ImmediateStrategy, PunctuationStrategy,
    WordBoundaryStrategy,
};

//! Chunk builders for testing.
//!
//! Available behind the `test-utils` feature flag.

mod chunk_script;

pub use chunk_script::ChunkScript;

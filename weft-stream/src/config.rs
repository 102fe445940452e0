//! Configuration types for the stream processor.

use crate::strategy::{ChunkStrategy, ImmediateStrategy};

/// Configuration for [`StreamProcessor`](crate::StreamProcessor).
pub struct ProcessorConfig {
    /// When text updates are pushed to observers.
    pub strategy: Box<dyn ChunkStrategy>,
}

impl ProcessorConfig {
    /// Use `strategy` for throttling text updates.
    pub fn with_strategy(strategy: impl ChunkStrategy + 'static) -> Self {
        Self {
            strategy: Box::new(strategy),
        }
    }
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self::with_strategy(ImmediateStrategy)
    }
}

impl std::fmt::Debug for ProcessorConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessorConfig").finish_non_exhaustive()
    }
}

//! Chunk strategies decide when accumulated text is pushed to observers.
//!
//! Throttling only changes how often updates fire. The processor always
//! flushes pending text when a segment closes and when a turn ends, so the
//! final state never depends on the strategy.

/// Decides whether a text delta triggers an observer update.
pub trait ChunkStrategy: Send + Sync {
    /// Called for every text or thinking delta. `accumulated` is the part's
    /// full content including `delta`.
    fn should_emit(&mut self, delta: &str, accumulated: &str) -> bool;

    /// Called at the start of every streaming turn.
    fn reset(&mut self) {}
}

impl<S: ChunkStrategy + ?Sized> ChunkStrategy for Box<S> {
    fn should_emit(&mut self, delta: &str, accumulated: &str) -> bool {
        (**self).should_emit(delta, accumulated)
    }

    fn reset(&mut self) {
        (**self).reset();
    }
}

/// Emits on every delta.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImmediateStrategy;

impl ChunkStrategy for ImmediateStrategy {
    fn should_emit(&mut self, _delta: &str, _accumulated: &str) -> bool {
        true
    }
}

/// Emits when a delta ends a sentence or a line.
#[derive(Debug, Clone, Copy, Default)]
pub struct PunctuationStrategy;

impl PunctuationStrategy {
    const ENDINGS: [char; 7] = ['.', '!', '?', '。', '！', '？', '\n'];
}

impl ChunkStrategy for PunctuationStrategy {
    fn should_emit(&mut self, delta: &str, _accumulated: &str) -> bool {
        delta.contains(Self::ENDINGS)
    }
}

/// Emits when a delta contains whitespace.
#[derive(Debug, Clone, Copy, Default)]
pub struct WordBoundaryStrategy;

impl ChunkStrategy for WordBoundaryStrategy {
    fn should_emit(&mut self, delta: &str, _accumulated: &str) -> bool {
        delta.chars().any(char::is_whitespace)
    }
}

/// Emits on every n-th delta.
#[derive(Debug, Clone)]
pub struct BatchStrategy {
    size: usize,
    seen: usize,
}

impl BatchStrategy {
    /// Emit every `size` deltas. A size of zero behaves as one.
    pub fn new(size: usize) -> Self {
        Self {
            size: size.max(1),
            seen: 0,
        }
    }
}

impl ChunkStrategy for BatchStrategy {
    fn should_emit(&mut self, _delta: &str, _accumulated: &str) -> bool {
        self.seen += 1;
        if self.seen >= self.size {
            self.seen = 0;
            true
        } else {
            false
        }
    }

    fn reset(&mut self) {
        self.seen = 0;
    }
}

/// Emits when any child strategy emits.
///
/// Every child sees every delta, so stateful children such as
/// [`BatchStrategy`] keep counting even when an earlier child fired.
#[derive(Default)]
pub struct CompositeStrategy {
    children: Vec<Box<dyn ChunkStrategy>>,
}

impl CompositeStrategy {
    /// Combine `children`. With no children nothing is ever emitted early.
    pub fn new(children: Vec<Box<dyn ChunkStrategy>>) -> Self {
        Self { children }
    }
}

impl ChunkStrategy for CompositeStrategy {
    fn should_emit(&mut self, delta: &str, accumulated: &str) -> bool {
        self.children
            .iter_mut()
            .fold(false, |any, child| child.should_emit(delta, accumulated) || any)
    }

    fn reset(&mut self) {
        for child in &mut self.children {
            child.reset();
        }
    }
}

impl std::fmt::Debug for CompositeStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompositeStrategy")
            .field("children", &self.children.len())
            .finish()
    }
}

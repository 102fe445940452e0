//! Continuation predicates for the agent loop.
//!
//! A strategy is asked once per model round that produced tool calls. It
//! answers whether the loop should execute those calls and go round again.

use std::collections::HashSet;
use std::fmt;

use weft_types::{FinishReason, ModelMessage};

/// What a strategy sees when deciding whether to continue.
#[derive(Debug, Clone, Copy)]
pub struct LoopState<'a> {
    /// Model rounds completed so far, the current one included.
    pub iteration_count: usize,
    /// The conversation in model shape.
    pub messages: &'a [ModelMessage],
    /// Finish reason of the latest round, if it reported one.
    pub last_finish_reason: Option<FinishReason>,
}

/// Decides whether the agent loop keeps going.
pub trait AgentLoopStrategy: Send + Sync {
    /// `true` to execute pending tool calls and run another round.
    fn should_continue(&self, state: &LoopState<'_>) -> bool;
}

impl<F> AgentLoopStrategy for F
where
    F: Fn(&LoopState<'_>) -> bool + Send + Sync,
{
    fn should_continue(&self, state: &LoopState<'_>) -> bool {
        self(state)
    }
}

/// Stops once `iteration_count` reaches a limit. See [`max_iterations`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MaxIterations(pub usize);

impl AgentLoopStrategy for MaxIterations {
    fn should_continue(&self, state: &LoopState<'_>) -> bool {
        state.iteration_count < self.0
    }
}

/// Stops once the last finish reason is in a set. See [`until_finish_reason`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UntilFinishReason(HashSet<FinishReason>);

impl AgentLoopStrategy for UntilFinishReason {
    fn should_continue(&self, state: &LoopState<'_>) -> bool {
        match state.last_finish_reason {
            Some(reason) => !self.0.contains(&reason),
            None => true,
        }
    }
}

/// Continues only while every child continues. See [`combine_strategies`].
#[derive(Default)]
pub struct AllOf(Vec<Box<dyn AgentLoopStrategy>>);

impl AgentLoopStrategy for AllOf {
    fn should_continue(&self, state: &LoopState<'_>) -> bool {
        self.0.iter().all(|s| s.should_continue(state))
    }
}

impl fmt::Debug for AllOf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("AllOf").field(&self.0.len()).finish()
    }
}

/// Allow at most `n` model rounds.
pub fn max_iterations(n: usize) -> MaxIterations {
    MaxIterations(n)
}

/// Stop when a round finishes with one of `reasons`.
pub fn until_finish_reason(reasons: impl IntoIterator<Item = FinishReason>) -> UntilFinishReason {
    UntilFinishReason(reasons.into_iter().collect())
}

/// Continue only while all `strategies` agree. An empty list always continues.
pub fn combine_strategies(strategies: Vec<Box<dyn AgentLoopStrategy>>) -> AllOf {
    AllOf(strategies)
}

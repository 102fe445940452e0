//! Configuration for the agent loop.

/// Static configuration for an [`AgentLoop`](crate::AgentLoop).
#[derive(Debug, Clone, Default)]
pub struct LoopConfig {
    /// Model identifier passed through to the chunk source.
    pub model: String,
    /// System prompt sent with every round.
    pub system_prompt: Option<String>,
    /// Execute a round's tool calls concurrently.
    pub parallel_tool_execution: bool,
}

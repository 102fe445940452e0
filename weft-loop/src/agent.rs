//! The agent loop driver.

use std::fmt;
use std::sync::Arc;

use futures::StreamExt;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use weft_stream::{StreamObserver, StreamProcessor};
use weft_tool::{Tool, ToolCallManager, ToolExecutionEvent, ToolManagerConfig};
use weft_types::{ChunkKind, FinishReason, ModelMessage, ModelToolCall, StreamChunk, ToolCallState};

use crate::config::LoopConfig;
use crate::error::LoopError;
use crate::source::{ChunkSource, ChunkStream, ModelRequest};
use crate::strategy::{AgentLoopStrategy, LoopState, max_iterations};

/// Rounds allowed when no strategy is set.
pub const DEFAULT_MAX_ITERATIONS: usize = 10;

const NOT_EXECUTED: &str = "tool call was not executed: the agent loop stopped";
const CANCELLED: &str = "tool call was cancelled";
const ABANDONED: &str = "tool call was abandoned for a new user message";

/// Why the loop stopped.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoopStop {
    /// The model finished without calling tools.
    Completed,
    /// The strategy declined to run another round. Tool calls from the last
    /// round were closed with an error result instead of running.
    StrategyHalted,
    /// A call waits for an approval decision or a client-side result.
    /// Supply it, then call [`AgentLoop::resume`].
    AwaitingInput,
    /// A call was denied. The loop does not continue past a denial.
    ApprovalDenied,
    /// The round ended with an `error` chunk or without a `done` chunk.
    StreamError(String),
    /// The cancellation token fired. Calls that had not finished were
    /// closed with an error result.
    Cancelled,
}

/// Summary of one [`run`](AgentLoop::run) or [`resume`](AgentLoop::resume).
#[derive(Debug, Clone, PartialEq)]
pub struct LoopOutcome {
    /// Model rounds since the last `run`.
    pub iterations: usize,
    /// Finish reason of the latest round.
    pub finish_reason: Option<FinishReason>,
    /// Why the loop stopped.
    pub stop: LoopStop,
    /// Tool messages produced by this call, in call order per round.
    pub tool_messages: Vec<ModelMessage>,
}

/// A round whose calls still wait for outside input.
#[derive(Debug)]
struct Parked {
    done: StreamChunk,
    calls: Vec<ModelToolCall>,
}

enum RoundEnd {
    Done(StreamChunk),
    Error(String),
    Exhausted,
    Cancelled,
}

/// Drives model rounds and tool execution over one conversation.
///
/// Each round streams chunks from the [`ChunkSource`] into the owned
/// [`StreamProcessor`] while a fresh [`ToolCallManager`] accumulates the
/// round's tool calls. When the round asked for tools and the strategy
/// agrees, the calls are executed, their chunks fed back into the
/// processor, and the next round starts.
pub struct AgentLoop<S> {
    source: S,
    processor: StreamProcessor,
    tools: Vec<Tool>,
    strategy: Box<dyn AgentLoopStrategy>,
    config: LoopConfig,
    cancel: CancellationToken,
    iterations: usize,
    parked: Option<Parked>,
}

impl<S: ChunkSource> AgentLoop<S> {
    /// A loop with no tools and at most [`DEFAULT_MAX_ITERATIONS`] rounds.
    pub fn new(source: S, config: LoopConfig) -> Self {
        Self {
            source,
            processor: StreamProcessor::new(),
            tools: Vec::new(),
            strategy: Box::new(max_iterations(DEFAULT_MAX_ITERATIONS)),
            config,
            cancel: CancellationToken::new(),
            iterations: 0,
            parked: None,
        }
    }

    /// Set the available tools.
    pub fn with_tools(mut self, tools: Vec<Tool>) -> Self {
        self.tools = tools;
        self
    }

    /// Set the continuation strategy.
    pub fn with_strategy(mut self, strategy: impl AgentLoopStrategy + 'static) -> Self {
        self.strategy = Box::new(strategy);
        self
    }

    /// Use a preconfigured processor, e.g. one holding earlier history.
    pub fn with_processor(mut self, processor: StreamProcessor) -> Self {
        self.processor = processor;
        self
    }

    /// Use an existing cancellation token.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// A handle that cancels this loop.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Register an observer on the owned processor.
    pub fn add_observer(&mut self, observer: Arc<dyn StreamObserver>) {
        self.processor.add_observer(observer);
    }

    /// The conversation state.
    pub fn processor(&self) -> &StreamProcessor {
        &self.processor
    }

    /// Whether the last call stopped with [`LoopStop::AwaitingInput`].
    pub fn is_awaiting_input(&self) -> bool {
        self.parked.is_some()
    }

    /// Answer an approval request raised by a gated tool.
    pub fn respond_to_approval(&mut self, approval_id: &str, approved: bool) -> Result<(), LoopError> {
        Ok(self.processor.add_tool_approval_response(approval_id, approved)?)
    }

    /// Supply the result of a client-side tool.
    pub fn add_tool_result(
        &mut self,
        tool_call_id: &str,
        output: Value,
        error: Option<String>,
    ) -> Result<(), LoopError> {
        Ok(self.processor.add_tool_result(tool_call_id, output, error)?)
    }

    /// Append a user message and drive rounds until something stops the loop.
    ///
    /// Calls still parked from an earlier run are closed with an error
    /// result first.
    pub async fn run(&mut self, user_message: impl Into<String>) -> Result<LoopOutcome, LoopError> {
        if let Some(parked) = self.parked.take() {
            self.abandon(&parked.calls, ABANDONED);
        }
        self.iterations = 0;
        self.processor.add_user_message(user_message);
        self.drive(Vec::new()).await
    }

    /// Continue after [`LoopStop::AwaitingInput`].
    ///
    /// Approved calls are executed first. The loop then parks again if
    /// anything is still undecided, halts on a denial, and otherwise starts
    /// the next round.
    pub async fn resume(&mut self) -> Result<LoopOutcome, LoopError> {
        let parked = self.parked.take().ok_or(LoopError::NotAwaitingInput)?;
        let mut tool_messages = Vec::new();

        let approved = self.processor.approved_tool_calls();
        if !approved.is_empty() {
            let mut manager = self.manager();
            for call in &approved {
                if manager.add_tool_call(call).is_ok() {
                    manager.set_approval(call.id.clone(), true);
                }
            }
            if !self.forward_tools(&manager, &parked.done, &mut tool_messages).await {
                return Ok(self.cancelled(&parked.calls, tool_messages));
            }
        }

        if let Some(stop) = self.settle(parked) {
            return Ok(self.finish(stop, tool_messages));
        }
        self.drive(tool_messages).await
    }

    async fn drive(&mut self, mut tool_messages: Vec<ModelMessage>) -> Result<LoopOutcome, LoopError> {
        let cancel = self.cancel.clone();
        loop {
            if cancel.is_cancelled() {
                return Ok(self.cancelled(&[], tool_messages));
            }

            let mut manager = self.manager();
            let request = ModelRequest {
                model: self.config.model.clone(),
                system_prompt: self.config.system_prompt.clone(),
                messages: self.processor.to_model_messages(),
                tools: manager.definitions(),
            };
            self.iterations += 1;
            tracing::debug!(
                iteration = self.iterations,
                messages = request.messages.len(),
                "starting model round"
            );

            let started = tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                started = self.source.stream(request) => Some(started),
            };
            let Some(started) = started else {
                return Ok(self.cancelled(&[], tool_messages));
            };
            let mut stream = started?;

            let done = match self.consume(&mut stream, &mut manager, &cancel).await {
                RoundEnd::Done(done) => done,
                RoundEnd::Error(message) => {
                    return Ok(self.finish(LoopStop::StreamError(message), tool_messages));
                }
                RoundEnd::Exhausted => {
                    self.processor.finalize_stream();
                    let stop = LoopStop::StreamError("chunk stream ended before done".into());
                    return Ok(self.finish(stop, tool_messages));
                }
                RoundEnd::Cancelled => return Ok(self.cancelled(&[], tool_messages)),
            };

            if !manager.has_tool_calls() {
                return Ok(self.finish(LoopStop::Completed, tool_messages));
            }

            let calls = manager.get_tool_calls();
            let messages = self.processor.to_model_messages();
            let state = LoopState {
                iteration_count: self.iterations,
                messages: &messages,
                last_finish_reason: self.processor.finish_reason(),
            };
            if !self.strategy.should_continue(&state) {
                self.abandon(&calls, NOT_EXECUTED);
                return Ok(self.finish(LoopStop::StrategyHalted, tool_messages));
            }

            if !self.forward_tools(&manager, &done, &mut tool_messages).await {
                return Ok(self.cancelled(&calls, tool_messages));
            }
            if let Some(stop) = self.settle(Parked { done, calls }) {
                return Ok(self.finish(stop, tool_messages));
            }
        }
    }

    /// Feed one round into the processor and the manager.
    async fn consume(
        &mut self,
        stream: &mut ChunkStream,
        manager: &mut ToolCallManager,
        cancel: &CancellationToken,
    ) -> RoundEnd {
        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                next = stream.next() => Some(next),
            };
            let chunk = match next {
                None => return RoundEnd::Cancelled,
                Some(None) => return RoundEnd::Exhausted,
                Some(Some(chunk)) => chunk,
            };

            self.processor.process_chunk(&chunk);
            match &chunk.kind {
                ChunkKind::ToolCall { tool_call, index } => {
                    // Rejected fragments are logged by the manager.
                    let _ = manager.add_tool_call_chunk(*index, tool_call);
                }
                ChunkKind::Error { message, .. } => return RoundEnd::Error(message.clone()),
                _ => {}
            }
            if matches!(chunk.kind, ChunkKind::Done { .. }) {
                return RoundEnd::Done(chunk);
            }
        }
    }

    /// Execute the manager's calls, forwarding every chunk to the processor.
    /// Returns `false` when cancelled part-way.
    async fn forward_tools(
        &mut self,
        manager: &ToolCallManager,
        done: &StreamChunk,
        tool_messages: &mut Vec<ModelMessage>,
    ) -> bool {
        let cancel = self.cancel.clone();
        let mut events = manager.execute_tools(done);
        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                next = events.next() => Some(next),
            };
            match next {
                None => return false,
                Some(None) => return true,
                Some(Some(ToolExecutionEvent::Started { tool_call_id })) => {
                    if let Err(err) = self.processor.start_tool_execution(&tool_call_id) {
                        tracing::warn!(tool_call_id = %tool_call_id, error = %err, "could not mark tool call as executing");
                    }
                }
                Some(Some(ToolExecutionEvent::Chunk(chunk))) => self.processor.process_chunk(&chunk),
                Some(Some(ToolExecutionEvent::Complete(messages))) => tool_messages.extend(messages),
            }
        }
    }

    /// Decide whether a round's calls let the loop go on.
    fn settle(&mut self, parked: Parked) -> Option<LoopStop> {
        let states: Vec<ToolCallState> = parked
            .calls
            .iter()
            .filter_map(|call| self.call_state(&call.id))
            .collect();
        if states.iter().any(|state| !state.is_terminal()) {
            tracing::debug!(calls = parked.calls.len(), "agent loop parked for input");
            self.parked = Some(parked);
            return Some(LoopStop::AwaitingInput);
        }
        if states.contains(&ToolCallState::Cancelled) {
            return Some(LoopStop::ApprovalDenied);
        }
        None
    }

    fn call_state(&self, tool_call_id: &str) -> Option<ToolCallState> {
        self.processor
            .messages()
            .iter()
            .rev()
            .flat_map(|message| message.tool_calls())
            .find(|part| part.id == tool_call_id)
            .map(|part| part.state)
    }

    fn manager(&self) -> ToolCallManager {
        ToolCallManager::with_config(
            self.tools.clone(),
            ToolManagerConfig {
                parallel: self.config.parallel_tool_execution,
            },
        )
    }

    /// Close every call in `calls` that has not reached a terminal state.
    fn abandon(&mut self, calls: &[ModelToolCall], reason: &str) {
        for call in calls {
            let open = self
                .call_state(&call.id)
                .is_some_and(|state| !state.is_terminal());
            if !open {
                continue;
            }
            if let Err(err) = self.processor.abort_tool_call(&call.id, reason) {
                tracing::warn!(tool_call_id = %call.id, error = %err, "could not close tool call");
            }
        }
    }

    fn cancelled(&mut self, open: &[ModelToolCall], tool_messages: Vec<ModelMessage>) -> LoopOutcome {
        self.processor.finalize_stream();
        self.abandon(open, CANCELLED);
        self.finish(LoopStop::Cancelled, tool_messages)
    }

    fn finish(&self, stop: LoopStop, tool_messages: Vec<ModelMessage>) -> LoopOutcome {
        tracing::debug!(iterations = self.iterations, stop = ?stop, "agent loop stopped");
        LoopOutcome {
            iterations: self.iterations,
            finish_reason: self.processor.finish_reason(),
            stop,
            tool_messages,
        }
    }
}

impl<S> fmt::Debug for AgentLoop<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AgentLoop")
            .field("processor", &self.processor)
            .field("tools", &self.tools.len())
            .field("config", &self.config)
            .field("iterations", &self.iterations)
            .field("parked", &self.parked.is_some())
            .finish_non_exhaustive()
    }
}

//! The chunk-to-message state machine.
//!
//! [`StreamProcessor`] consumes [`StreamChunk`]s one at a time and keeps an
//! ordered list of [`UIMessage`]s that can be rendered at any point.
//!
//! Within a turn, text and thinking deltas grow the current part until the
//! chunk type switches, which always starts a new part. Tool-call fragments
//! are reassembled through a per-turn [`ToolCallAccumulator`]; a call is
//! considered complete when a fragment for another call arrives, when text
//! or thinking resumes, or when the turn ends with `done`. A turn cut short
//! closes its unfinished calls with an error result instead. Chunks that address a tool
//! call by id attach to that call wherever it lives, even after its turn
//! ended.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::Value;
use weft_types::{
    ApprovalMeta, ApprovalRequest, ChunkKind, FinishReason, MessagePart, ModelMessage,
    ModelToolCall, StreamChunk, ToolCallAccumulator, ToolCallFragment, ToolCallPart,
    ToolCallState, ToolResultPart, ToolResultState, UIMessage, UiRole, Usage, output_to_text,
    ui_to_model_messages,
};

use crate::config::ProcessorConfig;
use crate::error::ProcessorError;
use crate::json::parse_partial_json;
use crate::observer::StreamObserver;
use crate::recording::{Recorder, Recording};
use crate::strategy::ChunkStrategy;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SegmentKind {
    Text,
    Thinking,
}

/// The text or thinking part currently growing.
#[derive(Debug)]
struct Segment {
    kind: SegmentKind,
    part: usize,
    /// Content changed since observers were last told.
    pending: bool,
}

/// State of the open assistant turn.
#[derive(Debug)]
struct Turn {
    message: usize,
    segment: Option<Segment>,
    text: String,
    thinking: String,
    calls: ToolCallAccumulator,
    active_index: Option<usize>,
}

impl Turn {
    fn new(message: usize) -> Self {
        Self {
            message,
            segment: None,
            text: String::new(),
            thinking: String::new(),
            calls: ToolCallAccumulator::new(),
            active_index: None,
        }
    }
}

/// Turns a chunk stream into renderable conversation state.
///
/// Single-threaded: every transition goes through `&mut self`.
pub struct StreamProcessor {
    messages: Vec<UIMessage>,
    strategy: Box<dyn ChunkStrategy>,
    observers: Vec<Arc<dyn StreamObserver>>,
    turn: Option<Turn>,
    finish_reason: Option<FinishReason>,
    usage: Option<Usage>,
    recorder: Option<Recorder>,
}

impl StreamProcessor {
    /// A processor with the default configuration.
    pub fn new() -> Self {
        Self::with_config(ProcessorConfig::default())
    }

    /// A processor with explicit configuration.
    pub fn with_config(config: ProcessorConfig) -> Self {
        Self {
            messages: Vec::new(),
            strategy: config.strategy,
            observers: Vec::new(),
            turn: None,
            finish_reason: None,
            usage: None,
            recorder: None,
        }
    }

    /// Rebuild the state a recording describes, using the default configuration.
    pub fn replay(recording: &Recording) -> Self {
        Self::replay_with(recording, ProcessorConfig::default())
    }

    /// Rebuild the state a recording describes.
    pub fn replay_with(recording: &Recording, config: ProcessorConfig) -> Self {
        let mut processor = Self::with_config(config);
        for chunk in recording.chunks() {
            processor.process_chunk(chunk);
        }
        processor
    }

    /// Register an observer.
    pub fn add_observer(&mut self, observer: Arc<dyn StreamObserver>) {
        self.observers.push(observer);
    }

    // ━━━ Queries ━━━

    /// All messages in order.
    pub fn messages(&self) -> &[UIMessage] {
        &self.messages
    }

    /// The conversation in model shape, without thinking parts.
    pub fn to_model_messages(&self) -> Vec<ModelMessage> {
        ui_to_model_messages(&self.messages)
    }

    /// Finish reason of the most recent turn, once it ended normally.
    pub fn finish_reason(&self) -> Option<FinishReason> {
        self.finish_reason
    }

    /// Usage reported by the most recent turn.
    pub fn usage(&self) -> Option<&Usage> {
        self.usage.as_ref()
    }

    /// Whether a turn is open.
    pub fn is_streaming(&self) -> bool {
        self.turn.is_some()
    }

    /// Tool calls waiting for a human decision.
    pub fn pending_approvals(&self) -> Vec<&ToolCallPart> {
        self.tool_call_parts()
            .filter(|part| {
                part.state == ToolCallState::ApprovalRequested
                    && part.approval.as_ref().is_some_and(ApprovalRequest::is_pending)
            })
            .collect()
    }

    /// Approved calls that have not produced output yet.
    pub fn approved_tool_calls(&self) -> Vec<ModelToolCall> {
        self.tool_call_parts()
            .filter(|part| {
                part.state == ToolCallState::Executing
                    && part.approval.as_ref().and_then(|a| a.approved) == Some(true)
            })
            .map(|part| ModelToolCall {
                id: part.id.clone(),
                name: part.name.clone(),
                arguments: part.arguments.clone(),
            })
            .collect()
    }

    fn tool_call_parts(&self) -> impl Iterator<Item = &ToolCallPart> {
        self.messages.iter().flat_map(UIMessage::tool_calls)
    }

    // ━━━ Recording ━━━

    /// Start recording every processed chunk. Restarts an active recording.
    pub fn start_recording(&mut self) {
        self.recorder = Some(Recorder::new());
    }

    /// The active recording, if any.
    pub fn recording(&self) -> Option<&Recording> {
        self.recorder.as_ref().map(Recorder::recording)
    }

    /// Stop recording and hand back what was captured.
    pub fn stop_recording(&mut self) -> Option<Recording> {
        self.recorder.take().map(|r| r.recording().clone())
    }

    // ━━━ Externally driven transitions ━━━

    /// Append a user message. Closes any open turn first.
    pub fn add_user_message(&mut self, content: impl Into<String>) -> &UIMessage {
        self.end_turn();
        let mut message = UIMessage::new(new_message_id(), UiRole::User, Utc::now());
        message.parts.push(MessagePart::text(content));
        let idx = self.push_message(message);
        &self.messages[idx]
    }

    /// Open an assistant turn explicitly and return its message id.
    ///
    /// Chunks processed afterwards attach to this message whatever their
    /// response id.
    pub fn start_assistant_message(&mut self) -> String {
        self.end_turn();
        let id = new_message_id();
        let message = UIMessage::new(id.clone(), UiRole::Assistant, Utc::now());
        self.open_turn(message);
        id
    }

    /// Close the open turn after the upstream sequence ended without `done`.
    ///
    /// Text is kept. Tool calls of the turn that never reached approval or
    /// execution end in `output-error`, so no half-streamed call is left
    /// for the model to answer.
    pub fn finalize_stream(&mut self) {
        self.abort_turn();
    }

    /// Drop all messages and turn state.
    pub fn clear(&mut self) {
        self.messages.clear();
        self.turn = None;
        self.finish_reason = None;
        self.usage = None;
        self.notify_change();
    }

    /// Resolve a tool call with output produced outside the processor.
    ///
    /// With `error` set the call ends in `output-error`.
    pub fn add_tool_result(
        &mut self,
        tool_call_id: &str,
        output: Value,
        error: Option<String>,
    ) -> Result<(), ProcessorError> {
        let (m, p) = self
            .locate_call(tool_call_id)
            .ok_or_else(|| ProcessorError::ToolCallNotFound(tool_call_id.to_string()))?;
        self.apply_tool_result(m, p, output, error)
    }

    /// Mark a call as running. Calls still streaming complete their input
    /// first. A no-op for a call that is already executing.
    pub fn start_tool_execution(&mut self, tool_call_id: &str) -> Result<(), ProcessorError> {
        let (m, p) = self
            .locate_call(tool_call_id)
            .ok_or_else(|| ProcessorError::ToolCallNotFound(tool_call_id.to_string()))?;
        self.enter_executing(m, p)
    }

    /// Close a call that will never run with an error result.
    ///
    /// Used when the conversation moves on without executing a call, e.g.
    /// after a halt or a cancellation. Terminal calls are rejected.
    pub fn abort_tool_call(
        &mut self,
        tool_call_id: &str,
        reason: impl Into<String>,
    ) -> Result<(), ProcessorError> {
        let (m, p) = self
            .locate_call(tool_call_id)
            .ok_or_else(|| ProcessorError::ToolCallNotFound(tool_call_id.to_string()))?;
        let state = self.messages[m].parts[p]
            .as_tool_call()
            .map(|part| part.state)
            .ok_or_else(|| ProcessorError::ToolCallNotFound(tool_call_id.to_string()))?;
        if state.is_terminal() {
            return Err(ProcessorError::InvalidTransition {
                id: tool_call_id.to_string(),
                from: state,
                to: ToolCallState::OutputError,
            });
        }
        self.force_error(m, p, reason.into());
        Ok(())
    }

    /// Answer an approval request. `false` cancels the call for good,
    /// `true` moves it to `executing`.
    pub fn add_tool_approval_response(
        &mut self,
        approval_id: &str,
        approved: bool,
    ) -> Result<(), ProcessorError> {
        let (m, p) = self
            .locate_approval(approval_id)
            .ok_or_else(|| ProcessorError::ApprovalNotFound(approval_id.to_string()))?;
        let Some(part) = self.messages[m].parts[p].as_tool_call_mut() else {
            return Err(ProcessorError::ApprovalNotFound(approval_id.to_string()));
        };
        let Some(approval) = part.approval.as_mut() else {
            return Err(ProcessorError::ApprovalNotFound(approval_id.to_string()));
        };
        if approval.approved.is_some() {
            return Err(ProcessorError::ApprovalAlreadyResolved(approval_id.to_string()));
        }
        let target = if approved {
            ToolCallState::Executing
        } else {
            ToolCallState::Cancelled
        };
        if !part.state.can_transition_to(target) {
            return Err(ProcessorError::InvalidTransition {
                id: part.id.clone(),
                from: part.state,
                to: target,
            });
        }
        approval.approved = Some(approved);
        part.state = target;
        tracing::debug!(tool_call_id = %part.id, approved, "approval resolved");

        self.notify_tool_state(m, p);
        self.notify_change();
        Ok(())
    }

    // ━━━ Chunk processing ━━━

    /// Apply one chunk. Never fails; chunks that make no sense in the
    /// current state are logged and ignored.
    pub fn process_chunk(&mut self, chunk: &StreamChunk) {
        if let Some(recorder) = self.recorder.as_mut() {
            recorder.record(chunk);
        }

        match &chunk.kind {
            ChunkKind::Content { delta, content, .. } => {
                self.on_segment(chunk, SegmentKind::Text, Some(delta.as_str()), content)
            }
            ChunkKind::Thinking { delta, content } => {
                self.on_segment(chunk, SegmentKind::Thinking, delta.as_deref(), content)
            }
            ChunkKind::ToolCall { tool_call, index } => {
                self.on_tool_call_fragment(chunk, *index, tool_call)
            }
            ChunkKind::ToolInputAvailable {
                tool_call_id,
                tool_name,
                input,
            } => self.on_tool_input_available(chunk, tool_call_id, tool_name, input),
            ChunkKind::ApprovalRequested {
                tool_call_id,
                tool_name,
                input,
                approval,
            } => self.on_approval_requested(chunk, tool_call_id, tool_name, input, approval),
            ChunkKind::ToolResult {
                tool_call_id,
                content,
                is_error,
            } => self.on_tool_result(chunk, tool_call_id, content, *is_error),
            ChunkKind::Done {
                finish_reason,
                usage,
            } => {
                if self.turn.is_none() {
                    tracing::debug!(chunk_id = %chunk.id, "ignoring done chunk without an open turn");
                    return;
                }
                self.finish_reason = *finish_reason;
                self.usage = usage.clone();
                self.end_turn();
            }
            ChunkKind::Error { message, code } => {
                if self.turn.is_none() {
                    tracing::debug!(chunk_id = %chunk.id, "ignoring error chunk without an open turn");
                    return;
                }
                tracing::warn!(message = %message, code = ?code, "upstream stream error");
                self.notify(|o| o.on_error(message));
                self.abort_turn();
            }
            other => {
                tracing::warn!(chunk_id = %chunk.id, kind = other.type_name(), "ignoring unrecognised chunk");
            }
        }
    }

    fn on_segment(
        &mut self,
        chunk: &StreamChunk,
        kind: SegmentKind,
        delta: Option<&str>,
        content: &str,
    ) {
        let m = self.ensure_turn(chunk);
        self.finish_active_call();

        let Some(turn) = self.turn.as_mut() else {
            return;
        };
        let total = match kind {
            SegmentKind::Text => &mut turn.text,
            SegmentKind::Thinking => &mut turn.thinking,
        };
        let delta = derive_delta(total, delta, content);
        if delta.is_empty() {
            return;
        }

        if turn.segment.as_ref().map(|s| s.kind) != Some(kind) {
            self.close_segment();
            let part = match kind {
                SegmentKind::Text => MessagePart::text(""),
                SegmentKind::Thinking => MessagePart::thinking(""),
            };
            let parts = &mut self.messages[m].parts;
            parts.push(part);
            let index = parts.len() - 1;
            if let Some(turn) = self.turn.as_mut() {
                turn.segment = Some(Segment {
                    kind,
                    part: index,
                    pending: false,
                });
            }
        }

        let Some(segment) = self.turn.as_mut().and_then(|t| t.segment.as_mut()) else {
            return;
        };
        let part = segment.part;
        let accumulated = match &mut self.messages[m].parts[part] {
            MessagePart::Text { content } | MessagePart::Thinking { content } => {
                content.push_str(&delta);
                content.clone()
            }
            _ => return,
        };
        if self.strategy.should_emit(&delta, &accumulated) {
            segment.pending = false;
            self.notify_segment(kind, m, &accumulated);
        } else {
            segment.pending = true;
        }
    }

    fn on_tool_call_fragment(&mut self, chunk: &StreamChunk, index: usize, fragment: &ToolCallFragment) {
        let m = self.ensure_turn(chunk);
        self.close_segment();

        let superseded = self.turn.as_ref().and_then(|turn| {
            let active = turn.active_index?;
            let current = turn.calls.get_by_index(active)?;
            let incoming = fragment
                .id()
                .or_else(|| turn.calls.get_by_index(index).map(|call| call.id.as_str()))
                .filter(|id| !id.is_empty());
            let same_call = match incoming {
                Some(id) => id == current.id,
                None => index == active,
            };
            (!same_call).then_some(active)
        });
        if let Some(active) = superseded {
            self.finish_call_at(active);
        }

        let Some(turn) = self.turn.as_mut() else {
            return;
        };
        let call = match turn.calls.push(index, fragment) {
            Ok(call) => call.clone(),
            Err(err) => {
                tracing::warn!(index, error = %err, "rejected tool call fragment");
                return;
            }
        };
        turn.active_index = Some(index);
        if call.id.is_empty() {
            // Held until a fragment carrying the id arrives.
            return;
        }

        let parts = &mut self.messages[m].parts;
        let (p, created) = match parts
            .iter()
            .position(|part| part.as_tool_call().is_some_and(|c| c.id == call.id))
        {
            Some(p) => (p, false),
            None => {
                parts.push(MessagePart::ToolCall(ToolCallPart::new(
                    call.id.clone(),
                    call.name.clone(),
                )));
                (parts.len() - 1, true)
            }
        };
        let Some(part) = parts[p].as_tool_call_mut() else {
            return;
        };
        if part.name.is_empty() {
            part.name = call.name.clone();
        }
        part.arguments = call.arguments;
        part.input = parse_partial_json(&part.arguments);
        let before = part.state;
        if before == ToolCallState::AwaitingInput && !part.arguments.is_empty() {
            part.state = ToolCallState::InputStreaming;
        }
        let changed = created || part.state != before;

        if changed {
            self.notify_tool_state(m, p);
        }
        self.notify_change();
    }

    fn on_tool_input_available(
        &mut self,
        chunk: &StreamChunk,
        tool_call_id: &str,
        tool_name: &str,
        input: &Value,
    ) {
        let (m, p) = self.locate_or_create_call(chunk, tool_call_id, tool_name);
        let Some(part) = self.messages[m].parts[p].as_tool_call_mut() else {
            return;
        };
        if part.arguments.is_empty() {
            part.arguments = input.to_string();
        }
        part.input = Some(input.clone());
        let changed = advance(part, ToolCallState::InputComplete);

        if changed {
            self.notify_tool_state(m, p);
        }
        self.notify(|o| o.on_tool_input_available(tool_call_id, tool_name, input));
        self.notify_change();
    }

    fn on_approval_requested(
        &mut self,
        chunk: &StreamChunk,
        tool_call_id: &str,
        tool_name: &str,
        input: &Value,
        approval: &ApprovalMeta,
    ) {
        let (m, p) = self.locate_or_create_call(chunk, tool_call_id, tool_name);
        let Some(part) = self.messages[m].parts[p].as_tool_call_mut() else {
            return;
        };
        if part.approval.as_ref().is_some_and(|a| !a.is_pending()) {
            tracing::warn!(tool_call_id, "approval already resolved, ignoring new request");
            return;
        }
        if part.state.is_streaming() {
            part.state = ToolCallState::InputComplete;
            self.notify_tool_state(m, p);
        }
        let Some(part) = self.messages[m].parts[p].as_tool_call_mut() else {
            return;
        };
        if !part.state.can_transition_to(ToolCallState::ApprovalRequested)
            && part.state != ToolCallState::ApprovalRequested
        {
            tracing::warn!(tool_call_id, state = ?part.state, "cannot request approval in this state");
            return;
        }
        if part.arguments.is_empty() {
            part.arguments = input.to_string();
        }
        part.input = Some(input.clone());
        part.approval = Some(ApprovalRequest::pending(approval.id.clone()));
        part.state = ToolCallState::ApprovalRequested;

        self.notify_tool_state(m, p);
        let message_id = self.messages[m].id.as_str();
        if let Some(part) = self.messages[m].parts[p].as_tool_call() {
            self.notify(|o| o.on_approval_request(message_id, part));
        }
        self.notify_change();
    }

    fn on_tool_result(&mut self, chunk: &StreamChunk, tool_call_id: &str, content: &str, is_error: bool) {
        let output = serde_json::from_str(content).unwrap_or_else(|_| Value::String(content.to_string()));
        let error = is_error.then(|| content.to_string());

        match self.locate_call(tool_call_id) {
            Some((m, p)) => {
                if let Err(err) = self.apply_tool_result(m, p, output, error) {
                    tracing::warn!(tool_call_id, error = %err, "rejected tool result");
                }
            }
            None => {
                tracing::debug!(tool_call_id, "tool result for unknown call");
                let m = self.ensure_turn(chunk);
                self.close_segment();
                self.messages[m].parts.push(MessagePart::ToolResult(ToolResultPart {
                    tool_call_id: tool_call_id.to_string(),
                    output: content.to_string(),
                    state: if is_error {
                        ToolResultState::Error
                    } else {
                        ToolResultState::Complete
                    },
                    error_text: error,
                }));
                self.notify_change();
            }
        }
    }

    /// Walk a call forward to `executing`, reporting each step.
    fn enter_executing(&mut self, m: usize, p: usize) -> Result<(), ProcessorError> {
        let Some(part) = self.messages[m].parts[p].as_tool_call_mut() else {
            return Err(ProcessorError::ToolCallNotFound(String::new()));
        };
        if part.state == ToolCallState::Executing {
            return Ok(());
        }
        let awaiting_approval = part.approval.as_ref().is_some_and(ApprovalRequest::is_pending);
        if awaiting_approval || part.state.is_terminal() {
            return Err(ProcessorError::InvalidTransition {
                id: part.id.clone(),
                from: part.state,
                to: ToolCallState::Executing,
            });
        }
        if part.state.is_streaming() {
            part.input = preview_input(&part.arguments);
            part.state = ToolCallState::InputComplete;
            self.notify_tool_state(m, p);
        }

        let Some(part) = self.messages[m].parts[p].as_tool_call_mut() else {
            return Err(ProcessorError::ToolCallNotFound(String::new()));
        };
        if !advance(part, ToolCallState::Executing) {
            return Err(ProcessorError::InvalidTransition {
                id: part.id.clone(),
                from: part.state,
                to: ToolCallState::Executing,
            });
        }
        self.notify_tool_state(m, p);
        self.notify_change();
        Ok(())
    }

    fn apply_tool_result(
        &mut self,
        m: usize,
        p: usize,
        output: Value,
        error: Option<String>,
    ) -> Result<(), ProcessorError> {
        let target = if error.is_some() {
            ToolCallState::OutputError
        } else {
            ToolCallState::OutputAvailable
        };
        if let Err(err) = self.enter_executing(m, p) {
            return Err(match err {
                ProcessorError::InvalidTransition { id, from, .. } => {
                    ProcessorError::InvalidTransition { id, from, to: target }
                }
                other => other,
            });
        }

        let message = &mut self.messages[m];
        let Some(part) = message.parts[p].as_tool_call_mut() else {
            return Err(ProcessorError::ToolCallNotFound(String::new()));
        };
        part.state = target;
        let result = ToolResultPart {
            tool_call_id: part.id.clone(),
            output: output_to_text(&output),
            state: if error.is_some() {
                ToolResultState::Error
            } else {
                ToolResultState::Complete
            },
            error_text: error,
        };
        part.output = Some(output);
        message.parts.push(MessagePart::ToolResult(result));

        self.notify_tool_state(m, p);
        self.notify_change();
        Ok(())
    }

    // ━━━ Turn lifecycle ━━━

    fn ensure_turn(&mut self, chunk: &StreamChunk) -> usize {
        if let Some(turn) = &self.turn {
            return turn.message;
        }
        let id = if chunk.id.is_empty() {
            new_message_id()
        } else {
            self.unique_id(&chunk.id)
        };
        let created_at = i64::try_from(chunk.timestamp)
            .ok()
            .and_then(DateTime::from_timestamp_millis)
            .unwrap_or_default();
        self.open_turn(UIMessage::new(id, UiRole::Assistant, created_at))
    }

    fn open_turn(&mut self, message: UIMessage) -> usize {
        tracing::debug!(message_id = %message.id, "assistant turn started");
        let m = self.push_message(message);
        self.turn = Some(Turn::new(m));
        self.strategy.reset();
        self.finish_reason = None;
        self.usage = None;
        m
    }

    fn end_turn(&mut self) {
        if self.turn.is_none() {
            return;
        }
        self.close_segment();
        let indices: Vec<usize> = self
            .turn
            .as_ref()
            .map(|t| t.calls.entries().iter().map(|c| c.index).collect())
            .unwrap_or_default();
        for index in indices {
            self.finish_call_at(index);
        }
        let Some(turn) = self.turn.take() else {
            return;
        };
        tracing::debug!(
            message_id = %self.messages[turn.message].id,
            finish_reason = ?self.finish_reason,
            "assistant turn ended"
        );
        let message = &self.messages[turn.message];
        self.notify(|o| o.on_stream_end(message));
        self.notify_change();
    }

    /// End the open turn without `done`: open calls of the turn that never
    /// reached approval or execution are closed with an error.
    fn abort_turn(&mut self) {
        let Some(m) = self.turn.as_ref().map(|t| t.message) else {
            return;
        };
        self.close_segment();
        let open: Vec<(usize, &'static str)> = self.messages[m]
            .parts
            .iter()
            .enumerate()
            .filter_map(|(p, part)| {
                let call = part.as_tool_call()?;
                match call.state {
                    ToolCallState::AwaitingInput | ToolCallState::InputStreaming => {
                        Some((p, STREAM_ENDED_MID_ARGUMENTS))
                    }
                    ToolCallState::InputComplete => Some((p, STREAM_ENDED_BEFORE_EXECUTION)),
                    _ => None,
                }
            })
            .collect();
        for (p, reason) in open {
            self.force_error(m, p, reason.to_string());
        }
        self.end_turn();
    }

    /// Close a non-terminal call with an error result.
    fn force_error(&mut self, m: usize, p: usize, reason: String) {
        let message = &mut self.messages[m];
        let Some(part) = message.parts[p].as_tool_call_mut() else {
            return;
        };
        if part.state.is_streaming() {
            part.input = preview_input(&part.arguments);
        }
        tracing::debug!(tool_call_id = %part.id, from = ?part.state, reason = %reason, "closing tool call");
        part.state = ToolCallState::OutputError;
        part.output = Some(Value::String(reason.clone()));
        let result = ToolResultPart {
            tool_call_id: part.id.clone(),
            output: reason.clone(),
            state: ToolResultState::Error,
            error_text: Some(reason),
        };
        message.parts.push(MessagePart::ToolResult(result));

        self.notify_tool_state(m, p);
        self.notify_change();
    }

    fn close_segment(&mut self) {
        let Some(turn) = self.turn.as_mut() else {
            return;
        };
        let Some(segment) = turn.segment.take() else {
            return;
        };
        if !segment.pending {
            return;
        }
        let m = turn.message;
        let content = match &self.messages[m].parts[segment.part] {
            MessagePart::Text { content } | MessagePart::Thinking { content } => content.clone(),
            _ => return,
        };
        self.notify_segment(segment.kind, m, &content);
    }

    fn finish_active_call(&mut self) {
        let active = self.turn.as_mut().and_then(|t| t.active_index.take());
        if let Some(index) = active {
            self.finish_call_at(index);
        }
    }

    fn finish_call_at(&mut self, index: usize) {
        let Some(turn) = &self.turn else {
            return;
        };
        let m = turn.message;
        let Some(call) = turn.calls.get_by_index(index) else {
            return;
        };
        if call.id.is_empty() {
            tracing::debug!(index, "dropping tool call fragments that never received an id");
            return;
        }
        let Some(p) = self.messages[m]
            .parts
            .iter()
            .position(|part| part.as_tool_call().is_some_and(|c| c.id == call.id))
        else {
            return;
        };
        let Some(part) = self.messages[m].parts[p].as_tool_call_mut() else {
            return;
        };
        if !part.state.is_streaming() {
            return;
        }
        part.input = preview_input(&part.arguments);
        part.state = ToolCallState::InputComplete;
        self.notify_tool_state(m, p);
        self.notify_change();
    }

    // ━━━ Lookup ━━━

    fn push_message(&mut self, message: UIMessage) -> usize {
        self.messages.push(message);
        let idx = self.messages.len() - 1;
        let message = &self.messages[idx];
        self.notify(|o| o.on_message_created(message));
        self.notify_change();
        idx
    }

    fn unique_id(&self, base: &str) -> String {
        let taken = |id: &str| self.messages.iter().any(|m| m.id == id);
        if !taken(base) {
            return base.to_string();
        }
        (1..)
            .map(|n| format!("{base}-{n}"))
            .find(|id| !taken(id))
            .unwrap_or_else(new_message_id)
    }

    fn locate_call(&self, tool_call_id: &str) -> Option<(usize, usize)> {
        self.locate(|part| part.id == tool_call_id)
    }

    fn locate_approval(&self, approval_id: &str) -> Option<(usize, usize)> {
        self.locate(|part| part.approval.as_ref().is_some_and(|a| a.id == approval_id))
    }

    fn locate(&self, matches: impl Fn(&ToolCallPart) -> bool) -> Option<(usize, usize)> {
        self.messages.iter().enumerate().rev().find_map(|(m, message)| {
            message
                .parts
                .iter()
                .position(|part| part.as_tool_call().is_some_and(&matches))
                .map(|p| (m, p))
        })
    }

    fn locate_or_create_call(
        &mut self,
        chunk: &StreamChunk,
        tool_call_id: &str,
        tool_name: &str,
    ) -> (usize, usize) {
        if let Some(found) = self.locate_call(tool_call_id) {
            return found;
        }
        let m = self.ensure_turn(chunk);
        self.close_segment();
        let parts = &mut self.messages[m].parts;
        parts.push(MessagePart::ToolCall(ToolCallPart::new(tool_call_id, tool_name)));
        (m, parts.len() - 1)
    }

    // ━━━ Notification ━━━

    fn notify(&self, f: impl Fn(&dyn StreamObserver)) {
        for observer in &self.observers {
            f(observer.as_ref());
        }
    }

    fn notify_change(&self) {
        self.notify(|o| o.on_messages_change(&self.messages));
    }

    fn notify_segment(&self, kind: SegmentKind, m: usize, content: &str) {
        let id = self.messages[m].id.as_str();
        match kind {
            SegmentKind::Text => self.notify(|o| o.on_text_update(id, content)),
            SegmentKind::Thinking => self.notify(|o| o.on_thinking_update(id, content)),
        }
        self.notify_change();
    }

    fn notify_tool_state(&self, m: usize, p: usize) {
        let message = &self.messages[m];
        if let Some(part) = message.parts[p].as_tool_call() {
            tracing::debug!(tool_call_id = %part.id, state = ?part.state, "tool call state changed");
            self.notify(|o| o.on_tool_call_state_change(&message.id, part));
        }
    }
}

impl Default for StreamProcessor {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for StreamProcessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamProcessor")
            .field("messages", &self.messages.len())
            .field("observers", &self.observers.len())
            .field("streaming", &self.turn.is_some())
            .field("recording", &self.recorder.is_some())
            .finish()
    }
}

/// Move `part` to `next` if the transition is legal. Returns whether it moved.
fn advance(part: &mut ToolCallPart, next: ToolCallState) -> bool {
    if part.state.can_transition_to(next) {
        part.state = next;
        true
    } else {
        false
    }
}

fn preview_input(arguments: &str) -> Option<Value> {
    if arguments.trim().is_empty() {
        Some(Value::Object(serde_json::Map::new()))
    } else {
        parse_partial_json(arguments)
    }
}

/// The new text a chunk carries. Falls back to diffing the accumulated
/// `content` against what the turn has seen when no delta is sent.
fn derive_delta(total: &mut String, delta: Option<&str>, content: &str) -> String {
    let delta = match delta.filter(|d| !d.is_empty()) {
        Some(delta) => delta.to_string(),
        None if content.is_empty() => return String::new(),
        None => match content.strip_prefix(total.as_str()) {
            Some(rest) => rest.to_string(),
            None => {
                total.clear();
                content.to_string()
            }
        },
    };
    total.push_str(&delta);
    delta
}

const STREAM_ENDED_MID_ARGUMENTS: &str = "stream ended before arguments completed";
const STREAM_ENDED_BEFORE_EXECUTION: &str = "stream ended before the call was executed";

fn new_message_id() -> String {
    format!("msg_{}", uuid::Uuid::new_v4().simple())
}

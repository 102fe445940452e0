//! Observers for testing.
//!
//! Available behind the `test-utils` feature flag.

use std::sync::{Mutex, PoisonError};

use serde_json::Value;
use weft_types::{ToolCallPart, ToolCallState, UIMessage};

use crate::observer::StreamObserver;

/// One notification received by a [`LoggingObserver`].
#[derive(Debug, Clone, PartialEq)]
pub enum ObservedEvent {
    /// `on_message_created`.
    MessageCreated(String),
    /// `on_messages_change`, with the message count.
    MessagesChanged(usize),
    /// `on_text_update`.
    Text(String),
    /// `on_thinking_update`.
    Thinking(String),
    /// `on_tool_call_state_change`.
    ToolState(String, ToolCallState),
    /// `on_tool_input_available`.
    ToolInput(String, Value),
    /// `on_approval_request`, with the approval id.
    Approval(String),
    /// `on_stream_end`.
    StreamEnd(String),
    /// `on_error`.
    Error(String),
}

/// An observer that records every notification.
/// Use `.events()` to inspect what was recorded.
#[derive(Debug, Default)]
pub struct LoggingObserver {
    events: Mutex<Vec<ObservedEvent>>,
}

impl LoggingObserver {
    /// Create an empty observer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything recorded so far.
    pub fn events(&self) -> Vec<ObservedEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Text updates only, in order.
    pub fn text_updates(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                ObservedEvent::Text(t) => Some(t),
                _ => None,
            })
            .collect()
    }

    /// States reported for one tool call, in order.
    pub fn tool_states(&self, tool_call_id: &str) -> Vec<ToolCallState> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                ObservedEvent::ToolState(id, state) if id == tool_call_id => Some(state),
                _ => None,
            })
            .collect()
    }

    fn push(&self, event: ObservedEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }
}

impl StreamObserver for LoggingObserver {
    fn on_message_created(&self, message: &UIMessage) {
        self.push(ObservedEvent::MessageCreated(message.id.clone()));
    }

    fn on_messages_change(&self, messages: &[UIMessage]) {
        self.push(ObservedEvent::MessagesChanged(messages.len()));
    }

    fn on_text_update(&self, _message_id: &str, content: &str) {
        self.push(ObservedEvent::Text(content.to_string()));
    }

    fn on_thinking_update(&self, _message_id: &str, content: &str) {
        self.push(ObservedEvent::Thinking(content.to_string()));
    }

    fn on_tool_call_state_change(&self, _message_id: &str, part: &ToolCallPart) {
        self.push(ObservedEvent::ToolState(part.id.clone(), part.state));
    }

    fn on_tool_input_available(&self, tool_call_id: &str, _tool_name: &str, input: &Value) {
        self.push(ObservedEvent::ToolInput(tool_call_id.to_string(), input.clone()));
    }

    fn on_approval_request(&self, _message_id: &str, part: &ToolCallPart) {
        let id = part.approval.as_ref().map(|a| a.id.clone()).unwrap_or_default();
        self.push(ObservedEvent::Approval(id));
    }

    fn on_stream_end(&self, message: &UIMessage) {
        self.push(ObservedEvent::StreamEnd(message.id.clone()));
    }

    fn on_error(&self, message: &str) {
        self.push(ObservedEvent::Error(message.to_string()));
    }
}

//! The observer interface: one notification path for every state change.

use serde_json::Value;
use weft_types::{ToolCallPart, UIMessage};

/// Receives notifications from a [`StreamProcessor`](crate::StreamProcessor).
///
/// Every method defaults to a no-op; implement the ones you need.
/// Notifications are fire-and-forget. The processor never inspects what an
/// observer does, and observers only ever see immutable borrows.
pub trait StreamObserver: Send + Sync {
    /// A new message was appended.
    fn on_message_created(&self, _message: &UIMessage) {}

    /// The message list changed in any way.
    fn on_messages_change(&self, _messages: &[UIMessage]) {}

    /// A text part's content changed. `content` is the part's full text.
    fn on_text_update(&self, _message_id: &str, _content: &str) {}

    /// A thinking part's content changed.
    fn on_thinking_update(&self, _message_id: &str, _content: &str) {}

    /// A tool call moved to a new state.
    fn on_tool_call_state_change(&self, _message_id: &str, _part: &ToolCallPart) {}

    /// A call needs the client to run it.
    fn on_tool_input_available(&self, _tool_call_id: &str, _tool_name: &str, _input: &Value) {}

    /// A call waits for a human decision. `part.approval` holds the request.
    fn on_approval_request(&self, _message_id: &str, _part: &ToolCallPart) {}

    /// A turn ended.
    fn on_stream_end(&self, _message: &UIMessage) {}

    /// The upstream reported an error.
    fn on_error(&self, _message: &str) {}
}

//! UI-facing messages and the model-facing wire messages.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Author of a [`UIMessage`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UiRole {
    /// A human user.
    User,
    /// The model.
    Assistant,
}

/// Lifecycle of a tool call as seen by the UI.
///
/// Legal moves: `AwaitingInput → InputStreaming → InputComplete`, then
/// either `ApprovalRequested → Executing | Cancelled` or straight to
/// `Executing`, and from `Executing` to `OutputAvailable | OutputError`.
/// `AwaitingInput` may skip to `InputComplete` when a call has no
/// arguments. The three output states are terminal.
///
/// A stream that ends abruptly closes any open call with `OutputError`
/// outside these edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ToolCallState {
    /// Registered, no argument text yet.
    AwaitingInput,
    /// Argument text is arriving.
    InputStreaming,
    /// Arguments are complete.
    InputComplete,
    /// Waiting for a human decision.
    ApprovalRequested,
    /// Running.
    Executing,
    /// Finished with output.
    OutputAvailable,
    /// Finished with an error.
    OutputError,
    /// Denied; never executes.
    Cancelled,
}

impl ToolCallState {
    /// Whether no further transition is possible.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            ToolCallState::OutputAvailable | ToolCallState::OutputError | ToolCallState::Cancelled
        )
    }

    /// Whether the arguments are still arriving.
    pub fn is_streaming(self) -> bool {
        matches!(
            self,
            ToolCallState::AwaitingInput | ToolCallState::InputStreaming
        )
    }

    /// Whether moving from `self` to `next` is a legal transition.
    pub fn can_transition_to(self, next: ToolCallState) -> bool {
        use ToolCallState::*;
        matches!(
            (self, next),
            (AwaitingInput, InputStreaming | InputComplete)
                | (InputStreaming, InputComplete)
                | (InputComplete, ApprovalRequested | Executing)
                | (ApprovalRequested, Executing | Cancelled)
                | (Executing, OutputAvailable | OutputError)
        )
    }
}

/// A human decision gate on a tool call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalRequest {
    /// Approval id.
    pub id: String,
    /// `None` while pending. Set once.
    #[serde(default)]
    pub approved: Option<bool>,
}

impl ApprovalRequest {
    /// A pending request.
    pub fn pending(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            approved: None,
        }
    }

    /// Whether a decision is still outstanding.
    pub fn is_pending(&self) -> bool {
        self.approved.is_none()
    }
}

/// A tool call rendered in a message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolCallPart {
    /// Provider-assigned call id.
    pub id: String,
    /// Tool name. Empty until the header fragment arrives.
    pub name: String,
    /// Raw concatenated argument text.
    pub arguments: String,
    /// Best-effort parse of `arguments`, for preview only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<serde_json::Value>,
    /// Lifecycle state.
    pub state: ToolCallState,
    /// Approval gate, when the tool requires one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approval: Option<ApprovalRequest>,
    /// Output once the call finished.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<serde_json::Value>,
}

impl ToolCallPart {
    /// A freshly registered call.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments: String::new(),
            input: None,
            state: ToolCallState::AwaitingInput,
            approval: None,
            output: None,
        }
    }
}

/// Outcome recorded in a [`ToolResultPart`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ToolResultState {
    /// The tool produced output.
    Complete,
    /// The tool failed.
    Error,
}

/// A tool result rendered in a message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolResultPart {
    /// The call this result answers.
    pub tool_call_id: String,
    /// Output text as sent to the model.
    pub output: String,
    /// Outcome.
    pub state: ToolResultState,
    /// Error description when `state` is `Error`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_text: Option<String>,
}

/// One ordered piece of a [`UIMessage`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum MessagePart {
    /// Visible text.
    Text {
        /// The text.
        content: String,
    },
    /// Reasoning trace. UI only.
    Thinking {
        /// The reasoning text.
        content: String,
    },
    /// A tool call.
    ToolCall(ToolCallPart),
    /// A tool result.
    ToolResult(ToolResultPart),
}

impl MessagePart {
    /// A text part.
    pub fn text(content: impl Into<String>) -> Self {
        MessagePart::Text {
            content: content.into(),
        }
    }

    /// A thinking part.
    pub fn thinking(content: impl Into<String>) -> Self {
        MessagePart::Thinking {
            content: content.into(),
        }
    }

    /// The tool call, if this part is one.
    pub fn as_tool_call(&self) -> Option<&ToolCallPart> {
        match self {
            MessagePart::ToolCall(part) => Some(part),
            _ => None,
        }
    }

    /// The tool call, mutably, if this part is one.
    pub fn as_tool_call_mut(&mut self) -> Option<&mut ToolCallPart> {
        match self {
            MessagePart::ToolCall(part) => Some(part),
            _ => None,
        }
    }
}

/// A message as the UI renders it: an ordered list of parts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UIMessage {
    /// Message id.
    pub id: String,
    /// Author.
    pub role: UiRole,
    /// Parts in arrival order.
    pub parts: Vec<MessagePart>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

impl UIMessage {
    /// An empty message.
    pub fn new(id: impl Into<String>, role: UiRole, created_at: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            role,
            parts: Vec::new(),
            created_at,
        }
    }

    /// Concatenated text of all text parts.
    pub fn text(&self) -> String {
        self.parts
            .iter()
            .filter_map(|part| match part {
                MessagePart::Text { content } => Some(content.as_str()),
                _ => None,
            })
            .collect()
    }

    /// All tool-call parts in order.
    pub fn tool_calls(&self) -> impl Iterator<Item = &ToolCallPart> {
        self.parts.iter().filter_map(MessagePart::as_tool_call)
    }

    /// The tool-call part with `id`.
    pub fn tool_call(&self, id: &str) -> Option<&ToolCallPart> {
        self.tool_calls().find(|part| part.id == id)
    }
}

/// Role of a [`ModelMessage`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelRole {
    /// Instructions.
    System,
    /// User input.
    User,
    /// Model output.
    Assistant,
    /// A tool result.
    Tool,
}

/// A tool call as the model sees it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelToolCall {
    /// Call id.
    pub id: String,
    /// Tool name.
    pub name: String,
    /// Raw JSON arguments.
    pub arguments: String,
}

/// A message in the shape the model consumes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelMessage {
    /// Author.
    pub role: ModelRole,
    /// Text content.
    #[serde(default)]
    pub content: Option<String>,
    /// Tool calls made by an assistant message.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ModelToolCall>,
    /// Call answered by a tool message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl ModelMessage {
    fn with_role(role: ModelRole, content: Option<String>) -> Self {
        Self {
            role,
            content,
            tool_calls: Vec::new(),
            tool_call_id: None,
        }
    }

    /// A system message.
    pub fn system(text: impl Into<String>) -> Self {
        Self::with_role(ModelRole::System, Some(text.into()))
    }

    /// A user message.
    pub fn user(text: impl Into<String>) -> Self {
        Self::with_role(ModelRole::User, Some(text.into()))
    }

    /// An assistant message with text only.
    pub fn assistant(text: impl Into<String>) -> Self {
        Self::with_role(ModelRole::Assistant, Some(text.into()))
    }

    /// A tool-result message.
    pub fn tool(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            tool_call_id: Some(tool_call_id.into()),
            ..Self::with_role(ModelRole::Tool, Some(content.into()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ToolCallState::*;

    #[test]
    fn forward_transitions_allowed() {
        assert!(AwaitingInput.can_transition_to(InputStreaming));
        assert!(AwaitingInput.can_transition_to(InputComplete));
        assert!(InputStreaming.can_transition_to(InputComplete));
        assert!(InputComplete.can_transition_to(ApprovalRequested));
        assert!(InputComplete.can_transition_to(Executing));
        assert!(ApprovalRequested.can_transition_to(Executing));
        assert!(ApprovalRequested.can_transition_to(Cancelled));
        assert!(Executing.can_transition_to(OutputError));
    }

    #[test]
    fn backward_and_terminal_transitions_rejected() {
        assert!(!InputComplete.can_transition_to(InputStreaming));
        assert!(!Executing.can_transition_to(ApprovalRequested));
        assert!(!InputStreaming.can_transition_to(InputStreaming));
        assert!(!OutputAvailable.can_transition_to(OutputError));
        assert!(!Cancelled.can_transition_to(Executing));
        assert!(!OutputError.can_transition_to(Cancelled));
    }

    #[test]
    fn outputs_only_from_executing() {
        assert!(!InputStreaming.can_transition_to(OutputAvailable));
        assert!(!AwaitingInput.can_transition_to(OutputAvailable));
        assert!(!InputComplete.can_transition_to(OutputAvailable));
        assert!(!InputComplete.can_transition_to(OutputError));
        assert!(!ApprovalRequested.can_transition_to(OutputAvailable));
        assert!(Executing.can_transition_to(OutputAvailable));
    }

    #[test]
    fn no_skipping_ahead_while_streaming() {
        assert!(!AwaitingInput.can_transition_to(Executing));
        assert!(!InputStreaming.can_transition_to(ApprovalRequested));
        assert!(!InputStreaming.can_transition_to(Executing));
    }

    #[test]
    fn cancel_only_from_approval() {
        assert!(!InputComplete.can_transition_to(Cancelled));
        assert!(!Executing.can_transition_to(Cancelled));
        assert!(!AwaitingInput.can_transition_to(Cancelled));
    }

    #[test]
    fn state_serializes_kebab_case() {
        assert_eq!(
            serde_json::to_string(&ApprovalRequested).unwrap(),
            "\"approval-requested\""
        );
        assert_eq!(
            serde_json::to_string(&OutputAvailable).unwrap(),
            "\"output-available\""
        );
    }

    #[test]
    fn part_tags() {
        let part = MessagePart::ToolCall(ToolCallPart::new("c1", "get_weather"));
        let value = serde_json::to_value(&part).unwrap();
        assert_eq!(value["type"], "tool-call");
        assert_eq!(value["state"], "awaiting-input");
        let back: MessagePart = serde_json::from_value(value).unwrap();
        assert_eq!(back, part);

        let text = serde_json::to_value(MessagePart::text("hi")).unwrap();
        assert_eq!(text["type"], "text");
    }

    #[test]
    fn message_text_joins_text_parts_only() {
        let mut msg = UIMessage::new("m1", UiRole::Assistant, Utc::now());
        msg.parts.push(MessagePart::text("Hello"));
        msg.parts.push(MessagePart::thinking("hmm"));
        msg.parts.push(MessagePart::text(" world"));
        assert_eq!(msg.text(), "Hello world");
    }

    #[test]
    fn tool_message_constructor() {
        let msg = ModelMessage::tool("c1", "72F");
        assert_eq!(msg.role, ModelRole::Tool);
        assert_eq!(msg.tool_call_id.as_deref(), Some("c1"));
        assert_eq!(msg.content.as_deref(), Some("72F"));
    }
}

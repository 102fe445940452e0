//! Stream chunks, the discrete events a model response is made of.
//!
//! A turn is a run of chunks ending in exactly one [`ChunkKind::Done`] or
//! [`ChunkKind::Error`]. Every chunk carries the response `id`, the `model`
//! that produced it and a Unix-millisecond `timestamp`.

use serde::{Deserialize, Serialize};

/// Why the model stopped generating.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    /// Model produced a final response.
    Stop,
    /// Hit the output token limit.
    Length,
    /// Model wants tools executed.
    ToolCalls,
    /// Content was filtered by safety.
    ContentFilter,
}

/// Token usage reported on the terminal `done` chunk.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Usage {
    /// Prompt tokens consumed.
    pub prompt_tokens: u64,
    /// Completion tokens generated.
    pub completion_tokens: u64,
    /// Total tokens.
    pub total_tokens: u64,
}

/// Role hint carried by a `content` chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChunkRole {
    /// The assistant.
    Assistant,
}

/// One fragment of a streamed tool call.
///
/// Providers usually send `id` and `name` on the first fragment of a call
/// only, then address later fragments by index.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCallFragment {
    /// Provider-assigned call id, if present on this fragment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Tool name, if present on this fragment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Raw argument text to append.
    #[serde(default)]
    pub arguments: String,
}

impl ToolCallFragment {
    /// The id, treating an empty string as absent.
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref().filter(|id| !id.is_empty())
    }

    /// The name, treating an empty string as absent.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref().filter(|name| !name.is_empty())
    }
}

/// Approval metadata on an `approval-requested` chunk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApprovalMeta {
    /// Approval id to answer with.
    pub id: String,
    /// Always `true` on the wire.
    pub needs_approval: bool,
}

/// The payload of a [`StreamChunk`].
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all_fields = "camelCase")]
pub enum ChunkKind {
    /// Assistant text.
    #[serde(rename = "content")]
    Content {
        /// The new text.
        delta: String,
        /// All text streamed so far in this turn.
        #[serde(default)]
        content: String,
        /// Optional role hint.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        role: Option<ChunkRole>,
    },

    /// Reasoning trace. Rendered, never sent back to the model.
    #[serde(rename = "thinking")]
    Thinking {
        /// The new reasoning text, when the provider sends deltas.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        delta: Option<String>,
        /// All reasoning streamed so far in this turn.
        #[serde(default)]
        content: String,
    },

    /// A tool-call fragment.
    #[serde(rename = "tool_call")]
    ToolCall {
        /// The fragment.
        tool_call: ToolCallFragment,
        /// Provider index of the call within the turn.
        index: usize,
    },

    /// A complete call with no local executor; the client must run it.
    #[serde(rename = "tool-input-available")]
    ToolInputAvailable {
        /// The call id.
        tool_call_id: String,
        /// The tool name.
        tool_name: String,
        /// Parsed input.
        input: serde_json::Value,
    },

    /// A complete call that waits for a human decision.
    #[serde(rename = "approval-requested")]
    ApprovalRequested {
        /// The call id.
        tool_call_id: String,
        /// The tool name.
        tool_name: String,
        /// Parsed input.
        input: serde_json::Value,
        /// Approval metadata.
        approval: ApprovalMeta,
    },

    /// Output of an executed call.
    #[serde(rename = "tool_result")]
    ToolResult {
        /// The call id.
        tool_call_id: String,
        /// Output text.
        content: String,
        /// Whether the output describes a failure.
        #[serde(default, skip_serializing_if = "std::ops::Not::not")]
        is_error: bool,
    },

    /// Normal end of a turn.
    #[serde(rename = "done")]
    Done {
        /// Why the model stopped.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        finish_reason: Option<FinishReason>,
        /// Token usage, when reported.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        usage: Option<Usage>,
    },

    /// Upstream failure; ends the turn.
    #[serde(rename = "error")]
    Error {
        /// Error message.
        message: String,
        /// Provider error code.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        code: Option<String>,
    },

    /// A chunk type this crate does not know.
    #[serde(other)]
    Unknown,
}

impl ChunkKind {
    /// The wire discriminant.
    pub fn type_name(&self) -> &'static str {
        match self {
            ChunkKind::Content { .. } => "content",
            ChunkKind::Thinking { .. } => "thinking",
            ChunkKind::ToolCall { .. } => "tool_call",
            ChunkKind::ToolInputAvailable { .. } => "tool-input-available",
            ChunkKind::ApprovalRequested { .. } => "approval-requested",
            ChunkKind::ToolResult { .. } => "tool_result",
            ChunkKind::Done { .. } => "done",
            ChunkKind::Error { .. } => "error",
            ChunkKind::Unknown => "unknown",
        }
    }
}

/// One event in a model response stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamChunk {
    /// Response id assigned by the provider.
    pub id: String,
    /// Model that produced the chunk.
    pub model: String,
    /// Unix timestamp in milliseconds.
    pub timestamp: u64,
    /// The event payload.
    #[serde(flatten)]
    pub kind: ChunkKind,
}

impl StreamChunk {
    /// Create a chunk with explicit metadata.
    pub fn new(
        id: impl Into<String>,
        model: impl Into<String>,
        timestamp: u64,
        kind: ChunkKind,
    ) -> Self {
        Self {
            id: id.into(),
            model: model.into(),
            timestamp,
            kind,
        }
    }

    /// A chunk sharing this chunk's `id` and `model`, stamped now.
    pub fn follow_up(&self, kind: ChunkKind) -> Self {
        Self::new(self.id.clone(), self.model.clone(), now_millis(), kind)
    }

    /// Whether this chunk ends a turn.
    pub fn is_terminal(&self) -> bool {
        matches!(self.kind, ChunkKind::Done { .. } | ChunkKind::Error { .. })
    }

    /// The finish reason, if this is a `done` chunk.
    pub fn finish_reason(&self) -> Option<FinishReason> {
        match &self.kind {
            ChunkKind::Done { finish_reason, .. } => *finish_reason,
            _ => None,
        }
    }
}

/// Current Unix time in milliseconds.
pub fn now_millis() -> u64 {
    u64::try_from(chrono::Utc::now().timestamp_millis()).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn chunk(kind: ChunkKind) -> StreamChunk {
        StreamChunk::new("resp_1", "test-model", 1_700_000_000_000, kind)
    }

    #[test]
    fn content_chunk_wire_shape() {
        let c = chunk(ChunkKind::Content {
            delta: "Hi".into(),
            content: "Hi".into(),
            role: Some(ChunkRole::Assistant),
        });
        let value = serde_json::to_value(&c).unwrap();
        assert_eq!(value["type"], "content");
        assert_eq!(value["id"], "resp_1");
        assert_eq!(value["role"], "assistant");
        assert_eq!(value["delta"], "Hi");
    }

    #[test]
    fn approval_chunk_uses_camel_case() {
        let c = chunk(ChunkKind::ApprovalRequested {
            tool_call_id: "c1".into(),
            tool_name: "delete_file".into(),
            input: json!({"path": "/tmp/x"}),
            approval: ApprovalMeta {
                id: "ap_1".into(),
                needs_approval: true,
            },
        });
        let value = serde_json::to_value(&c).unwrap();
        assert_eq!(value["type"], "approval-requested");
        assert_eq!(value["toolCallId"], "c1");
        assert_eq!(value["approval"]["needsApproval"], true);
        let back: StreamChunk = serde_json::from_value(value).unwrap();
        assert_eq!(back, c);
    }

    #[test]
    fn tool_call_fragment_without_header_deserializes() {
        let c: StreamChunk = serde_json::from_value(json!({
            "type": "tool_call",
            "id": "resp_1",
            "model": "m",
            "timestamp": 1,
            "index": 0,
            "toolCall": {"arguments": "ation\":\"SF\"}"}
        }))
        .unwrap();
        match c.kind {
            ChunkKind::ToolCall { tool_call, index } => {
                assert_eq!(index, 0);
                assert!(tool_call.id().is_none());
                assert!(tool_call.name().is_none());
            }
            other => panic!("expected tool_call, got {other:?}"),
        }
    }

    #[test]
    fn unknown_type_becomes_unknown_kind() {
        let c: StreamChunk = serde_json::from_value(json!({
            "type": "step-started",
            "id": "resp_1",
            "model": "m",
            "timestamp": 1,
            "stepId": "s1"
        }))
        .unwrap();
        assert_eq!(c.kind, ChunkKind::Unknown);
        assert_eq!(c.kind.type_name(), "unknown");
    }

    #[test]
    fn done_and_error_are_terminal() {
        assert!(chunk(ChunkKind::Done {
            finish_reason: Some(FinishReason::Stop),
            usage: None
        })
        .is_terminal());
        assert!(chunk(ChunkKind::Error {
            message: "boom".into(),
            code: None
        })
        .is_terminal());
        assert!(!chunk(ChunkKind::Content {
            delta: "x".into(),
            content: "x".into(),
            role: None
        })
        .is_terminal());
    }

    #[test]
    fn tool_result_error_flag_defaults_to_false() {
        let c: StreamChunk = serde_json::from_value(json!({
            "type": "tool_result",
            "id": "r",
            "model": "m",
            "timestamp": 1,
            "toolCallId": "c1",
            "content": "72F"
        }))
        .unwrap();
        assert!(matches!(c.kind, ChunkKind::ToolResult { is_error: false, .. }));
    }

    #[test]
    fn finish_reason_snake_case() {
        assert_eq!(
            serde_json::to_string(&FinishReason::ToolCalls).unwrap(),
            "\"tool_calls\""
        );
    }
}

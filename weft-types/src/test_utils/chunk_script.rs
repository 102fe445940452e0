//! ChunkScript: builds a deterministic chunk sequence for one turn.

use crate::chunk::{
    ApprovalMeta, ChunkKind, ChunkRole, FinishReason, StreamChunk, ToolCallFragment, Usage,
};

/// Fixed start time so scripted turns replay identically.
const BASE_TIMESTAMP: u64 = 1_700_000_000_000;

/// Builds the chunks of one scripted model turn.
///
/// Every chunk shares the script's response id and model. Timestamps start
/// at a fixed instant and advance by one millisecond per chunk, and the
/// accumulated `content` fields are tracked for you.
#[derive(Debug, Clone)]
pub struct ChunkScript {
    id: String,
    model: String,
    timestamp: u64,
    text: String,
    thinking: String,
    chunks: Vec<StreamChunk>,
}

impl ChunkScript {
    /// Start a script for response `id` produced by `model`.
    pub fn new(id: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            model: model.into(),
            timestamp: BASE_TIMESTAMP,
            text: String::new(),
            thinking: String::new(),
            chunks: Vec::new(),
        }
    }

    /// Override the timestamp of the next chunk.
    pub fn at(mut self, timestamp: u64) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Append a chunk of any kind.
    pub fn chunk(mut self, kind: ChunkKind) -> Self {
        self.chunks.push(StreamChunk::new(
            self.id.clone(),
            self.model.clone(),
            self.timestamp,
            kind,
        ));
        self.timestamp += 1;
        self
    }

    /// Append a `content` delta.
    pub fn content(mut self, delta: &str) -> Self {
        self.text.push_str(delta);
        let content = self.text.clone();
        self.chunk(ChunkKind::Content {
            delta: delta.to_string(),
            content,
            role: Some(ChunkRole::Assistant),
        })
    }

    /// Append a `thinking` delta.
    pub fn thinking(mut self, delta: &str) -> Self {
        self.thinking.push_str(delta);
        let content = self.thinking.clone();
        self.chunk(ChunkKind::Thinking {
            delta: Some(delta.to_string()),
            content,
        })
    }

    /// Append the first fragment of a tool call, carrying id and name.
    pub fn tool_call(self, index: usize, id: &str, name: &str, arguments: &str) -> Self {
        self.chunk(ChunkKind::ToolCall {
            tool_call: ToolCallFragment {
                id: Some(id.to_string()),
                name: Some(name.to_string()),
                arguments: arguments.to_string(),
            },
            index,
        })
    }

    /// Append a continuation fragment addressed by index only.
    pub fn tool_args(self, index: usize, arguments: &str) -> Self {
        self.chunk(ChunkKind::ToolCall {
            tool_call: ToolCallFragment {
                id: None,
                name: None,
                arguments: arguments.to_string(),
            },
            index,
        })
    }

    /// Append a `tool_result`.
    pub fn tool_result(self, tool_call_id: &str, content: &str) -> Self {
        self.chunk(ChunkKind::ToolResult {
            tool_call_id: tool_call_id.to_string(),
            content: content.to_string(),
            is_error: false,
        })
    }

    /// Append an `approval-requested` chunk.
    pub fn approval_requested(
        self,
        tool_call_id: &str,
        tool_name: &str,
        input: serde_json::Value,
        approval_id: &str,
    ) -> Self {
        self.chunk(ChunkKind::ApprovalRequested {
            tool_call_id: tool_call_id.to_string(),
            tool_name: tool_name.to_string(),
            input,
            approval: ApprovalMeta {
                id: approval_id.to_string(),
                needs_approval: true,
            },
        })
    }

    /// Append a `done` chunk.
    pub fn done(self, reason: FinishReason) -> Self {
        self.chunk(ChunkKind::Done {
            finish_reason: Some(reason),
            usage: None,
        })
    }

    /// Append a `done` chunk with usage.
    pub fn done_with_usage(self, reason: FinishReason, usage: Usage) -> Self {
        self.chunk(ChunkKind::Done {
            finish_reason: Some(reason),
            usage: Some(usage),
        })
    }

    /// Append an `error` chunk.
    pub fn error(self, message: &str) -> Self {
        self.chunk(ChunkKind::Error {
            message: message.to_string(),
            code: None,
        })
    }

    /// The scripted chunks.
    pub fn build(self) -> Vec<StreamChunk> {
        self.chunks
    }
}

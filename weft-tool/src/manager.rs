//! Tool-call accumulation and execution for one assistant turn.

use std::collections::HashMap;

use async_stream::stream;
use futures::stream::{BoxStream, FuturesUnordered, StreamExt};
use serde_json::Value;

use weft_types::{
    AccumulatorError, ApprovalMeta, ChunkKind, ModelMessage, ModelToolCall, StreamChunk,
    ToolCallAccumulator, ToolCallFragment, output_to_text,
};

use crate::error::ToolError;
use crate::tool::{Tool, ToolDefinition};

/// Configuration for [`ToolCallManager`].
#[derive(Debug, Clone, Default)]
pub struct ToolManagerConfig {
    /// Run executable calls concurrently. Result chunks then arrive in
    /// completion order; the returned messages stay in call order.
    pub parallel: bool,
}

/// One item of [`ToolCallManager::execute_tools`].
#[derive(Debug, Clone, PartialEq)]
pub enum ToolExecutionEvent {
    /// An executor is about to run for this call.
    Started {
        /// Id of the call being executed.
        tool_call_id: String,
    },
    /// A chunk to feed into the stream processor.
    Chunk(StreamChunk),
    /// Final item: one tool message per completed call, in call order.
    Complete(Vec<ModelMessage>),
}

/// What to do with one accumulated call.
enum Plan {
    Skip,
    Announce(ChunkKind),
    Fail(ToolError),
    Run(Tool, Value),
}

/// Accumulates streamed tool-call fragments and executes the resulting calls.
///
/// Owned by one conversation; [`clear`](Self::clear) resets it between turns.
#[derive(Debug)]
pub struct ToolCallManager {
    tools: HashMap<String, Tool>,
    accumulator: ToolCallAccumulator,
    approvals: HashMap<String, bool>,
    config: ToolManagerConfig,
}

impl ToolCallManager {
    /// A manager for `tools` with sequential execution.
    pub fn new(tools: Vec<Tool>) -> Self {
        Self::with_config(tools, ToolManagerConfig::default())
    }

    /// A manager with explicit configuration.
    pub fn with_config(tools: Vec<Tool>, config: ToolManagerConfig) -> Self {
        Self {
            tools: tools
                .into_iter()
                .map(|tool| (tool.name().to_string(), tool))
                .collect(),
            accumulator: ToolCallAccumulator::new(),
            approvals: HashMap::new(),
            config,
        }
    }

    /// Look up a tool by name.
    pub fn tool(&self, name: &str) -> Option<&Tool> {
        self.tools.get(name)
    }

    /// Definitions of every available tool, sorted by name.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        let mut defs: Vec<_> = self.tools.values().map(Tool::definition).collect();
        defs.sort_by(|a, b| a.name.cmp(&b.name));
        defs
    }

    /// Fold one streamed fragment into the per-turn table.
    ///
    /// A fragment that reuses an index for a different call id is rejected
    /// and logged; accumulated state is left untouched.
    pub fn add_tool_call_chunk(
        &mut self,
        index: usize,
        fragment: &ToolCallFragment,
    ) -> Result<(), AccumulatorError> {
        match self.accumulator.push(index, fragment) {
            Ok(_) => Ok(()),
            Err(err) => {
                tracing::warn!(index, error = %err, "rejected tool call fragment");
                Err(err)
            }
        }
    }

    /// Register an already complete call, placed after every known index.
    pub fn add_tool_call(&mut self, call: &ModelToolCall) -> Result<(), AccumulatorError> {
        let index = self
            .accumulator
            .entries()
            .iter()
            .map(|entry| entry.index + 1)
            .max()
            .unwrap_or(0);
        self.add_tool_call_chunk(
            index,
            &ToolCallFragment {
                id: Some(call.id.clone()),
                name: Some(call.name.clone()),
                arguments: call.arguments.clone(),
            },
        )
    }

    /// Calls with both id and name, in original call order.
    pub fn get_tool_calls(&self) -> Vec<ModelToolCall> {
        self.accumulator
            .complete_calls()
            .into_iter()
            .map(|call| ModelToolCall {
                id: call.id,
                name: call.name,
                arguments: call.arguments,
            })
            .collect()
    }

    /// Whether any complete call has accumulated.
    pub fn has_tool_calls(&self) -> bool {
        self.accumulator
            .entries()
            .iter()
            .any(|entry| entry.is_complete())
    }

    /// Record a human decision for a gated call.
    pub fn set_approval(&mut self, tool_call_id: impl Into<String>, approved: bool) {
        self.approvals.insert(tool_call_id.into(), approved);
    }

    /// Forget accumulated calls and recorded approvals.
    pub fn clear(&mut self) {
        self.accumulator.clear();
        self.approvals.clear();
    }

    /// Execute every accumulated call.
    ///
    /// `done` is the chunk that ended the turn; generated chunks reuse its
    /// response id and model. Yields [`ToolExecutionEvent::Started`] before
    /// each executor runs, one [`ToolExecutionEvent::Chunk`] per announced
    /// or completed call, then exactly one
    /// [`ToolExecutionEvent::Complete`]. Tool failures become error results
    /// and never end the stream early.
    pub fn execute_tools(&self, done: &StreamChunk) -> BoxStream<'static, ToolExecutionEvent> {
        let origin = done.clone();
        let calls = self.get_tool_calls();
        let plans: Vec<Plan> = calls.iter().map(|call| self.plan(call)).collect();
        let parallel = self.config.parallel;

        Box::pin(stream! {
            let mut messages: Vec<Option<ModelMessage>> = vec![None; calls.len()];
            let mut pending = Vec::new();

            for (pos, (call, plan)) in calls.iter().zip(plans).enumerate() {
                match plan {
                    Plan::Skip => {
                        tracing::debug!(tool_call_id = %call.id, "skipping denied tool call");
                    }
                    Plan::Announce(kind) => {
                        yield ToolExecutionEvent::Chunk(origin.follow_up(kind));
                    }
                    Plan::Fail(err) => {
                        let (chunk, message) = result_for(&origin, call, Err(err));
                        messages[pos] = Some(message);
                        yield ToolExecutionEvent::Chunk(chunk);
                    }
                    Plan::Run(tool, input) if !parallel => {
                        yield ToolExecutionEvent::Started { tool_call_id: call.id.clone() };
                        let outcome = run_call(call, tool, input).await;
                        let (chunk, message) = result_for(&origin, call, outcome);
                        messages[pos] = Some(message);
                        yield ToolExecutionEvent::Chunk(chunk);
                    }
                    Plan::Run(tool, input) => pending.push((pos, tool, input)),
                }
            }

            for (pos, _, _) in &pending {
                yield ToolExecutionEvent::Started { tool_call_id: calls[*pos].id.clone() };
            }
            let mut running: FuturesUnordered<_> = pending
                .into_iter()
                .map(|(pos, tool, input)| {
                    let call = &calls[pos];
                    async move { (pos, run_call(call, tool, input).await) }
                })
                .collect();
            while let Some((pos, outcome)) = running.next().await {
                let (chunk, message) = result_for(&origin, &calls[pos], outcome);
                messages[pos] = Some(message);
                yield ToolExecutionEvent::Chunk(chunk);
            }

            yield ToolExecutionEvent::Complete(messages.into_iter().flatten().collect());
        })
    }

    fn plan(&self, call: &ModelToolCall) -> Plan {
        let Some(tool) = self.tools.get(&call.name) else {
            return Plan::Fail(ToolError::NotFound(call.name.clone()));
        };

        let parsed = parse_arguments(&call.arguments);

        if tool.needs_approval() {
            match self.approvals.get(&call.id) {
                None => {
                    return Plan::Announce(ChunkKind::ApprovalRequested {
                        tool_call_id: call.id.clone(),
                        tool_name: call.name.clone(),
                        input: preview_input(&parsed, &call.arguments),
                        approval: ApprovalMeta {
                            id: approval_id(&call.id),
                            needs_approval: true,
                        },
                    });
                }
                Some(false) => return Plan::Skip,
                Some(true) => {}
            }
        }

        if !tool.has_executor() {
            return Plan::Announce(ChunkKind::ToolInputAvailable {
                tool_call_id: call.id.clone(),
                tool_name: call.name.clone(),
                input: preview_input(&parsed, &call.arguments),
            });
        }

        match parsed.and_then(|input| tool.validate_input(input)) {
            Ok(input) => Plan::Run(tool.clone(), input),
            Err(err) => Plan::Fail(err),
        }
    }
}

/// The approval id issued for a gated call.
pub fn approval_id(tool_call_id: &str) -> String {
    format!("approval_{tool_call_id}")
}

/// Strict parse of accumulated arguments. Empty text is an empty object.
pub fn parse_arguments(arguments: &str) -> Result<Value, ToolError> {
    if arguments.trim().is_empty() {
        return Ok(Value::Object(serde_json::Map::new()));
    }
    serde_json::from_str(arguments).map_err(|e| ToolError::Parse(e.to_string()))
}

fn preview_input(parsed: &Result<Value, ToolError>, raw: &str) -> Value {
    match parsed {
        Ok(value) => value.clone(),
        Err(_) => Value::String(raw.to_string()),
    }
}

async fn run_call(call: &ModelToolCall, tool: Tool, input: Value) -> Result<Value, ToolError> {
    tracing::debug!(tool = %call.name, tool_call_id = %call.id, "executing tool");
    let outcome = tool.run(input).await;
    match &outcome {
        Ok(_) => tracing::debug!(tool = %call.name, tool_call_id = %call.id, "tool finished"),
        Err(err) => {
            tracing::debug!(tool = %call.name, tool_call_id = %call.id, error = %err, "tool failed")
        }
    }
    outcome
}

fn result_for(
    origin: &StreamChunk,
    call: &ModelToolCall,
    outcome: Result<Value, ToolError>,
) -> (StreamChunk, ModelMessage) {
    let (content, is_error) = match outcome {
        Ok(output) => (output_to_text(&output), false),
        Err(err) => (err.to_string(), true),
    };
    let chunk = origin.follow_up(ChunkKind::ToolResult {
        tool_call_id: call.id.clone(),
        content: content.clone(),
        is_error,
    });
    (chunk, ModelMessage::tool(call.id.clone(), content))
}

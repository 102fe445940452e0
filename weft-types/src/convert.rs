//! Bidirectional conversion between UI messages and model messages.
//!
//! Thinking parts are UI-only and never reach the model. Tool results are
//! emitted as tool-role messages directly after the assistant message that
//! made the calls, in call order.

use chrono::Utc;

use crate::message::{
    MessagePart, ModelMessage, ModelRole, ModelToolCall, ToolCallPart, ToolCallState,
    ToolResultPart, ToolResultState, UIMessage, UiRole,
};

/// Text sent back to the model for a call the user denied.
pub const DENIED_TOOL_OUTPUT: &str = "Tool call was denied by the user.";

/// Render a tool output value as the text a model receives.
///
/// Strings pass through verbatim; anything else is JSON-serialised.
pub fn output_to_text(output: &serde_json::Value) -> String {
    match output {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Convert UI messages to the model wire shape.
pub fn ui_to_model_messages(messages: &[UIMessage]) -> Vec<ModelMessage> {
    let mut out = Vec::with_capacity(messages.len());
    for message in messages {
        match message.role {
            UiRole::User => out.push(ModelMessage::user(message.text())),
            UiRole::Assistant => assistant_to_model(message, &mut out),
        }
    }
    out
}

fn assistant_to_model(message: &UIMessage, out: &mut Vec<ModelMessage>) {
    let text = message.text();
    let calls: Vec<&ToolCallPart> = message
        .tool_calls()
        .filter(|part| !part.state.is_streaming() && !part.name.is_empty())
        .collect();

    if text.is_empty() && calls.is_empty() {
        return;
    }

    out.push(ModelMessage {
        role: ModelRole::Assistant,
        content: (!text.is_empty()).then_some(text),
        tool_calls: calls.iter().map(|part| model_tool_call(part)).collect(),
        tool_call_id: None,
    });

    for part in calls {
        if let Some(content) = tool_output_text(message, part) {
            out.push(ModelMessage::tool(part.id.clone(), content));
        }
    }
}

// Arguments cut off mid-stream are replaced by the parsed preview so the
// model always receives valid JSON.
fn model_tool_call(part: &ToolCallPart) -> ModelToolCall {
    let complete = !part.arguments.is_empty()
        && serde_json::from_str::<serde_json::Value>(&part.arguments).is_ok();
    let arguments = if complete {
        part.arguments.clone()
    } else {
        part.input
            .as_ref()
            .map(|input| input.to_string())
            .unwrap_or_else(|| "{}".to_string())
    };
    ModelToolCall {
        id: part.id.clone(),
        name: part.name.clone(),
        arguments,
    }
}

fn tool_output_text(message: &UIMessage, part: &ToolCallPart) -> Option<String> {
    let result = message.parts.iter().find_map(|p| match p {
        MessagePart::ToolResult(result) if result.tool_call_id == part.id => Some(result),
        _ => None,
    });
    if let Some(result) = result {
        return Some(result.output.clone());
    }
    if let Some(output) = &part.output {
        return Some(output_to_text(output));
    }
    (part.state == ToolCallState::Cancelled).then(|| DENIED_TOOL_OUTPUT.to_string())
}

/// Convert model messages into UI messages.
///
/// System messages have no UI representation and are dropped. A tool
/// message is folded into the assistant message holding its call.
pub fn model_to_ui_messages(messages: &[ModelMessage]) -> Vec<UIMessage> {
    let mut out: Vec<UIMessage> = Vec::with_capacity(messages.len());
    for message in messages {
        match message.role {
            ModelRole::System => {}
            ModelRole::User => {
                let mut ui = UIMessage::new(new_message_id(), UiRole::User, Utc::now());
                ui.parts
                    .push(MessagePart::text(message.content.clone().unwrap_or_default()));
                out.push(ui);
            }
            ModelRole::Assistant => {
                let mut ui = UIMessage::new(new_message_id(), UiRole::Assistant, Utc::now());
                if let Some(text) = message.content.as_deref().filter(|t| !t.is_empty()) {
                    ui.parts.push(MessagePart::text(text));
                }
                for call in &message.tool_calls {
                    let mut part = ToolCallPart::new(call.id.clone(), call.name.clone());
                    part.arguments = call.arguments.clone();
                    part.input = serde_json::from_str(&call.arguments).ok();
                    part.state = ToolCallState::InputComplete;
                    ui.parts.push(MessagePart::ToolCall(part));
                }
                out.push(ui);
            }
            ModelRole::Tool => {
                if let Some(call_id) = message.tool_call_id.as_deref() {
                    attach_tool_result(&mut out, call_id, message.content.as_deref());
                }
            }
        }
    }
    out
}

fn attach_tool_result(out: &mut [UIMessage], call_id: &str, content: Option<&str>) {
    let content = content.unwrap_or_default();
    let Some(message) = out.iter_mut().rev().find(|m| {
        m.role == UiRole::Assistant && m.tool_call(call_id).is_some()
    }) else {
        return;
    };

    if let Some(part) = message
        .parts
        .iter_mut()
        .filter_map(MessagePart::as_tool_call_mut)
        .find(|part| part.id == call_id)
    {
        part.output = Some(
            serde_json::from_str(content)
                .unwrap_or_else(|_| serde_json::Value::String(content.to_string())),
        );
        part.state = ToolCallState::OutputAvailable;
    }
    message.parts.push(MessagePart::ToolResult(ToolResultPart {
        tool_call_id: call_id.to_string(),
        output: content.to_string(),
        state: ToolResultState::Complete,
        error_text: None,
    }));
}

fn new_message_id() -> String {
    format!("msg_{}", uuid::Uuid::new_v4().simple())
}

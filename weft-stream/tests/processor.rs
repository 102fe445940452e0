//! StreamProcessor behaviour driven by scripted chunk sequences.

use std::sync::Arc;

use serde_json::json;
use weft_stream::test_utils::{LoggingObserver, ObservedEvent};
use weft_stream::*;
use weft_types::test_utils::ChunkScript;
use weft_types::*;

fn process(processor: &mut StreamProcessor, chunks: &[StreamChunk]) {
    for chunk in chunks {
        processor.process_chunk(chunk);
    }
}

fn observed(config: ProcessorConfig) -> (StreamProcessor, Arc<LoggingObserver>) {
    let observer = Arc::new(LoggingObserver::new());
    let mut processor = StreamProcessor::with_config(config);
    processor.add_observer(observer.clone());
    (processor, observer)
}

fn only_tool_call(processor: &StreamProcessor) -> &ToolCallPart {
    let calls: Vec<_> = processor.messages().iter().flat_map(|m| m.tool_calls()).collect();
    assert_eq!(calls.len(), 1, "expected exactly one tool call");
    calls[0]
}

fn denial_turn() -> Vec<StreamChunk> {
    ChunkScript::new("resp_1", "test-model")
        .tool_call(0, "call_1", "delete_file", "{\"path\":\"/tmp/x\"}")
        .done(FinishReason::ToolCalls)
        .approval_requested("call_1", "delete_file", json!({"path": "/tmp/x"}), "approval_call_1")
        .build()
}

// ━━━ Text and thinking ━━━

#[test]
fn text_deltas_accumulate_into_one_part() {
    let mut processor = StreamProcessor::new();
    let chunks = ChunkScript::new("resp_1", "test-model")
        .content("Hi")
        .content(" there")
        .done(FinishReason::Stop)
        .build();
    process(&mut processor, &chunks);

    let messages = processor.messages();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].id, "resp_1");
    assert_eq!(messages[0].role, UiRole::Assistant);
    assert_eq!(messages[0].parts, vec![MessagePart::text("Hi there")]);
    assert_eq!(processor.finish_reason(), Some(FinishReason::Stop));
    assert!(!processor.is_streaming());
}

#[test]
fn created_at_comes_from_first_chunk() {
    let mut processor = StreamProcessor::new();
    let chunks = ChunkScript::new("resp_1", "m")
        .at(1_700_000_123_456)
        .content("x")
        .done(FinishReason::Stop)
        .build();
    process(&mut processor, &chunks);
    assert_eq!(
        processor.messages()[0].created_at.timestamp_millis(),
        1_700_000_123_456
    );
}

#[test]
fn interleaved_thinking_and_text_keep_arrival_order() {
    let mut processor = StreamProcessor::new();
    let chunks = ChunkScript::new("resp_1", "m")
        .thinking("Let me ")
        .thinking("think.")
        .content("Answer")
        .thinking("Second thought")
        .content(" continued")
        .done(FinishReason::Stop)
        .build();
    process(&mut processor, &chunks);

    assert_eq!(
        processor.messages()[0].parts,
        vec![
            MessagePart::thinking("Let me think."),
            MessagePart::text("Answer"),
            MessagePart::thinking("Second thought"),
            MessagePart::text(" continued"),
        ]
    );
}

#[test]
fn thinking_without_delta_is_diffed_from_content() {
    let mut processor = StreamProcessor::new();
    for content in ["Step", "Step one", "Step one."] {
        processor.process_chunk(&StreamChunk::new(
            "r",
            "m",
            1,
            ChunkKind::Thinking {
                delta: None,
                content: content.into(),
            },
        ));
    }
    processor.finalize_stream();
    assert_eq!(
        processor.messages()[0].parts,
        vec![MessagePart::thinking("Step one.")]
    );
}

#[test]
fn thinking_never_reaches_model_messages() {
    let mut processor = StreamProcessor::new();
    processor.add_user_message("What is 2+2?");
    let chunks = ChunkScript::new("resp_1", "m")
        .thinking("simple arithmetic")
        .content("4")
        .done(FinishReason::Stop)
        .build();
    process(&mut processor, &chunks);

    let model = processor.to_model_messages();
    assert_eq!(model.len(), 2);
    assert_eq!(model[0], ModelMessage::user("What is 2+2?"));
    assert_eq!(model[1].content.as_deref(), Some("4"));
}

// ━━━ Throttling ━━━

#[test]
fn immediate_strategy_reports_every_delta() {
    let (mut processor, observer) = observed(ProcessorConfig::default());
    let chunks = ChunkScript::new("r", "m")
        .content("a")
        .content("b")
        .content("c")
        .done(FinishReason::Stop)
        .build();
    process(&mut processor, &chunks);
    assert_eq!(observer.text_updates(), ["a", "ab", "abc"]);
}

#[test]
fn batch_strategy_throttles_but_flushes_at_end() {
    let (mut processor, observer) = observed(ProcessorConfig::with_strategy(BatchStrategy::new(2)));
    let chunks = ChunkScript::new("r", "m")
        .content("a")
        .content("b")
        .content("c")
        .done(FinishReason::Stop)
        .build();
    process(&mut processor, &chunks);
    assert_eq!(observer.text_updates(), ["ab", "abc"]);
    assert_eq!(processor.messages()[0].text(), "abc");
}

#[test]
fn segment_switch_flushes_pending_text() {
    let (mut processor, observer) = observed(ProcessorConfig::with_strategy(PunctuationStrategy));
    let chunks = ChunkScript::new("r", "m")
        .content("Hello")
        .thinking("hmm")
        .done(FinishReason::Stop)
        .build();
    process(&mut processor, &chunks);

    let updates: Vec<_> = observer
        .events()
        .into_iter()
        .filter(|e| matches!(e, ObservedEvent::Text(_) | ObservedEvent::Thinking(_)))
        .collect();
    assert_eq!(
        updates,
        [
            ObservedEvent::Text("Hello".into()),
            ObservedEvent::Thinking("hmm".into()),
        ]
    );
}

// ━━━ Tool calls ━━━

#[test]
fn split_arguments_produce_one_tool_call_with_parsed_input() {
    let mut processor = StreamProcessor::new();
    let chunks = ChunkScript::new("resp_1", "m")
        .tool_call(0, "call_1", "get_weather", "{\"loc")
        .tool_args(0, "ation\":\"SF\"}")
        .done(FinishReason::ToolCalls)
        .build();
    process(&mut processor, &chunks);

    let call = only_tool_call(&processor);
    assert_eq!(call.name, "get_weather");
    assert_eq!(call.arguments, r#"{"location":"SF"}"#);
    assert_eq!(call.input, Some(json!({"location": "SF"})));
    assert_eq!(call.state, ToolCallState::InputComplete);
}

#[test]
fn streaming_call_exposes_preview_input() {
    let mut processor = StreamProcessor::new();
    let chunks = ChunkScript::new("resp_1", "m")
        .tool_call(0, "call_1", "get_weather", "{\"location\":\"San Fr")
        .build();
    process(&mut processor, &chunks);

    let call = only_tool_call(&processor);
    assert_eq!(call.state, ToolCallState::InputStreaming);
    assert_eq!(call.input, Some(json!({"location": "San Fr"})));
}

#[test]
fn new_index_completes_previous_call() {
    let (mut processor, observer) = observed(ProcessorConfig::default());
    let chunks = ChunkScript::new("r", "m")
        .tool_call(0, "c1", "a", "{\"x\":1}")
        .tool_call(1, "c2", "b", "{")
        .build();
    process(&mut processor, &chunks);

    let message = &processor.messages()[0];
    assert_eq!(message.tool_call("c1").unwrap().state, ToolCallState::InputComplete);
    assert_eq!(message.tool_call("c2").unwrap().state, ToolCallState::InputStreaming);
    assert_eq!(
        observer.tool_states("c1"),
        [ToolCallState::InputStreaming, ToolCallState::InputComplete]
    );
}

#[test]
fn text_after_tool_call_completes_it() {
    let mut processor = StreamProcessor::new();
    let chunks = ChunkScript::new("r", "m")
        .tool_call(0, "c1", "a", "{}")
        .content("Calling a now")
        .build();
    process(&mut processor, &chunks);

    let message = &processor.messages()[0];
    assert_eq!(message.tool_call("c1").unwrap().state, ToolCallState::InputComplete);
    assert!(matches!(message.parts[1], MessagePart::Text { .. }));
}

#[test]
fn index_reuse_for_another_id_is_rejected() {
    let mut processor = StreamProcessor::new();
    let chunks = ChunkScript::new("r", "m")
        .tool_call(0, "c1", "a", "{}")
        .tool_call(0, "c2", "b", "{\"y\":2}")
        .done(FinishReason::ToolCalls)
        .build();
    process(&mut processor, &chunks);

    let call = only_tool_call(&processor);
    assert_eq!(call.id, "c1");
    assert_eq!(call.arguments, "{}");
}

#[test]
fn fragments_before_header_are_adopted() {
    let mut processor = StreamProcessor::new();
    let chunks = ChunkScript::new("r", "m")
        .tool_args(0, "{\"q\":")
        .tool_call(0, "c1", "search", "\"rust\"}")
        .done(FinishReason::ToolCalls)
        .build();
    process(&mut processor, &chunks);

    let call = only_tool_call(&processor);
    assert_eq!(call.input, Some(json!({"q": "rust"})));
}

#[test]
fn same_id_on_new_index_keeps_streaming() {
    let (mut processor, observer) = observed(ProcessorConfig::default());
    let chunks = ChunkScript::new("r", "m")
        .tool_call(0, "c1", "search", "{\"q\":")
        .tool_call(3, "c1", "search", "\"ru")
        .build();
    process(&mut processor, &chunks);

    let call = only_tool_call(&processor);
    assert_eq!(call.state, ToolCallState::InputStreaming);
    assert_eq!(call.arguments, r#"{"q":"ru"#);
    assert_eq!(observer.tool_states("c1"), [ToolCallState::InputStreaming]);
}

#[test]
fn empty_content_chunk_does_not_duplicate_text() {
    let mut processor = StreamProcessor::new();
    for (delta, content) in [("Hi", "Hi"), ("", ""), ("", "Hi there")] {
        processor.process_chunk(&StreamChunk::new(
            "r",
            "m",
            1,
            ChunkKind::Content {
                delta: delta.into(),
                content: content.into(),
                role: None,
            },
        ));
    }
    processor.finalize_stream();
    assert_eq!(processor.messages()[0].parts, vec![MessagePart::text("Hi there")]);
}

#[test]
fn tool_result_chunk_passes_through_executing() {
    let (mut processor, observer) = observed(ProcessorConfig::default());
    let chunks = ChunkScript::new("r", "m")
        .tool_call(0, "c1", "get_weather", "{\"location\":\"SF\"}")
        .done(FinishReason::ToolCalls)
        .tool_result("c1", "72F")
        .build();
    process(&mut processor, &chunks);
    assert_eq!(
        observer.tool_states("c1"),
        [
            ToolCallState::InputStreaming,
            ToolCallState::InputComplete,
            ToolCallState::Executing,
            ToolCallState::OutputAvailable,
        ]
    );
}

#[test]
fn start_tool_execution_marks_call_running() {
    let mut processor = StreamProcessor::new();
    let chunks = ChunkScript::new("r", "m")
        .tool_call(0, "c1", "get_weather", "{}")
        .done(FinishReason::ToolCalls)
        .build();
    process(&mut processor, &chunks);

    processor.start_tool_execution("c1").unwrap();
    assert_eq!(only_tool_call(&processor).state, ToolCallState::Executing);
    processor.start_tool_execution("c1").unwrap();
    assert_eq!(
        processor.start_tool_execution("nope"),
        Err(ProcessorError::ToolCallNotFound("nope".into()))
    );

    processor.add_tool_result("c1", json!("sunny"), None).unwrap();
    assert!(matches!(
        processor.start_tool_execution("c1"),
        Err(ProcessorError::InvalidTransition { from: ToolCallState::OutputAvailable, .. })
    ));
}

#[test]
fn pending_approval_cannot_start_execution() {
    let mut processor = StreamProcessor::new();
    process(&mut processor, &denial_turn());
    assert!(matches!(
        processor.start_tool_execution("call_1"),
        Err(ProcessorError::InvalidTransition { .. })
    ));
    assert_eq!(only_tool_call(&processor).state, ToolCallState::ApprovalRequested);
}

#[test]
fn abort_tool_call_closes_open_call() {
    let mut processor = StreamProcessor::new();
    let chunks = ChunkScript::new("r", "m")
        .tool_call(0, "c1", "work", "{}")
        .done(FinishReason::ToolCalls)
        .build();
    process(&mut processor, &chunks);

    processor.abort_tool_call("c1", "not run").unwrap();
    let call = only_tool_call(&processor);
    assert_eq!(call.state, ToolCallState::OutputError);
    assert_eq!(call.output, Some(json!("not run")));
    assert!(matches!(
        processor.abort_tool_call("c1", "again"),
        Err(ProcessorError::InvalidTransition { .. })
    ));

    let model = processor.to_model_messages();
    assert_eq!(model[1], ModelMessage::tool("c1", "not run"));
}

#[test]
fn tool_result_chunk_completes_call() {
    let mut processor = StreamProcessor::new();
    let chunks = ChunkScript::new("r", "m")
        .tool_call(0, "c1", "get_weather", "{\"location\":\"SF\"}")
        .done(FinishReason::ToolCalls)
        .tool_result("c1", "72F")
        .build();
    process(&mut processor, &chunks);

    let message = &processor.messages()[0];
    let call = message.tool_call("c1").unwrap();
    assert_eq!(call.state, ToolCallState::OutputAvailable);
    assert_eq!(call.output, Some(json!("72F")));
    assert!(matches!(
        message.parts.last(),
        Some(MessagePart::ToolResult(r)) if r.output == "72F" && r.state == ToolResultState::Complete
    ));

    let model = processor.to_model_messages();
    assert_eq!(model.len(), 2);
    assert_eq!(model[1], ModelMessage::tool("c1", "72F"));
}

#[test]
fn error_tool_result_ends_in_output_error() {
    let mut processor = StreamProcessor::new();
    let mut chunks = ChunkScript::new("r", "m")
        .tool_call(0, "c1", "get_weather", "{}")
        .done(FinishReason::ToolCalls)
        .build();
    chunks.push(StreamChunk::new(
        "r",
        "m",
        5,
        ChunkKind::ToolResult {
            tool_call_id: "c1".into(),
            content: "execution failed: timeout".into(),
            is_error: true,
        },
    ));
    process(&mut processor, &chunks);

    let message = &processor.messages()[0];
    assert_eq!(message.tool_call("c1").unwrap().state, ToolCallState::OutputError);
    match message.parts.last() {
        Some(MessagePart::ToolResult(result)) => {
            assert_eq!(result.state, ToolResultState::Error);
            assert_eq!(result.error_text.as_deref(), Some("execution failed: timeout"));
        }
        other => panic!("expected tool result, got {other:?}"),
    }
}

#[test]
fn client_tool_result_via_add_tool_result() {
    let (mut processor, observer) = observed(ProcessorConfig::default());
    let mut chunks = ChunkScript::new("r", "m")
        .tool_call(0, "c1", "pick_color", "{}")
        .done(FinishReason::ToolCalls)
        .build();
    chunks.push(chunks[0].follow_up(ChunkKind::ToolInputAvailable {
        tool_call_id: "c1".into(),
        tool_name: "pick_color".into(),
        input: json!({}),
    }));
    process(&mut processor, &chunks);
    assert!(observer
        .events()
        .contains(&ObservedEvent::ToolInput("c1".into(), json!({}))));

    processor
        .add_tool_result("c1", json!({"color": "teal"}), None)
        .unwrap();
    let call = only_tool_call(&processor);
    assert_eq!(call.state, ToolCallState::OutputAvailable);
    assert_eq!(call.output, Some(json!({"color": "teal"})));

    let err = processor.add_tool_result("c1", json!("again"), None).unwrap_err();
    assert!(matches!(err, ProcessorError::InvalidTransition { .. }));
    assert!(matches!(
        processor.add_tool_result("nope", json!(1), None),
        Err(ProcessorError::ToolCallNotFound(_))
    ));
}

#[test]
fn tool_result_for_unknown_call_opens_a_turn() {
    let mut processor = StreamProcessor::new();
    let chunks = ChunkScript::new("r", "m").tool_result("ghost", "boo").build();
    process(&mut processor, &chunks);
    assert_eq!(processor.messages().len(), 1);
    assert!(matches!(
        &processor.messages()[0].parts[0],
        MessagePart::ToolResult(r) if r.tool_call_id == "ghost"
    ));
}

// ━━━ Approval ━━━

#[test]
fn approval_denial_cancels_and_blocks_results() {
    let (mut processor, observer) = observed(ProcessorConfig::default());
    process(&mut processor, &denial_turn());

    assert_eq!(processor.pending_approvals().len(), 1);
    assert!(observer
        .events()
        .contains(&ObservedEvent::Approval("approval_call_1".into())));

    processor
        .add_tool_approval_response("approval_call_1", false)
        .unwrap();
    assert_eq!(only_tool_call(&processor).state, ToolCallState::Cancelled);
    assert!(processor.pending_approvals().is_empty());

    // A late result for a denied call is ignored.
    let late = ChunkScript::new("resp_1", "m").tool_result("call_1", "deleted").build();
    process(&mut processor, &late);
    let message = &processor.messages()[0];
    assert!(!message.parts.iter().any(|p| matches!(p, MessagePart::ToolResult(_))));
    assert_eq!(only_tool_call(&processor).state, ToolCallState::Cancelled);

    assert_eq!(
        processor.add_tool_approval_response("approval_call_1", true),
        Err(ProcessorError::ApprovalAlreadyResolved("approval_call_1".into()))
    );
    assert_eq!(only_tool_call(&processor).state, ToolCallState::Cancelled);
}

#[test]
fn approval_request_replaces_preview_input() {
    let mut processor = StreamProcessor::new();
    let mut chunks = ChunkScript::new("r", "m")
        .tool_call(0, "c1", "delete_file", "{\"path\":\"/tm")
        .build();
    chunks.push(chunks[0].follow_up(ChunkKind::ApprovalRequested {
        tool_call_id: "c1".into(),
        tool_name: "delete_file".into(),
        input: json!({"path": "/tmp/x"}),
        approval: ApprovalMeta {
            id: "approval_c1".into(),
            needs_approval: true,
        },
    }));
    process(&mut processor, &chunks);

    let call = only_tool_call(&processor);
    assert_eq!(call.state, ToolCallState::ApprovalRequested);
    assert_eq!(call.input, Some(json!({"path": "/tmp/x"})));
}

#[test]
fn approval_grant_moves_to_executing() {
    let mut processor = StreamProcessor::new();
    process(&mut processor, &denial_turn());

    assert!(matches!(
        processor.add_tool_result("call_1", json!("early"), None),
        Err(ProcessorError::InvalidTransition { .. })
    ));

    processor
        .add_tool_approval_response("approval_call_1", true)
        .unwrap();
    assert_eq!(only_tool_call(&processor).state, ToolCallState::Executing);
    let approved = processor.approved_tool_calls();
    assert_eq!(approved.len(), 1);
    assert_eq!(approved[0].name, "delete_file");

    processor.add_tool_result("call_1", json!("deleted"), None).unwrap();
    assert_eq!(only_tool_call(&processor).state, ToolCallState::OutputAvailable);
    assert!(processor.approved_tool_calls().is_empty());
}

#[test]
fn unknown_approval_id_is_an_error() {
    let mut processor = StreamProcessor::new();
    assert_eq!(
        processor.add_tool_approval_response("missing", true),
        Err(ProcessorError::ApprovalNotFound("missing".into()))
    );
}

// ━━━ Turn boundaries ━━━

#[test]
fn terminal_chunks_without_turn_are_ignored() {
    let (mut processor, observer) = observed(ProcessorConfig::default());
    let chunks = ChunkScript::new("r", "m").done(FinishReason::Stop).error("late").build();
    process(&mut processor, &chunks);
    assert!(processor.messages().is_empty());
    assert!(observer.events().is_empty());
}

#[test]
fn error_chunk_ends_turn_and_notifies() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter("weft_stream=debug")
        .try_init();
    let (mut processor, observer) = observed(ProcessorConfig::default());
    let chunks = ChunkScript::new("r", "m").content("partial").error("overloaded").build();
    process(&mut processor, &chunks);

    assert!(!processor.is_streaming());
    assert_eq!(processor.finish_reason(), None);
    let events = observer.events();
    let error_at = events
        .iter()
        .position(|e| *e == ObservedEvent::Error("overloaded".into()))
        .unwrap();
    let end_at = events
        .iter()
        .position(|e| *e == ObservedEvent::StreamEnd("r".into()))
        .unwrap();
    assert!(error_at < end_at);
    assert_eq!(processor.messages()[0].text(), "partial");
}

#[test]
fn unknown_chunk_is_ignored() {
    let mut processor = StreamProcessor::new();
    let chunk: StreamChunk = serde_json::from_value(json!({
        "type": "step-started",
        "id": "r",
        "model": "m",
        "timestamp": 1
    }))
    .unwrap();
    processor.process_chunk(&chunk);
    assert!(processor.messages().is_empty());
    assert!(!processor.is_streaming());
}

#[test]
fn finalize_stream_closes_open_turn() {
    let mut processor = StreamProcessor::new();
    let chunks = ChunkScript::new("r", "m")
        .content("cut off")
        .tool_call(0, "c1", "a", "{\"k\":\"v")
        .build();
    process(&mut processor, &chunks);
    assert!(processor.is_streaming());

    processor.finalize_stream();
    assert!(!processor.is_streaming());
    let call = only_tool_call(&processor);
    assert_eq!(call.state, ToolCallState::OutputError);
    assert!(call.state.is_terminal());
    assert_eq!(call.input, Some(json!({"k": "v"})));

    let message = &processor.messages()[0];
    assert_eq!(message.text(), "cut off");
    match message.parts.last() {
        Some(MessagePart::ToolResult(result)) => {
            assert_eq!(result.tool_call_id, "c1");
            assert_eq!(result.state, ToolResultState::Error);
            assert_eq!(
                result.error_text.as_deref(),
                Some("stream ended before arguments completed")
            );
        }
        other => panic!("expected tool result, got {other:?}"),
    }

    let model = processor.to_model_messages();
    assert_eq!(model.len(), 2);
    assert_eq!(model[0].tool_calls[0].arguments, r#"{"k":"v"}"#);
    assert_eq!(model[1].tool_call_id.as_deref(), Some("c1"));
}

#[test]
fn finalize_stream_closes_completed_but_unexecuted_calls() {
    let mut processor = StreamProcessor::new();
    let chunks = ChunkScript::new("r", "m")
        .tool_call(0, "c1", "a", "{}")
        .tool_call(1, "c2", "b", "{\"x")
        .build();
    process(&mut processor, &chunks);
    processor.finalize_stream();

    let message = &processor.messages()[0];
    assert_eq!(message.tool_call("c1").unwrap().state, ToolCallState::OutputError);
    assert_eq!(message.tool_call("c2").unwrap().state, ToolCallState::OutputError);
    let results = message
        .parts
        .iter()
        .filter(|p| matches!(p, MessagePart::ToolResult(_)))
        .count();
    assert_eq!(results, 2);
}

#[test]
fn finalize_stream_leaves_finished_turns_alone() {
    let mut processor = StreamProcessor::new();
    let chunks = ChunkScript::new("r", "m")
        .tool_call(0, "c1", "a", "{}")
        .done(FinishReason::ToolCalls)
        .build();
    process(&mut processor, &chunks);
    processor.finalize_stream();
    assert_eq!(only_tool_call(&processor).state, ToolCallState::InputComplete);
}

#[test]
fn error_chunk_closes_streaming_call() {
    let mut processor = StreamProcessor::new();
    let chunks = ChunkScript::new("r", "m")
        .tool_call(0, "c1", "a", "{\"k\":")
        .error("overloaded")
        .build();
    process(&mut processor, &chunks);
    assert_eq!(only_tool_call(&processor).state, ToolCallState::OutputError);
}

#[test]
fn usage_is_recorded() {
    let mut processor = StreamProcessor::new();
    let usage = Usage {
        prompt_tokens: 10,
        completion_tokens: 5,
        total_tokens: 15,
    };
    let chunks = ChunkScript::new("r", "m")
        .content("ok")
        .done_with_usage(FinishReason::Stop, usage.clone())
        .build();
    process(&mut processor, &chunks);
    assert_eq!(processor.usage(), Some(&usage));
}

#[test]
fn explicit_assistant_message_collects_chunks() {
    let mut processor = StreamProcessor::new();
    let id = processor.start_assistant_message();
    let chunks = ChunkScript::new("resp_9", "m")
        .content("hello")
        .done(FinishReason::Stop)
        .build();
    process(&mut processor, &chunks);

    assert_eq!(processor.messages().len(), 1);
    assert_eq!(processor.messages()[0].id, id);
    assert_eq!(processor.messages()[0].text(), "hello");
}

#[test]
fn user_message_closes_open_turn() {
    let mut processor = StreamProcessor::new();
    process(&mut processor, &ChunkScript::new("r", "m").content("half").build());
    let user = processor.add_user_message("stop").clone();
    assert_eq!(user.role, UiRole::User);
    assert!(!processor.is_streaming());
    assert_eq!(processor.messages().len(), 2);
}

#[test]
fn clear_then_nothing_leaves_no_messages() {
    let mut processor = StreamProcessor::new();
    process(
        &mut processor,
        &ChunkScript::new("r", "m").content("x").done(FinishReason::Stop).build(),
    );
    processor.clear();
    process(&mut processor, &[]);
    assert!(processor.messages().is_empty());
    processor.clear();
    assert!(processor.messages().is_empty());
    assert_eq!(processor.finish_reason(), None);
}

// ━━━ Recording ━━━

#[test]
fn replay_is_deterministic() {
    let mut processor = StreamProcessor::new();
    processor.start_recording();
    let chunks = ChunkScript::new("resp_1", "m")
        .thinking("plan")
        .content("Checking")
        .tool_call(0, "c1", "get_weather", "{\"location\":")
        .tool_args(0, "\"SF\"}")
        .done(FinishReason::ToolCalls)
        .tool_result("c1", "{\"temp\":72}")
        .build();
    process(&mut processor, &chunks);

    let recording = processor.recording().unwrap().clone();
    assert_eq!(recording.len(), chunks.len());

    let first = StreamProcessor::replay(&recording);
    let second = StreamProcessor::replay(&recording);
    let snapshot = |p: &StreamProcessor| serde_json::to_string(p.messages()).unwrap();
    assert_eq!(snapshot(&first), snapshot(&second));
    assert_eq!(snapshot(&first), snapshot(&processor));

    let wire = serde_json::to_string(&recording).unwrap();
    let restored: Recording = serde_json::from_str(&wire).unwrap();
    assert_eq!(snapshot(&StreamProcessor::replay(&restored)), snapshot(&processor));
}

#[test]
fn stop_recording_hands_back_log() {
    let mut processor = StreamProcessor::new();
    assert!(processor.recording().is_none());
    processor.start_recording();
    process(&mut processor, &ChunkScript::new("r", "m").content("x").build());
    let recording = processor.stop_recording().unwrap();
    assert_eq!(recording.len(), 1);
    assert!(processor.recording().is_none());
}

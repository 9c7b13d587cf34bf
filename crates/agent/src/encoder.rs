//! Event encoder: maps orchestrator events onto the line-delimited wire format.
//!
//! Every event becomes exactly one `data: <json>` record. The mapping is
//! stateless, so the transport can flush each record as soon as it has it.

use cocochat_core::tool::{ToolOutcome, ToolResult};
use serde::Serialize;
use serde_json::Value;

use crate::stream_event::OrchestratorEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WireRole {
    Assistant,
    Tool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WireToolCall {
    pub id: String,
    pub name: String,
    pub arguments: Value,
}

/// One record as the client sees it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum WireRecord {
    /// `{"role":"assistant","tool_calls":[...]}`
    ToolCalls {
        role: WireRole,
        tool_calls: Vec<WireToolCall>,
    },
    /// `{"role":"tool","tool_call_id":..,"name":..,"content":..}`
    ToolOutput {
        role: WireRole,
        tool_call_id: String,
        name: String,
        content: Value,
        #[serde(skip_serializing_if = "std::ops::Not::not")]
        is_error: bool,
    },
    /// `{"role":"assistant","content":".."}`
    Content { role: WireRole, content: String },
    /// `{"error":".."}`
    Error { error: String },
    /// `{"done":true,"rounds":..,"tool_calls_made":..}`
    Done {
        done: bool,
        rounds: u32,
        tool_calls_made: usize,
    },
}

impl WireRecord {
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|e| {
            serde_json::json!({ "error": format!("failed to encode event: {e}") }).to_string()
        })
    }
}

fn tool_output(result: &ToolResult) -> WireRecord {
    let (content, is_error) = match &result.outcome {
        ToolOutcome::Payload(payload) => (payload.clone(), false),
        ToolOutcome::Error(_) => (Value::String(result.content_text()), true),
    };
    WireRecord::ToolOutput {
        role: WireRole::Tool,
        tool_call_id: result.tool_call_id.clone(),
        name: result.name.clone(),
        content,
        is_error,
    }
}

/// Map one event to its wire record.
pub fn encode(event: &OrchestratorEvent) -> WireRecord {
    match event {
        OrchestratorEvent::AssistantDelta { content } => WireRecord::Content {
            role: WireRole::Assistant,
            content: content.clone(),
        },
        OrchestratorEvent::ToolCallAnnounced { call } => WireRecord::ToolCalls {
            role: WireRole::Assistant,
            tool_calls: vec![WireToolCall {
                id: call.id.clone(),
                name: call.name.clone(),
                arguments: call.arguments.clone(),
            }],
        },
        OrchestratorEvent::ToolResultReady { result } => tool_output(result),
        OrchestratorEvent::Error { message } => WireRecord::Error {
            error: message.clone(),
        },
        OrchestratorEvent::Done {
            rounds,
            tool_calls_made,
            ..
        } => WireRecord::Done {
            done: true,
            rounds: *rounds,
            tool_calls_made: *tool_calls_made,
        },
    }
}

/// The full `data: ...` line for an event, including the blank-line terminator.
pub fn to_sse_line(event: &OrchestratorEvent) -> String {
    format!("data: {}\n\n", encode(event).to_json())
}

#[cfg(test)]
mod tests {
    use super::*;
    use cocochat_core::error::ToolError;
    use cocochat_core::tool::ToolCall;
    use serde_json::json;

    fn call() -> ToolCall {
        ToolCall {
            id: "call_1".into(),
            name: "item_search".into(),
            arguments: json!({"name": "jeans", "category": "pants"}),
        }
    }

    fn as_value(event: &OrchestratorEvent) -> Value {
        serde_json::from_str(&encode(event).to_json()).unwrap()
    }

    #[test]
    fn delta_is_assistant_content() {
        let event = OrchestratorEvent::AssistantDelta {
            content: "hi".into(),
        };
        assert_eq!(as_value(&event), json!({"role": "assistant", "content": "hi"}));
    }

    #[test]
    fn announcement_lists_tool_call() {
        let event = OrchestratorEvent::ToolCallAnnounced { call: call() };
        assert_eq!(
            as_value(&event),
            json!({
                "role": "assistant",
                "tool_calls": [{
                    "id": "call_1",
                    "name": "item_search",
                    "arguments": {"name": "jeans", "category": "pants"}
                }]
            })
        );
    }

    #[test]
    fn successful_result_carries_payload() {
        let result = ToolResult::success(&call(), json!([{"id": 1}]));
        let value = as_value(&OrchestratorEvent::ToolResultReady { result });
        assert_eq!(
            value,
            json!({
                "role": "tool",
                "tool_call_id": "call_1",
                "name": "item_search",
                "content": [{"id": 1}]
            })
        );
    }

    #[test]
    fn failed_result_is_flagged() {
        let result = ToolResult::failure(&call(), &ToolError::NotFound("item_search".into()));
        let value = as_value(&OrchestratorEvent::ToolResultReady { result });
        assert_eq!(value["role"], "tool");
        assert_eq!(value["is_error"], true);
        assert!(value["content"].as_str().unwrap().starts_with("Error: "));
    }

    #[test]
    fn error_and_done_records() {
        let error = OrchestratorEvent::Error {
            message: "iteration limit exceeded (3 rounds)".into(),
        };
        assert_eq!(
            as_value(&error),
            json!({"error": "iteration limit exceeded (3 rounds)"})
        );

        let done = OrchestratorEvent::Done {
            rounds: 2,
            tool_calls_made: 1,
            usage: None,
        };
        assert_eq!(
            as_value(&done),
            json!({"done": true, "rounds": 2, "tool_calls_made": 1})
        );
    }

    #[test]
    fn sse_line_framing() {
        let line = to_sse_line(&OrchestratorEvent::AssistantDelta {
            content: "a\nb".into(),
        });
        assert!(line.starts_with("data: {"));
        assert!(line.ends_with("}\n\n"));
        // Newlines inside content are escaped, so the record stays on one line.
        assert_eq!(line.matches('\n').count(), 2);
    }
}

//! Orchestrator events.
//!
//! `OrchestratorEvent` is the only thing the orchestrator produces. The
//! transport sees nothing of its internal state beyond this sequence.

use cocochat_core::provider::Usage;
use cocochat_core::tool::{ToolCall, ToolResult};
use serde::{Deserialize, Serialize};

/// Events emitted by the orchestrator, in order.
///
/// - `assistant_delta`: partial text from the model
/// - `tool_call_announced`: a tool is about to run
/// - `tool_result_ready`: the tool finished (successfully or not)
/// - `error`: the exchange failed; terminal
/// - `done`: the exchange completed; terminal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OrchestratorEvent {
    /// Partial text token from the model.
    AssistantDelta { content: String },

    /// The orchestrator is about to invoke a tool.
    ToolCallAnnounced { call: ToolCall },

    /// Tool invocation completed.
    ToolResultReady { result: ToolResult },

    /// The exchange failed.
    Error { message: String },

    /// The exchange is complete.
    Done {
        rounds: u32,
        tool_calls_made: usize,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        usage: Option<Usage>,
    },
}

impl OrchestratorEvent {
    /// Event name for this event type.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::AssistantDelta { .. } => "assistant_delta",
            Self::ToolCallAnnounced { .. } => "tool_call_announced",
            Self::ToolResultReady { .. } => "tool_result_ready",
            Self::Error { .. } => "error",
            Self::Done { .. } => "done",
        }
    }

    /// Whether no event may follow this one.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Error { .. } | Self::Done { .. })
    }
}

//! Tool invoker: runs one tool call and always produces a result.
//!
//! The registry looks the tool up, validates the arguments and runs it. Any
//! failure comes back as a `ToolResult` carrying an error, never as an `Err`.
//! Panics in a tool body are caught and reported the same way.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use cocochat_core::error::ToolError;
use cocochat_core::tool::{ToolCall, ToolRegistry, ToolResult};
use futures::FutureExt;
use tracing::{debug, warn};

#[derive(Clone)]
pub struct ToolInvoker {
    registry: Arc<ToolRegistry>,
}

impl ToolInvoker {
    pub fn new(registry: Arc<ToolRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Resolve, validate and execute a call.
    pub async fn invoke(&self, call: &ToolCall) -> ToolResult {
        match self.try_invoke(call).await {
            Ok(payload) => {
                debug!(tool = %call.name, tool_call_id = %call.id, "Tool succeeded");
                ToolResult::success(call, payload)
            }
            Err(e) => {
                warn!(tool = %call.name, tool_call_id = %call.id, error = %e, "Tool failed");
                ToolResult::failure(call, &e)
            }
        }
    }

    async fn try_invoke(&self, call: &ToolCall) -> Result<serde_json::Value, ToolError> {
        let outcome = AssertUnwindSafe(self.registry.execute(call))
            .catch_unwind()
            .await;

        match outcome {
            Ok(Ok(payload)) => Ok(payload),
            Ok(Err(
                e @ (ToolError::NotFound(_)
                | ToolError::InvalidArguments(_)
                | ToolError::ExecutionFailed { .. }),
            )) => Err(e),
            Ok(Err(other)) => Err(ToolError::ExecutionFailed {
                tool_name: call.name.clone(),
                reason: other.to_string(),
            }),
            Err(panic) => Err(ToolError::ExecutionFailed {
                tool_name: call.name.clone(),
                reason: format!("tool panicked: {}", panic_message(panic.as_ref())),
            }),
        }
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> &str {
    panic
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| panic.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic")
}

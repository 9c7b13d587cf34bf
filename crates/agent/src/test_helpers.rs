//! Shared test helpers: scripted providers and fixed-behaviour tools.

use std::sync::Mutex;

use async_trait::async_trait;
use cocochat_core::error::{ProviderError, ToolError};
use cocochat_core::provider::{
    FragmentStream, Provider, ProviderRequest, ProviderResponse, StreamFragment, ToolCallFragment,
    Usage,
};
use cocochat_core::tool::{Tool, ToolCall};
use serde_json::{Value, json};
use tokio::sync::mpsc;

use crate::accumulator::{AssistantTurn, accumulate};

/// What the scripted provider does on one call.
#[derive(Clone)]
pub enum Script {
    /// Stream these fragments, then end the turn.
    Turn(Vec<StreamFragment>),
    /// Refuse the call outright.
    Fail(ProviderError),
    /// Stream these fragments, then report the stream as broken.
    Interrupted(Vec<StreamFragment>),
}

type ScriptSource = Box<dyn Fn(usize) -> Script + Send + Sync>;

/// A mock provider that plays back one script per model call.
///
/// Calls beyond the script fail with an API error rather than panicking,
/// so an over-eager orchestrator shows up as an `Error` event.
pub struct ScriptedProvider {
    source: ScriptSource,
    requests: Mutex<Vec<ProviderRequest>>,
}

impl ScriptedProvider {
    pub fn new(scripts: Vec<Script>) -> Self {
        Self::from_fn(move |i| {
            scripts.get(i).cloned().unwrap_or_else(|| {
                Script::Fail(ProviderError::ApiError {
                    status_code: 500,
                    message: format!("script exhausted at call #{i}"),
                })
            })
        })
    }

    /// A provider whose script for call `i` is `f(i)`.
    pub fn from_fn(f: impl Fn(usize) -> Script + Send + Sync + 'static) -> Self {
        Self {
            source: Box::new(f),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Create a provider that returns a single text turn.
    pub fn single_text(text: &str) -> Self {
        Self::new(vec![Script::Turn(text_turn(text))])
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<ProviderRequest> {
        self.requests.lock().unwrap().clone()
    }

    fn next_script(&self, request: ProviderRequest) -> Script {
        let mut requests = self.requests.lock().unwrap();
        let index = requests.len();
        requests.push(request);
        (self.source)(index)
    }
}

#[async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted_mock"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let fragments = match self.next_script(request) {
            Script::Turn(fragments) => fragments,
            Script::Fail(e) => return Err(e),
            Script::Interrupted(_) => {
                return Err(ProviderError::StreamInterrupted("connection reset".into()));
            }
        };
        let turn = fragments
            .into_iter()
            .fold(AssistantTurn::default(), accumulate)
            .finish();
        Ok(ProviderResponse {
            message: turn.to_message(),
            usage: turn.usage,
            model: "mock-model".into(),
        })
    }

    async fn stream(&self, request: ProviderRequest) -> Result<FragmentStream, ProviderError> {
        let (fragments, trailing_error) = match self.next_script(request) {
            Script::Turn(fragments) => (fragments, None),
            Script::Fail(e) => return Err(e),
            Script::Interrupted(fragments) => (
                fragments,
                Some(ProviderError::StreamInterrupted("connection reset".into())),
            ),
        };

        let (tx, rx) = mpsc::channel(fragments.len() + 1);
        for fragment in fragments {
            let _ = tx.send(Ok(fragment)).await;
        }
        if let Some(e) = trailing_error {
            let _ = tx.send(Err(e)).await;
        }
        Ok(rx)
    }
}

/// A provider that streams one fragment, then holds the turn open forever.
///
/// The sender side is kept so tests can observe when the orchestrator
/// abandons the stream.
pub struct HangingProvider {
    senders: Mutex<Vec<mpsc::Sender<Result<StreamFragment, ProviderError>>>>,
}

impl HangingProvider {
    pub fn new() -> Self {
        Self {
            senders: Mutex::new(Vec::new()),
        }
    }

    pub fn sender(&self) -> Option<mpsc::Sender<Result<StreamFragment, ProviderError>>> {
        self.senders.lock().unwrap().first().cloned()
    }
}

#[async_trait]
impl Provider for HangingProvider {
    fn name(&self) -> &str {
        "hanging_mock"
    }

    async fn complete(&self, _request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        std::future::pending().await
    }

    async fn stream(&self, _request: ProviderRequest) -> Result<FragmentStream, ProviderError> {
        let (tx, rx) = mpsc::channel(4);
        let _ = tx.send(Ok(StreamFragment::text("thinking"))).await;
        self.senders.lock().unwrap().push(tx);
        Ok(rx)
    }
}

/// Fragments for a plain text turn, split into word-sized pieces.
pub fn text_turn(text: &str) -> Vec<StreamFragment> {
    text.split_inclusive(' ').map(StreamFragment::text).collect()
}

/// Fragments for a single tool-call turn, with the arguments split in two.
pub fn tool_call_turn(id: &str, name: &str, arguments: Value) -> Vec<StreamFragment> {
    let raw = arguments.to_string();
    let (head, tail) = raw.split_at(raw.len() / 2);
    vec![
        StreamFragment::tool_call(ToolCallFragment {
            index: 0,
            id: Some(id.into()),
            name: Some(name.into()),
            arguments: head.into(),
        }),
        StreamFragment::tool_call(ToolCallFragment {
            index: 0,
            id: None,
            name: None,
            arguments: tail.into(),
        }),
    ]
}

/// A usage-only fragment.
pub fn usage_fragment(prompt: u32, completion: u32) -> StreamFragment {
    StreamFragment {
        usage: Some(Usage {
            prompt_tokens: prompt,
            completion_tokens: completion,
            total_tokens: prompt + completion,
        }),
        ..StreamFragment::default()
    }
}

/// Helper to create a tool call.
pub fn make_tool_call(id: &str, name: &str, arguments: Value) -> ToolCall {
    ToolCall {
        id: id.into(),
        name: name.into(),
        arguments,
    }
}

/// A tool that returns a fixed payload for any valid `{name}` arguments.
pub struct StaticTool {
    name: String,
    payload: Value,
}

impl StaticTool {
    pub fn new(name: &str, payload: Value) -> Self {
        Self {
            name: name.into(),
            payload,
        }
    }
}

#[async_trait]
impl Tool for StaticTool {
    fn name(&self) -> &str {
        &self.name
    }
    fn description(&self) -> &str {
        "Returns a fixed payload"
    }
    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": { "name": { "type": "string" } },
            "required": ["name"]
        })
    }
    async fn execute(&self, _arguments: Value) -> Result<Value, ToolError> {
        Ok(self.payload.clone())
    }
}

/// A tool that always fails.
pub struct FailingTool;

#[async_trait]
impl Tool for FailingTool {
    fn name(&self) -> &str {
        "always_fails"
    }
    fn description(&self) -> &str {
        "Always fails"
    }
    fn parameters_schema(&self) -> Value {
        json!({"type": "object"})
    }
    async fn execute(&self, _arguments: Value) -> Result<Value, ToolError> {
        Err(ToolError::ExecutionFailed {
            tool_name: "always_fails".into(),
            reason: "catalog offline".into(),
        })
    }
}

/// A tool whose body panics.
pub struct PanickingTool;

#[async_trait]
impl Tool for PanickingTool {
    fn name(&self) -> &str {
        "panics"
    }
    fn description(&self) -> &str {
        "Panics"
    }
    fn parameters_schema(&self) -> Value {
        json!({"type": "object"})
    }
    async fn execute(&self, _arguments: Value) -> Result<Value, ToolError> {
        panic!("kaboom")
    }
}

//! Tool trait and registry.
//!
//! Tools are what let the assistant act on the world (search the catalog,
//! look things up). Each tool publishes a JSON Schema for its parameters;
//! the registry compiles it once at registration and checks every call's
//! arguments against it before the tool body runs.

use std::collections::HashMap;
use std::fmt;

use async_trait::async_trait;
use jsonschema::JSONSchema;
use serde::{Deserialize, Serialize};

use crate::error::ToolError;
use crate::message::{Content, Message};
use crate::provider::ToolDefinition;

/// Maximum number of schema violations reported back in one error.
const MAX_REPORTED_VIOLATIONS: usize = 3;

/// A fully assembled request to execute a tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Unique call ID (matches the model's tool_call.id)
    pub id: String,

    /// Name of the tool to execute
    pub name: String,

    /// Parsed arguments
    pub arguments: serde_json::Value,
}

/// What a tool call produced: a payload on success, or a textual error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolOutcome {
    Payload(serde_json::Value),
    Error(String),
}

/// The result of one tool call, paired with the call it answers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    /// The call ID this result is for
    pub tool_call_id: String,

    /// The tool that was invoked
    pub name: String,

    pub outcome: ToolOutcome,
}

impl ToolResult {
    pub fn success(call: &ToolCall, payload: serde_json::Value) -> Self {
        Self {
            tool_call_id: call.id.clone(),
            name: call.name.clone(),
            outcome: ToolOutcome::Payload(payload),
        }
    }

    pub fn failure(call: &ToolCall, error: &ToolError) -> Self {
        Self {
            tool_call_id: call.id.clone(),
            name: call.name.clone(),
            outcome: ToolOutcome::Error(error.to_string()),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self.outcome, ToolOutcome::Error(_))
    }

    /// Text the model sees for this result. Failures are prefixed with `Error: `.
    pub fn content_text(&self) -> String {
        match &self.outcome {
            ToolOutcome::Payload(serde_json::Value::String(text)) => text.clone(),
            ToolOutcome::Payload(value) => value.to_string(),
            ToolOutcome::Error(message) => format!("Error: {message}"),
        }
    }

    /// The tool-role message that records this result in the log.
    pub fn to_message(&self) -> Message {
        let content: Content = match &self.outcome {
            ToolOutcome::Payload(value) => value.clone().into(),
            ToolOutcome::Error(_) => self.content_text().into(),
        };
        Message::tool_result(self.tool_call_id.clone(), self.name.clone(), content)
    }
}

/// The core Tool trait.
///
/// A tool must not assume it runs concurrently with any other tool.
#[async_trait]
pub trait Tool: Send + Sync {
    /// The unique name of this tool (e.g., "item_search").
    fn name(&self) -> &str;

    /// A description of what this tool does (sent to the model).
    fn description(&self) -> &str;

    /// JSON Schema describing this tool's parameters.
    fn parameters_schema(&self) -> serde_json::Value;

    /// Execute the tool with arguments that already passed schema validation.
    async fn execute(
        &self,
        arguments: serde_json::Value,
    ) -> std::result::Result<serde_json::Value, ToolError>;

    /// Convert this tool into a ToolDefinition for sending to the model.
    fn to_definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters_schema(),
        }
    }
}

struct RegisteredTool {
    tool: Box<dyn Tool>,
    schema: JSONSchema,
}

/// A registry of available tools, keyed by unique name.
///
/// The orchestrator uses it to:
/// 1. Get tool definitions to send to the model
/// 2. Validate and execute tools when the model requests them
#[derive(Default)]
pub struct ToolRegistry {
    tools: HashMap<String, RegisteredTool>,
}

impl fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.names())
            .finish()
    }
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool, compiling its parameter schema.
    ///
    /// Fails if the name is taken or the schema is not an object schema
    /// that compiles.
    pub fn register(&mut self, tool: Box<dyn Tool>) -> std::result::Result<(), ToolError> {
        let name = tool.name().to_string();
        if self.tools.contains_key(&name) {
            return Err(ToolError::DuplicateTool(name));
        }

        let raw = tool.parameters_schema();
        if raw.get("type").and_then(|t| t.as_str()) != Some("object") {
            return Err(ToolError::InvalidSchema {
                tool_name: name,
                reason: "parameter schema must have \"type\": \"object\"".into(),
            });
        }
        let schema = JSONSchema::compile(&raw).map_err(|e| ToolError::InvalidSchema {
            tool_name: name.clone(),
            reason: e.to_string(),
        })?;

        tracing::debug!(tool = %name, "Registered tool");
        self.tools.insert(name, RegisteredTool { tool, schema });
        Ok(())
    }

    /// Get a tool by name.
    pub fn get(&self, name: &str) -> Option<&dyn Tool> {
        self.tools.get(name).map(|t| t.tool.as_ref())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// All tool definitions, ordered by name.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        let mut defs: Vec<ToolDefinition> =
            self.tools.values().map(|t| t.tool.to_definition()).collect();
        defs.sort_by(|a, b| a.name.cmp(&b.name));
        defs
    }

    /// Check arguments against the named tool's schema.
    pub fn validate_arguments(
        &self,
        name: &str,
        arguments: &serde_json::Value,
    ) -> std::result::Result<(), ToolError> {
        let entry = self
            .tools
            .get(name)
            .ok_or_else(|| ToolError::NotFound(name.to_string()))?;

        check_argument_shape(arguments)?;
        if let Err(errors) = entry.schema.validate(arguments) {
            let violations: Vec<String> = errors
                .take(MAX_REPORTED_VIOLATIONS)
                .map(|err| {
                    let path = err.instance_path.to_string();
                    if path.is_empty() {
                        err.to_string()
                    } else {
                        format!("{path}: {err}")
                    }
                })
                .collect();
            return Err(ToolError::InvalidArguments(violations.join("; ")));
        }
        Ok(())
    }

    /// Look up, validate and execute a tool call.
    pub async fn execute(&self, call: &ToolCall) -> std::result::Result<serde_json::Value, ToolError> {
        self.validate_arguments(&call.name, &call.arguments)?;
        match self.tools.get(&call.name) {
            Some(entry) => entry.tool.execute(call.arguments.clone()).await,
            None => Err(ToolError::NotFound(call.name.clone())),
        }
    }

    /// All registered tool names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tools.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

/// Arguments must be a JSON object. Unparseable argument text arrives as a
/// JSON string and is reported as such.
fn check_argument_shape(arguments: &serde_json::Value) -> std::result::Result<(), ToolError> {
    match arguments {
        serde_json::Value::Object(_) => Ok(()),
        serde_json::Value::String(raw) if serde_json::from_str::<serde_json::Value>(raw).is_err() => {
            Err(ToolError::InvalidArguments(format!(
                "arguments are not valid JSON: {raw}"
            )))
        }
        _ => Err(ToolError::InvalidArguments(
            "arguments must be a JSON object".into(),
        )),
    }
}

//! Message and message-log domain types.
//!
//! These are the core value objects that flow through the entire system:
//! the client sends prior turns plus a new user message → the orchestrator
//! extends the log with assistant and tool turns → the model sees the log.

use std::borrow::Cow;
use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::LogError;
use crate::tool::ToolCall;

/// The role of a message sender in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System instructions (persona, rules)
    System,
    /// The end user
    User,
    /// The AI assistant
    Assistant,
    /// Tool execution result
    Tool,
}

/// Message content: plain text, or an opaque structured payload (tool output).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Content {
    Text(String),
    Structured(serde_json::Value),
}

impl Content {
    /// Render the content as text. Structured payloads become compact JSON.
    pub fn as_text(&self) -> Cow<'_, str> {
        match self {
            Self::Text(text) => Cow::Borrowed(text),
            Self::Structured(serde_json::Value::String(text)) => Cow::Borrowed(text),
            Self::Structured(serde_json::Value::Null) => Cow::Borrowed(""),
            Self::Structured(value) => Cow::Owned(value.to_string()),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Self::Text(text) => text.is_empty(),
            Self::Structured(serde_json::Value::Null) => true,
            Self::Structured(_) => false,
        }
    }
}

impl Default for Content {
    fn default() -> Self {
        Self::Text(String::new())
    }
}

impl From<String> for Content {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<&str> for Content {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<serde_json::Value> for Content {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::String(text) => Self::Text(text),
            other => Self::Structured(other),
        }
    }
}

fn new_message_id() -> String {
    Uuid::new_v4().to_string()
}

/// A single message in a conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Unique message ID
    #[serde(default = "new_message_id")]
    pub id: String,

    /// Who sent this message
    pub role: Role,

    /// Text or structured content
    #[serde(default)]
    pub content: Content,

    /// Tool calls requested by the assistant (if any)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,

    /// If this is a tool result, which tool call it responds to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,

    /// If this is a tool result, the name of the tool that produced it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Timestamp
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
}

impl Message {
    fn with_role(role: Role, content: Content) -> Self {
        Self {
            id: new_message_id(),
            role,
            content,
            tool_calls: Vec::new(),
            tool_call_id: None,
            name: None,
            timestamp: Utc::now(),
        }
    }

    /// Create a new user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self::with_role(Role::User, Content::Text(content.into()))
    }

    /// Create a new assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::with_role(Role::Assistant, Content::Text(content.into()))
    }

    /// Create an assistant message that requests tool execution.
    pub fn assistant_with_tool_calls(content: impl Into<String>, tool_calls: Vec<ToolCall>) -> Self {
        let mut msg = Self::assistant(content);
        msg.tool_calls = tool_calls;
        msg
    }

    /// Create a new system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self::with_role(Role::System, Content::Text(content.into()))
    }

    /// Create a tool result message.
    pub fn tool_result(
        tool_call_id: impl Into<String>,
        name: impl Into<String>,
        content: impl Into<Content>,
    ) -> Self {
        let mut msg = Self::with_role(Role::Tool, content.into());
        msg.tool_call_id = Some(tool_call_id.into());
        msg.name = Some(name.into());
        msg
    }

    /// The content rendered as text.
    pub fn text(&self) -> Cow<'_, str> {
        self.content.as_text()
    }
}

/// The ordered, append-only message log of one exchange.
///
/// Every tool-role message must answer a tool call announced by a strictly
/// earlier assistant message. The check runs on every `push`, so a log that
/// exists is always referentially intact.
#[derive(Debug, Clone, Default, Serialize)]
pub struct MessageLog {
    messages: Vec<Message>,
    #[serde(skip)]
    call_ids: HashSet<String>,
}

impl MessageLog {
    /// Create an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a log that starts with a system prompt.
    pub fn with_system_prompt(prompt: impl Into<String>) -> Self {
        let mut log = Self::new();
        log.messages.push(Message::system(prompt));
        log
    }

    /// Build a log from already-ordered messages, rejecting the first violation.
    pub fn from_messages(
        messages: impl IntoIterator<Item = Message>,
    ) -> Result<Self, LogError> {
        let mut log = Self::new();
        for message in messages {
            log.push(message)?;
        }
        Ok(log)
    }

    /// Append a message, enforcing referential integrity.
    pub fn push(&mut self, message: Message) -> Result<(), LogError> {
        match message.role {
            Role::Assistant => {
                let mut seen = HashSet::with_capacity(message.tool_calls.len());
                for call in &message.tool_calls {
                    if self.call_ids.contains(&call.id) || !seen.insert(call.id.as_str()) {
                        return Err(LogError::DuplicateToolCallId(call.id.clone()));
                    }
                }
                self.call_ids
                    .extend(message.tool_calls.iter().map(|c| c.id.clone()));
            }
            Role::Tool => {
                if !message.tool_calls.is_empty() {
                    return Err(LogError::ToolCallsOnNonAssistant);
                }
                let id = message
                    .tool_call_id
                    .as_deref()
                    .ok_or(LogError::MissingToolCallId)?;
                if !self.call_ids.contains(id) {
                    return Err(LogError::UnknownToolCallId(id.to_string()));
                }
            }
            Role::System | Role::User => {
                if !message.tool_calls.is_empty() {
                    return Err(LogError::ToolCallsOnNonAssistant);
                }
            }
        }
        self.messages.push(message);
        Ok(())
    }

    /// All messages, in turn order.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Message> {
        self.messages.iter()
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Whether an assistant message in the log announced this tool call.
    pub fn has_tool_call(&self, id: &str) -> bool {
        self.call_ids.contains(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn call(id: &str) -> ToolCall {
        ToolCall {
            id: id.into(),
            name: "item_search".into(),
            arguments: json!({"name": "jeans"}),
        }
    }

    #[test]
    fn create_user_message() {
        let msg = Message::user("Hello, Coco!");
        assert_eq!(msg.role, Role::User);
        assert_eq!(msg.text(), "Hello, Coco!");
        assert!(msg.tool_calls.is_empty());
    }

    #[test]
    fn message_deserializes_without_id_or_timestamp() {
        let msg: Message =
            serde_json::from_str(r#"{"role":"assistant","content":"hi there"}"#).unwrap();
        assert_eq!(msg.role, Role::Assistant);
        assert_eq!(msg.text(), "hi there");
        assert!(!msg.id.is_empty());
    }

    #[test]
    fn structured_content_renders_as_json() {
        let msg = Message::tool_result("call_1", "item_search", json!([{"id": 1}]));
        assert!(matches!(msg.content, Content::Structured(_)));
        assert_eq!(msg.text(), r#"[{"id":1}]"#);
        assert_eq!(msg.name.as_deref(), Some("item_search"));
    }

    #[test]
    fn tool_message_must_reference_earlier_call() {
        let mut log = MessageLog::with_system_prompt("be nice");
        log.push(Message::user("find jeans")).unwrap();

        let err = log
            .push(Message::tool_result("call_1", "item_search", "[]"))
            .unwrap_err();
        assert_eq!(err, LogError::UnknownToolCallId("call_1".into()));

        log.push(Message::assistant_with_tool_calls("", vec![call("call_1")]))
            .unwrap();
        log.push(Message::tool_result("call_1", "item_search", "[]"))
            .unwrap();
        assert_eq!(log.len(), 4);
        assert!(log.has_tool_call("call_1"));
    }

    #[test]
    fn tool_message_without_id_is_rejected() {
        let mut log = MessageLog::new();
        let mut msg = Message::tool_result("x", "item_search", "[]");
        msg.tool_call_id = None;
        assert_eq!(log.push(msg).unwrap_err(), LogError::MissingToolCallId);
        assert!(log.is_empty());
    }

    #[test]
    fn duplicate_call_ids_are_rejected() {
        let mut log = MessageLog::new();
        let dup = Message::assistant_with_tool_calls("", vec![call("a"), call("a")]);
        assert_eq!(
            log.push(dup).unwrap_err(),
            LogError::DuplicateToolCallId("a".into())
        );

        log.push(Message::assistant_with_tool_calls("", vec![call("a")]))
            .unwrap();
        let again = Message::assistant_with_tool_calls("", vec![call("a")]);
        assert!(log.push(again).is_err());
        assert_eq!(log.len(), 1);
    }

    #[test]
    fn only_assistant_messages_carry_tool_calls() {
        let mut log = MessageLog::new();
        let mut msg = Message::user("hi");
        msg.tool_calls.push(call("a"));
        assert_eq!(log.push(msg).unwrap_err(), LogError::ToolCallsOnNonAssistant);
    }

    #[test]
    fn from_messages_stops_at_first_violation() {
        let result = MessageLog::from_messages(vec![
            Message::user("hi"),
            Message::tool_result("ghost", "item_search", "[]"),
        ]);
        assert!(matches!(result, Err(LogError::UnknownToolCallId(_))));
    }

    #[test]
    fn log_serializes_messages_only() {
        let mut log = MessageLog::new();
        log.push(Message::user("hi")).unwrap();
        let json = serde_json::to_value(&log).unwrap();
        assert_eq!(json["messages"][0]["role"], "user");
        assert!(json.get("call_ids").is_none());
    }
}

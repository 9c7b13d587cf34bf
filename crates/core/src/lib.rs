//! # cocochat core
//!
//! Domain types, traits, and error definitions for the cocochat assistant.
//! This crate has no transport or framework dependencies; it defines the
//! model that every other crate implements against.
//!
//! Each seam (model backend, tool) is a trait here. Implementations live in
//! their own crates, which keeps the dependency graph pointing inward and
//! makes tests with scripted stand-ins straightforward.

pub mod error;
pub mod message;
pub mod provider;
pub mod tool;

// Re-export key types at crate root for ergonomics
pub use error::{Error, LogError, ProviderError, Result, ToolError};
pub use message::{Content, Message, MessageLog, Role};
pub use provider::{
    FragmentStream, Provider, ProviderRequest, ProviderResponse, StreamFragment, ToolCallFragment,
    ToolDefinition, Usage,
};
pub use tool::{Tool, ToolCall, ToolOutcome, ToolRegistry, ToolResult};

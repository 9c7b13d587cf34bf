//! The conversation orchestrator for Cocochat.
//!
//! One exchange runs as a loop:
//!
//! 1. **Call the model** with the message log and the bound tool set
//! 2. **Accumulate** its fragments into one assistant turn, streaming text out
//! 3. **If tool calls**: invoke each in order, append results, go back to 1
//! 4. **Otherwise**: emit `Done`
//!
//! The loop stops early on a model failure, on the round limit, or when
//! the client goes away. Everything it reports flows through
//! [`OrchestratorEvent`], which [`encoder`] maps onto the wire format.

pub mod accumulator;
pub mod encoder;
pub mod invoker;
pub mod orchestrator;
pub mod prompt;
pub mod stream_event;

#[cfg(test)]
mod test_helpers;

pub use accumulator::{AssistantTurn, FinishedTurn, PendingToolCall, accumulate};
pub use encoder::{WireRecord, encode, to_sse_line};
pub use invoker::ToolInvoker;
pub use orchestrator::{
    Orchestrator, OrchestratorError, OrchestratorSettings, Reply, Termination, TerminationReason,
};
pub use prompt::{SYSTEM_PROMPT, system_prompt};
pub use stream_event::OrchestratorEvent;

//! The streaming orchestrator, which drives one exchange to completion.
//!
//! The loop is a small state machine:
//!
//! ```text
//! AwaitingModel ──▶ Accumulating ──┬──▶ Terminal            (no tool calls)
//!       ▲                          └──▶ EmittingToolCalls ──┐
//!       └───────────────────────────────────────────────────┘
//! ```
//!
//! Every finished turn is appended to the message log, tool calls run one
//! at a time in turn order, and the number of model calls is capped. Events
//! are sent one by one with backpressure, and each send is followed by a
//! yield, so a disconnected client stops the loop at the next suspension
//! point.

use std::sync::Arc;

use cocochat_config::AppConfig;
use cocochat_core::error::{LogError, ProviderError};
use cocochat_core::message::MessageLog;
use cocochat_core::provider::{Provider, ProviderRequest, StreamFragment, Usage};
use cocochat_core::tool::ToolRegistry;
use tokio::sync::mpsc;
use tracing::{debug, error, info, trace, warn};

use crate::accumulator::{AssistantTurn, accumulate};
use crate::invoker::ToolInvoker;
use crate::stream_event::OrchestratorEvent;

/// Fatal failures of an exchange.
#[derive(Debug, thiserror::Error)]
pub enum OrchestratorError {
    #[error("model call failed: {0}")]
    ModelCallFailed(#[from] ProviderError),

    #[error("iteration limit exceeded ({limit} rounds)")]
    IterationLimitExceeded { limit: u32 },

    #[error("client disconnected")]
    Cancelled,

    #[error("message log integrity violated: {0}")]
    Log(#[from] LogError),
}

/// Why a successful exchange stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminationReason {
    /// The model answered without requesting tools.
    Completed,
    /// The model produced nothing at all.
    EmptyTurn,
}

/// Summary of a successful exchange.
#[derive(Debug, Clone, PartialEq)]
pub struct Termination {
    pub rounds: u32,
    pub tool_calls_made: usize,
    pub reason: TerminationReason,
    pub usage: Option<Usage>,
}

/// A single-shot answer.
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    pub content: String,
    pub rounds: u32,
    pub tool_calls_made: usize,
    pub usage: Option<Usage>,
}

#[derive(Debug, Clone)]
pub struct OrchestratorSettings {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: Option<u32>,
    /// Maximum model calls per exchange
    pub max_rounds: u32,
    /// Use the provider's fragment stream rather than `complete`
    pub streaming: bool,
    /// Capacity of the event channel created by `spawn`
    pub event_buffer: usize,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".into(),
            temperature: 0.3,
            max_tokens: Some(2048),
            max_rounds: 8,
            streaming: true,
            event_buffer: 64,
        }
    }
}

impl OrchestratorSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            model: config.model.model_id.clone(),
            temperature: config.model.temperature,
            max_tokens: Some(config.model.max_tokens),
            max_rounds: config.agent.max_rounds,
            streaming: true,
            event_buffer: config.agent.event_buffer,
        }
    }

    pub fn with_streaming(mut self, streaming: bool) -> Self {
        self.streaming = streaming;
        self
    }

    pub fn with_max_rounds(mut self, max_rounds: u32) -> Self {
        self.max_rounds = max_rounds;
        self
    }
}

/// Drives model calls and tool invocations for one exchange at a time.
///
/// Cloning is cheap; clones share the provider and the tool registry.
#[derive(Clone)]
pub struct Orchestrator {
    provider: Arc<dyn Provider>,
    invoker: ToolInvoker,
    settings: OrchestratorSettings,
}

impl Orchestrator {
    pub fn new(
        provider: Arc<dyn Provider>,
        tools: Arc<ToolRegistry>,
        settings: OrchestratorSettings,
    ) -> Self {
        Self {
            provider,
            invoker: ToolInvoker::new(tools),
            settings,
        }
    }

    pub fn settings(&self) -> &OrchestratorSettings {
        &self.settings
    }

    /// Run the exchange to completion, extending `log` and emitting events.
    ///
    /// On success the last event sent is `Done`. On failure no terminal
    /// event is sent; the caller decides how to report the error.
    pub async fn drive(
        &self,
        log: &mut MessageLog,
        events: &mpsc::Sender<OrchestratorEvent>,
    ) -> Result<Termination, OrchestratorError> {
        let definitions = self.invoker.registry().definitions();
        let mut rounds = 0u32;
        let mut tool_calls_made = 0usize;
        let mut usage: Option<Usage> = None;

        loop {
            // ── AwaitingModel ──
            if rounds >= self.settings.max_rounds {
                warn!(limit = self.settings.max_rounds, "Round limit reached");
                return Err(OrchestratorError::IterationLimitExceeded {
                    limit: self.settings.max_rounds,
                });
            }
            rounds += 1;
            debug!(round = rounds, messages = log.len(), "Calling model");

            let request = ProviderRequest {
                model: self.settings.model.clone(),
                messages: log.messages().to_vec(),
                temperature: self.settings.temperature,
                max_tokens: self.settings.max_tokens,
                tools: definitions.clone(),
                stream: self.settings.streaming,
            };

            // ── Accumulating ──
            let turn = self.collect_turn(request, events).await?.finish();
            if let Some(round_usage) = turn.usage {
                *usage.get_or_insert_with(Usage::default) += round_usage;
            }
            log.push(turn.to_message())?;

            if !turn.has_tool_calls() {
                let reason = if turn.is_empty() {
                    debug!(round = rounds, "Model returned an empty turn");
                    TerminationReason::EmptyTurn
                } else {
                    TerminationReason::Completed
                };
                self.emit(
                    events,
                    OrchestratorEvent::Done {
                        rounds,
                        tool_calls_made,
                        usage,
                    },
                )
                .await?;
                return Ok(Termination {
                    rounds,
                    tool_calls_made,
                    reason,
                    usage,
                });
            }

            // Results of these calls could never reach the model.
            if rounds >= self.settings.max_rounds {
                warn!(
                    limit = self.settings.max_rounds,
                    pending_calls = turn.tool_calls.len(),
                    "Round limit reached with tool calls pending"
                );
                return Err(OrchestratorError::IterationLimitExceeded {
                    limit: self.settings.max_rounds,
                });
            }

            // ── EmittingToolCalls ──
            for call in &turn.tool_calls {
                self.emit(
                    events,
                    OrchestratorEvent::ToolCallAnnounced { call: call.clone() },
                )
                .await?;

                debug!(round = rounds, tool = %call.name, tool_call_id = %call.id, "Invoking tool");
                let result = tokio::select! {
                    biased;
                    _ = events.closed() => return Err(OrchestratorError::Cancelled),
                    result = self.invoker.invoke(call) => result,
                };
                tool_calls_made += 1;

                log.push(result.to_message())?;
                self.emit(events, OrchestratorEvent::ToolResultReady { result })
                    .await?;
            }
        }
    }

    /// Call the model once and fold its output into a turn, emitting text deltas.
    async fn collect_turn(
        &self,
        request: ProviderRequest,
        events: &mpsc::Sender<OrchestratorEvent>,
    ) -> Result<AssistantTurn, OrchestratorError> {
        let mut turn = AssistantTurn::default();

        if !self.settings.streaming {
            let response = tokio::select! {
                biased;
                _ = events.closed() => return Err(OrchestratorError::Cancelled),
                response = self.provider.complete(request) => response?,
            };
            let fragment = StreamFragment::from(response);
            self.emit_delta(&fragment, events).await?;
            return Ok(accumulate(turn, fragment));
        }

        let mut stream = tokio::select! {
            biased;
            _ = events.closed() => return Err(OrchestratorError::Cancelled),
            stream = self.provider.stream(request) => stream?,
        };

        loop {
            let next = tokio::select! {
                biased;
                _ = events.closed() => return Err(OrchestratorError::Cancelled),
                next = stream.recv() => next,
            };
            let Some(item) = next else {
                break;
            };
            let fragment = item?;
            trace!(
                content = fragment.content.is_some(),
                tool_calls = fragment.tool_calls.len(),
                "Fragment received"
            );
            self.emit_delta(&fragment, events).await?;
            turn = accumulate(turn, fragment);
        }

        Ok(turn)
    }

    async fn emit_delta(
        &self,
        fragment: &StreamFragment,
        events: &mpsc::Sender<OrchestratorEvent>,
    ) -> Result<(), OrchestratorError> {
        match fragment.content.as_deref() {
            Some(text) if !text.is_empty() => {
                self.emit(
                    events,
                    OrchestratorEvent::AssistantDelta {
                        content: text.to_string(),
                    },
                )
                .await
            }
            _ => Ok(()),
        }
    }

    async fn emit(
        &self,
        events: &mpsc::Sender<OrchestratorEvent>,
        event: OrchestratorEvent,
    ) -> Result<(), OrchestratorError> {
        events
            .send(event)
            .await
            .map_err(|_| OrchestratorError::Cancelled)?;
        tokio::task::yield_now().await;
        Ok(())
    }

    /// Run the exchange on its own task and return its event stream.
    ///
    /// The stream always ends with `Done` or `Error`, unless the receiver
    /// is dropped first, which cancels the exchange.
    pub fn spawn(&self, log: MessageLog) -> mpsc::Receiver<OrchestratorEvent> {
        let (tx, rx) = mpsc::channel(self.settings.event_buffer.max(1));
        let orchestrator = self.clone();

        tokio::spawn(async move {
            let mut log = log;
            match orchestrator.drive(&mut log, &tx).await {
                Ok(termination) => {
                    info!(
                        rounds = termination.rounds,
                        tool_calls = termination.tool_calls_made,
                        reason = ?termination.reason,
                        "Exchange complete"
                    );
                }
                Err(OrchestratorError::Cancelled) => {
                    info!("Client disconnected, exchange abandoned");
                }
                Err(e) => {
                    error!(error = %e, "Exchange failed");
                    let _ = tx
                        .send(OrchestratorEvent::Error {
                            message: e.to_string(),
                        })
                        .await;
                }
            }
        });

        rx
    }

    /// Run the exchange and return the final assistant text.
    pub async fn reply(&self, mut log: MessageLog) -> Result<Reply, OrchestratorError> {
        let (tx, mut rx) = mpsc::channel(self.settings.event_buffer.max(1));
        let log_ref = &mut log;

        let driver = async move {
            let result = self.drive(log_ref, &tx).await;
            drop(tx);
            result
        };
        let drain = async move { while rx.recv().await.is_some() {} };

        let (result, ()) = tokio::join!(driver, drain);
        let termination = result?;

        let content = log
            .last()
            .map(|m| m.text().into_owned())
            .unwrap_or_default();

        Ok(Reply {
            content,
            rounds: termination.rounds,
            tool_calls_made: termination.tool_calls_made,
            usage: termination.usage,
        })
    }
}

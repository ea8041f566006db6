//! The ReAct controller: reason, act, observe, repeat.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use wire::{RequestId, ToolCallRequest};

use crate::collaborator::{Collaborator, Reply};
use crate::conversation::{Message, ToolResult};
use crate::events::{EventBus, HostEvent};
use crate::pipeline::Pipeline;
use crate::registry::ToolRegistry;
use crate::{Error, Result};

/// Controller tuning knobs.
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Tool-call rounds allowed per user turn before the turn fails.
    pub max_rounds: usize,
    /// Per-invocation timeout; `None` uses the supervisor default.
    pub tool_timeout: Option<Duration>,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            max_rounds: 10,
            tool_timeout: None,
        }
    }
}

/// Drives the reasoning cycle for one conversation.
///
/// Each turn: send history plus advertised tool definitions to the
/// collaborator, interpret the reply, route tool-call decisions through the
/// invocation pipeline, and loop with results appended until a final answer.
/// All tool calls of one round execute concurrently and are joined before the
/// next reasoning step; no two collaborator calls are ever in flight for the
/// same conversation.
pub struct Controller<C> {
    collaborator: C,
    pipeline: Arc<Pipeline>,
    registry: Arc<ToolRegistry>,
    events: EventBus,
    config: ControllerConfig,
    system: Option<String>,
    history: Vec<Message>,
}

impl<C: Collaborator> Controller<C> {
    pub fn new(
        collaborator: C,
        pipeline: Arc<Pipeline>,
        registry: Arc<ToolRegistry>,
        events: EventBus,
        config: ControllerConfig,
    ) -> Self {
        Self {
            collaborator,
            pipeline,
            registry,
            events,
            config,
            system: None,
            history: Vec::new(),
        }
    }

    /// Set the system prompt.
    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    /// Append-only conversation history, the only state kept across turns.
    pub fn history(&self) -> &[Message] {
        &self.history
    }

    /// Run one user turn to a final answer.
    ///
    /// A round-limit overrun or collaborator failure is fatal to this turn
    /// only; the error is reported to the caller, never to the host.
    pub async fn run_turn(&mut self, user_input: &str, cancel: CancellationToken) -> Result<String> {
        self.events.emit(HostEvent::TurnStarted {
            user_input: user_input.to_string(),
        });
        self.history.push(Message::user(user_input));

        let definitions = self.registry.definitions();

        for round in 0..self.config.max_rounds {
            let decision = tokio::select! {
                reply = self.collaborator.decide(self.system.as_deref(), &definitions, &self.history) => reply,
                _ = cancel.cancelled() => {
                    self.events.emit(HostEvent::TurnCancelled);
                    return Err(Error::Cancelled);
                }
            };

            let reply = match decision {
                Ok(reply) => reply,
                Err(e) => {
                    self.events.emit(HostEvent::TurnFailed {
                        reason: e.to_string(),
                    });
                    return Err(e);
                }
            };

            match reply {
                Reply::FinalAnswer(text) => {
                    self.history.push(Message::assistant(&text));
                    self.events.emit(HostEvent::FinalAnswer { text: text.clone() });
                    return Ok(text);
                }
                Reply::ToolCalls(calls) => {
                    debug!(round, calls = calls.len(), "tool-call round");
                    self.history.push(Message::tool_calls(&calls));

                    let results = self.run_round(calls, &cancel).await;
                    self.history.push(Message::tool_results(&results));

                    if cancel.is_cancelled() {
                        self.events.emit(HostEvent::TurnCancelled);
                        return Err(Error::Cancelled);
                    }
                }
            }
        }

        let rounds = self.config.max_rounds;
        self.events.emit(HostEvent::TurnFailed {
            reason: format!("turn exceeded {rounds} tool-call rounds"),
        });
        Err(Error::RoundLimit { rounds })
    }

    /// Execute one round's tool calls concurrently and join them.
    ///
    /// Results land in the order they resolve. Exactly one result is
    /// returned per request id, synthesized if a task is lost.
    async fn run_round(
        &self,
        calls: Vec<ToolCallRequest>,
        cancel: &CancellationToken,
    ) -> Vec<ToolResult> {
        let mut pending: Vec<RequestId> = calls.iter().map(|c| c.id.clone()).collect();
        let mut tasks = JoinSet::new();
        for call in calls {
            let pipeline = self.pipeline.clone();
            let timeout = self.config.tool_timeout;
            tasks.spawn(async move { pipeline.invoke(call, timeout).await });
        }

        let mut results = Vec::new();
        loop {
            tokio::select! {
                next = tasks.join_next() => match next {
                    None => break,
                    Some(Ok(result)) => {
                        pending.retain(|id| *id != result.request_id);
                        results.push(result);
                    }
                    Some(Err(e)) => warn!(error = %e, "invocation task failed"),
                },
                _ = cancel.cancelled() => {
                    // Propagate the cancel to every live handle, then let the
                    // in-flight tasks resolve to their terminal results.
                    self.pipeline.supervisor().terminate_all();
                    while let Some(next) = tasks.join_next().await {
                        if let Ok(result) = next {
                            pending.retain(|id| *id != result.request_id);
                            results.push(result);
                        }
                    }
                    break;
                }
            }
        }

        for id in pending {
            results.push(ToolResult::failure(id, "invocation task aborted"));
        }
        results
    }
}

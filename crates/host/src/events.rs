//! Host event stream for observers.
//!
//! The host emits an ordered stream of conversation, authorization, and
//! subprocess lifecycle events that any presentation layer (TUI, log sink)
//! may subscribe to. The host functions identically with zero observers.

use audit::{AuditLog, ProcessPhase, Record, RecordKind};
use std::sync::Arc;
use supervisor::{ProcessEvent, Supervisor};
use tokio::sync::broadcast;
use tracing::warn;
use wire::RequestId;

use crate::conversation::ToolOutcome;

const EVENT_CAPACITY: usize = 256;

/// An observable host event.
#[derive(Debug, Clone)]
pub enum HostEvent {
    TurnStarted {
        user_input: String,
    },
    /// An authorization verdict was issued (allow and deny alike).
    Verdict {
        request_id: RequestId,
        tool_name: String,
        allowed: bool,
        reason: String,
    },
    ToolRequested {
        request_id: RequestId,
        tool_name: String,
    },
    ToolCompleted {
        request_id: RequestId,
        tool_name: String,
        outcome: ToolOutcome,
    },
    /// Subprocess lifecycle, bridged from the supervisor.
    Process(ProcessEvent),
    FinalAnswer {
        text: String,
    },
    TurnFailed {
        reason: String,
    },
    TurnCancelled,
}

/// Broadcast fan-out of [`HostEvent`]s.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<HostEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(EVENT_CAPACITY);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<HostEvent> {
        self.sender.subscribe()
    }

    pub fn emit(&self, event: HostEvent) {
        // Fails only with zero observers attached, which is supported.
        let _ = self.sender.send(event);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Forward supervisor lifecycle events onto the host bus and into the audit
/// trail. Runs until the supervisor is dropped.
pub fn bridge_process_events(
    supervisor: &Supervisor,
    bus: EventBus,
    log: Arc<AuditLog>,
) -> tokio::task::JoinHandle<()> {
    let mut rx = supervisor.subscribe();
    tokio::spawn(async move {
        loop {
            let event = match rx.recv().await {
                Ok(event) => event,
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    warn!(missed, "process event bridge lagged");
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => break,
            };

            let (invocation, tool_name, phase, status) = match &event {
                ProcessEvent::Spawned {
                    invocation,
                    tool_name,
                    ..
                } => (*invocation, tool_name.clone(), ProcessPhase::Spawned, None),
                ProcessEvent::Exited {
                    invocation,
                    tool_name,
                    status,
                } => (*invocation, tool_name.clone(), ProcessPhase::Exited, *status),
                ProcessEvent::TimedOut {
                    invocation,
                    tool_name,
                } => (*invocation, tool_name.clone(), ProcessPhase::TimedOut, None),
                ProcessEvent::Killed {
                    invocation,
                    tool_name,
                } => (*invocation, tool_name.clone(), ProcessPhase::Killed, None),
            };

            if let Err(e) = log.append(&Record::new(RecordKind::Process {
                invocation,
                tool_name,
                phase,
                status,
            })) {
                warn!(error = %e, "failed to append process record to audit trail");
            }

            bus.emit(HostEvent::Process(event));
        }
    })
}

//! The invocation pipeline: authorize, spawn, exchange, resolve.

use std::sync::Arc;
use std::time::Duration;

use audit::{AuditLog, Record, RecordKind};
use supervisor::{ExecOutcome, Supervisor};
use tracing::{debug, warn};
use wire::ToolCallRequest;

use crate::conversation::ToolResult;
use crate::events::{EventBus, HostEvent};
use crate::gatekeeper::Gatekeeper;
use crate::registry::ToolRegistry;

/// Composes gatekeeper, supervisor, and codec into a single
/// `invoke(request) -> result` operation.
///
/// Per-invocation state machine: Received → Authorizing → {Denied |
/// Authorized} → Spawning → Executing → {Succeeded | Failed | TimedOut}.
/// A subprocess is spawned iff the verdict is Allow, and exactly one
/// [`ToolResult`] is produced per request; consumers rely on this for
/// correlation in conversation history.
pub struct Pipeline {
    registry: Arc<ToolRegistry>,
    gatekeeper: Arc<Gatekeeper>,
    supervisor: Arc<Supervisor>,
    log: Arc<AuditLog>,
    events: EventBus,
}

impl Pipeline {
    pub fn new(
        registry: Arc<ToolRegistry>,
        gatekeeper: Arc<Gatekeeper>,
        supervisor: Arc<Supervisor>,
        log: Arc<AuditLog>,
        events: EventBus,
    ) -> Self {
        Self {
            registry,
            gatekeeper,
            supervisor,
            log,
            events,
        }
    }

    pub fn supervisor(&self) -> &Arc<Supervisor> {
        &self.supervisor
    }

    /// Drive one tool-call request to its terminal result.
    ///
    /// Never panics and never crosses failure into another invocation; every
    /// path below resolves to exactly one result for `request.id`.
    pub async fn invoke(&self, request: ToolCallRequest, timeout: Option<Duration>) -> ToolResult {
        self.events.emit(HostEvent::ToolRequested {
            request_id: request.id.clone(),
            tool_name: request.tool_name.clone(),
        });

        // Arguments are semi-trusted collaborator output: a schema mismatch
        // is a protocol error, caught before authorization is even attempted.
        if let Some(tool) = self.registry.get(&request.tool_name) {
            if let Err(e) =
                wire::validate_arguments(&tool.definition.input_schema, &request.arguments)
            {
                self.audit_protocol_error(&request, &e.to_string(), request.arguments.to_string());
                return self
                    .finish(&request, ToolResult::failure(request.id.clone(), e.to_string()));
            }
        }

        let verdict = self.gatekeeper.authorize(&request);
        if !verdict.allowed {
            // Denied is terminal before the supervisor ever sees the call.
            return self.finish(&request, ToolResult::denied(request.id.clone(), verdict.reason));
        }

        // Authorization guarantees registration.
        let Some(tool) = self.registry.get(&request.tool_name) else {
            return self.finish(
                &request,
                ToolResult::denied(request.id.clone(), "tool vanished from registry"),
            );
        };

        let frame = match wire::encode_request(&request) {
            Ok(frame) => frame,
            Err(e) => {
                return self.finish(
                    &request,
                    ToolResult::failure(request.id.clone(), format!("encode failed: {e}")),
                );
            }
        };

        let report = self.supervisor.execute(&tool.launch, frame, timeout).await;
        debug!(
            invocation = report.invocation,
            tool = %request.tool_name,
            elapsed_ms = report.elapsed.as_millis() as u64,
            "execution finished"
        );

        let result = match report.outcome {
            ExecOutcome::Frame(bytes) => match wire::decode_response(&bytes, &request.id) {
                Ok(payload) => ToolResult::success(request.id.clone(), payload),
                Err(wire::Error::Remote(err)) => {
                    ToolResult::failure(request.id.clone(), format!("tool reported error: {err}"))
                }
                Err(e) => {
                    self.audit_protocol_error(
                        &request,
                        &e.to_string(),
                        String::from_utf8_lossy(&bytes).into_owned(),
                    );
                    ToolResult::failure(request.id.clone(), format!("protocol error: {e}"))
                }
            },
            ExecOutcome::SpawnFailed(detail) => {
                ToolResult::failure(request.id.clone(), format!("spawn failed: {detail}"))
            }
            ExecOutcome::Exited { status, partial } => {
                if !partial.is_empty() {
                    self.audit_protocol_error(
                        &request,
                        "process exited mid-frame",
                        String::from_utf8_lossy(&partial).into_owned(),
                    );
                }
                let detail = match status {
                    Some(code) => format!("process exited with status {code} before responding"),
                    None => "process exited before responding".to_string(),
                };
                ToolResult::failure(request.id.clone(), with_stderr(detail, &report.stderr))
            }
            ExecOutcome::Oversize { size, max } => {
                self.audit_protocol_error(
                    &request,
                    &format!("response exceeded frame bound: {size} bytes (max {max})"),
                    String::new(),
                );
                ToolResult::failure(
                    request.id.clone(),
                    format!("response too large: {size} bytes (max {max})"),
                )
            }
            ExecOutcome::TimedOut => ToolResult::timed_out(request.id.clone()),
            ExecOutcome::Terminated => {
                ToolResult::failure(request.id.clone(), "terminated before completion")
            }
        };

        self.finish(&request, result)
    }

    fn finish(&self, request: &ToolCallRequest, result: ToolResult) -> ToolResult {
        self.events.emit(HostEvent::ToolCompleted {
            request_id: result.request_id.clone(),
            tool_name: request.tool_name.clone(),
            outcome: result.outcome.clone(),
        });
        result
    }

    fn audit_protocol_error(&self, request: &ToolCallRequest, detail: &str, raw: String) {
        warn!(tool = %request.tool_name, detail, "protocol error");
        if let Err(e) = self.log.append(&Record::new(RecordKind::ProtocolError {
            request_id: request.id.to_string(),
            tool_name: request.tool_name.clone(),
            detail: detail.to_string(),
            raw,
        })) {
            warn!(error = %e, "failed to append protocol error to audit trail");
        }
    }
}

fn with_stderr(detail: String, stderr: &str) -> String {
    let stderr = stderr.trim();
    if stderr.is_empty() {
        detail
    } else {
        format!("{detail}; stderr: {stderr}")
    }
}

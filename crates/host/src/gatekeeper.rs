//! Capability middleware: authorize or reject every proposed tool call.

use std::sync::Arc;

use audit::{AuditLog, Record, RecordKind};
use policy::{Decision, PolicyStore};
use sha2::{Digest, Sha256};
use tracing::{info, warn};
use wire::ToolCallRequest;

use crate::events::{EventBus, HostEvent};
use crate::registry::ToolRegistry;

/// Outcome of one authorization check.
#[derive(Debug, Clone)]
pub struct Verdict {
    pub allowed: bool,
    pub reason: String,
    /// The rule that produced the decision.
    pub rule: String,
}

/// The gatekeeper sits between the collaborator's decisions and the process
/// supervisor. Pure with respect to the policy snapshot it loads per check;
/// its only side effects are the audit record and event emission, which
/// happen on the allow path as well as deny.
pub struct Gatekeeper {
    store: Arc<PolicyStore>,
    registry: Arc<ToolRegistry>,
    log: Arc<AuditLog>,
    events: EventBus,
}

impl Gatekeeper {
    pub fn new(
        store: Arc<PolicyStore>,
        registry: Arc<ToolRegistry>,
        log: Arc<AuditLog>,
        events: EventBus,
    ) -> Self {
        Self {
            store,
            registry,
            log,
            events,
        }
    }

    /// Authorize one tool-call request.
    ///
    /// An unregistered tool is always denied regardless of policy content, so
    /// an unknown name cannot be allow-listed by collision. Registered tools
    /// get the snapshot's per-tool rule, or the global default if none.
    pub fn authorize(&self, request: &ToolCallRequest) -> Verdict {
        let verdict = if !self.registry.contains(&request.tool_name) {
            Verdict {
                allowed: false,
                reason: format!("tool '{}' is not registered", request.tool_name),
                rule: "unregistered".to_string(),
            }
        } else {
            let snapshot = self.store.snapshot();
            let (decision, source) = snapshot.decision_for(&request.tool_name);
            match decision {
                Decision::Allow => Verdict {
                    allowed: true,
                    reason: format!("allowed by {source}"),
                    rule: source.to_string(),
                },
                Decision::Deny => Verdict {
                    allowed: false,
                    reason: format!("denied by {source}"),
                    rule: source.to_string(),
                },
            }
        };

        self.record(request, &verdict);
        verdict
    }

    fn record(&self, request: &ToolCallRequest, verdict: &Verdict) {
        let decision = if verdict.allowed { "allow" } else { "deny" };
        if verdict.allowed {
            info!(tool = %request.tool_name, rule = %verdict.rule, "tool call authorized");
        } else {
            warn!(tool = %request.tool_name, rule = %verdict.rule, reason = %verdict.reason, "tool call denied");
        }

        if let Err(e) = self.log.append(&Record::new(RecordKind::Verdict {
            request_id: request.id.to_string(),
            tool_name: request.tool_name.clone(),
            arguments_digest: arguments_digest(request),
            decision: decision.to_string(),
            rule: verdict.rule.clone(),
            reason: (!verdict.allowed).then(|| verdict.reason.clone()),
        })) {
            warn!(error = %e, "failed to append verdict to audit trail");
        }

        self.events.emit(HostEvent::Verdict {
            request_id: request.id.clone(),
            tool_name: request.tool_name.clone(),
            allowed: verdict.allowed,
            reason: verdict.reason.clone(),
        });
    }
}

/// SHA-256 over the compact argument encoding. The audit trail stores the
/// digest, not the arguments themselves.
fn arguments_digest(request: &ToolCallRequest) -> String {
    let encoded = request.arguments.to_string();
    let digest = Sha256::digest(encoded.as_bytes());
    format!("{digest:x}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use policy::Policy;
    use serde_json::json;
    use supervisor::LaunchSpec;
    use wire::{RequestId, ToolDefinition};

    fn registry(names: &[&str]) -> Arc<ToolRegistry> {
        let tools = names.iter().map(|name| crate::registry::RegisteredTool {
            definition: ToolDefinition {
                name: name.to_string(),
                description: None,
                input_schema: json!({"type": "object"}),
            },
            launch: LaunchSpec::new(*name, "true"),
        });
        Arc::new(ToolRegistry::new(tools).unwrap())
    }

    fn gatekeeper(policy_toml: &str, names: &[&str]) -> Gatekeeper {
        let policy = Policy::parse(policy_toml).unwrap();
        Gatekeeper::new(
            Arc::new(PolicyStore::new(policy)),
            registry(names),
            Arc::new(AuditLog::in_memory().unwrap()),
            EventBus::new(),
        )
    }

    fn request(tool: &str) -> ToolCallRequest {
        ToolCallRequest {
            id: RequestId::String(format!("call-{tool}")),
            tool_name: tool.to_string(),
            arguments: json!({"a": 1, "b": 2}),
        }
    }

    #[test]
    fn scenario_from_security_review() {
        let gk = gatekeeper(
            "global_policy = \"deny\"\n[rules]\ncalculate_sum = \"allow\"\n",
            &["calculate_sum", "delete_system32"],
        );

        assert!(gk.authorize(&request("calculate_sum")).allowed);
        let denied = gk.authorize(&request("delete_system32"));
        assert!(!denied.allowed);
        assert_eq!(denied.rule, "global_policy");
    }

    #[test]
    fn unregistered_tool_denied_even_when_allow_listed() {
        let gk = gatekeeper(
            "global_policy = \"deny\"\n[rules]\nnonexistent_tool = \"allow\"\n",
            &["calculate_sum"],
        );
        let verdict = gk.authorize(&request("nonexistent_tool"));
        assert!(!verdict.allowed);
        assert_eq!(verdict.rule, "unregistered");
    }

    #[test]
    fn default_decision_applies_without_rule() {
        let gk = gatekeeper("global_policy = \"allow\"\n", &["anything"]);
        let verdict = gk.authorize(&request("anything"));
        assert!(verdict.allowed);
        assert_eq!(verdict.rule, "global_policy");
    }

    #[test]
    fn every_verdict_is_audited_allow_included() {
        let log = Arc::new(AuditLog::in_memory().unwrap());
        let gk = Gatekeeper::new(
            Arc::new(PolicyStore::new(Policy::parse("global_policy = \"allow\"").unwrap())),
            registry(&["calculate_sum"]),
            log.clone(),
            EventBus::new(),
        );

        gk.authorize(&request("calculate_sum"));
        gk.authorize(&request("unknown"));

        let verdicts = log.recent(10, Some("verdict")).unwrap();
        assert_eq!(verdicts.len(), 2);
    }

    #[test]
    fn reload_uses_latest_snapshot_only() {
        let store = Arc::new(PolicyStore::new(
            Policy::parse("global_policy = \"deny\"").unwrap(),
        ));
        let gk = Gatekeeper::new(
            store.clone(),
            registry(&["calculate_sum"]),
            Arc::new(AuditLog::in_memory().unwrap()),
            EventBus::new(),
        );

        assert!(!gk.authorize(&request("calculate_sum")).allowed);
        store.replace(Policy::parse("global_policy = \"allow\"").unwrap());
        assert!(gk.authorize(&request("calculate_sum")).allowed);
    }

    #[test]
    fn digest_is_stable() {
        let a = arguments_digest(&request("x"));
        let b = arguments_digest(&request("x"));
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
    }
}

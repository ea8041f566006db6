//! Audit record types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// What an audit record captures.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RecordKind {
    /// An authorization verdict. Recorded on the allow path as well as deny;
    /// this is the audit trail, not an error log.
    Verdict {
        request_id: String,
        tool_name: String,
        /// SHA-256 digest of the canonical argument encoding.
        arguments_digest: String,
        decision: String,
        /// The rule that produced the decision (per-tool rule or the
        /// global default).
        rule: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },
    /// A subprocess lifecycle transition.
    Process {
        invocation: u64,
        tool_name: String,
        phase: ProcessPhase,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        status: Option<i32>,
    },
    /// A response that failed to parse or correlate. The raw bytes are
    /// preserved (lossy UTF-8) for diagnosis.
    ProtocolError {
        request_id: String,
        tool_name: String,
        detail: String,
        raw: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessPhase {
    Spawned,
    Exited,
    TimedOut,
    Killed,
}

/// One entry in the audit trail.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Record {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub kind: RecordKind,
}

impl Record {
    pub fn new(kind: RecordKind) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            kind,
        }
    }

    /// Tool name this record concerns, for filtered queries.
    pub fn tool_name(&self) -> &str {
        match &self.kind {
            RecordKind::Verdict { tool_name, .. }
            | RecordKind::Process { tool_name, .. }
            | RecordKind::ProtocolError { tool_name, .. } => tool_name,
        }
    }
}

pub(crate) fn kind_name(kind: &RecordKind) -> &'static str {
    match kind {
        RecordKind::Verdict { .. } => "verdict",
        RecordKind::Process { .. } => "process",
        RecordKind::ProtocolError { .. } => "protocol_error",
    }
}

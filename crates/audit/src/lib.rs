//! SQLite-backed audit trail for the tool execution host.
//!
//! Every authorization verdict (allow and deny alike), every subprocess
//! lifecycle transition, and every protocol error (raw bytes included) is
//! appended here, enabling "why did it do that?" inspection after the fact.
//! Conversation history itself is not persisted; this is the security audit
//! trail, not a chat log.
//!
//! # Example
//!
//! ```
//! use audit::{AuditLog, Record, RecordKind};
//!
//! let log = AuditLog::in_memory()?;
//! log.append(&Record::new(RecordKind::Verdict {
//!     request_id: "call-1".into(),
//!     tool_name: "calculate_sum".into(),
//!     arguments_digest: "9f86d08...".into(),
//!     decision: "allow".into(),
//!     rule: "rules.calculate_sum".into(),
//!     reason: None,
//! }))?;
//!
//! let verdicts = log.recent(10, Some("verdict"))?;
//! assert_eq!(verdicts.len(), 1);
//! # Ok::<(), audit::Error>(())
//! ```

mod error;
mod log;
mod record;

pub use error::{Error, Result};
pub use log::AuditLog;
pub use record::{ProcessPhase, Record, RecordKind};

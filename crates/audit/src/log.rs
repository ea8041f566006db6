//! SQLite audit log implementation.

use crate::record::{Record, kind_name};
use crate::{Error, Result};
use rusqlite::{Connection, params};
use std::path::Path;
use std::sync::Mutex;

/// SQLite-backed audit trail.
///
/// Appends come from concurrent invocation tasks, so the connection sits
/// behind a mutex; the critical sections are single statements.
pub struct AuditLog {
    conn: Mutex<Connection>,
}

impl AuditLog {
    /// Open or create an audit log at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path)?;
        let log = Self {
            conn: Mutex::new(conn),
        };
        log.init_schema()?;
        Ok(log)
    }

    /// Create an in-memory audit log (useful for testing).
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let log = Self {
            conn: Mutex::new(conn),
        };
        log.init_schema()?;
        Ok(log)
    }

    fn init_schema(&self) -> Result<()> {
        let conn = self.lock();
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS records (
                id TEXT PRIMARY KEY,
                timestamp TEXT NOT NULL,
                kind TEXT NOT NULL,
                tool_name TEXT NOT NULL,
                data TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_records_tool
                ON records(tool_name, timestamp);
            "#,
        )?;
        Ok(())
    }

    /// Append a record to the trail.
    pub fn append(&self, record: &Record) -> Result<()> {
        let conn = self.lock();
        conn.execute(
            "INSERT INTO records (id, timestamp, kind, tool_name, data) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                record.id.to_string(),
                record.timestamp.to_rfc3339(),
                kind_name(&record.kind),
                record.tool_name(),
                serde_json::to_string(&record.kind)?,
            ],
        )?;
        Ok(())
    }

    /// Most recent records, newest first, optionally filtered by kind.
    pub fn recent(&self, limit: usize, kind: Option<&str>) -> Result<Vec<Record>> {
        let conn = self.lock();
        let (sql, has_kind) = match kind {
            Some(_) => (
                "SELECT id, timestamp, data FROM records WHERE kind = ?1
                 ORDER BY timestamp DESC LIMIT ?2",
                true,
            ),
            None => (
                "SELECT id, timestamp, data FROM records
                 ORDER BY timestamp DESC LIMIT ?1",
                false,
            ),
        };
        let mut stmt = conn.prepare(sql)?;

        let map_row = |row: &rusqlite::Row<'_>| {
            let id: String = row.get(0)?;
            let timestamp: String = row.get(1)?;
            let data: String = row.get(2)?;
            Ok((id, timestamp, data))
        };

        let rows: Vec<(String, String, String)> = if has_kind {
            stmt.query_map(params![kind, limit as i64], map_row)?
                .filter_map(|r| r.ok())
                .collect()
        } else {
            stmt.query_map(params![limit as i64], map_row)?
                .filter_map(|r| r.ok())
                .collect()
        };

        Ok(rows
            .into_iter()
            .filter_map(|(id, timestamp, data)| {
                Some(Record {
                    id: id.parse().ok()?,
                    timestamp: timestamp.parse().ok()?,
                    kind: serde_json::from_str(&data).ok()?,
                })
            })
            .collect())
    }

    /// All records for one tool, oldest first.
    pub fn for_tool(&self, tool_name: &str) -> Result<Vec<Record>> {
        let conn = self.lock();
        let mut stmt = conn.prepare(
            "SELECT id, timestamp, data FROM records
             WHERE tool_name = ?1 ORDER BY timestamp",
        )?;

        let records = stmt
            .query_map([tool_name], |row| {
                let id: String = row.get(0)?;
                let timestamp: String = row.get(1)?;
                let data: String = row.get(2)?;
                Ok((id, timestamp, data))
            })?
            .filter_map(|r| r.ok())
            .filter_map(|(id, timestamp, data)| {
                Some(Record {
                    id: id.parse().ok()?,
                    timestamp: timestamp.parse().ok()?,
                    kind: serde_json::from_str(&data).ok()?,
                })
            })
            .collect();

        Ok(records)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().expect("audit connection poisoned")
    }

    /// Number of records in the trail.
    pub fn len(&self) -> Result<usize> {
        let conn = self.lock();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM records", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }
}

#[allow(unused)]
fn _assert_send_sync() {
    fn check<T: Send + Sync>() {}
    check::<AuditLog>();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{ProcessPhase, RecordKind};

    fn verdict(tool: &str, decision: &str) -> Record {
        Record::new(RecordKind::Verdict {
            request_id: "req-1".into(),
            tool_name: tool.into(),
            arguments_digest: "deadbeef".into(),
            decision: decision.into(),
            rule: "global_policy".into(),
            reason: None,
        })
    }

    #[test]
    fn append_and_read_back() {
        let log = AuditLog::in_memory().unwrap();
        log.append(&verdict("calculate_sum", "allow")).unwrap();
        log.append(&Record::new(RecordKind::Process {
            invocation: 1,
            tool_name: "calculate_sum".into(),
            phase: ProcessPhase::Spawned,
            status: None,
        }))
        .unwrap();

        assert_eq!(log.len().unwrap(), 2);
        let records = log.for_tool("calculate_sum").unwrap();
        assert_eq!(records.len(), 2);
        assert!(matches!(records[0].kind, RecordKind::Verdict { .. }));
    }

    #[test]
    fn recent_filters_by_kind() {
        let log = AuditLog::in_memory().unwrap();
        log.append(&verdict("a", "deny")).unwrap();
        log.append(&Record::new(RecordKind::ProtocolError {
            request_id: "req-2".into(),
            tool_name: "a".into(),
            detail: "bad frame".into(),
            raw: "not json".into(),
        }))
        .unwrap();

        let verdicts = log.recent(10, Some("verdict")).unwrap();
        assert_eq!(verdicts.len(), 1);
        let all = log.recent(10, None).unwrap();
        assert_eq!(all.len(), 2);
    }

    #[test]
    fn allow_path_is_recorded_too() {
        let log = AuditLog::in_memory().unwrap();
        log.append(&verdict("calculate_sum", "allow")).unwrap();
        let records = log.recent(10, Some("verdict")).unwrap();
        match &records[0].kind {
            RecordKind::Verdict { decision, .. } => assert_eq!(decision, "allow"),
            other => panic!("unexpected record: {other:?}"),
        }
    }
}

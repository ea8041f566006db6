//! Live-handle table.

use crate::types::{HandleInfo, InvocationId};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Instant;
use tokio_util::sync::CancellationToken;

pub(crate) struct Entry {
    pub tool_name: String,
    pub pid: Option<u32>,
    pub spawned_at: Instant,
    pub cancel: CancellationToken,
}

/// Mutex-guarded map of live executions.
///
/// The only mutable structure shared across invocation tasks. Mutations
/// (insert on spawn, remove on completion) serialize on the lock; status
/// queries read a snapshot. Nothing awaits while holding the lock.
#[derive(Default)]
pub(crate) struct HandleTable {
    inner: Mutex<HashMap<InvocationId, Entry>>,
}

impl HandleTable {
    pub fn insert(&self, id: InvocationId, entry: Entry) {
        self.inner.lock().expect("handle table poisoned").insert(id, entry);
    }

    pub fn remove(&self, id: InvocationId) {
        self.inner.lock().expect("handle table poisoned").remove(&id);
    }

    /// Signal one live handle to terminate. False if already terminal.
    pub fn cancel(&self, id: InvocationId) -> bool {
        let guard = self.inner.lock().expect("handle table poisoned");
        match guard.get(&id) {
            Some(entry) => {
                entry.cancel.cancel();
                true
            }
            None => false,
        }
    }

    /// Signal every live handle to terminate.
    pub fn cancel_all(&self) {
        let guard = self.inner.lock().expect("handle table poisoned");
        for entry in guard.values() {
            entry.cancel.cancel();
        }
    }

    pub fn len(&self) -> usize {
        self.inner.lock().expect("handle table poisoned").len()
    }

    pub fn snapshot(&self) -> Vec<HandleInfo> {
        let guard = self.inner.lock().expect("handle table poisoned");
        let now = Instant::now();
        guard
            .iter()
            .map(|(&invocation, entry)| HandleInfo {
                invocation,
                tool_name: entry.tool_name.clone(),
                pid: entry.pid,
                running_for: now.duration_since(entry.spawned_at),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(tool: &str) -> Entry {
        Entry {
            tool_name: tool.to_string(),
            pid: Some(42),
            spawned_at: Instant::now(),
            cancel: CancellationToken::new(),
        }
    }

    #[test]
    fn insert_remove_roundtrip() {
        let table = HandleTable::default();
        table.insert(1, entry("a"));
        table.insert(2, entry("b"));
        assert_eq!(table.len(), 2);

        table.remove(1);
        let snap = table.snapshot();
        assert_eq!(snap.len(), 1);
        assert_eq!(snap[0].tool_name, "b");
    }

    #[test]
    fn cancel_reaches_the_token() {
        let table = HandleTable::default();
        let e = entry("a");
        let token = e.cancel.clone();
        table.insert(7, e);

        assert!(table.cancel(7));
        assert!(token.is_cancelled());
        // Removed handles are already terminal.
        table.remove(7);
        assert!(!table.cancel(7));
    }
}

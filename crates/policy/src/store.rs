//! Hot-reloadable policy snapshots.

use crate::{Policy, Result};
use arc_swap::ArcSwap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info};

/// Atomically swappable policy snapshot.
///
/// Readers take an `Arc<Policy>` and keep it for the duration of one
/// authorization, so an in-flight check never observes a half-updated policy.
/// Reload builds a complete new snapshot and swaps it in one step.
pub struct PolicyStore {
    current: ArcSwap<Policy>,
    source: Option<PathBuf>,
}

impl PolicyStore {
    /// Create a store from an already-parsed policy (no reload source).
    pub fn new(policy: Policy) -> Self {
        Self {
            current: ArcSwap::from_pointee(policy),
            source: None,
        }
    }

    /// Load the initial snapshot from a TOML file.
    ///
    /// A malformed policy here is fatal: the host refuses to start rather
    /// than run with an ambiguous rule set.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let policy = Policy::load(path)?;
        Ok(Self {
            current: ArcSwap::from_pointee(policy),
            source: Some(path.to_path_buf()),
        })
    }

    /// Current snapshot. Cheap; safe to hold across await points.
    pub fn snapshot(&self) -> Arc<Policy> {
        self.current.load_full()
    }

    /// Re-read the source file and swap in a fresh snapshot.
    ///
    /// A reload failure after startup never crashes the host: the error is
    /// logged and the last-known-good snapshot keeps serving.
    pub fn reload(&self) -> bool {
        let Some(path) = &self.source else {
            return false;
        };

        match Policy::load(path) {
            Ok(policy) => {
                let rules = policy.rules.len();
                self.current.store(Arc::new(policy));
                info!(path = %path.display(), rules, "policy reloaded");
                true
            }
            Err(e) => {
                error!(path = %path.display(), error = %e, "policy reload failed, keeping last-known-good snapshot");
                false
            }
        }
    }

    /// Swap in a new snapshot directly (tests, embedded callers).
    pub fn replace(&self, policy: Policy) {
        self.current.store(Arc::new(policy));
    }
}

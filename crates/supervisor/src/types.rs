//! Supervisor data types.

use std::collections::HashMap;
use std::time::Duration;

/// Monotonic identifier for one tool execution.
pub type InvocationId = u64;

/// How to launch a tool's executable.
#[derive(Debug, Clone)]
pub struct LaunchSpec {
    /// Tool name, carried through lifecycle events.
    pub tool_name: String,
    pub command: String,
    pub args: Vec<String>,
    pub env: HashMap<String, String>,
}

impl LaunchSpec {
    pub fn new(tool_name: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            tool_name: tool_name.into(),
            command: command.into(),
            args: Vec::new(),
            env: HashMap::new(),
        }
    }

    pub fn with_args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }
}

/// Supervisor tuning knobs.
#[derive(Debug, Clone)]
pub struct SupervisorConfig {
    /// Cap on concurrently running subprocesses. Spawns beyond the cap
    /// queue FIFO until a slot frees.
    pub max_concurrent: usize,
    /// Timeout applied when the caller does not supply one.
    pub default_timeout: Duration,
    /// Window between graceful terminate and forced kill.
    pub grace_period: Duration,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            max_concurrent: 8,
            default_timeout: Duration::from_secs(15),
            grace_period: Duration::from_millis(500),
        }
    }
}

/// Terminal outcome of one execution.
#[derive(Debug, Clone)]
pub enum ExecOutcome {
    /// One complete response frame arrived.
    Frame(Vec<u8>),
    /// The executable could not be spawned (missing, permission denied).
    SpawnFailed(String),
    /// The process exited before producing a complete frame. Any bytes it
    /// did write are preserved for the audit record.
    Exited {
        status: Option<i32>,
        partial: Vec<u8>,
    },
    /// The process wrote more than the frame-size bound.
    Oversize { size: usize, max: usize },
    /// No complete frame before the deadline; the process was killed.
    TimedOut,
    /// Terminated on request (turn cancellation or host shutdown).
    Terminated,
}

/// What one call to [`Supervisor::execute`] produced.
///
/// [`Supervisor::execute`]: crate::Supervisor::execute
#[derive(Debug, Clone)]
pub struct ExecReport {
    pub invocation: InvocationId,
    pub outcome: ExecOutcome,
    /// Everything the tool wrote to stderr. Captured for audit, never parsed.
    pub stderr: String,
    pub elapsed: Duration,
}

/// Subprocess lifecycle event, published on the supervisor's broadcast
/// channel for any observer (dashboard, log sink, tests).
#[derive(Debug, Clone)]
pub enum ProcessEvent {
    Spawned {
        invocation: InvocationId,
        tool_name: String,
        pid: Option<u32>,
    },
    Exited {
        invocation: InvocationId,
        tool_name: String,
        status: Option<i32>,
    },
    TimedOut {
        invocation: InvocationId,
        tool_name: String,
    },
    Killed {
        invocation: InvocationId,
        tool_name: String,
    },
}

/// Read-only view of a live handle, for status queries.
#[derive(Debug, Clone)]
pub struct HandleInfo {
    pub invocation: InvocationId,
    pub tool_name: String,
    pub pid: Option<u32>,
    pub running_for: Duration,
}

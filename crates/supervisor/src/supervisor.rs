//! Subprocess spawning, piping, timeout enforcement, and reaping.

use std::process::Stdio;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::{Child, ChildStdin, Command};
use tokio::sync::{Semaphore, broadcast};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::table::{Entry, HandleTable};
use crate::types::{
    ExecOutcome, ExecReport, HandleInfo, InvocationId, LaunchSpec, ProcessEvent, SupervisorConfig,
};
use wire::FrameDecoder;

const READ_CHUNK: usize = 4096;
const EVENT_CAPACITY: usize = 256;

/// Owns the subprocess pool: spawn-on-demand, stream piping, timeout
/// enforcement, termination, and resource accounting.
///
/// Each call to [`execute`](Self::execute) is an independent unit of
/// concurrency; many may be in flight at once, bounded by
/// [`SupervisorConfig::max_concurrent`] with FIFO queueing beyond the cap.
pub struct Supervisor {
    config: SupervisorConfig,
    limiter: Arc<Semaphore>,
    table: HandleTable,
    next_id: AtomicU64,
    events: broadcast::Sender<ProcessEvent>,
}

impl Supervisor {
    pub fn new(config: SupervisorConfig) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            limiter: Arc::new(Semaphore::new(config.max_concurrent.max(1))),
            config,
            table: HandleTable::default(),
            next_id: AtomicU64::new(1),
            events,
        }
    }

    /// Subscribe to subprocess lifecycle events. The supervisor functions
    /// identically with zero subscribers.
    pub fn subscribe(&self) -> broadcast::Receiver<ProcessEvent> {
        self.events.subscribe()
    }

    /// Number of currently live subprocesses.
    pub fn live_count(&self) -> usize {
        self.table.len()
    }

    /// Snapshot of all live handles.
    pub fn live_handles(&self) -> Vec<HandleInfo> {
        self.table.snapshot()
    }

    /// Signal one live execution to terminate. Returns false if the handle
    /// is already terminal.
    pub fn terminate(&self, invocation: InvocationId) -> bool {
        self.table.cancel(invocation)
    }

    /// Signal every live execution to terminate (turn cancellation).
    pub fn terminate_all(&self) {
        self.table.cancel_all();
    }

    /// Terminate all live handles and wait up to `grace` for them to reap.
    ///
    /// Each execution responds to the signal by closing the tool's stdin and
    /// force-killing after its own grace interval, so no subprocess outlives
    /// the host past this bound. Abandoned children are killed on drop.
    pub async fn shutdown(&self, grace: Duration) {
        self.table.cancel_all();
        let deadline = Instant::now() + grace;
        while self.table.len() > 0 && Instant::now() < deadline {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        let stragglers = self.table.len();
        if stragglers > 0 {
            warn!(stragglers, "subprocesses still live at shutdown deadline");
        }
    }

    /// Run one tool invocation to a terminal outcome.
    ///
    /// Spawns the executable, writes `frame` to its stdin, and accumulates
    /// stdout until one complete response frame arrives or the deadline
    /// passes. Exactly one [`ExecReport`] is produced per call; no failure
    /// here escapes as a panic or crosses into another invocation.
    pub async fn execute(
        &self,
        spec: &LaunchSpec,
        frame: Vec<u8>,
        timeout: Option<Duration>,
    ) -> ExecReport {
        let started = Instant::now();
        let deadline = timeout.unwrap_or(self.config.default_timeout);

        // FIFO queue on the concurrency cap; never dropped.
        let _permit = self
            .limiter
            .acquire()
            .await
            .expect("supervisor semaphore never closed");

        let invocation = self.next_id.fetch_add(1, Ordering::Relaxed);

        let mut cmd = Command::new(&spec.command);
        cmd.args(&spec.args)
            .envs(&spec.env)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => {
                warn!(tool = %spec.tool_name, command = %spec.command, error = %e, "spawn failed");
                return ExecReport {
                    invocation,
                    outcome: ExecOutcome::SpawnFailed(e.to_string()),
                    stderr: String::new(),
                    elapsed: started.elapsed(),
                };
            }
        };

        let pid = child.id();
        let cancel = CancellationToken::new();
        self.table.insert(
            invocation,
            Entry {
                tool_name: spec.tool_name.clone(),
                pid,
                spawned_at: started,
                cancel: cancel.clone(),
            },
        );
        debug!(invocation, tool = %spec.tool_name, ?pid, "subprocess spawned");
        self.emit(ProcessEvent::Spawned {
            invocation,
            tool_name: spec.tool_name.clone(),
            pid,
        });

        // Stderr is drained concurrently so a chatty tool cannot deadlock on
        // a full pipe; the bytes are kept for audit, never parsed.
        let stderr_pipe = child.stderr.take();
        let stderr_task = tokio::spawn(async move {
            let mut buf = Vec::new();
            if let Some(mut pipe) = stderr_pipe {
                let _ = pipe.read_to_end(&mut buf).await;
            }
            buf
        });

        let outcome = self
            .drive(invocation, &spec.tool_name, &mut child, frame, deadline, cancel)
            .await;

        self.table.remove(invocation);

        let stderr = match tokio::time::timeout(self.config.grace_period, stderr_task).await {
            Ok(Ok(bytes)) => String::from_utf8_lossy(&bytes).into_owned(),
            _ => String::new(),
        };

        ExecReport {
            invocation,
            outcome,
            stderr,
            elapsed: started.elapsed(),
        }
    }

    async fn drive(
        &self,
        invocation: InvocationId,
        tool_name: &str,
        child: &mut Child,
        frame: Vec<u8>,
        deadline: Duration,
        cancel: CancellationToken,
    ) -> ExecOutcome {
        let mut stdin = child.stdin.take();
        let mut stdout = match child.stdout.take() {
            Some(stdout) => stdout,
            None => {
                let status = self.reap(invocation, tool_name, child, stdin.take()).await;
                return ExecOutcome::Exited {
                    status,
                    partial: Vec::new(),
                };
            }
        };

        // A write failure means the child already died; fall through to the
        // exit path and report its status instead of the pipe error.
        if let Some(pipe) = stdin.as_mut() {
            let write = async {
                pipe.write_all(&frame).await?;
                pipe.flush().await
            };
            if write.await.is_err() {
                let status = self.reap(invocation, tool_name, child, stdin.take()).await;
                return ExecOutcome::Exited {
                    status,
                    partial: Vec::new(),
                };
            }
        }

        let mut decoder = FrameDecoder::new();
        let mut buf = [0u8; READ_CHUNK];
        let deadline_at = tokio::time::Instant::now() + deadline;

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!(invocation, tool = %tool_name, "terminate requested");
                    self.reap(invocation, tool_name, child, stdin.take()).await;
                    return ExecOutcome::Terminated;
                }
                _ = tokio::time::sleep_until(deadline_at) => {
                    warn!(invocation, tool = %tool_name, ?deadline, "no complete frame before deadline");
                    self.emit(ProcessEvent::TimedOut {
                        invocation,
                        tool_name: tool_name.to_string(),
                    });
                    self.reap(invocation, tool_name, child, stdin.take()).await;
                    return ExecOutcome::TimedOut;
                }
                read = stdout.read(&mut buf) => match read {
                    Ok(0) => {
                        let partial = decoder.residual().to_vec();
                        let status = self.reap(invocation, tool_name, child, stdin.take()).await;
                        return ExecOutcome::Exited { status, partial };
                    }
                    Ok(n) => {
                        match decoder.feed(&buf[..n]) {
                            Ok(()) => {}
                            Err(wire::Error::FrameTooLarge { size, max }) => {
                                self.kill(invocation, tool_name, child).await;
                                return ExecOutcome::Oversize { size, max };
                            }
                            // feed only fails on frame size
                            Err(_) => {}
                        }
                        if let Some(response) = decoder.next_frame() {
                            self.reap(invocation, tool_name, child, stdin.take()).await;
                            return ExecOutcome::Frame(response);
                        }
                    }
                    Err(e) => {
                        warn!(invocation, tool = %tool_name, error = %e, "stdout read failed");
                        let partial = decoder.residual().to_vec();
                        self.kill(invocation, tool_name, child).await;
                        return ExecOutcome::Exited { status: None, partial };
                    }
                }
            }
        }
    }

    /// Graceful terminate, then forced kill after the grace interval.
    ///
    /// Closing the tool's stdin is the terminate signal under the one-shot
    /// contract; a well-behaved tool exits on EOF.
    async fn reap(
        &self,
        invocation: InvocationId,
        tool_name: &str,
        child: &mut Child,
        stdin: Option<ChildStdin>,
    ) -> Option<i32> {
        drop(stdin);
        match tokio::time::timeout(self.config.grace_period, child.wait()).await {
            Ok(Ok(status)) => {
                let code = status.code();
                self.emit(ProcessEvent::Exited {
                    invocation,
                    tool_name: tool_name.to_string(),
                    status: code,
                });
                code
            }
            Ok(Err(e)) => {
                warn!(invocation, tool = %tool_name, error = %e, "wait failed");
                None
            }
            Err(_) => {
                self.kill(invocation, tool_name, child).await;
                None
            }
        }
    }

    async fn kill(&self, invocation: InvocationId, tool_name: &str, child: &mut Child) {
        let _ = child.kill().await;
        self.emit(ProcessEvent::Killed {
            invocation,
            tool_name: tool_name.to_string(),
        });
    }

    fn emit(&self, event: ProcessEvent) {
        // Send fails only when no observer is attached, which is fine.
        let _ = self.events.send(event);
    }
}

//! Asynchronous process supervision for tool subprocesses.
//!
//! The supervisor spawns a tool's executable on demand, wires its standard
//! streams, writes one framed request, and awaits one framed response without
//! blocking any other in-flight invocation. Every execution carries a timeout;
//! a tool that never produces a complete frame is terminated gracefully and
//! then force-killed after a short grace interval.
//!
//! One-shot contract: a subprocess serves exactly one invocation and exits.
//! There is no tool-server reuse across calls.
//!
//! # Example
//!
//! ```no_run
//! use supervisor::{ExecOutcome, LaunchSpec, Supervisor, SupervisorConfig};
//!
//! # async fn example() {
//! let supervisor = Supervisor::new(SupervisorConfig::default());
//! let spec = LaunchSpec::new("calculate_sum", "./tools/adder");
//!
//! let report = supervisor.execute(&spec, b"{...}\n".to_vec(), None).await;
//! match report.outcome {
//!     ExecOutcome::Frame(bytes) => println!("{} bytes", bytes.len()),
//!     other => eprintln!("no response: {other:?}"),
//! }
//! # }
//! ```

mod supervisor;
mod table;
mod types;

pub use supervisor::Supervisor;
pub use types::{
    ExecOutcome, ExecReport, HandleInfo, InvocationId, LaunchSpec, ProcessEvent, SupervisorConfig,
};

//! Warden host runtime: the tool execution core.
//!
//! This crate composes the pieces of the host: the tool registry, the
//! gatekeeper that authorizes every proposed call against the policy
//! snapshot, the invocation pipeline that drives an authorized call through
//! subprocess execution, and the ReAct controller that sequences reasoning
//! and action.
//!
//! # Overview
//!
//! - **ToolRegistry**: immutable startup registry of tool definitions and
//!   launch specs.
//! - **Gatekeeper**: authorize-or-reject middleware; every verdict audited.
//! - **Pipeline**: `invoke(request) -> result`, exactly one result per
//!   request, deny before spawn.
//! - **Controller**: the reason → decide → authorize → execute → observe
//!   cycle against a [`Collaborator`].
//! - **EventBus**: ordered event stream for dashboards and log sinks; the
//!   host runs correctly with zero observers.
//!
//! # Example
//!
//! ```ignore
//! use host::{
//!     AnthropicCollaborator, Controller, ControllerConfig, EventBus, Gatekeeper, Pipeline,
//!     ToolRegistry,
//! };
//! use policy::{Policy, PolicyStore};
//! use supervisor::{Supervisor, SupervisorConfig};
//! use std::sync::Arc;
//!
//! # async fn example(registry: ToolRegistry) -> host::Result<()> {
//! let registry = Arc::new(registry);
//! let store = Arc::new(PolicyStore::new(Policy::default()));
//! let log = Arc::new(audit::AuditLog::in_memory()?);
//! let events = EventBus::new();
//! let supervisor = Arc::new(Supervisor::new(SupervisorConfig::default()));
//!
//! let gatekeeper = Arc::new(Gatekeeper::new(store, registry.clone(), log.clone(), events.clone()));
//! let pipeline = Arc::new(Pipeline::new(registry.clone(), gatekeeper, supervisor, log, events.clone()));
//!
//! let collaborator = AnthropicCollaborator::builder("sk-ant-...", "claude-sonnet-4-20250514").build();
//! let mut controller = Controller::new(collaborator, pipeline, registry, events, ControllerConfig::default());
//!
//! let answer = controller.run_turn("what is 2 + 2?", Default::default()).await?;
//! println!("{answer}");
//! # Ok(())
//! # }
//! ```

mod collaborator;
mod controller;
mod conversation;
mod error;
mod events;
mod gatekeeper;
mod pipeline;
mod registry;

pub use collaborator::{
    AnthropicCollaborator, AnthropicCollaboratorBuilder, Collaborator, Reply,
};
pub use controller::{Controller, ControllerConfig};
pub use conversation::{Message, Part, Role, ToolOutcome, ToolResult};
pub use error::{Error, Result};
pub use events::{EventBus, HostEvent, bridge_process_events};
pub use gatekeeper::{Gatekeeper, Verdict};
pub use pipeline::Pipeline;
pub use registry::{RegisteredTool, ToolRegistry};

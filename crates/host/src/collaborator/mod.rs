//! Reasoning collaborator abstraction.
//!
//! The host treats the remote reasoning model as an opaque request/response
//! boundary: given the conversation so far and the advertised tool
//! definitions, it returns either a final answer or a tool-call decision.
//! Transport and authentication live entirely behind this trait.

mod anthropic;

pub use anthropic::{AnthropicCollaborator, AnthropicCollaboratorBuilder};

use crate::Result;
use crate::conversation::Message;
use std::future::Future;
use wire::{ToolCallRequest, ToolDefinition};

/// What the collaborator decided for this round.
#[derive(Debug, Clone)]
pub enum Reply {
    /// The model answered directly; the turn is over.
    FinalAnswer(String),
    /// The model wants one or more tools executed before continuing.
    ToolCalls(Vec<ToolCallRequest>),
}

/// A reasoning collaborator.
pub trait Collaborator: Send + Sync {
    /// Send the accumulated conversation and get the next decision.
    fn decide(
        &self,
        system: Option<&str>,
        tools: &[ToolDefinition],
        history: &[Message],
    ) -> impl Future<Output = Result<Reply>> + Send;
}

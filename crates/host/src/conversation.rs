//! Conversation types shared by the controller and the collaborator boundary.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use wire::{RequestId, ToolCallRequest};

/// Role of a message participant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// Terminal outcome of one tool invocation, fed back into history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ToolOutcome {
    /// The tool produced a payload.
    Success { payload: Value },
    /// Spawn failure, unexpected exit, or protocol error.
    Failure { detail: String },
    /// The gatekeeper blocked the call.
    Denied { reason: String },
    /// No complete response frame before the deadline.
    TimedOut,
}

impl ToolOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// Text shown to the collaborator so it can decide how to proceed.
    pub fn describe(&self) -> String {
        match self {
            Self::Success { payload } => payload.to_string(),
            Self::Failure { detail } => format!("tool failed: {detail}"),
            Self::Denied { reason } => format!("tool call blocked by policy: {reason}"),
            Self::TimedOut => "tool timed out before responding".to_string(),
        }
    }
}

/// Exactly one of these is produced per [`ToolCallRequest`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    pub request_id: RequestId,
    pub outcome: ToolOutcome,
}

impl ToolResult {
    pub fn success(request_id: RequestId, payload: Value) -> Self {
        Self {
            request_id,
            outcome: ToolOutcome::Success { payload },
        }
    }

    pub fn failure(request_id: RequestId, detail: impl Into<String>) -> Self {
        Self {
            request_id,
            outcome: ToolOutcome::Failure {
                detail: detail.into(),
            },
        }
    }

    pub fn denied(request_id: RequestId, reason: impl Into<String>) -> Self {
        Self {
            request_id,
            outcome: ToolOutcome::Denied {
                reason: reason.into(),
            },
        }
    }

    pub fn timed_out(request_id: RequestId) -> Self {
        Self {
            request_id,
            outcome: ToolOutcome::TimedOut,
        }
    }
}

/// A part of a message's content.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Part {
    Text { text: String },
    ToolCall(ToolCallRequest),
    ToolResult(ToolResult),
}

/// One turn entry in the append-only conversation history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub parts: Vec<Part>,
}

impl Message {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            parts: vec![Part::Text { text: text.into() }],
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            parts: vec![Part::Text { text: text.into() }],
        }
    }

    /// The assistant's tool-call decision for one round.
    pub fn tool_calls(calls: &[ToolCallRequest]) -> Self {
        Self {
            role: Role::Assistant,
            parts: calls.iter().cloned().map(Part::ToolCall).collect(),
        }
    }

    /// Tool results feed back as a user-role message (the collaborator's
    /// convention for observation turns).
    pub fn tool_results(results: &[ToolResult]) -> Self {
        Self {
            role: Role::User,
            parts: results.iter().cloned().map(Part::ToolResult).collect(),
        }
    }

    /// Concatenated text parts, for display.
    pub fn text(&self) -> String {
        self.parts
            .iter()
            .filter_map(|p| match p {
                Part::Text { text } => Some(text.as_str()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

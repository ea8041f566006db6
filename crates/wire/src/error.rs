//! Wire protocol error types.

use crate::protocol::JsonRpcError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to serialize request: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("malformed frame: {detail}")]
    MalformedFrame {
        detail: String,
        /// Raw bytes kept for the audit record.
        raw: Vec<u8>,
    },

    #[error("frame too large: {size} bytes (max {max})")]
    FrameTooLarge { size: usize, max: usize },

    #[error("response id mismatch: expected {expected}, got {got}")]
    IdMismatch { expected: String, got: String },

    #[error("response missing id (expected {expected})")]
    MissingId { expected: String },

    #[error("tool reported error: {0}")]
    Remote(JsonRpcError),

    #[error("arguments do not match tool schema: {0}")]
    SchemaMismatch(String),
}

pub type Result<T> = std::result::Result<T, Error>;

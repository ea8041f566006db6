//! CLI error types.

use std::path::PathBuf;
use thiserror::Error;

/// CLI errors.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new variants
/// in future versions without breaking downstream code.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// No API key in the config file or environment.
    #[error("no API key: set collaborator.api_key in warden.toml or the ANTHROPIC_API_KEY environment variable")]
    MissingApiKey,

    /// The audit database does not exist yet.
    #[error("audit log not found at {path}. Run 'warden chat' first")]
    AuditLogNotFound { path: PathBuf },

    /// Configuration is invalid or missing required fields.
    #[error("config error: {0}")]
    Config(#[from] crate::config::ConfigError),

    /// An error occurred in the host layer.
    #[error(transparent)]
    Host(#[from] host::Error),

    /// An error occurred in the policy layer.
    #[error(transparent)]
    Policy(#[from] policy::Error),

    /// An error occurred in the audit layer.
    #[error(transparent)]
    Audit(#[from] audit::Error),

    /// An I/O error occurred.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

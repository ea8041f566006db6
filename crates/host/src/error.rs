use thiserror::Error;

/// Host errors.
///
/// Tool-level failures (denied, spawn failure, protocol error, timeout) are
/// not errors here: they terminate only their own invocation and flow back
/// into conversation history as [`ToolOutcome`] variants. This enum covers
/// what can fail a whole turn or prevent startup.
///
/// [`ToolOutcome`]: crate::ToolOutcome
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid policy, registry, or configuration at startup. The only
    /// fatal class: the host refuses to start.
    #[error("config error: {0}")]
    Config(String),

    /// The external reasoning call failed. Fatal to the turn, not the host.
    #[error("collaborator error: {0}")]
    Collaborator(String),

    /// The turn hit its tool-call round limit. Reported to the user.
    #[error("turn exceeded {rounds} tool-call rounds")]
    RoundLimit { rounds: usize },

    /// The turn was cancelled by the user.
    #[error("turn cancelled")]
    Cancelled,

    #[error(transparent)]
    Audit(#[from] audit::Error),

    #[error(transparent)]
    Policy(#[from] policy::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

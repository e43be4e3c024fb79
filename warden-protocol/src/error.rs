use thiserror::Error;

/// Errors surfaced by the core. Every error a tool call can raise is
/// converted to an error response at the transport boundary; none of these
/// tear down the process (see `warden-mcp-server`).
#[derive(Debug, Error)]
pub enum WardenError {
    /// The policy file was absent, unparseable, or failed a structural
    /// invariant (e.g. an empty `allowedCommands`). Fatal at startup.
    #[error("invalid policy: {0}")]
    PolicyInvalid(String),

    /// The requested executable is not on the allowlist.
    #[error("command not allowed: {0}")]
    NotAllowed(String),

    /// An argument or path attempted to leave the sandbox root.
    #[error("path escapes sandbox: {0}")]
    PathEscape(String),

    /// An argument matched a `blockedArgsRegex` entry.
    #[error("argument blocked: {0}")]
    BlockedArgument(String),

    /// `confirm`/`cancel` referenced a token that does not exist.
    #[error("confirmation token not found")]
    ConfirmationMissing,

    /// `confirm`/`cancel` referenced a token past its `expiresAtMs`.
    #[error("confirmation token expired")]
    ConfirmationExpired,

    /// `execute` was invoked on a stage-1 token (or `advance` on a stage-2 one).
    #[error("wrong confirmation stage")]
    WrongStage,

    /// The child process could not be spawned (e.g. `ENOENT`).
    #[error("failed to spawn process: {0}")]
    SpawnFailure(String),

    /// A filesystem read/write/mkdir failed for a reason other than the
    /// above (permissions, disk full, not a regular file, ...).
    #[error("io failure: {0}")]
    IoFailure(#[from] std::io::Error),

    /// The model's output could not be parsed into a valid `Action`.
    #[error("could not parse model action: {0}")]
    ActionInvalid(String),

    /// The chat/completion HTTP endpoint returned an error or timed out.
    #[error("model unavailable: {0}")]
    ModelUnavailable(String),
}

pub type Result<T> = std::result::Result<T, WardenError>;

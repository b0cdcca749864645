use thiserror::Error;

pub type SealboxResult<T> = Result<T, SealboxError>;

/// Every failure a protocol operation can surface to its caller.
///
/// None of these are retried internally. `IntegrityViolation` is always fatal
/// to the operation that hit it; build it through [`SealboxError::integrity`]
/// so the tamper event is also recorded on the `sealbox::tamper` log target.
#[derive(Debug, Error)]
pub enum SealboxError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("account already exists")]
    AccountExists,

    #[error("unknown account")]
    UnknownAccount,

    #[error("authentication failed")]
    AuthenticationFailed,

    #[error("file not found: {0}")]
    FileNotFound(String),

    #[error("file already exists: {0}")]
    FileExists(String),

    #[error("no such share")]
    NoSuchShare,

    #[error("file is not shared with {0}")]
    NotShared(String),

    #[error("unknown recipient: {0}")]
    UnknownRecipient(String),

    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("integrity violation")]
    IntegrityViolation(String),

    #[error("decode error: {0}")]
    Decode(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl SealboxError {
    /// Build an `IntegrityViolation` and log it as a tamper event.
    ///
    /// The context string only reaches the log; the `Display` output is the
    /// same for every integrity failure.
    pub fn integrity(context: impl Into<String>) -> Self {
        let context = context.into();
        tracing::warn!(target: "sealbox::tamper", context = %context, "integrity check failed");
        Self::IntegrityViolation(context)
    }

    pub fn is_integrity_violation(&self) -> bool {
        matches!(self, Self::IntegrityViolation(_))
    }
}

use thiserror::Error;

/// Error kinds surfaced by every core operation.
///
/// Domain-rule violations are terminal for the attempted operation; retrying
/// them cannot change the outcome. Only `TransientStore` is worth a retry,
/// and that decision belongs to the caller.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    #[error("match not found: {0}")]
    NotFound(String),

    #[error("match is closed to changes")]
    MatchClosed,

    #[error("match is full ({capacity} slots)")]
    MatchFull { capacity: u32 },

    #[error("{0} is already on the roster")]
    AlreadyEnrolled(String),

    #[error("{0} is not on the roster")]
    NotEnrolled(String),

    #[error("match has already been finalized")]
    MatchAlreadyFinished,

    #[error("only the match creator may do this")]
    Unauthorized,

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("store failure: {0}")]
    TransientStore(String),
}

impl CoreError {
    /// Whether a caller-initiated retry could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, CoreError::TransientStore(_))
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, TraceError>;

/// Errors surfaced by the tracing engine and its decoding adapters.
///
/// The engine itself is deterministic, so none of these are worth retrying
/// with the same input.
#[derive(Debug, Error)]
pub enum TraceError {
    /// The caller handed over something the engine cannot trace.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// An internal invariant broke (non-finite coordinate, open chain, ...).
    #[error("design violation: {0}")]
    DesignViolation(String),

    #[error("failed to decode image: {0}")]
    Decode(#[from] image::ImageError),

    #[error("failed to read image: {0}")]
    Io(#[from] std::io::Error),
}

impl TraceError {
    pub(crate) fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    pub(crate) fn design_violation(message: impl Into<String>) -> Self {
        Self::DesignViolation(message.into())
    }
}

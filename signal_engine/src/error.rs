use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SignalError {
    /// Malformed or empty required input.
    #[error("validation error: {0}")]
    Validation(String),
    /// A companion series needed by the computation is missing.
    #[error("data unavailable: {0}")]
    DataUnavailable(String),
    /// A ratio whose denominator is zero was requested as a finite number.
    #[error("division undefined: {0}")]
    DivisionUndefined(String),
}

pub type Result<T> = std::result::Result<T, SignalError>;

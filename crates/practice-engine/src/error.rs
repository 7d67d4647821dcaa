//! Error types for practice-engine operations.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    /// Malformed input: unparsable amounts, unknown enum values, bad dates.
    #[error("Validation error: {0}")]
    Validation(String),

    /// The appointment id does not resolve to a record.
    #[error("Appointment not found: {0}")]
    NotFound(String),

    /// A version-checked write lost the race against a concurrent edit.
    #[error("Concurrent edit conflict on appointment: {0}")]
    VersionConflict(String),
}

pub type Result<T> = std::result::Result<T, EngineError>;

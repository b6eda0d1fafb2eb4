//! Error types for occurrence-engine operations.
//!
//! Expansion, resolution, and materialization never fail: malformed windows
//! simply produce nothing. Errors originate from input parsing, definition
//! validation, and mutation planning.

use thiserror::Error;

use crate::model::Status;

#[derive(Error, Debug)]
pub enum EngineError {
    /// A definition or intent payload failed validation.
    #[error("Validation error: {0}")]
    Validation(String),

    /// An occurrence status change the state machine does not allow.
    #[error("Invalid status transition: {from} -> {to}")]
    InvalidTransition { from: Status, to: Status },

    /// The mutation target no longer exists in the supplied snapshot.
    #[error("Definition not found: {0}")]
    DefinitionNotFound(String),

    #[error("Invalid date: {0}")]
    InvalidDate(String),

    #[error("Invalid time: {0}")]
    InvalidTime(String),
}

impl EngineError {
    /// True for stale references (the target definition is gone).
    pub fn is_not_found(&self) -> bool {
        matches!(self, EngineError::DefinitionNotFound(_))
    }

    /// True for every input the caller can fix and resubmit.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            EngineError::Validation(_)
                | EngineError::InvalidTransition { .. }
                | EngineError::InvalidDate(_)
                | EngineError::InvalidTime(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;

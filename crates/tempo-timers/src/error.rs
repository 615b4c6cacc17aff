use tempo_core::RecordId;
use tempo_store::StoreError;
use thiserror::Error;

use crate::types::TimerStatus;

#[derive(Debug, Error)]
pub enum TimerError {
    /// Bad input to create/resume (empty name, non-positive duration, ...).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The operation is not valid for the timer's current status.
    #[error("timer is {actual}, expected {expected}")]
    InvalidState {
        expected: TimerStatus,
        actual: TimerStatus,
    },

    /// No timer with the given id exists.
    #[error("no timer with id {id}")]
    NotFound { id: RecordId },

    /// Underlying record store error.
    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type Result<T> = std::result::Result<T, TimerError>;

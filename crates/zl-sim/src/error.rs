//! Error types for simulation operations.

use thiserror::Error;

/// Errors encountered while driving a closed loop.
#[derive(Error, Debug)]
pub enum SimError {
    #[error("Invalid argument: {what}")]
    InvalidArg { what: &'static str },

    #[error("Non-finite signal: {message}")]
    NonFinite { message: String },
}

pub type SimResult<T> = Result<T, SimError>;

impl From<zl_core::CoreError> for SimError {
    fn from(e: zl_core::CoreError) -> Self {
        SimError::NonFinite {
            message: e.to_string(),
        }
    }
}

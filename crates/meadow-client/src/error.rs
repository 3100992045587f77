//! Client error types.

use meadow_core::{Fault, SessionError, ValidationError};
use thiserror::Error;

/// Why an intent was not transmitted.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ClientError {
    /// Intent failed local validation
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Session could not transmit (not open, or encoding failed)
    #[error(transparent)]
    Session(#[from] SessionError),
}

impl From<ClientError> for Fault {
    fn from(err: ClientError) -> Self {
        match err {
            ClientError::Validation(e) => Self::Validation(e),
            ClientError::Session(e) => Self::Session(e),
        }
    }
}

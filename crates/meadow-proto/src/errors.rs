//! Protocol error types.

use thiserror::Error;

/// Result alias for protocol operations.
pub type Result<T> = std::result::Result<T, ProtocolError>;

/// Errors raised while decoding or encoding wire messages.
///
/// Decoding errors never carry the raw payload: the authority is untrusted
/// and payloads may be large.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Payload is not valid JSON
    #[error("malformed message: {0}")]
    Malformed(String),

    /// Payload is valid JSON but not an object
    #[error("message is not a JSON object")]
    NotAnObject,

    /// A required field is absent or null
    #[error("missing required field `{0}`")]
    MissingField(&'static str),

    /// A field is present with the wrong JSON type
    #[error("field `{field}` has the wrong type, expected {expected}")]
    InvalidField {
        /// Field name
        field: &'static str,
        /// Expected JSON type
        expected: &'static str,
    },

    /// The `type` discriminant names no known message
    #[error("unknown message type `{0}`")]
    UnknownType(String),

    /// The `state` field does not have the snapshot shape
    #[error("invalid snapshot: {0}")]
    InvalidSnapshot(String),

    /// A command could not be parsed (authority side of the wire)
    #[error("invalid command: {0}")]
    InvalidCommand(String),

    /// Serialization failed
    #[error("encoding failed: {0}")]
    Encode(String),
}

impl From<serde_json::Error> for ProtocolError {
    fn from(err: serde_json::Error) -> Self {
        Self::Encode(err.to_string())
    }
}

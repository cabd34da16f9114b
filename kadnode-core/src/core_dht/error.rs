//! Error types for the DHT subsystem

use thiserror::Error;

/// Errors surfaced by DHT constructors and public operations.
///
/// Per the propagation policy: only input-validation and base64/structural
/// errors are returned to a caller. Transport and protocol-logic errors are
/// logged internally and never bubble up through `put`/`get`.
#[derive(Debug, Error)]
pub enum DhtError {
    #[error("identifier is not valid base64 or does not decode to 20 bytes: {0}")]
    InvalidUid(String),

    #[error("host address must not be empty")]
    EmptyAddress,

    #[error("host uid must not be empty")]
    EmptyUid,

    #[error("key must not be empty")]
    EmptyKey,

    #[error("message is missing required field: {0}")]
    MissingField(&'static str),

    #[error("message has unexpected field: {0}")]
    UnexpectedField(String),

    #[error("unknown message type: {0}")]
    UnknownMessageType(String),

    #[error("malformed JSON payload: {0}")]
    MalformedJson(String),

    #[error("empty request buffer")]
    EmptyBuffer,
}

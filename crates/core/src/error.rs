use thiserror::Error;

/// Errors that can occur while encoding or decoding attributes.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum CodecError {
    /// Attributes could not be encoded.
    #[error("failed to serialize attributes: {0}")]
    Serialization(String),

    /// Bytes could not be decoded into attributes.
    #[error("failed to deserialize attributes: {0}")]
    Deserialization(String),
}

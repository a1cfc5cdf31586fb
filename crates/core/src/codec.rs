use crate::attributes::Attributes;
use crate::error::CodecError;

use std::fmt::Debug;

use bytes::Bytes;

/// Encodes attributes to an opaque byte buffer and back.
pub trait AttributesCodec: Clone + Debug + Send + Sync + 'static {
    /// Encodes attributes.
    ///
    /// # Errors
    ///
    /// Returns an error if the attributes cannot be serialized.
    fn encode(&self, attributes: &Attributes) -> Result<Bytes, CodecError>;

    /// Decodes attributes.
    ///
    /// # Errors
    ///
    /// Returns an error if the bytes are not valid encoded attributes.
    fn decode(&self, bytes: &[u8]) -> Result<Attributes, CodecError>;
}

/// CBOR attributes codec.
#[derive(Clone, Copy, Debug, Default)]
pub struct CborCodec;

impl AttributesCodec for CborCodec {
    fn encode(&self, attributes: &Attributes) -> Result<Bytes, CodecError> {
        let mut buffer = Vec::new();
        ciborium::ser::into_writer(attributes, &mut buffer)
            .map_err(|e| CodecError::Serialization(e.to_string()))?;
        Ok(Bytes::from(buffer))
    }

    fn decode(&self, bytes: &[u8]) -> Result<Attributes, CodecError> {
        ciborium::de::from_reader(bytes).map_err(|e| CodecError::Deserialization(e.to_string()))
    }
}

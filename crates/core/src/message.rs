use crate::attributes::Attributes;

use bytes::Bytes;

/// A payload together with the attributes describing it.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Message {
    /// Opaque payload bytes.
    pub payload: Bytes,

    /// Attributes sent alongside the payload.
    pub attributes: Attributes,
}

impl Message {
    /// Creates a message.
    #[must_use]
    pub const fn new(payload: Bytes, attributes: Attributes) -> Self {
        Self {
            payload,
            attributes,
        }
    }

    /// Whether this is the empty message returned when no valid reply arrived.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.payload.is_empty() && self.attributes == Attributes::default()
    }
}

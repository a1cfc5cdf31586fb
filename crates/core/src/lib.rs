//! Shared data model for RPC invocations: addresses, priorities, attributes and messages.
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

mod error;

/// Message attributes carried out-of-band next to payloads.
pub mod attributes;

/// Codecs for turning attributes into bytes and back.
pub mod codec;

/// Messages pair a payload with attributes.
pub mod message;

/// Per-call options supplied by the caller.
pub mod options;

/// Message priorities.
pub mod priority;

/// Resource addresses.
pub mod uri;

pub use attributes::{Attributes, AttributesBuilder, MessageType};
pub use codec::{AttributesCodec, CborCodec};
pub use error::CodecError;
pub use message::Message;
pub use options::CallOptions;
pub use priority::Priority;
pub use uri::{Entity, Resource, Uri};

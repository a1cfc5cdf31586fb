//! Transport abstraction for issuing queries over a publish/subscribe session.
//!
//! This crate only defines the contracts the RPC layer depends on. Concrete
//! transports (in-memory, networked) live in separate crates.
//!
//! Transports handle:
//! - Establishing and tearing down a shared session
//! - Routing a query to whichever responder serves its key
//! - Delivering zero or more replies on a per-query channel
//! - Closing that channel when the query's timeout elapses
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

mod attachment;
mod error;
mod reply;

pub use attachment::Attachment;
pub use error::Error;
pub use reply::{ErrorReply, Reply, ReplyChannel, ReplySender, Sample, reply_fifo};

use std::fmt::{self, Debug, Display, Formatter};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// Transport-level address a query is routed on.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct RoutingKey(String);

impl RoutingKey {
    /// Creates a routing key.
    pub fn new<K>(key: K) -> Self
    where
        K: Into<String>,
    {
        Self(key.into())
    }

    /// The key as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for RoutingKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<RoutingKey> for String {
    fn from(key: RoutingKey) -> Self {
        key.0
    }
}

/// An outbound query.
#[derive(Clone, Debug)]
pub struct Query {
    /// Query body.
    pub payload: Bytes,

    /// Out-of-band metadata.
    pub attachment: Attachment,

    /// How long the transport keeps the reply channel open.
    pub timeout: Duration,
}

/// Configuration used when establishing a session.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Endpoints to connect to.
    pub connect: Vec<String>,

    /// Endpoints to listen on.
    pub listen: Vec<String>,

    /// Whether transport-level QoS is enabled.
    pub qos_enabled: bool,

    /// Whether the low-latency transport mode is enabled.
    pub low_latency: bool,
}

/// An established session capable of issuing queries.
#[async_trait]
pub trait Session
where
    Self: Clone + Debug + Send + Sync + 'static,
{
    /// Allocates a reply channel for one query.
    ///
    /// # Errors
    ///
    /// Returns an error if the channel cannot be allocated.
    fn reply_fifo(&self, capacity: usize) -> Result<(ReplySender, ReplyChannel), Error> {
        reply_fifo(capacity)
    }

    /// Issues a query on `key`. Replies are delivered through `replies`; the
    /// channel closes when the responders are done or the timeout elapses.
    ///
    /// Returns as soon as the query is enqueued.
    async fn query(&self, key: &RoutingKey, query: Query, replies: ReplySender)
    -> Result<(), Error>;
}

/// Manages the lifetime of the process's transport session.
#[async_trait]
pub trait SessionProvider
where
    Self: Send + Sync + 'static,
{
    /// The session type handed out once established.
    type Session: Session;

    /// Establishes the session.
    async fn establish(&self, config: &SessionConfig) -> Result<(), Error>;

    /// Returns the established session, if any.
    fn current_session(&self) -> Option<Self::Session>;

    /// Tears the session down.
    async fn teardown(&self) -> Result<(), Error>;
}

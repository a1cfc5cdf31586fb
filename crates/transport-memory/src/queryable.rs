//! Queryables that answer queries on a routing key.

use crate::MemoryNetwork;

use std::fmt::{self, Debug, Formatter};

use async_trait::async_trait;
use bytes::Bytes;
use courier_transport::{Attachment, Error, ErrorReply, Reply, ReplySender, RoutingKey, Sample};
use tracing::debug;

/// A query as seen by a responder.
#[derive(Clone, Debug)]
pub struct IncomingQuery {
    /// Key the query was routed on.
    pub key: RoutingKey,

    /// Query body.
    pub payload: Bytes,

    /// Out-of-band metadata sent with the query.
    pub attachment: Attachment,
}

/// Sends replies back to the querier.
///
/// The querier's reply channel closes once the responder is dropped.
#[derive(Debug)]
pub struct Responder {
    key: RoutingKey,
    replies: ReplySender,
}

impl Responder {
    pub(crate) const fn new(key: RoutingKey, replies: ReplySender) -> Self {
        Self { key, replies }
    }

    /// Sends a data reply.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Closed`] if the querier stopped listening.
    pub async fn reply(&self, payload: Bytes, attachment: Option<Attachment>) -> Result<(), Error> {
        self.replies
            .send(Reply::Ok(Sample {
                key: self.key.clone(),
                payload,
                attachment,
            }))
            .await
    }

    /// Sends an error reply.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Closed`] if the querier stopped listening.
    pub async fn reply_err<M>(&self, message: M) -> Result<(), Error>
    where
        M: Into<String> + Send,
    {
        self.replies.send(Reply::Err(ErrorReply::new(message))).await
    }
}

/// Handles queries routed to a declared key.
#[async_trait]
pub trait QueryHandler
where
    Self: Send + Sync + 'static,
{
    /// Handles one query. Dropping the responder ends the reply stream.
    async fn handle(&self, query: IncomingQuery, responder: Responder);
}

/// A declared queryable. Undeclares itself when dropped.
pub struct Queryable {
    key: RoutingKey,
    network: MemoryNetwork,
}

impl Queryable {
    pub(crate) const fn new(key: RoutingKey, network: MemoryNetwork) -> Self {
        Self { key, network }
    }

    /// Key the queryable serves.
    #[must_use]
    pub const fn key(&self) -> &RoutingKey {
        &self.key
    }
}

impl Debug for Queryable {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Queryable").field("key", &self.key).finish()
    }
}

impl Drop for Queryable {
    fn drop(&mut self) {
        debug!("undeclaring queryable on {}", self.key);
        self.network.queryables.remove(&self.key);
    }
}

//! Reply delivery from the transport to the caller.

use crate::RoutingKey;
use crate::attachment::Attachment;
use crate::error::Error;

use bytes::Bytes;

/// A successful reply carrying data.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Sample {
    /// Key the reply was produced for.
    pub key: RoutingKey,

    /// Reply payload.
    pub payload: Bytes,

    /// Out-of-band metadata, if the responder attached any.
    pub attachment: Option<Attachment>,
}

/// A reply signalling that the responder or the transport failed.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ErrorReply {
    /// Error payload, usually a UTF-8 description.
    pub payload: Bytes,
}

impl ErrorReply {
    /// Creates an error reply from a description.
    pub fn new<M>(message: M) -> Self
    where
        M: Into<String>,
    {
        Self {
            payload: Bytes::from(message.into()),
        }
    }

    /// The payload rendered as text.
    #[must_use]
    pub fn message(&self) -> String {
        String::from_utf8_lossy(&self.payload).into_owned()
    }
}

/// A raw reply to a query.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Reply {
    /// The responder answered.
    Ok(Sample),

    /// The responder or transport signalled an error.
    Err(ErrorReply),
}

/// Producing side of a reply channel, handed to the transport with each query.
#[derive(Clone, Debug)]
pub struct ReplySender {
    sender: flume::Sender<Reply>,
}

impl ReplySender {
    /// Delivers a reply, waiting for room in the channel.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Closed`] if the consumer has gone away.
    pub async fn send(&self, reply: Reply) -> Result<(), Error> {
        self.sender
            .send_async(reply)
            .await
            .map_err(|_| Error::Closed)
    }

    /// Whether the consumer has gone away.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.sender.is_disconnected()
    }
}

/// Consuming side of a per-query reply channel.
///
/// The channel closes once every [`ReplySender`] for it has been dropped.
#[derive(Debug)]
pub struct ReplyChannel {
    receiver: flume::Receiver<Reply>,
}

impl ReplyChannel {
    /// Waits for the next reply. Returns `None` once the channel is closed and drained.
    pub async fn recv(&self) -> Option<Reply> {
        self.receiver.recv_async().await.ok()
    }
}

/// Allocates a bounded FIFO reply channel.
///
/// # Errors
///
/// Returns [`Error::ChannelCapacity`] if `capacity` is zero.
pub fn reply_fifo(capacity: usize) -> Result<(ReplySender, ReplyChannel), Error> {
    if capacity == 0 {
        return Err(Error::ChannelCapacity);
    }

    let (sender, receiver) = flume::bounded(capacity);
    Ok((ReplySender { sender }, ReplyChannel { receiver }))
}

//! Error types for RPC invocation.

use crate::pool::PoolError;

use courier_core::{CodecError, Priority, Uri};
use courier_transport::Error as TransportError;
use thiserror::Error;

/// Result type alias for RPC operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while invoking a remote method.
#[derive(Clone, Debug, Error)]
pub enum Error {
    /// No client holds the shared session.
    #[error("RPC session is not initialized")]
    NotInitialized,

    /// The shared session could not be brought up or torn down.
    #[error("RPC session unavailable: {message}")]
    Unavailable {
        /// What went wrong.
        message: String,
        /// The transport failure, if one caused this.
        #[source]
        source: Option<TransportError>,
    },

    /// The target does not address an RPC method.
    #[error("'{0}' is not an RPC method")]
    InvalidTarget(Uri),

    /// The requested priority is below what RPC requires.
    #[error("priority {priority} is below the minimum {minimum} for RPC")]
    PriorityTooLow {
        /// Priority of the request.
        priority: Priority,
        /// Lowest priority accepted.
        minimum: Priority,
    },

    /// Request attributes could not be serialized.
    #[error("failed to serialize request attributes: {0}")]
    SerializationFailure(#[source] CodecError),

    /// The transport refused to allocate a reply channel.
    #[error("failed to allocate reply channel: {0}")]
    ChannelAllocationFailure(#[source] TransportError),

    /// The transport did not accept the query.
    #[error("failed to dispatch query: {0}")]
    TransportDispatchFailure(#[source] TransportError),

    /// The responder or the transport replied with an error.
    #[error("reply error: {0}")]
    ReplyError(String),

    /// A reply arrived without a payload.
    #[error("reply carried no payload")]
    PayloadMissing,

    /// A reply arrived without attributes attached.
    #[error("reply carried no attributes attachment")]
    AttachmentMissing,

    /// The attributes attached to a reply could not be decoded.
    #[error("failed to parse reply attributes: {0}")]
    AttributesParseFailure(#[source] CodecError),

    /// The reply channel closed before any usable reply arrived.
    #[error("no reply received")]
    NoReply,

    /// The worker pool queue is full.
    #[error("worker pool is saturated")]
    ExecutorSaturated,

    /// The worker pool has shut down.
    #[error("worker pool is shut down")]
    ExecutorShutDown,

    /// The reply collection task was dropped before it finished.
    #[error("invocation canceled")]
    Canceled,
}

impl Error {
    pub(crate) fn unavailable<M>(message: M, source: Option<TransportError>) -> Self
    where
        M: Into<String>,
    {
        Self::Unavailable {
            message: message.into(),
            source,
        }
    }
}

impl From<PoolError> for Error {
    fn from(error: PoolError) -> Self {
        match error {
            PoolError::Saturated => Self::ExecutorSaturated,
            PoolError::ShutDown => Self::ExecutorShutDown,
            PoolError::Canceled => Self::Canceled,
            PoolError::InvalidConfig(message) | PoolError::NoRuntime(message) => {
                Self::unavailable(format!("worker pool: {message}"), None)
            }
        }
    }
}

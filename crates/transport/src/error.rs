//! Transport error types.

use thiserror::Error;

/// Errors raised by transport sessions.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum Error {
    /// The session could not be established, retrieved or torn down.
    #[error("transport unavailable: {0}")]
    Unavailable(String),

    /// The session has been closed.
    #[error("session closed")]
    Closed,

    /// The routing key cannot be routed.
    #[error("no route for key '{0}'")]
    NoRoute(String),

    /// A reply channel was requested with zero capacity.
    #[error("reply channel capacity must be non-zero")]
    ChannelCapacity,

    /// A queryable is already declared on the key.
    #[error("queryable already declared on key '{0}'")]
    AlreadyDeclared(String),
}

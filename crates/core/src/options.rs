use crate::priority::Priority;

use serde::{Deserialize, Serialize};

/// Options attached to a single invocation.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct CallOptions {
    /// Priority the request is sent with.
    pub priority: Priority,

    /// Time-to-live of the request in milliseconds. When unset the client default applies.
    pub ttl: Option<u32>,

    /// Access token forwarded to the responder.
    pub token: Option<String>,
}

impl CallOptions {
    /// Creates options with the given priority and no deadline.
    #[must_use]
    pub const fn new(priority: Priority) -> Self {
        Self {
            priority,
            ttl: None,
            token: None,
        }
    }

    /// Sets the time-to-live in milliseconds.
    #[must_use]
    pub fn with_ttl(mut self, ttl: u32) -> Self {
        self.ttl = Some(ttl);
        self
    }

    /// Sets the access token.
    #[must_use]
    pub fn with_token<K>(mut self, token: K) -> Self
    where
        K: Into<String>,
    {
        self.token = Some(token.into());
        self
    }
}

impl Default for CallOptions {
    fn default() -> Self {
        Self::new(Priority::MIN_RPC)
    }
}

//! Validation and preparation of outbound requests.

use crate::error::{Error, Result};

use std::fmt::Write;
use std::time::Duration;

use bytes::Bytes;
use courier_core::{Attributes, AttributesCodec, CallOptions, Priority, Uri};
use courier_transport::RoutingKey;
use twox_hash::XxHash64;

/// Attachment entry the serialized attributes travel under.
pub const ATTRIBUTES_KEY: &str = "attributes";

/// Derives the transport routing key for `uri`.
///
/// The key hashes the long form of `uri`. A method addressed only by its
/// numeric id has no name in the long form, so the id is appended.
///
/// Responders must declare their queryables under the same key.
pub fn routing_key(uri: &Uri) -> RoutingKey {
    let mut address = uri.to_long_form();
    let named = uri.resource.instance.as_deref().is_some_and(|i| !i.is_empty());
    if let Some(id) = uri.resource.id.filter(|_| !named) {
        let _ = write!(address, "?id={id}");
    }

    let hash = XxHash64::oneshot(0, address.as_bytes());
    RoutingKey::new(hash.to_string())
}

/// A method invocation as requested by the caller.
#[derive(Clone, Debug)]
pub struct InvocationRequest {
    /// Method to invoke.
    pub target: Uri,

    /// Request body, possibly empty.
    pub payload: Bytes,

    /// Priority, deadline and token.
    pub options: CallOptions,
}

impl InvocationRequest {
    /// Creates a request.
    pub const fn new(target: Uri, payload: Bytes, options: CallOptions) -> Self {
        Self {
            target,
            payload,
            options,
        }
    }
}

/// A validated request ready for dispatch.
#[derive(Clone, Debug)]
pub struct PreparedRequest {
    /// Attributes describing the request.
    pub attributes: Attributes,

    /// The attributes in their encoded form.
    pub metadata: Bytes,

    /// Key the query is routed on.
    pub key: RoutingKey,

    /// How long the transport waits for replies.
    pub timeout: Duration,

    /// Request body.
    pub payload: Bytes,
}

/// Turns [`InvocationRequest`]s into [`PreparedRequest`]s.
#[derive(Clone, Debug)]
pub struct RequestBuilder<C> {
    codec: C,
    default_timeout: Duration,
}

impl<C> RequestBuilder<C>
where
    C: AttributesCodec,
{
    /// Creates a builder falling back to `default_timeout` for requests without a deadline.
    pub const fn new(codec: C, default_timeout: Duration) -> Self {
        Self {
            codec,
            default_timeout,
        }
    }

    /// The timeout a request with the given deadline is dispatched with.
    pub fn effective_timeout(&self, ttl: Option<u32>) -> Duration {
        ttl.map_or(self.default_timeout, |ttl| {
            Duration::from_millis(u64::from(ttl))
        })
    }

    /// Validates `request` and encodes its attributes.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidTarget`] if the target is not an RPC method,
    /// [`Error::PriorityTooLow`] if the priority is below [`Priority::MIN_RPC`],
    /// and [`Error::SerializationFailure`] if the attributes cannot be encoded.
    pub fn build(&self, request: InvocationRequest) -> Result<PreparedRequest> {
        let InvocationRequest {
            target,
            payload,
            options,
        } = request;

        if !target.is_rpc_method() {
            return Err(Error::InvalidTarget(target));
        }

        if !options.priority.is_rpc_eligible() {
            return Err(Error::PriorityTooLow {
                priority: options.priority,
                minimum: Priority::MIN_RPC,
            });
        }

        let key = routing_key(&target);
        let timeout = self.effective_timeout(options.ttl);

        let mut builder = Attributes::request(options.priority).sink(target);
        if let Some(ttl) = options.ttl {
            builder = builder.ttl(ttl);
        }
        if let Some(token) = options.token {
            builder = builder.token(token);
        }
        let attributes = builder.build();

        let metadata = self
            .codec
            .encode(&attributes)
            .map_err(Error::SerializationFailure)?;

        Ok(PreparedRequest {
            attributes,
            metadata,
            key,
            timeout,
            payload,
        })
    }
}

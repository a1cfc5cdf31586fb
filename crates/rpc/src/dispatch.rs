//! Issues prepared requests on the transport and hands their replies to the pool.

use crate::collector::{FailureMode, ReplyCollector, ReplyPolicy};
use crate::error::{Error, Result};
use crate::handle::InvocationHandle;
use crate::request::{ATTRIBUTES_KEY, PreparedRequest};
use crate::session::SharedSession;

use courier_core::AttributesCodec;
use courier_transport::{Attachment, Query, Session};
use tracing::{Instrument, debug, instrument};

/// Sends one query per request and schedules its reply collection.
#[derive(Clone, Debug)]
pub struct Dispatcher<C> {
    codec: C,
    reply_channel_capacity: usize,
    reply_policy: ReplyPolicy,
    failure_mode: FailureMode,
}

impl<C> Dispatcher<C>
where
    C: AttributesCodec,
{
    /// Creates a dispatcher.
    pub const fn new(
        codec: C,
        reply_channel_capacity: usize,
        reply_policy: ReplyPolicy,
        failure_mode: FailureMode,
    ) -> Self {
        Self {
            codec,
            reply_channel_capacity,
            reply_policy,
            failure_mode,
        }
    }

    /// Issues `request` on `shared` and returns a handle to its response
    /// without waiting for replies.
    ///
    /// A place for the reply collector is reserved on the worker pool before
    /// anything goes out, so a refused request never reaches the transport.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ExecutorSaturated`] or [`Error::ExecutorShutDown`] if
    /// the worker pool has no room for the reply collector,
    /// [`Error::ChannelAllocationFailure`] if no reply channel can be
    /// allocated, and [`Error::TransportDispatchFailure`] if the transport
    /// rejects the query.
    #[instrument(skip_all, fields(request_id = %request.attributes.id, key = %request.key))]
    pub async fn dispatch<S>(
        &self,
        shared: &SharedSession<S>,
        request: PreparedRequest,
    ) -> Result<InvocationHandle>
    where
        S: Session,
    {
        let PreparedRequest {
            attributes,
            metadata,
            key,
            timeout,
            payload,
        } = request;

        let slot = shared.pool().reserve().await?;

        let session = shared.session();
        let (sender, channel) = session
            .reply_fifo(self.reply_channel_capacity)
            .map_err(Error::ChannelAllocationFailure)?;

        let mut attachment = Attachment::new();
        attachment.insert(ATTRIBUTES_KEY, metadata);

        debug!("dispatching {} byte request with timeout {:?}", payload.len(), timeout);

        session
            .query(
                &key,
                Query {
                    payload,
                    attachment,
                    timeout,
                },
                sender,
            )
            .await
            .map_err(Error::TransportDispatchFailure)?;

        let collector = ReplyCollector::new(
            self.codec.clone(),
            self.reply_policy,
            self.failure_mode,
            attributes.id,
        );
        let task = slot.submit(collector.collect(channel).in_current_span());

        Ok(InvocationHandle::new(attributes.id, task))
    }
}

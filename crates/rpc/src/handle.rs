//! Handles through which callers await invocation responses.

use crate::error::{Error, Result};
use crate::pool::TaskHandle;

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use courier_core::Message;
use uuid::Uuid;

/// Resolves to the response of one invocation.
///
/// Dropping the handle does not stop reply collection; the response is discarded.
#[derive(Debug)]
#[must_use = "the response is only observable by awaiting the handle"]
pub struct InvocationHandle {
    request_id: Uuid,
    task: TaskHandle<Result<Message>>,
}

impl InvocationHandle {
    pub(crate) const fn new(request_id: Uuid, task: TaskHandle<Result<Message>>) -> Self {
        Self { request_id, task }
    }

    /// Identifier of the request this handle answers.
    pub const fn request_id(&self) -> Uuid {
        self.request_id
    }
}

impl Future for InvocationHandle {
    type Output = Result<Message>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.task)
            .poll(cx)
            .map(|result| result.map_err(Error::from).and_then(|response| response))
    }
}

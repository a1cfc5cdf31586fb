//! Bounded worker pool the reply collectors run on.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::runtime::Handle;
use tokio::sync::{Mutex, mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info};

type Job = Pin<Box<dyn Future<Output = ()> + Send>>;

/// Worker pool errors.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum PoolError {
    /// The queue is full and the pool rejects instead of waiting.
    #[error("queue is full")]
    Saturated,

    /// The pool no longer accepts work.
    #[error("pool is shut down")]
    ShutDown,

    /// The job was dropped before it produced a result.
    #[error("job canceled")]
    Canceled,

    /// The configuration cannot produce a working pool.
    #[error("invalid pool configuration: {0}")]
    InvalidConfig(String),

    /// No tokio runtime to spawn workers on.
    #[error("no runtime available: {0}")]
    NoRuntime(String),
}

/// What [`WorkerPool::submit`] does when the queue is full.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmitPolicy {
    /// Wait for room in the queue.
    #[default]
    Block,

    /// Fail with [`PoolError::Saturated`].
    Reject,
}

/// Worker pool configuration.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Jobs that may wait for a worker.
    pub queue_size: usize,

    /// Jobs that may run at the same time.
    pub max_concurrent_requests: usize,

    /// Behaviour when the queue is full.
    pub submit_policy: SubmitPolicy,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            queue_size: 256,
            max_concurrent_requests: 64,
            submit_policy: SubmitPolicy::Block,
        }
    }
}

/// Resolves to the output of a submitted job.
#[derive(Debug)]
pub struct TaskHandle<T> {
    receiver: oneshot::Receiver<T>,
}

impl<T> Future for TaskHandle<T> {
    type Output = Result<T, PoolError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.receiver)
            .poll(cx)
            .map(|result| result.map_err(|_| PoolError::Canceled))
    }
}

/// A reserved place in a [`WorkerPool`] queue.
#[derive(Debug)]
pub struct Slot<'a> {
    permit: mpsc::Permit<'a, Job>,
}

impl Slot<'_> {
    /// Queues `future` in the reserved place and returns a handle to its output.
    pub fn submit<F, T>(self, future: F) -> TaskHandle<T>
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let (result_tx, receiver) = oneshot::channel();
        self.permit.send(Box::pin(async move {
            // The caller may have dropped its handle.
            let _ = result_tx.send(future.await);
        }));

        TaskHandle { receiver }
    }
}

/// A fixed set of workers draining a bounded job queue.
#[derive(Debug)]
pub struct WorkerPool {
    config: PoolConfig,
    sender: mpsc::Sender<Job>,
    receiver: Arc<Mutex<mpsc::Receiver<Job>>>,
    shutdown: CancellationToken,
    workers: TaskTracker,
}

impl WorkerPool {
    /// Starts the workers on the current tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration asks for no workers or no queue,
    /// or if called outside a tokio runtime.
    pub fn new(config: PoolConfig) -> Result<Self, PoolError> {
        if config.max_concurrent_requests == 0 {
            return Err(PoolError::InvalidConfig(
                "max_concurrent_requests must be non-zero".to_string(),
            ));
        }
        if config.queue_size == 0 {
            return Err(PoolError::InvalidConfig(
                "queue_size must be non-zero".to_string(),
            ));
        }

        let runtime = Handle::try_current().map_err(|e| PoolError::NoRuntime(e.to_string()))?;

        let (sender, receiver) = mpsc::channel(config.queue_size);
        let receiver = Arc::new(Mutex::new(receiver));
        let shutdown = CancellationToken::new();
        let workers = TaskTracker::new();

        for worker in 0..config.max_concurrent_requests {
            workers.spawn_on(
                Self::run_worker(worker, Arc::clone(&receiver), shutdown.clone()),
                &runtime,
            );
        }

        debug!(
            "worker pool started with {} workers and queue size {}",
            config.max_concurrent_requests, config.queue_size
        );

        Ok(Self {
            config,
            sender,
            receiver,
            shutdown,
            workers,
        })
    }

    async fn run_worker(
        worker: usize,
        receiver: Arc<Mutex<mpsc::Receiver<Job>>>,
        shutdown: CancellationToken,
    ) {
        loop {
            let job = tokio::select! {
                biased;
                () = shutdown.cancelled() => break,
                job = async { receiver.lock().await.recv().await } => match job {
                    Some(job) => job,
                    None => break,
                },
            };

            tokio::select! {
                biased;
                () = shutdown.cancelled() => break,
                () = job => {}
            }
        }

        debug!("worker {} stopped", worker);
    }

    /// The configuration the pool was started with.
    #[must_use]
    pub const fn config(&self) -> &PoolConfig {
        &self.config
    }

    /// Whether [`shutdown`](Self::shutdown) has been called.
    #[must_use]
    pub fn is_shut_down(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    /// Claims a place in the queue without supplying the job yet.
    ///
    /// The place is released if the returned [`Slot`] is dropped unused.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::ShutDown`] once the pool is shut down, and
    /// [`PoolError::Saturated`] if the queue is full under [`SubmitPolicy::Reject`].
    pub async fn reserve(&self) -> Result<Slot<'_>, PoolError> {
        if self.is_shut_down() {
            return Err(PoolError::ShutDown);
        }

        let permit = match self.config.submit_policy {
            SubmitPolicy::Block => {
                tokio::select! {
                    () = self.shutdown.cancelled() => return Err(PoolError::ShutDown),
                    permit = self.sender.reserve() => permit.map_err(|_| PoolError::ShutDown)?,
                }
            }
            SubmitPolicy::Reject => self.sender.try_reserve().map_err(|e| match e {
                mpsc::error::TrySendError::Full(()) => PoolError::Saturated,
                mpsc::error::TrySendError::Closed(()) => PoolError::ShutDown,
            })?,
        };

        Ok(Slot { permit })
    }

    /// Queues `future` and returns a handle to its output.
    ///
    /// # Errors
    ///
    /// See [`reserve`](Self::reserve).
    pub async fn submit<F, T>(&self, future: F) -> Result<TaskHandle<T>, PoolError>
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        Ok(self.reserve().await?.submit(future))
    }

    /// Stops the workers. Running and queued jobs are dropped and their
    /// handles resolve with [`PoolError::Canceled`].
    pub async fn shutdown(&self) {
        if self.shutdown.is_cancelled() {
            return;
        }

        self.shutdown.cancel();
        self.workers.close();
        self.workers.wait().await;

        let mut receiver = self.receiver.lock().await;
        receiver.close();
        let mut dropped = 0usize;
        while receiver.try_recv().is_ok() {
            dropped += 1;
        }

        info!("worker pool shut down, {} queued jobs dropped", dropped);
    }
}

//! Reference-counted ownership of the shared transport session and worker pool.

use crate::config::Config;
use crate::error::{Error, Result};
use crate::pool::WorkerPool;

use std::fmt::{self, Debug, Formatter};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use courier_transport::SessionProvider;
use parking_lot::RwLock;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

/// The transport session and worker pool shared by every client.
#[derive(Debug)]
pub struct SharedSession<S> {
    session: S,
    pool: WorkerPool,
}

impl<S> SharedSession<S> {
    /// The transport session.
    pub const fn session(&self) -> &S {
        &self.session
    }

    /// The worker pool reply collectors run on.
    pub const fn pool(&self) -> &WorkerPool {
        &self.pool
    }
}

/// Creates the shared session on the first [`init`](Self::init) and destroys
/// it on the matching last [`term`](Self::term).
///
/// The session and the pool exist exactly while the reference count is
/// non-zero.
pub struct SessionManager<P>
where
    P: SessionProvider,
{
    provider: P,
    config: Config,
    ref_count: AtomicUsize,
    transition: Mutex<()>,
    shared: RwLock<Option<Arc<SharedSession<P::Session>>>>,
}

impl<P> SessionManager<P>
where
    P: SessionProvider,
{
    /// Creates a manager. Nothing is established until the first `init`.
    pub fn new(provider: P, config: Config) -> Self {
        Self {
            provider,
            config,
            ref_count: AtomicUsize::new(0),
            transition: Mutex::new(()),
            shared: RwLock::new(None),
        }
    }

    /// The configuration sessions are created with.
    pub const fn config(&self) -> &Config {
        &self.config
    }

    /// The transport session provider.
    pub const fn provider(&self) -> &P {
        &self.provider
    }

    /// Number of outstanding `init` calls.
    pub fn ref_count(&self) -> usize {
        self.ref_count.load(Ordering::Acquire)
    }

    /// Whether the shared session currently exists.
    pub fn is_initialized(&self) -> bool {
        self.ref_count() > 0
    }

    /// The shared session, if initialized.
    pub fn current(&self) -> Option<Arc<SharedSession<P::Session>>> {
        if !self.is_initialized() {
            return None;
        }

        self.shared.read().clone()
    }

    /// Increments the count if it is already non-zero.
    fn try_acquire(&self) -> bool {
        self.ref_count
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |count| {
                (count > 0).then(|| count + 1)
            })
            .is_ok()
    }

    /// Takes a reference to the shared session, creating it if this is the first.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Unavailable`] if the transport session cannot be
    /// established or retrieved, or the worker pool cannot be started. The
    /// reference count is left unchanged.
    #[instrument(skip(self))]
    pub async fn init(&self) -> Result<()> {
        if self.try_acquire() {
            return Ok(());
        }

        let _guard = self.transition.lock().await;
        if self.try_acquire() {
            return Ok(());
        }

        self.provider
            .establish(&self.config.session)
            .await
            .map_err(|e| Error::unavailable("failed to establish session", Some(e)))?;

        let Some(session) = self.provider.current_session() else {
            self.abandon_transport().await;
            return Err(Error::unavailable("session handle not available", None));
        };

        let pool = match WorkerPool::new(self.config.pool.clone()) {
            Ok(pool) => pool,
            Err(e) => {
                self.abandon_transport().await;
                return Err(Error::unavailable(
                    format!("failed to start worker pool: {e}"),
                    None,
                ));
            }
        };

        *self.shared.write() = Some(Arc::new(SharedSession { session, pool }));
        self.ref_count.store(1, Ordering::Release);

        info!("RPC session initialized");
        Ok(())
    }

    /// Releases a reference, destroying the shared session with the last one.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotInitialized`] if there is no reference to release,
    /// and [`Error::Unavailable`] if the transport session fails to tear down.
    #[instrument(skip(self))]
    pub async fn term(&self) -> Result<()> {
        let _guard = self.transition.lock().await;

        let previous = self
            .ref_count
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |count| {
                count.checked_sub(1)
            })
            .map_err(|_| Error::NotInitialized)?;

        if previous > 1 {
            debug!("RPC session released, {} references remain", previous - 1);
            return Ok(());
        }

        let shared = self.shared.write().take();
        if let Some(shared) = shared {
            shared.pool().shutdown().await;
        }

        self.provider
            .teardown()
            .await
            .map_err(|e| Error::unavailable("failed to tear down session", Some(e)))?;

        info!("RPC session terminated");
        Ok(())
    }

    async fn abandon_transport(&self) {
        if let Err(e) = self.provider.teardown().await {
            warn!("failed to tear down partially initialized session: {}", e);
        }
    }
}

impl<P> Debug for SessionManager<P>
where
    P: SessionProvider,
{
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionManager")
            .field("ref_count", &self.ref_count())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

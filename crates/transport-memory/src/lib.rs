//! In-memory transport implementation for testing
//!
//! Queries are routed between sessions within the same process. Sessions
//! created from the same [`MemoryNetwork`] see each other's queryables.
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

mod queryable;

pub use queryable::{IncomingQuery, QueryHandler, Queryable, Responder};

use std::fmt::{self, Debug, Formatter};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use courier_transport::{
    Error, Query, ReplySender, RoutingKey, Session, SessionConfig, SessionProvider,
};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use parking_lot::Mutex;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};
use uuid::Uuid;

/// Registry of queryables shared by every session attached to it.
#[derive(Clone, Default)]
pub struct MemoryNetwork {
    queryables: Arc<DashMap<RoutingKey, Arc<dyn QueryHandler>>>,
}

impl MemoryNetwork {
    /// Creates an empty network.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of declared queryables.
    #[must_use]
    pub fn queryable_count(&self) -> usize {
        self.queryables.len()
    }

    fn handler(&self, key: &RoutingKey) -> Option<Arc<dyn QueryHandler>> {
        self.queryables.get(key).map(|entry| Arc::clone(entry.value()))
    }
}

impl Debug for MemoryNetwork {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryNetwork")
            .field("queryables", &self.queryables.len())
            .finish()
    }
}

/// A session on a [`MemoryNetwork`].
#[derive(Clone, Debug)]
pub struct MemorySession {
    id: Uuid,
    network: MemoryNetwork,
    shutdown: CancellationToken,
}

impl MemorySession {
    /// Opens a session on `network`.
    #[must_use]
    pub fn open(network: MemoryNetwork) -> Self {
        Self {
            id: Uuid::new_v4(),
            network,
            shutdown: CancellationToken::new(),
        }
    }

    /// Identifier of the session.
    #[must_use]
    pub const fn id(&self) -> Uuid {
        self.id
    }

    /// Whether the session has been closed.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    /// Closes the session. In-flight queries are abandoned and their reply channels close.
    pub fn close(&self) {
        debug!("closing memory session {}", self.id);
        self.shutdown.cancel();
    }

    /// Declares a queryable serving `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the session is closed or `key` is already served.
    pub fn declare_queryable<H>(&self, key: RoutingKey, handler: H) -> Result<Queryable, Error>
    where
        H: QueryHandler,
    {
        if self.is_closed() {
            return Err(Error::Closed);
        }

        match self.network.queryables.entry(key.clone()) {
            Entry::Occupied(_) => Err(Error::AlreadyDeclared(key.into())),
            Entry::Vacant(entry) => {
                entry.insert(Arc::new(handler));
                info!("declared queryable on {}", key);
                Ok(Queryable::new(key, self.network.clone()))
            }
        }
    }
}

#[async_trait]
impl Session for MemorySession {
    #[instrument(skip(self, query, replies), fields(session = %self.id))]
    async fn query(
        &self,
        key: &RoutingKey,
        query: Query,
        replies: ReplySender,
    ) -> Result<(), Error> {
        if self.is_closed() {
            return Err(Error::Closed);
        }

        if key.as_str().is_empty() {
            return Err(Error::NoRoute(key.to_string()));
        }

        let Some(handler) = self.network.handler(key) else {
            // Nobody serves the key: the query completes without replies.
            debug!("no queryable on {}", key);
            return Ok(());
        };

        let incoming = IncomingQuery {
            key: key.clone(),
            payload: query.payload,
            attachment: query.attachment,
        };
        let responder = Responder::new(key.clone(), replies);
        let shutdown = self.shutdown.clone();
        let query_timeout = query.timeout;
        let key = key.clone();

        tokio::spawn(async move {
            tokio::select! {
                () = shutdown.cancelled() => {
                    debug!("session closed while query on {} was in flight", key);
                }
                result = timeout(query_timeout, handler.handle(incoming, responder)) => {
                    if result.is_err() {
                        debug!("query on {} timed out after {:?}", key, query_timeout);
                    }
                }
            }
        });

        Ok(())
    }
}

/// Provides a single shared [`MemorySession`] per provider.
#[derive(Debug, Default)]
pub struct MemorySessionProvider {
    network: MemoryNetwork,
    session: Mutex<Option<MemorySession>>,
    establish_count: AtomicUsize,
    teardown_count: AtomicUsize,
}

impl MemorySessionProvider {
    /// Creates a provider whose sessions attach to `network`.
    #[must_use]
    pub fn new(network: MemoryNetwork) -> Self {
        Self {
            network,
            session: Mutex::new(None),
            establish_count: AtomicUsize::new(0),
            teardown_count: AtomicUsize::new(0),
        }
    }

    /// The network sessions attach to.
    #[must_use]
    pub const fn network(&self) -> &MemoryNetwork {
        &self.network
    }

    /// How many times a session has been established.
    #[must_use]
    pub fn establish_count(&self) -> usize {
        self.establish_count.load(Ordering::SeqCst)
    }

    /// How many times a session has been torn down.
    #[must_use]
    pub fn teardown_count(&self) -> usize {
        self.teardown_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SessionProvider for MemorySessionProvider {
    type Session = MemorySession;

    async fn establish(&self, config: &SessionConfig) -> Result<(), Error> {
        let mut slot = self.session.lock();
        if slot.is_some() {
            return Ok(());
        }

        let session = MemorySession::open(self.network.clone());
        info!(
            "established memory session {} (connect: {:?}, listen: {:?})",
            session.id(),
            config.connect,
            config.listen
        );
        *slot = Some(session);
        self.establish_count.fetch_add(1, Ordering::SeqCst);

        Ok(())
    }

    fn current_session(&self) -> Option<MemorySession> {
        self.session.lock().clone()
    }

    async fn teardown(&self) -> Result<(), Error> {
        let session = self
            .session
            .lock()
            .take()
            .ok_or_else(|| Error::Unavailable("no session established".to_string()))?;

        session.close();
        self.teardown_count.fetch_add(1, Ordering::SeqCst);
        info!("tore down memory session {}", session.id());

        Ok(())
    }
}

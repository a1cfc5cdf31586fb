//! Test doubles for the transport contracts.

use crate::request::ATTRIBUTES_KEY;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use courier_core::{Attributes, AttributesCodec, CborCodec};
use courier_transport::{
    Attachment, Error, ErrorReply, Query, Reply, ReplySender, RoutingKey, Sample, Session,
    SessionConfig, SessionProvider,
};
use parking_lot::Mutex;

pub fn valid_reply(payload: &'static [u8], attributes: &Attributes) -> Reply {
    let metadata = CborCodec.encode(attributes).unwrap();
    raw_reply(payload, Some([(ATTRIBUTES_KEY, metadata)].into_iter().collect()))
}

pub fn raw_reply(payload: &'static [u8], attachment: Option<Attachment>) -> Reply {
    Reply::Ok(Sample {
        key: RoutingKey::new("test"),
        payload: Bytes::from_static(payload),
        attachment,
    })
}

pub fn error_reply(message: &str) -> Reply {
    Reply::Err(ErrorReply::new(message))
}

/// Step at which the mock transport fails.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Failure {
    Establish,
    NoSession,
    Teardown,
    Query,
}

/// What the mock session answers each query with.
#[derive(Clone, Debug)]
pub enum Script {
    /// Close the reply channel without replying.
    Silent,
    /// Send the query payload and attachment back.
    Echo,
    /// Send these replies in order.
    Replies(Vec<Reply>),
}

#[derive(Clone, Debug)]
pub struct MockSession {
    queries: Arc<Mutex<Vec<(RoutingKey, Query)>>>,
    script: Arc<Mutex<Script>>,
    fail_query: bool,
}

impl MockSession {
    pub fn queries(&self) -> Vec<(RoutingKey, Query)> {
        self.queries.lock().clone()
    }

    pub fn script(&self, script: Script) {
        *self.script.lock() = script;
    }
}

#[async_trait]
impl Session for MockSession {
    async fn query(
        &self,
        key: &RoutingKey,
        query: Query,
        replies: ReplySender,
    ) -> Result<(), Error> {
        if self.fail_query {
            return Err(Error::Closed);
        }

        self.queries.lock().push((key.clone(), query.clone()));

        let script = self.script.lock().clone();
        let replies_to_send = match script {
            Script::Silent => Vec::new(),
            Script::Echo => vec![Reply::Ok(Sample {
                key: key.clone(),
                payload: query.payload,
                attachment: Some(query.attachment),
            })],
            Script::Replies(replies) => replies,
        };

        tokio::spawn(async move {
            for reply in replies_to_send {
                if replies.send(reply).await.is_err() {
                    break;
                }
            }
        });

        Ok(())
    }
}

/// Session provider counting establishments and teardowns.
#[derive(Debug)]
pub struct MockProvider {
    session: MockSession,
    established: AtomicBool,
    establish_count: AtomicUsize,
    teardown_count: AtomicUsize,
    failure: Option<Failure>,
}

impl MockProvider {
    pub fn new() -> Self {
        Self {
            session: MockSession {
                queries: Arc::default(),
                script: Arc::new(Mutex::new(Script::Silent)),
                fail_query: false,
            },
            established: AtomicBool::new(false),
            establish_count: AtomicUsize::new(0),
            teardown_count: AtomicUsize::new(0),
            failure: None,
        }
    }

    pub fn failing(mut self, failure: Failure) -> Self {
        self.session.fail_query = failure == Failure::Query;
        self.failure = Some(failure);
        self
    }

    pub fn scripted(self, script: Script) -> Self {
        self.session.script(script);
        self
    }

    pub fn session(&self) -> &MockSession {
        &self.session
    }

    pub fn establish_count(&self) -> usize {
        self.establish_count.load(Ordering::SeqCst)
    }

    pub fn teardown_count(&self) -> usize {
        self.teardown_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SessionProvider for MockProvider {
    type Session = MockSession;

    async fn establish(&self, _config: &SessionConfig) -> Result<(), Error> {
        // Widen the window for racing initializers.
        tokio::task::yield_now().await;

        if self.failure == Some(Failure::Establish) {
            return Err(Error::Unavailable("refused".to_string()));
        }

        self.established.store(true, Ordering::SeqCst);
        self.establish_count.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn current_session(&self) -> Option<MockSession> {
        if self.failure == Some(Failure::NoSession) || !self.established.load(Ordering::SeqCst) {
            return None;
        }

        Some(self.session.clone())
    }

    async fn teardown(&self) -> Result<(), Error> {
        tokio::task::yield_now().await;

        self.established.store(false, Ordering::SeqCst);
        self.teardown_count.fetch_add(1, Ordering::SeqCst);

        if self.failure == Some(Failure::Teardown) {
            return Err(Error::Unavailable("teardown refused".to_string()));
        }
        Ok(())
    }
}

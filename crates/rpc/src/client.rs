//! RPC client implementation.

use crate::dispatch::Dispatcher;
use crate::error::{Error, Result};
use crate::handle::InvocationHandle;
use crate::request::{InvocationRequest, RequestBuilder};
use crate::session::SessionManager;

use std::sync::Arc;

use bytes::Bytes;
use courier_core::{AttributesCodec, CallOptions, CborCodec, Uri};
use courier_transport::SessionProvider;
use tracing::{debug, instrument};

/// Invokes remote methods over the shared session.
///
/// Every client built on the same [`SessionManager`] shares one transport
/// session and one worker pool.
pub struct RpcClient<P, C = CborCodec>
where
    P: SessionProvider,
{
    manager: Arc<SessionManager<P>>,
    builder: RequestBuilder<C>,
    dispatcher: Dispatcher<C>,
}

impl<P> RpcClient<P>
where
    P: SessionProvider,
{
    /// Creates a client encoding attributes as CBOR.
    pub fn new(manager: Arc<SessionManager<P>>) -> Self {
        Self::with_codec(manager, CborCodec)
    }
}

impl<P, C> RpcClient<P, C>
where
    P: SessionProvider,
    C: AttributesCodec,
{
    /// Creates a client with a custom attributes codec.
    pub fn with_codec(manager: Arc<SessionManager<P>>, codec: C) -> Self {
        let config = manager.config();
        let builder = RequestBuilder::new(codec.clone(), config.request_timeout);
        let dispatcher = Dispatcher::new(
            codec,
            config.reply_channel_capacity,
            config.reply_policy,
            config.failure_mode,
        );

        Self {
            manager,
            builder,
            dispatcher,
        }
    }

    /// The session manager this client draws on.
    pub const fn manager(&self) -> &Arc<SessionManager<P>> {
        &self.manager
    }

    /// Takes a reference to the shared session.
    ///
    /// # Errors
    ///
    /// See [`SessionManager::init`].
    pub async fn init(&self) -> Result<()> {
        self.manager.init().await
    }

    /// Releases a reference to the shared session.
    ///
    /// # Errors
    ///
    /// See [`SessionManager::term`].
    pub async fn term(&self) -> Result<()> {
        self.manager.term().await
    }

    /// Invokes `method` with `payload` and returns a handle to the response.
    ///
    /// Returns once the query is on the transport; the reply is awaited
    /// through the handle.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotInitialized`] when no client holds the session,
    /// any validation error from [`RequestBuilder::build`], and any dispatch
    /// error from [`Dispatcher::dispatch`].
    #[instrument(skip(self, payload, options), fields(method = %method))]
    pub async fn invoke_method(
        &self,
        method: &Uri,
        payload: Bytes,
        options: CallOptions,
    ) -> Result<InvocationHandle> {
        let shared = self.manager.current().ok_or(Error::NotInitialized)?;

        let request = self.builder.build(InvocationRequest::new(
            method.clone(),
            payload,
            options,
        ))?;
        debug!("invoking {} as request {}", method, request.attributes.id);

        self.dispatcher.dispatch(&shared, request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::{FailureMode, ReplyPolicy};
    use crate::config::Config;
    use crate::testing::{MockProvider, Script, raw_reply, valid_reply};

    use std::time::Duration;

    use courier_core::{Attributes, Entity, Priority, Resource};
    use futures::future::join_all;
    use proptest::prelude::*;
    use tracing_test::traced_test;
    use uuid::Uuid;

    fn method() -> Uri {
        Uri::rpc_method("body.access", Some(1), "UpdateDoor")
    }

    fn client(provider: MockProvider, config: Config) -> RpcClient<MockProvider> {
        RpcClient::new(Arc::new(SessionManager::new(provider, config)))
    }

    #[tokio::test]
    async fn test_invoke_before_init() {
        let client = client(MockProvider::new(), Config::default());

        let result = client
            .invoke_method(&method(), Bytes::new(), CallOptions::default())
            .await;

        assert!(matches!(result, Err(Error::NotInitialized)));
        assert!(client.manager().provider().session().queries().is_empty());
    }

    #[tokio::test]
    async fn test_invoke_after_term() {
        let client = client(MockProvider::new(), Config::default());
        client.init().await.unwrap();
        client.term().await.unwrap();

        let result = client
            .invoke_method(&method(), Bytes::new(), CallOptions::default())
            .await;

        assert!(matches!(result, Err(Error::NotInitialized)));
    }

    #[tokio::test]
    async fn test_invalid_target_not_dispatched() {
        let client = client(MockProvider::new(), Config::default());
        client.init().await.unwrap();
        let topic = Uri::new(
            Entity::new("body.access", Some(1)),
            Resource::rpc_method_id(0x8001),
        );

        let result = client
            .invoke_method(&topic, Bytes::new(), CallOptions::default())
            .await;

        assert!(matches!(result, Err(Error::InvalidTarget(_))));
        assert!(client.manager().provider().session().queries().is_empty());
    }

    #[tokio::test]
    async fn test_default_and_explicit_timeouts() {
        let config = Config::builder()
            .request_timeout(Duration::from_millis(1200))
            .build();
        let client = client(MockProvider::new(), config);
        client.init().await.unwrap();

        client
            .invoke_method(&method(), Bytes::new(), CallOptions::default())
            .await
            .unwrap()
            .await
            .unwrap();
        client
            .invoke_method(
                &method(),
                Bytes::new(),
                CallOptions::default().with_ttl(300),
            )
            .await
            .unwrap()
            .await
            .unwrap();

        let timeouts: Vec<_> = client
            .manager()
            .provider()
            .session()
            .queries()
            .into_iter()
            .map(|(_, query)| query.timeout)
            .collect();
        assert_eq!(
            timeouts,
            vec![Duration::from_millis(1200), Duration::from_millis(300)]
        );
    }

    #[tokio::test]
    #[traced_test]
    async fn test_reply_without_attachment_resolves_empty() {
        let provider =
            MockProvider::new().scripted(Script::Replies(vec![raw_reply(b"payload", None)]));
        let client = client(provider, Config::default());
        client.init().await.unwrap();

        let response = client
            .invoke_method(&method(), Bytes::new(), CallOptions::default())
            .await
            .unwrap()
            .await
            .unwrap();

        assert_eq!(response, courier_core::Message::default());
        assert!(logs_contain("reply carried no attributes attachment"));
    }

    #[tokio::test]
    async fn test_second_valid_reply_wins() {
        let first = Attributes::response(Uuid::now_v7(), Priority::CS4).build();
        let second = Attributes::response(Uuid::now_v7(), Priority::CS5).build();
        let provider = MockProvider::new().scripted(Script::Replies(vec![
            valid_reply(b"first", &first),
            valid_reply(b"second", &second),
        ]));
        let client = client(provider, Config::default());
        client.init().await.unwrap();

        let response = client
            .invoke_method(&method(), Bytes::new(), CallOptions::default())
            .await
            .unwrap()
            .await
            .unwrap();

        assert_eq!(response.payload, Bytes::from_static(b"second"));
        assert_eq!(response.attributes, second);
    }

    #[tokio::test]
    async fn test_strict_first_valid_configuration() {
        let first = Attributes::response(Uuid::now_v7(), Priority::CS4).build();
        let provider = MockProvider::new().scripted(Script::Replies(vec![
            valid_reply(b"first", &first),
            raw_reply(b"second", None),
        ]));
        let config = Config::builder()
            .reply_policy(ReplyPolicy::FirstValid)
            .failure_mode(FailureMode::Strict)
            .build();
        let client = client(provider, config);
        client.init().await.unwrap();

        let response = client
            .invoke_method(&method(), Bytes::new(), CallOptions::default())
            .await
            .unwrap()
            .await
            .unwrap();
        assert_eq!(response.payload, Bytes::from_static(b"first"));

        client
            .manager()
            .provider()
            .session()
            .script(Script::Silent);
        let result = client
            .invoke_method(&method(), Bytes::new(), CallOptions::default())
            .await
            .unwrap()
            .await;
        assert!(matches!(result, Err(Error::NoReply)));
    }

    #[tokio::test]
    async fn test_clients_share_one_session() {
        let manager = Arc::new(SessionManager::new(
            MockProvider::new().scripted(Script::Echo),
            Config::default(),
        ));
        let clients: Vec<_> = (0..2).map(|_| RpcClient::new(Arc::clone(&manager))).collect();

        for result in join_all(clients.iter().map(|client| client.init())).await {
            result.unwrap();
        }
        assert_eq!(manager.provider().establish_count(), 1);

        for client in &clients {
            let response = client
                .invoke_method(&method(), Bytes::from_static(b"hi"), CallOptions::default())
                .await
                .unwrap()
                .await
                .unwrap();
            assert_eq!(response.payload, Bytes::from_static(b"hi"));
        }

        for result in join_all(clients.iter().map(|client| client.term())).await {
            result.unwrap();
        }
        assert_eq!(manager.provider().teardown_count(), 1);
        assert!(manager.current().is_none());
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn prop_low_priority_never_dispatched(level in 0u8..5) {
            let priority = match level {
                0 => Priority::Unspecified,
                1 => Priority::CS0,
                2 => Priority::CS1,
                3 => Priority::CS2,
                _ => Priority::CS3,
            };

            let runtime = tokio::runtime::Runtime::new().unwrap();
            let queries = runtime.block_on(async {
                let client = client(MockProvider::new(), Config::default());
                client.init().await.unwrap();

                let result = client
                    .invoke_method(&method(), Bytes::new(), CallOptions::new(priority))
                    .await;
                assert!(matches!(result, Err(Error::PriorityTooLow { .. })));

                let queries = client.manager().provider().session().queries().len();
                client.term().await.unwrap();
                queries
            });

            prop_assert_eq!(queries, 0);
        }
    }
}

//! Request/response invocation of remote methods over a pub/sub query transport.
//!
//! A caller invokes a method addressed by a [`Uri`](courier_core::Uri) and
//! gets back an [`InvocationHandle`] that resolves to the response. Under the
//! hood each invocation:
//!
//! - is validated and given request attributes by the [`RequestBuilder`]
//! - is sent as a query on the target's routing key by the [`Dispatcher`],
//!   with the encoded attributes attached next to the payload
//! - has its replies drained by a [`ReplyCollector`] running on the shared
//!   [`WorkerPool`]
//!
//! All clients built on the same [`SessionManager`] share one transport
//! session, created on the first `init` and torn down on the last `term`.
//!
//! # Example
//!
//! ```rust,ignore
//! let manager = Arc::new(SessionManager::new(provider, Config::default()));
//! let client = RpcClient::new(Arc::clone(&manager));
//! client.init().await?;
//!
//! let method = Uri::rpc_method("body.access", Some(1), "UpdateDoor");
//! let response = client
//!     .invoke_method(&method, Bytes::from_static(b"open"), CallOptions::default())
//!     .await?
//!     .await?;
//!
//! client.term().await?;
//! ```
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

mod client;
mod collector;
mod config;
mod dispatch;
mod error;
mod handle;
mod pool;
mod request;
mod session;

#[cfg(test)]
mod testing;

pub use client::RpcClient;
pub use collector::{FailureMode, ReplyCollector, ReplyPolicy};
pub use config::{Config, ConfigBuilder, DEFAULT_REPLY_CHANNEL_CAPACITY, DEFAULT_REQUEST_TIMEOUT};
pub use dispatch::Dispatcher;
pub use error::{Error, Result};
pub use handle::InvocationHandle;
pub use pool::{PoolConfig, PoolError, Slot, SubmitPolicy, TaskHandle, WorkerPool};
pub use request::{ATTRIBUTES_KEY, InvocationRequest, PreparedRequest, RequestBuilder, routing_key};
pub use session::{SessionManager, SharedSession};

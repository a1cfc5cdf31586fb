//! RPC client configuration

use crate::collector::{FailureMode, ReplyPolicy};
use crate::pool::{PoolConfig, SubmitPolicy};

use std::time::Duration;

use courier_transport::SessionConfig;
use serde::{Deserialize, Serialize};

/// Default time a request waits for replies when it carries no deadline.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Default number of replies buffered per request.
pub const DEFAULT_REPLY_CHANNEL_CAPACITY: usize = 16;

/// RPC client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Transport session configuration
    pub session: SessionConfig,

    /// Worker pool configuration
    pub pool: PoolConfig,

    /// Timeout for requests without an explicit deadline
    pub request_timeout: Duration,

    /// Replies buffered per request
    pub reply_channel_capacity: usize,

    /// Which reply wins when several arrive
    pub reply_policy: ReplyPolicy,

    /// How reply anomalies reach the caller
    pub failure_mode: FailureMode,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            session: SessionConfig::default(),
            pool: PoolConfig::default(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            reply_channel_capacity: DEFAULT_REPLY_CHANNEL_CAPACITY,
            reply_policy: ReplyPolicy::default(),
            failure_mode: FailureMode::default(),
        }
    }
}

impl Config {
    /// Starts building a configuration from the defaults.
    #[must_use]
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }
}

/// Builder for [`Config`].
#[derive(Debug, Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the transport session configuration.
    #[must_use]
    pub fn session(mut self, session: SessionConfig) -> Self {
        self.config.session = session;
        self
    }

    /// Set the default request timeout.
    #[must_use]
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.config.request_timeout = timeout;
        self
    }

    /// Set the per-request reply channel capacity.
    #[must_use]
    pub fn reply_channel_capacity(mut self, capacity: usize) -> Self {
        self.config.reply_channel_capacity = capacity;
        self
    }

    /// Set the number of reply collectors that may run at once.
    #[must_use]
    pub fn max_concurrent_requests(mut self, max: usize) -> Self {
        self.config.pool.max_concurrent_requests = max;
        self
    }

    /// Set the worker pool queue size.
    #[must_use]
    pub fn queue_size(mut self, size: usize) -> Self {
        self.config.pool.queue_size = size;
        self
    }

    /// Set what happens when the worker pool queue is full.
    #[must_use]
    pub fn submit_policy(mut self, policy: SubmitPolicy) -> Self {
        self.config.pool.submit_policy = policy;
        self
    }

    /// Set which reply wins when several arrive.
    #[must_use]
    pub fn reply_policy(mut self, policy: ReplyPolicy) -> Self {
        self.config.reply_policy = policy;
        self
    }

    /// Set how reply anomalies reach the caller.
    #[must_use]
    pub fn failure_mode(mut self, mode: FailureMode) -> Self {
        self.config.failure_mode = mode;
        self
    }

    /// Build the configuration.
    #[must_use]
    pub fn build(self) -> Config {
        self.config
    }
}

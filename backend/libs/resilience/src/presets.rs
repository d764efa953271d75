/// Preset configurations for the remote dependencies of the sampler
use crate::retry::RetryConfig;
use crate::timeout::TimeoutConfig;
use std::time::Duration;

/// Configuration bundle for a dependency type
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub timeout: TimeoutConfig,
    pub retry: RetryConfig,
}

impl ServiceConfig {
    /// Same retry policy, different per-call time limit
    pub fn with_timeout(mut self, duration: Duration) -> Self {
        self.timeout = TimeoutConfig { duration };
        self
    }
}

/// Redis viewed-set operations
///
/// - Timeout: 1s (single set command on a local network)
/// - Retry: 2 attempts, short backoff, for commands with the same effect on
///   repeat (SISMEMBER, SREM, SCARD, DEL). Not for an SADD claim: after a
///   lost reply the retry reads back `0` for the caller's own insert.
pub fn redis_config() -> ServiceConfig {
    ServiceConfig {
        timeout: TimeoutConfig {
            duration: Duration::from_secs(1),
        },
        retry: RetryConfig {
            max_retries: 2,
            initial_backoff: Duration::from_millis(20),
            max_backoff: Duration::from_millis(200),
            backoff_multiplier: 2.0,
            jitter: true,
        },
    }
}

/// Picture metadata API (external HTTP)
///
/// - Timeout: 5s (remote board API, sometimes slow)
/// - Retry: 2 attempts with exponential backoff
pub fn content_source_config() -> ServiceConfig {
    ServiceConfig {
        timeout: TimeoutConfig {
            duration: Duration::from_secs(5),
        },
        retry: RetryConfig {
            max_retries: 2,
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_secs(1),
            backoff_multiplier: 2.0,
            jitter: true,
        },
    }
}

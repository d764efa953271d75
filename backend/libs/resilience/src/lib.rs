/// Resilience patterns for the gallery backend
///
/// This library provides the two primitives every remote call in the
/// sampler goes through:
/// - **Timeout**: Enforces a time limit on a single call to Redis or the content source
/// - **Retry**: Exponential backoff with jitter for transient failures, bounded attempts
/// - **Preset Configurations**: Pre-tuned settings for Redis and the content source
///
/// # Example: Redis call with timeout and retry
///
/// ```rust,no_run
/// use resilience::{presets, with_retry, with_timeout_result};
///
/// #[tokio::main]
/// async fn main() {
///     let config = presets::redis_config();
///
///     let result = with_retry(config.retry.clone(), || async {
///         with_timeout_result(config.timeout.duration, async {
///             // Your Redis command here
///             Ok::<_, String>(())
///         })
///         .await
///     })
///     .await;
/// }
/// ```

pub mod presets;
pub mod retry;
pub mod timeout;

// Re-export main types for convenience
pub use presets::{content_source_config, redis_config, ServiceConfig};
pub use retry::{with_retry, with_retry_if, RetryConfig, RetryError};
pub use timeout::{with_timeout, with_timeout_result, TimeoutConfig, TimeoutError};

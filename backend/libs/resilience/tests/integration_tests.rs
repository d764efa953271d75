/// Integration tests for resilience library
use resilience::{
    presets,
    retry::{with_retry, RetryConfig, RetryError},
    timeout::{with_timeout_result, TimeoutError},
};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

// ==================== Retry + Timeout Composition ====================

#[tokio::test(start_paused = true)]
async fn test_slow_call_is_retried_after_timeout() {
    let calls = Arc::new(AtomicU32::new(0));
    let calls_clone = calls.clone();

    let config = RetryConfig {
        max_retries: 2,
        initial_backoff: Duration::from_millis(5),
        jitter: false,
        ..Default::default()
    };

    let result = with_retry(config, move || {
        let n = calls_clone.fetch_add(1, Ordering::SeqCst);
        async move {
            with_timeout_result(Duration::from_millis(50), async move {
                if n == 0 {
                    // First call hangs past the deadline
                    tokio::time::sleep(Duration::from_secs(10)).await;
                }
                Ok::<_, String>(n)
            })
            .await
        }
    })
    .await;

    assert_eq!(result.unwrap(), 1);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test(start_paused = true)]
async fn test_persistent_timeout_surfaces_elapsed() {
    let config = presets::redis_config();
    let deadline = config.timeout.duration;

    let result = with_retry(config.retry, || async move {
        with_timeout_result(deadline, async {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok::<(), String>(())
        })
        .await
    })
    .await;

    match result {
        Err(RetryError::Exhausted { attempts, last }) => {
            assert_eq!(attempts, 3);
            assert!(matches!(last, TimeoutError::Elapsed(d) if d == deadline));
        }
        Ok(_) => panic!("expected timeout"),
    }
}

#[tokio::test]
async fn test_operation_error_is_not_masked_by_timeout() {
    let result = with_retry(RetryConfig::none(), || async {
        with_timeout_result(Duration::from_secs(1), async {
            Err::<(), _>("connection refused")
        })
        .await
    })
    .await;

    let last = result.unwrap_err().into_last();
    assert!(matches!(last, TimeoutError::OperationFailed("connection refused")));
}

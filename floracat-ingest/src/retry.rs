//! Exponential backoff for outbound crawler fetches.

use std::time::Duration;

use floracat_core::config::IngestConfig;
use floracat_core::{FloraCatError, FloraCatResult};
use tracing::warn;

/// Retry an async operation with exponential backoff, per `IngestConfig`.
/// Hard-fails immediately on a non-retriable error (4xx other than 429,
/// signalled by the closure returning `Ok(Err(e))` with `e.retriable() ==
/// false`); only `StoreUnavailable`/`DeadlineExceeded`-shaped errors are
/// retried.
pub async fn with_backoff<F, Fut, T>(config: &IngestConfig, mut op: F) -> FloraCatResult<T>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = FloraCatResult<T>>,
{
    let mut delay = Duration::from_secs(config.backoff_base_secs);
    let max_delay = Duration::from_secs(config.backoff_max_secs);

    for attempt in 1..=config.max_attempts {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if attempt == config.max_attempts || !err.retriable() => return Err(err),
            Err(err) => {
                warn!(attempt, %err, delay_secs = delay.as_secs(), "retrying after transport error");
                tokio::time::sleep(delay).await;
                delay = std::cmp::min(delay * config.backoff_factor, max_delay);
            }
        }
    }
    Err(FloraCatError::Generic("retry loop exited without a result".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn succeeds_after_transient_failures() {
        let config = IngestConfig {
            backoff_base_secs: 0,
            backoff_factor: 2,
            backoff_max_secs: 0,
            max_attempts: 3,
            ..IngestConfig::default()
        };
        let attempts = AtomicU32::new(0);
        let result = with_backoff(&config, || {
            let n = attempts.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(FloraCatError::StoreUnavailable("unreachable".to_string()))
                } else {
                    Ok(42)
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn gives_up_on_non_retriable_error() {
        let config = IngestConfig::default();
        let attempts = AtomicU32::new(0);
        let result: FloraCatResult<()> = with_backoff(&config, || {
            attempts.fetch_add(1, Ordering::SeqCst);
            async { Err(FloraCatError::CrawlerParseFailed("bad row".to_string())) }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }
}

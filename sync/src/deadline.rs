//! Bounded waits for hot-path remote reads.

use std::future::Future;
use std::time::Duration;

/// Await `fut` for at most `limit`, yielding `fallback` on expiry.
pub async fn with_fallback<T, F>(limit: Duration, fut: F, fallback: T) -> T
where
    F: Future<Output = T>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(value) => value,
        Err(_) => {
            tracing::debug!(?limit, "read timed out, using fallback");
            fallback
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn completes_before_limit() {
        let value = with_fallback(Duration::from_secs(1), async { 7 }, 0).await;
        assert_eq!(value, 7);
    }

    #[tokio::test(start_paused = true)]
    async fn falls_back_on_expiry() {
        let slow = async {
            tokio::time::sleep(Duration::from_secs(60)).await;
            7
        };
        let value = with_fallback(Duration::from_millis(10), slow, 0).await;
        assert_eq!(value, 0);
    }
}

//! Optimistic-concurrency retry loop.

use crate::MarketError;
use gebeya_store::MAX_COMMIT_RETRIES;
use std::future::Future;
use tracing::debug;

/// Run a read-modify-commit attempt until it commits without a version
/// conflict, at most [`MAX_COMMIT_RETRIES`] times.
///
/// Each attempt must re-read everything it writes. Any error other than a
/// version conflict is returned immediately.
pub(crate) async fn retry_on_conflict<T, F, Fut>(operation: &str, mut attempt: F) -> Result<T, MarketError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, MarketError>>,
{
    for n in 1..=MAX_COMMIT_RETRIES {
        match attempt().await {
            Err(e) if e.is_version_conflict() => {
                debug!(operation, attempt = n, error = %e, "Version conflict, retrying");
            }
            other => return other,
        }
    }
    Err(MarketError::Conflict(format!(
        "{} lost {} consecutive commit races",
        operation, MAX_COMMIT_RETRIES
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use gebeya_store::{DocKey, StoreError};
    use std::sync::atomic::{AtomicU32, Ordering};

    fn conflict() -> MarketError {
        MarketError::Store(StoreError::VersionConflict {
            key: DocKey::new("orders", "o"),
            expected: 1,
            found: 2,
        })
    }

    #[tokio::test]
    async fn test_succeeds_after_conflict() {
        let calls = AtomicU32::new(0);
        let result = retry_on_conflict("op", || async {
            if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(conflict())
            } else {
                Ok(7)
            }
        })
        .await;
        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_gives_up_with_conflict() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = retry_on_conflict("op", || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(conflict())
        })
        .await;
        assert!(matches!(result, Err(MarketError::Conflict(_))));
        assert_eq!(calls.load(Ordering::SeqCst), MAX_COMMIT_RETRIES);
    }

    #[tokio::test]
    async fn test_other_errors_not_retried() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = retry_on_conflict("op", || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(MarketError::EmptyCart)
        })
        .await;
        assert!(matches!(result, Err(MarketError::EmptyCart)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}

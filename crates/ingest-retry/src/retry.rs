//! Standalone retry driver.
//!
//! Unlike this crate's ancestry (a Tower `Service` middleware wrapping a
//! fixed request/response pair), `retry` wraps an arbitrary async closure:
//! there is no `Service` to layer, just an operation to re-attempt under a
//! policy.

use std::future::Future;
use std::time::Instant;

use tokio_util::sync::CancellationToken;

use ingest_core::{IngestError, Result};

use crate::config::RetryPolicy;

/// Retries `op` under `policy` until it succeeds, the classifier says the
/// error isn't retryable, attempts are exhausted, the deadline passes, or
/// `cancel` fires.
///
/// `classifier` is consulted only for errors other than cancellation;
/// cancellation always takes priority and is never swallowed by it. Pass
/// [`IngestError::is_retryable_class`] for the toolkit's default policy.
pub async fn retry_result<T, F, Fut>(
    name: &str,
    mut op: F,
    policy: &RetryPolicy,
    classifier: impl Fn(&IngestError) -> bool,
    cancel: &CancellationToken,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let deadline = if policy.timeout.is_zero() {
        None
    } else {
        Some(Instant::now() + policy.timeout)
    };

    let mut attempt: u64 = 0;
    loop {
        if cancel.is_cancelled() {
            return Err(IngestError::Cancelled);
        }

        attempt += 1;
        let result = op().await;

        let err = match result {
            Ok(value) => {
                #[cfg(feature = "tracing")]
                if attempt > 1 {
                    tracing::debug!(name, attempt, "retry succeeded");
                }
                return Ok(value);
            }
            Err(err) => err,
        };

        if err.is_cancelled() {
            return Err(err);
        }

        let attempts_exhausted = policy.max_attempts != 0 && attempt >= policy.max_attempts;
        let retryable = classifier(&err);

        if attempts_exhausted || !retryable {
            #[cfg(feature = "tracing")]
            tracing::warn!(name, attempt, error = %err, "retry giving up");
            #[cfg(feature = "metrics")]
            metrics::counter!("ingest_retry_exhausted_total", "name" => name.to_string())
                .increment(1);
            return Err(err);
        }

        let delay = policy.delay_for_retry(attempt - 1);

        if let Some(deadline) = deadline {
            if Instant::now() + delay >= deadline {
                #[cfg(feature = "tracing")]
                tracing::warn!(name, attempt, "retry deadline exceeded");
                return Err(err);
            }
        }

        #[cfg(feature = "tracing")]
        tracing::debug!(name, attempt, ?delay, error = %err, "retrying after backoff");
        #[cfg(feature = "metrics")]
        metrics::counter!("ingest_retry_attempts_total", "name" => name.to_string()).increment(1);

        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            _ = cancel.cancelled() => return Err(IngestError::Cancelled),
        }
    }
}

/// Convenience wrapper over [`retry_result`] for operations whose `Result`
/// already carries an [`IngestError`], using the toolkit's default
/// classifier ([`IngestError::is_retryable_class`]).
pub async fn retry<T, F, Fut>(
    name: &str,
    op: F,
    policy: &RetryPolicy,
    cancel: &CancellationToken,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    retry_result(name, op, policy, IngestError::is_retryable_class, cancel).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn succeeds_without_retrying() {
        let policy = RetryPolicy::builder().build();
        let cancel = CancellationToken::new();
        let calls = Arc::new(AtomicU64::new(0));
        let calls2 = calls.clone();

        let result: Result<u32> = retry(
            "op",
            move || {
                let calls = calls2.clone();
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(42)
                }
            },
            &policy,
            &cancel,
        )
        .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn retries_transient_errors_until_success() {
        let policy = RetryPolicy::builder()
            .initial_delay(Duration::from_millis(1))
            .build();
        let cancel = CancellationToken::new();
        let calls = Arc::new(AtomicU64::new(0));
        let calls2 = calls.clone();

        let result: Result<u32> = retry(
            "op",
            move || {
                let calls = calls2.clone();
                async move {
                    let n = calls.fetch_add(1, Ordering::SeqCst);
                    if n < 2 {
                        Err(IngestError::TransientNetwork("blip".into()))
                    } else {
                        Ok(7)
                    }
                }
            },
            &policy,
            &cancel,
        )
        .await;

        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_when_attempts_are_exhausted() {
        let policy = RetryPolicy::builder()
            .max_attempts(2)
            .initial_delay(Duration::from_millis(1))
            .build();
        let cancel = CancellationToken::new();
        let calls = Arc::new(AtomicU64::new(0));
        let calls2 = calls.clone();

        let result: Result<u32> = retry(
            "op",
            move || {
                let calls = calls2.clone();
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err(IngestError::TransientNetwork("down".into()))
                }
            },
            &policy,
            &cancel,
        )
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn non_retryable_errors_are_not_retried() {
        let policy = RetryPolicy::builder().build();
        let cancel = CancellationToken::new();
        let calls = Arc::new(AtomicU64::new(0));
        let calls2 = calls.clone();

        let result: Result<u32> = retry(
            "op",
            move || {
                let calls = calls2.clone();
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err(IngestError::BadRequest("nope".into()))
                }
            },
            &policy,
            &cancel,
        )
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn unbounded_attempts_keep_retrying_until_cancelled() {
        let policy = RetryPolicy::builder()
            .max_attempts(0)
            .initial_delay(Duration::from_millis(1))
            .build();
        let cancel = CancellationToken::new();
        let calls = Arc::new(AtomicU64::new(0));
        let calls2 = calls.clone();
        let cancel2 = cancel.clone();

        let handle = tokio::spawn(async move {
            retry_result::<u32, _, _>(
                "op",
                move || {
                    let calls = calls2.clone();
                    async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        Err(IngestError::TransientNetwork("down".into()))
                    }
                },
                &policy,
                IngestError::is_retryable_class,
                &cancel2,
            )
            .await
        });

        tokio::time::sleep(Duration::from_millis(10)).await;
        cancel.cancel();
        let result = handle.await.unwrap();
        assert!(matches!(result, Err(IngestError::Cancelled)));
        assert!(calls.load(Ordering::SeqCst) >= 1);
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_stops_further_retries() {
        let policy = RetryPolicy::builder()
            .max_attempts(0)
            .timeout(Duration::from_millis(5))
            .initial_delay(Duration::from_millis(100))
            .build();
        let cancel = CancellationToken::new();

        let result: Result<u32> = retry(
            "op",
            || async { Err(IngestError::TransientNetwork("down".into())) },
            &policy,
            &cancel,
        )
        .await;

        assert!(matches!(result, Err(IngestError::TransientNetwork(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn already_cancelled_token_short_circuits_before_first_attempt() {
        let policy = RetryPolicy::builder().build();
        let cancel = CancellationToken::new();
        cancel.cancel();
        let calls = Arc::new(AtomicU64::new(0));
        let calls2 = calls.clone();

        let result: Result<u32> = retry(
            "op",
            move || {
                let calls = calls2.clone();
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(1)
                }
            },
            &policy,
            &cancel,
        )
        .await;

        assert!(matches!(result, Err(IngestError::Cancelled)));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }
}

//! Fixed-parallelism fan-out helper.

use std::collections::VecDeque;
use std::future::Future;

use futures::stream::{FuturesUnordered, StreamExt};
use tokio_util::sync::CancellationToken;

/// Runs `generators` with strict parallelism `parallelism`: at most that
/// many futures are in flight at once, and a new one is launched only as an
/// earlier one completes. Returns the first error encountered; results for
/// generators that never got to run (because an earlier one failed, or
/// `cancel` fired) are simply absent. `parallelism == 0` is treated as `1`.
pub async fn run_throttled<T, E, G, Fut>(
    generators: Vec<G>,
    parallelism: usize,
    mut on_complete: Option<impl FnMut(&Result<T, E>)>,
    cancel: CancellationToken,
) -> Result<Vec<T>, E>
where
    G: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let parallelism = parallelism.max(1);
    let mut queue: VecDeque<G> = generators.into_iter().collect();
    let mut in_flight = FuturesUnordered::new();
    let mut results = Vec::new();
    let mut first_error = None;

    while !queue.is_empty() || !in_flight.is_empty() {
        while in_flight.len() < parallelism && !queue.is_empty() && !cancel.is_cancelled() {
            let generator = queue.pop_front().expect("queue checked non-empty above");
            in_flight.push(generator());
        }

        let Some(result) = in_flight.next().await else {
            break;
        };

        if let Some(callback) = on_complete.as_mut() {
            callback(&result);
        }

        match result {
            Ok(value) => results.push(value),
            Err(err) => {
                first_error.get_or_insert(err);
                break;
            }
        }

        if cancel.is_cancelled() {
            break;
        }
    }

    match first_error {
        Some(err) => Err(err),
        None => Ok(results),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn runs_all_generators_and_collects_results() {
        let generators: Vec<_> = (0..5)
            .map(|i| move || async move { Ok::<_, String>(i * 2) })
            .collect();

        let results = run_throttled(generators, 2, None::<fn(&Result<i32, String>)>, CancellationToken::new())
            .await
            .unwrap();
        let mut sorted = results;
        sorted.sort();
        assert_eq!(sorted, vec![0, 2, 4, 6, 8]);
    }

    #[tokio::test]
    async fn never_exceeds_strict_parallelism() {
        let concurrent = Arc::new(AtomicUsize::new(0));
        let max_seen = Arc::new(AtomicUsize::new(0));

        let generators: Vec<_> = (0..10)
            .map(|_| {
                let concurrent = Arc::clone(&concurrent);
                let max_seen = Arc::clone(&max_seen);
                move || async move {
                    let now = concurrent.fetch_add(1, Ordering::SeqCst) + 1;
                    max_seen.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(5)).await;
                    concurrent.fetch_sub(1, Ordering::SeqCst);
                    Ok::<_, String>(())
                }
            })
            .collect();

        run_throttled(generators, 3, None::<fn(&Result<(), String>)>, CancellationToken::new())
            .await
            .unwrap();

        assert!(max_seen.load(Ordering::SeqCst) <= 3);
    }

    #[tokio::test]
    async fn propagates_first_error() {
        let generators: Vec<_> = vec![
            (|| async { Ok::<_, &'static str>(1) }) as fn() -> _,
            (|| async { Err("boom") }) as fn() -> _,
            (|| async { Ok::<_, &'static str>(3) }) as fn() -> _,
        ];

        let err = run_throttled(generators, 1, None::<fn(&Result<i32, &'static str>)>, CancellationToken::new())
            .await
            .unwrap_err();
        assert_eq!(err, "boom");
    }

    #[tokio::test]
    async fn on_complete_callback_observes_every_result() {
        let seen = Arc::new(AtomicUsize::new(0));
        let seen_clone = Arc::clone(&seen);

        let generators: Vec<_> = (0..4).map(|i| move || async move { Ok::<_, String>(i) }).collect();

        run_throttled(
            generators,
            4,
            Some(move |_: &Result<i32, String>| {
                seen_clone.fetch_add(1, Ordering::SeqCst);
            }),
            CancellationToken::new(),
        )
        .await
        .unwrap();

        assert_eq!(seen.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn cancellation_stops_launching_new_generators() {
        let launched = Arc::new(AtomicUsize::new(0));
        let cancel = CancellationToken::new();
        let cancel_for_first = cancel.clone();

        let generators: Vec<_> = (0..5)
            .map(|i| {
                let launched = Arc::clone(&launched);
                let cancel_for_first = cancel_for_first.clone();
                move || async move {
                    launched.fetch_add(1, Ordering::SeqCst);
                    if i == 0 {
                        cancel_for_first.cancel();
                    }
                    Ok::<_, String>(())
                }
            })
            .collect();

        run_throttled(generators, 1, None::<fn(&Result<(), String>)>, cancel)
            .await
            .unwrap();

        assert!(launched.load(Ordering::SeqCst) < 5);
    }
}

//! Bounded, order-preserving concurrent execution
//!
//! Up to `concurrency` futures are polled at once on the current task.
//! Outputs are yielded in input order regardless of completion order.

use futures::stream::{self, Stream, StreamExt};
use std::future::Future;

/// Map every item to a future and yield the outputs in input order
pub fn run_ordered<T, F, Fut>(
    items: Vec<T>,
    concurrency: usize,
    f: F,
) -> impl Stream<Item = Fut::Output>
where
    F: FnMut(T) -> Fut,
    Fut: Future,
{
    stream::iter(items).map(f).buffered(concurrency.max(1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn test_output_order_matches_input() {
        let delays = vec![60u64, 10, 40, 0];
        let out: Vec<u64> = run_ordered(delays.clone(), 4, |ms| async move {
            tokio::time::sleep(Duration::from_millis(ms)).await;
            ms
        })
        .collect()
        .await;
        assert_eq!(out, delays);
    }

    #[tokio::test]
    async fn test_concurrency_is_bounded() {
        let in_flight = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let out: Vec<usize> = run_ordered((0..6).collect(), 2, |i| {
            let in_flight = in_flight.clone();
            let peak = peak.clone();
            async move {
                let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(20)).await;
                in_flight.fetch_sub(1, Ordering::SeqCst);
                i
            }
        })
        .collect()
        .await;

        assert_eq!(out, vec![0, 1, 2, 3, 4, 5]);
        assert_eq!(peak.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_zero_concurrency_runs_sequentially() {
        let out: Vec<i32> = run_ordered(vec![1, 2, 3], 0, |i| async move { i * 2 })
            .collect()
            .await;
        assert_eq!(out, vec![2, 4, 6]);
    }
}

use std::future::Future;

use futures_util::{stream, StreamExt, TryStreamExt};

use dynamap_core::{AccessError, Result};

pub const DEFAULT_SCAN_CONCURRENCY: usize = 4;

/// Runs one future per scan segment, at most `max_concurrency` at a time.
///
/// Results are concatenated in segment order; the first failing segment
/// aborts the whole scan.
pub async fn run_segments<O, F, Fut>(
    total_segments: u32,
    max_concurrency: usize,
    run: F,
) -> Result<Vec<O>>
where
    F: Fn(u32) -> Fut,
    Fut: Future<Output = Result<Vec<O>>>,
{
    if total_segments == 0 {
        return Err(AccessError::validation("total_segments must be > 0"));
    }
    if max_concurrency == 0 {
        return Err(AccessError::validation("max_concurrency must be > 0"));
    }

    tracing::debug!(total_segments, max_concurrency, "starting parallel scan");
    let segments: Vec<Vec<O>> = stream::iter((0..total_segments).map(run))
        .buffered(max_concurrency)
        .try_collect()
        .await?;

    Ok(segments.into_iter().flatten().collect())
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn test_results_keep_segment_order() {
        let items = run_segments(4, 4, |segment| async move {
            // Later segments finish first.
            tokio::time::sleep(Duration::from_millis(u64::from(4 - segment) * 5)).await;
            Ok(vec![segment * 10, segment * 10 + 1])
        })
        .await
        .unwrap();
        assert_eq!(items, vec![0, 1, 10, 11, 20, 21, 30, 31]);
    }

    #[tokio::test]
    async fn test_concurrency_is_bounded() {
        let running = AtomicUsize::new(0);
        let peak = AtomicUsize::new(0);
        let (running, peak) = (&running, &peak);
        run_segments(8, 2, |_| async move {
            let now = running.fetch_add(1, Ordering::SeqCst) + 1;
            peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(2)).await;
            running.fetch_sub(1, Ordering::SeqCst);
            Ok(Vec::<()>::new())
        })
        .await
        .unwrap();
        assert!(peak.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test]
    async fn test_segment_failure_aborts() {
        let err = run_segments(3, 3, |segment| async move {
            if segment == 1 {
                Err(AccessError::validation("bad segment"))
            } else {
                Ok(vec![segment])
            }
        })
        .await
        .unwrap_err();
        assert_eq!(err, AccessError::validation("bad segment"));
    }

    #[tokio::test]
    async fn test_zero_segments_is_rejected() {
        let err = run_segments(0, 1, |_| async { Ok(Vec::<u32>::new()) })
            .await
            .unwrap_err();
        assert_eq!(err, AccessError::validation("total_segments must be > 0"));
    }
}

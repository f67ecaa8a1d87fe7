//! The status poll loop shared by both trackers.

use crate::MessageResult;
use core::{fmt::Debug, future::Future, time::Duration};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

/// The outcome of waiting on a message status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusWait<S> {
    /// The last observed status.
    pub status: S,
    /// `false` if the wait timed out or was cancelled before the status settled.
    pub complete: bool,
}

/// Reads a status every `interval` until `is_done` accepts it, `timeout` elapses or `cancel` fires.
///
/// Reads are never interrupted. Cancellation and the deadline are only observed between reads.
/// A zero timeout performs exactly one read.
pub(crate) async fn poll_until<S, F, Fut>(
    interval: Duration,
    timeout: Option<Duration>,
    cancel: &CancellationToken,
    mut read: F,
    is_done: impl Fn(&S) -> bool,
) -> MessageResult<StatusWait<S>>
where
    S: Debug,
    F: FnMut() -> Fut,
    Fut: Future<Output = MessageResult<S>>,
{
    // A timeout past the end of the clock never expires.
    let deadline = timeout.and_then(|timeout| Instant::now().checked_add(timeout));
    let mut reads = 0u64;

    loop {
        let status = read().await?;
        reads += 1;
        if is_done(&status) {
            debug!(target: "messages::poll", ?status, reads, "Status settled");
            return Ok(StatusWait { status, complete: true });
        }

        let mut delay = interval;
        if let Some(deadline) = deadline {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                debug!(target: "messages::poll", ?status, reads, "Timed out waiting for status");
                return Ok(StatusWait { status, complete: false });
            }
            delay = delay.min(remaining);
        }

        trace!(target: "messages::poll", ?status, ?delay, "Status not settled, sleeping");
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!(target: "messages::poll", ?status, reads, "Status wait cancelled");
                return Ok(StatusWait { status, complete: false });
            }
            _ = tokio::time::sleep(delay) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ChainReaderError, MessageError};
    use core::sync::atomic::{AtomicU64, Ordering};

    fn counting_read(
        reads: &AtomicU64,
        done_at: u64,
    ) -> impl FnMut() -> core::future::Ready<MessageResult<u64>> + '_ {
        move || {
            let n = reads.fetch_add(1, Ordering::SeqCst) + 1;
            core::future::ready(Ok(n.min(done_at)))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_completes_once_settled() {
        let reads = AtomicU64::new(0);
        let cancel = CancellationToken::new();
        let wait = poll_until(
            Duration::from_secs(1),
            None,
            &cancel,
            counting_read(&reads, 3),
            |status| *status == 3,
        )
        .await
        .unwrap();

        assert_eq!(wait, StatusWait { status: 3, complete: true });
        assert_eq!(reads.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_timeout_reads_once() {
        let reads = AtomicU64::new(0);
        let cancel = CancellationToken::new();
        let wait = poll_until(
            Duration::from_secs(1),
            Some(Duration::ZERO),
            &cancel,
            counting_read(&reads, 10),
            |status| *status == 10,
        )
        .await
        .unwrap();

        assert_eq!(wait, StatusWait { status: 1, complete: false });
        assert_eq!(reads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unbounded_timeout_waits_for_settlement() {
        let reads = AtomicU64::new(0);
        let cancel = CancellationToken::new();
        let wait = poll_until(
            Duration::from_secs(1),
            Some(Duration::MAX),
            &cancel,
            counting_read(&reads, 4),
            |status| *status == 4,
        )
        .await
        .unwrap();

        assert_eq!(wait, StatusWait { status: 4, complete: true });
        assert_eq!(reads.load(Ordering::SeqCst), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_returns_incomplete() {
        let reads = AtomicU64::new(0);
        let cancel = CancellationToken::new();
        let start = Instant::now();
        let wait = poll_until(
            Duration::from_secs(2),
            Some(Duration::from_secs(5)),
            &cancel,
            counting_read(&reads, 100),
            |status| *status == 100,
        )
        .await
        .unwrap();

        // Reads at t = 0, 2, 4 and the deadline at 5.
        assert!(!wait.complete);
        assert_eq!(reads.load(Ordering::SeqCst), 4);
        assert!(start.elapsed() >= Duration::from_secs(5));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_stops_between_reads() {
        let reads = AtomicU64::new(0);
        let cancel = CancellationToken::new();
        cancel.cancel();
        let wait = poll_until(
            Duration::from_secs(1),
            None,
            &cancel,
            counting_read(&reads, 100),
            |status| *status == 100,
        )
        .await
        .unwrap();

        assert_eq!(wait, StatusWait { status: 1, complete: false });
    }

    #[tokio::test(start_paused = true)]
    async fn test_read_errors_propagate() {
        let cancel = CancellationToken::new();
        let result: MessageResult<StatusWait<u64>> = poll_until(
            Duration::from_secs(1),
            None,
            &cancel,
            || async { Err(MessageError::ChainRead(ChainReaderError::Transport("down".into()))) },
            |_| true,
        )
        .await;

        assert!(matches!(result, Err(MessageError::ChainRead(_))));
    }
}

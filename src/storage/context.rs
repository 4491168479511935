//! Per-operation cancellation and deadline context.

use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use super::error::{CancelReason, Result, StorageError};

/// Caller-supplied cancellation scope for a storage operation.
///
/// A context may carry a deadline, a [`CancellationToken`], both, or
/// neither ([`Context::background`]). Cloning is cheap; clones share the
/// token.
///
/// # Example
///
/// ```ignore
/// let ctx = Context::with_timeout(Duration::from_millis(250));
/// let value = store.get(&ctx, "session:42").await?;
/// ```
#[derive(Debug, Clone, Default)]
pub struct Context {
    deadline: Option<Instant>,
    token: Option<CancellationToken>,
}

impl Context {
    /// A context that is never cancelled and has no deadline.
    pub fn background() -> Self {
        Self::default()
    }

    /// A context that expires `timeout` from now.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self::background().deadline(Instant::now() + timeout)
    }

    /// A context cancelled when `token` is cancelled.
    pub fn with_token(token: CancellationToken) -> Self {
        Self::background().token(token)
    }

    /// Sets the deadline, keeping the earlier one if already set.
    #[must_use]
    pub fn deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(match self.deadline {
            Some(existing) => existing.min(deadline),
            None => deadline,
        });
        self
    }

    #[must_use]
    pub fn token(mut self, token: CancellationToken) -> Self {
        self.token = Some(token);
        self
    }

    pub fn deadline_at(&self) -> Option<Instant> {
        self.deadline
    }

    /// Returns why the context is done, or `None` if it is still live.
    pub fn done(&self) -> Option<CancelReason> {
        if self.token.as_ref().is_some_and(CancellationToken::is_cancelled) {
            return Some(CancelReason::Cancelled);
        }
        if self.deadline.is_some_and(|d| Instant::now() >= d) {
            return Some(CancelReason::DeadlineExceeded);
        }
        None
    }

    /// Runs `operation` unless the context ends first.
    ///
    /// If the context is already done the operation is never polled, so no
    /// request leaves the process. Otherwise the operation is dropped as soon
    /// as the token fires or the deadline passes. An operation that is ready
    /// on the same poll still wins.
    ///
    /// A `Cancelled` result does not mean a remote write was not applied:
    /// the request may have reached the service before it was dropped.
    pub async fn run<T, F>(&self, key: &str, operation: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        if let Some(reason) = self.done() {
            return Err(StorageError::cancelled(key, reason));
        }

        let cancelled = async {
            match &self.token {
                Some(token) => token.cancelled().await,
                None => std::future::pending().await,
            }
        };
        let expired = async {
            match self.deadline {
                Some(deadline) => tokio::time::sleep_until(deadline).await,
                None => std::future::pending().await,
            }
        };

        tokio::select! {
            biased;
            result = operation => result,
            () = cancelled => Err(StorageError::cancelled(key, CancelReason::Cancelled)),
            () = expired => Err(StorageError::cancelled(key, CancelReason::DeadlineExceeded)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_background_runs_operation() {
        let ctx = Context::background();
        assert!(ctx.done().is_none());
        let value = ctx.run("k", async { Ok(5) }).await.unwrap();
        assert_eq!(value, 5);
    }

    #[tokio::test]
    async fn test_cancelled_token_skips_operation() {
        let token = CancellationToken::new();
        token.cancel();
        let ctx = Context::with_token(token);

        let mut polled = false;
        let result = ctx
            .run("k", async {
                polled = true;
                Ok(())
            })
            .await;

        assert!(matches!(
            result,
            Err(StorageError::Cancelled {
                reason: CancelReason::Cancelled,
                ..
            })
        ));
        assert!(!polled);
    }

    #[tokio::test]
    async fn test_deadline_interrupts_slow_operation() {
        let ctx = Context::with_timeout(Duration::from_millis(50));
        let result: Result<()> = ctx
            .run("slow", async {
                tokio::time::sleep(Duration::from_secs(10)).await;
                Ok(())
            })
            .await;

        assert!(matches!(
            result,
            Err(StorageError::Cancelled {
                reason: CancelReason::DeadlineExceeded,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_token_cancels_in_flight_operation() {
        let token = CancellationToken::new();
        let ctx = Context::with_token(token.clone());

        let canceller = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            token.cancel();
        });

        let result: Result<()> = ctx
            .run("k", std::future::pending::<Result<()>>())
            .await;
        canceller.await.unwrap();

        assert!(matches!(result, Err(StorageError::Cancelled { .. })));
    }

    #[tokio::test]
    async fn test_completed_operation_beats_late_cancellation() {
        let token = CancellationToken::new();
        let ctx = Context::with_token(token.clone());

        // Cancels between its first and second poll, then completes
        let result = ctx
            .run("k", async {
                token.cancel();
                tokio::task::yield_now().await;
                Ok(9)
            })
            .await;

        assert_eq!(result.unwrap(), 9);
        assert!(ctx.done().is_some());
    }

    #[test]
    fn test_deadline_keeps_earliest() {
        let now = Instant::now();
        let early = now + Duration::from_secs(1);
        let late = now + Duration::from_secs(5);
        let ctx = Context::background().deadline(early).deadline(late);
        assert_eq!(ctx.deadline_at(), Some(early));
    }
}

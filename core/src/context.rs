//! Per-request query context.
//!
//! A [`QueryContext`] carries the instance a request is scoped to, its
//! deadline and an optional cancellation signal. Every log fetch is raced
//! against both, so an abandoned request cannot finish a stale validation
//! after its caller gave up.

use crate::error::{QueryError, Result};
use std::future::Future;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;

/// Request-scoped context threaded through every log fetch.
///
/// # Example
///
/// ```
/// use readmodel_core::context::QueryContext;
/// use std::time::Duration;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let (ctx, cancel) = QueryContext::new("instance-1")
///     .with_timeout(Duration::from_secs(5))
///     .cancellable();
///
/// // In another task, when the client disconnects:
/// cancel.send(true).ok();
/// assert!(ctx.is_cancelled());
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct QueryContext {
    instance_id: String,
    deadline: Option<Instant>,
    cancellation: Option<watch::Receiver<bool>>,
    consistency_window: Option<Duration>,
}

impl QueryContext {
    /// Create a context without deadline or cancellation.
    #[must_use]
    pub fn new(instance_id: impl Into<String>) -> Self {
        Self {
            instance_id: instance_id.into(),
            deadline: None,
            cancellation: None,
            consistency_window: None,
        }
    }

    /// Set the deadline to `timeout` from now.
    #[must_use]
    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Set an absolute deadline. An earlier existing deadline is kept.
    #[must_use]
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(match self.deadline {
            Some(existing) if existing < deadline => existing,
            _ => deadline,
        });
        self
    }

    /// Attach an external cancellation signal; sending `true` cancels.
    #[must_use]
    pub fn with_cancellation(mut self, cancellation: watch::Receiver<bool>) -> Self {
        self.cancellation = Some(cancellation);
        self
    }

    /// Attach a fresh cancellation signal and return its sender.
    #[must_use]
    pub fn cancellable(self) -> (Self, watch::Sender<bool>) {
        let (cancel_tx, cancel_rx) = watch::channel(false);
        (self.with_cancellation(cancel_rx), cancel_tx)
    }

    /// Consistency window applied to fetches that do not set their own.
    #[must_use]
    pub const fn with_consistency_window(mut self, window: Duration) -> Self {
        self.consistency_window = Some(window);
        self
    }

    /// Instance the request is scoped to.
    #[must_use]
    pub fn instance_id(&self) -> &str {
        &self.instance_id
    }

    /// Deadline, if any.
    #[must_use]
    pub const fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Default consistency window, if any.
    #[must_use]
    pub const fn consistency_window(&self) -> Option<Duration> {
        self.consistency_window
    }

    /// Whether the cancellation signal fired or the deadline passed.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        let signalled = self
            .cancellation
            .as_ref()
            .is_some_and(|rx| *rx.borrow());
        let expired = self.deadline.is_some_and(|deadline| Instant::now() >= deadline);
        signalled || expired
    }

    /// Run `operation` unless the context is cancelled first.
    ///
    /// Cancellation and deadline are checked before the operation starts and
    /// take priority over a result that becomes ready at the same time.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::Cancelled`] on cancellation or deadline, or the
    /// operation's own error.
    pub async fn run<F, T>(&self, operation: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        if self.is_cancelled() {
            return Err(QueryError::Cancelled);
        }

        let mut cancellation = self.cancellation.clone();
        let cancelled = async move {
            match cancellation.as_mut() {
                Some(rx) => loop {
                    if *rx.borrow_and_update() {
                        return;
                    }
                    if rx.changed().await.is_err() {
                        // Sender dropped without cancelling.
                        std::future::pending::<()>().await;
                    }
                },
                None => std::future::pending::<()>().await,
            }
        };
        let deadline = self.deadline;
        let expired = async move {
            match deadline {
                Some(deadline) => tokio::time::sleep_until(deadline).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            biased;
            () = cancelled => {
                tracing::debug!(instance_id = %self.instance_id, "query cancelled by caller");
                Err(QueryError::Cancelled)
            }
            () = expired => {
                tracing::debug!(instance_id = %self.instance_id, "query deadline exceeded");
                Err(QueryError::Cancelled)
            }
            result = operation => result,
        }
    }
}

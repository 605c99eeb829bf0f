//! Request context: cancellation and deadlines.
//!
//! Every request carries a [`Context`]. Canceling it, or letting its deadline
//! pass, aborts the in-flight HTTP request, interrupts retry and poll sleeps,
//! and ends action waits with [`Error::Canceled`] or
//! [`Error::DeadlineExceeded`].

use crate::{Error, Result};
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Cancellation and deadline scope for API calls.
///
/// Contexts are cheap to clone. Derived contexts are canceled together with
/// their parent and inherit the parent's deadline unless their own is earlier.
///
/// # Examples
///
/// ```
/// use hcloud::Context;
/// use std::time::Duration;
///
/// let ctx = Context::background().with_timeout(Duration::from_secs(30));
/// let (child, cancel) = ctx.with_cancel();
///
/// cancel.cancel();
/// assert!(child.err().is_some());
/// assert!(ctx.err().is_none());
/// ```
#[derive(Debug, Clone, Default)]
pub struct Context {
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl Context {
    /// Returns a context that is never canceled and has no deadline.
    pub fn background() -> Self {
        Self::default()
    }

    /// Returns a child context together with the token that cancels it.
    pub fn with_cancel(&self) -> (Context, CancellationToken) {
        let token = self.token.child_token();
        let ctx = Context {
            token: token.clone(),
            deadline: self.deadline,
        };
        (ctx, token)
    }

    /// Returns a child context that expires after `timeout`.
    ///
    /// A timeout too large to represent as an instant adds no deadline.
    pub fn with_timeout(&self, timeout: Duration) -> Context {
        match Instant::now().checked_add(timeout) {
            Some(deadline) => self.with_deadline(deadline),
            None => {
                let (ctx, _) = self.with_cancel();
                ctx
            }
        }
    }

    /// Returns a child context that expires at `deadline`.
    pub fn with_deadline(&self, deadline: Instant) -> Context {
        let deadline = match self.deadline {
            Some(parent) if parent < deadline => parent,
            _ => deadline,
        };
        Context {
            token: self.token.child_token(),
            deadline: Some(deadline),
        }
    }

    /// Returns the deadline, if any.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Returns the cancellation error if the context is already done.
    pub fn err(&self) -> Option<Error> {
        if self.token.is_cancelled() {
            return Some(Error::Canceled);
        }
        match self.deadline {
            Some(deadline) if deadline <= Instant::now() => Some(Error::DeadlineExceeded),
            _ => None,
        }
    }

    /// Resolves once the context is canceled or its deadline passes.
    pub async fn done(&self) -> Error {
        match self.deadline {
            Some(deadline) => tokio::select! {
                _ = self.token.cancelled() => Error::Canceled,
                _ = tokio::time::sleep_until(deadline) => Error::DeadlineExceeded,
            },
            None => {
                self.token.cancelled().await;
                Error::Canceled
            }
        }
    }

    /// Sleeps for `duration` unless the context finishes first.
    pub async fn sleep(&self, duration: Duration) -> Result<()> {
        self.run(tokio::time::sleep(duration)).await
    }

    /// Drives `fut` to completion unless the context finishes first.
    pub async fn run<F: Future>(&self, fut: F) -> Result<F::Output> {
        if let Some(err) = self.err() {
            return Err(err);
        }
        tokio::select! {
            biased;
            err = self.done() => Err(err),
            output = fut => Ok(output),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_background_never_finishes() {
        let ctx = Context::background();
        assert!(ctx.err().is_none());
        assert!(ctx.sleep(Duration::from_millis(1)).await.is_ok());
    }

    #[tokio::test]
    async fn test_cancel_interrupts_sleep() {
        let (ctx, cancel) = Context::background().with_cancel();
        let handle = tokio::spawn(async move { ctx.sleep(Duration::from_secs(60)).await });
        cancel.cancel();

        let result = handle.await.unwrap();
        assert!(matches!(result, Err(Error::Canceled)));
    }

    #[tokio::test]
    async fn test_deadline_interrupts_sleep() {
        let ctx = Context::background().with_timeout(Duration::from_millis(10));
        let result = ctx.sleep(Duration::from_secs(60)).await;
        match result {
            Err(err) => {
                assert!(matches!(err, Error::DeadlineExceeded));
                assert!(err.is_cancellation());
            }
            Ok(()) => panic!("Expected the deadline to interrupt the sleep"),
        }
    }

    #[test]
    fn test_child_keeps_earlier_parent_deadline() {
        let parent = Context::background().with_timeout(Duration::from_secs(1));
        let child = parent.with_timeout(Duration::from_secs(60));
        assert_eq!(child.deadline(), parent.deadline());
    }

    #[tokio::test]
    async fn test_unrepresentable_timeout_has_no_deadline() {
        let ctx = Context::background().with_timeout(Duration::MAX);
        assert!(ctx.deadline().is_none());
        assert!(ctx.err().is_none());

        let parent = Context::background().with_timeout(Duration::from_secs(1));
        let child = parent.with_timeout(Duration::MAX);
        assert_eq!(child.deadline(), parent.deadline());
    }

    #[tokio::test]
    async fn test_parent_cancel_reaches_child() {
        let (parent, cancel) = Context::background().with_cancel();
        let child = parent.with_timeout(Duration::from_secs(60));
        cancel.cancel();
        assert!(matches!(child.err(), Some(Error::Canceled)));
    }
}

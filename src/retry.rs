//! Backoff schedules and retry predicates.
//!
//! A [`Backoff`] maps a zero-based attempt index to a wait duration. It is used
//! both by the retry handler between request attempts and by the action
//! waiter between polls. A [`RetryPredicate`] decides which failures are
//! worth another attempt.

use crate::Error;
use rand::Rng;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Maps an attempt index (0-based) to the time to wait before the next try.
///
/// # Examples
///
/// ```
/// use hcloud::Backoff;
/// use std::time::Duration;
///
/// let constant = Backoff::Constant(Duration::from_millis(500));
/// assert_eq!(constant.delay(7), Duration::from_millis(500));
///
/// // 1s, 2s, 4s, ... capped at 60s
/// let exponential = Backoff::Exponential {
///     base: Duration::from_secs(1),
///     multiplier: 2.0,
///     cap: Some(Duration::from_secs(60)),
///     jitter: false,
/// };
/// assert_eq!(exponential.delay(2), Duration::from_secs(4));
/// assert_eq!(exponential.delay(10), Duration::from_secs(60));
/// ```
#[derive(Clone)]
pub enum Backoff {
    /// Always wait the same duration.
    Constant(Duration),

    /// Wait `base * multiplier^attempt`, optionally capped.
    ///
    /// With jitter the wait is drawn uniformly between `base` and the
    /// computed (capped) value.
    Exponential {
        /// Delay of the first retry.
        base: Duration,
        /// Growth factor per attempt.
        multiplier: f64,
        /// Upper bound for a single delay.
        cap: Option<Duration>,
        /// Whether to randomize delays.
        jitter: bool,
    },

    /// Custom schedule.
    Custom(Arc<dyn Fn(usize) -> Duration + Send + Sync>),
}

impl Backoff {
    /// Builds a custom schedule from a closure.
    pub fn custom(f: impl Fn(usize) -> Duration + Send + Sync + 'static) -> Self {
        Backoff::Custom(Arc::new(f))
    }

    /// The default schedule for request retries: exponential from 1s, doubling,
    /// capped at 60s, with jitter.
    pub fn default_retry() -> Self {
        Backoff::Exponential {
            base: Duration::from_secs(1),
            multiplier: 2.0,
            cap: Some(Duration::from_secs(60)),
            jitter: true,
        }
    }

    /// The default schedule for action polling: a constant 500ms.
    pub fn default_poll() -> Self {
        Backoff::Constant(Duration::from_millis(500))
    }

    /// Returns the delay before the next try after `attempt` (0-based).
    pub fn delay(&self, attempt: usize) -> Duration {
        match self {
            Backoff::Constant(delay) => *delay,
            Backoff::Exponential {
                base,
                multiplier,
                cap,
                jitter,
            } => {
                let base_secs = base.as_secs_f64();
                let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
                let mut secs = base_secs * multiplier.powi(exponent);
                if let Some(cap) = cap {
                    secs = secs.min(cap.as_secs_f64());
                }
                if !secs.is_finite() || secs < 0.0 {
                    secs = cap.map(|c| c.as_secs_f64()).unwrap_or(base_secs);
                }

                if *jitter && secs > base_secs {
                    secs = rand::thread_rng().gen_range(base_secs..=secs);
                }
                Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX)
            }
            Backoff::Custom(f) => f(attempt),
        }
    }
}

impl fmt::Debug for Backoff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Backoff::Constant(delay) => f.debug_tuple("Constant").field(delay).finish(),
            Backoff::Exponential {
                base,
                multiplier,
                cap,
                jitter,
            } => f
                .debug_struct("Exponential")
                .field("base", base)
                .field("multiplier", multiplier)
                .field("cap", cap)
                .field("jitter", jitter)
                .finish(),
            Backoff::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// Trait for determining whether a failed request should be retried.
///
/// # Examples
///
/// ```
/// use hcloud::{Error, ErrorCode, RetryPredicate};
///
/// struct RetryOnLocked;
///
/// impl RetryPredicate for RetryOnLocked {
///     fn should_retry(&self, error: &Error, _attempt: usize) -> bool {
///         error.is_retryable() || error.is_error(&ErrorCode::Locked)
///     }
/// }
/// ```
pub trait RetryPredicate: Send + Sync {
    /// Determines whether the request should be retried.
    ///
    /// `attempt` is the 0-based index of the attempt that just failed.
    fn should_retry(&self, error: &Error, attempt: usize) -> bool;
}

/// Retry all errors that are marked as retryable.
///
/// This uses [`Error::is_retryable`]: transport timeouts, 502/504 responses,
/// and API errors with code `conflict`, `rate_limit_exceeded` or `timeout`.
#[derive(Debug, Clone, Copy)]
pub struct RetryOnRetryable;

impl RetryPredicate for RetryOnRetryable {
    fn should_retry(&self, error: &Error, _attempt: usize) -> bool {
        error.is_retryable()
    }
}

impl<F> RetryPredicate for F
where
    F: Fn(&Error) -> bool + Send + Sync,
{
    fn should_retry(&self, error: &Error, _attempt: usize) -> bool {
        self(error)
    }
}

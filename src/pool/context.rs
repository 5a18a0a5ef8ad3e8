//! Run-wide cancellation token with a first-error slot.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

use tracing::debug;

use super::PoolError;

/// Cancellation state shared by every worker and the pool coordinator.
///
/// The token only moves from active to cancelled. The first error recorded
/// with [`fail`](Self::fail) wins; later errors are logged and dropped.
#[derive(Debug, Default)]
pub struct RunContext {
    cancelled: AtomicBool,
    first_error: Mutex<Option<PoolError>>,
}

impl RunContext {
    /// Creates an active context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the run has been cancelled. Non-blocking.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    /// Cancels the run without recording an error (e.g. on Ctrl+C).
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    /// Records `error` if no error has been recorded yet, then cancels.
    ///
    /// Returns `true` if this error became the run's error.
    pub fn fail(&self, error: PoolError) -> bool {
        let recorded = {
            let mut slot = self
                .first_error
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            if slot.is_none() {
                *slot = Some(error);
                true
            } else {
                debug!(error = %error, "dropping error after first failure");
                false
            }
        };
        self.cancel();
        recorded
    }

    /// Removes and returns the recorded error, if any.
    pub fn take_error(&self) -> Option<PoolError> {
        self.first_error
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    #[test]
    fn test_context_starts_active() {
        let context = RunContext::new();
        assert!(!context.is_cancelled());
        assert!(context.take_error().is_none());
    }

    #[test]
    fn test_cancel_is_sticky() {
        let context = RunContext::new();
        context.cancel();
        context.cancel();
        assert!(context.is_cancelled());
        assert!(context.take_error().is_none());
    }

    #[test]
    fn test_first_error_wins() {
        let context = RunContext::new();
        assert!(context.fail(PoolError::WorkerPanicked("first".to_string())));
        assert!(!context.fail(PoolError::WorkerPanicked("second".to_string())));
        assert!(context.is_cancelled());

        match context.take_error() {
            Some(PoolError::WorkerPanicked(message)) => assert_eq!(message, "first"),
            other => panic!("expected first error, got {other:?}"),
        }
        assert!(context.take_error().is_none());
    }

    #[test]
    fn test_concurrent_failures_record_exactly_one() {
        let context = Arc::new(RunContext::new());
        let handles: Vec<_> = (0..16)
            .map(|i| {
                let context = Arc::clone(&context);
                std::thread::spawn(move || context.fail(PoolError::WorkerPanicked(i.to_string())))
            })
            .collect();

        let winners = handles
            .into_iter()
            .map(|h| h.join().unwrap_or(false))
            .filter(|won| *won)
            .count();
        assert_eq!(winners, 1);
        assert!(context.take_error().is_some());
    }
}

//! External cancellation of blocked publish/consume calls.

use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

/// Something with sleepers that must re-check their wait condition.
pub(crate) trait Wake: Send + Sync {
    /// Broadcasts to every waiter. Must take the sleepers' lock first so a
    /// waiter between its condition check and its sleep cannot miss it.
    fn wake_all(&self);
}

struct TokenInner {
    cancelled: AtomicBool,
    /// Queues this token has been used with.
    wakers: Mutex<Vec<Weak<dyn Wake>>>,
}

/// A cloneable request to stop waiting.
///
/// Pass it to [`BlockingQueue::publish_cancellable`] or
/// [`BlockingQueue::consume_cancellable`]; calling [`cancel`] from any
/// thread makes every such call that holds a clone of the token fail with
/// `Cancelled`, including calls currently asleep on a full or empty queue.
///
/// Cancellation is permanent. Only the first call to [`cancel`] has an
/// effect, subsequent calls are no-ops.
///
/// [`BlockingQueue::publish_cancellable`]: crate::BlockingQueue::publish_cancellable
/// [`BlockingQueue::consume_cancellable`]: crate::BlockingQueue::consume_cancellable
/// [`cancel`]: CancelToken::cancel
#[derive(Clone)]
pub struct CancelToken {
    inner: Arc<TokenInner>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(TokenInner {
                cancelled: AtomicBool::new(false),
                wakers: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Cancels the token and wakes every thread blocked on it.
    pub fn cancel(&self) {
        if self.inner.cancelled.swap(true, Ordering::SeqCst) {
            return;
        }

        // Taken out so no queue lock is acquired while holding the list lock
        let wakers = std::mem::take(&mut *self.inner.wakers.lock());
        log::debug!("cancel token fired, waking {} queue(s)", wakers.len());

        for waker in wakers.iter().filter_map(Weak::upgrade) {
            waker.wake_all();
        }
    }

    /// Returns `true` once [`cancel`](CancelToken::cancel) has been called.
    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    /// Subscribes `waker` to this token's cancellation.
    ///
    /// Registering after `cancel` is harmless: the caller checks
    /// `is_cancelled` under its own lock before sleeping.
    pub(crate) fn register(&self, waker: Weak<dyn Wake>) {
        let mut wakers = self.inner.wakers.lock();
        if self.is_cancelled() {
            return;
        }

        wakers.retain(|w| w.strong_count() > 0);
        if !wakers.iter().any(|w| w.ptr_eq(&waker)) {
            wakers.push(waker);
        }
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for CancelToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancelToken")
            .field("cancelled", &self.is_cancelled())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    struct CountingWaker(AtomicUsize);

    impl Wake for CountingWaker {
        fn wake_all(&self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_cancel_is_idempotent() {
        let waker = Arc::new(CountingWaker(AtomicUsize::new(0)));
        let token = CancelToken::new();
        let weak: Weak<dyn Wake> = Arc::downgrade(&waker) as Weak<dyn Wake>;
        token.register(weak);

        token.cancel();
        token.cancel();

        assert!(token.is_cancelled());
        assert_eq!(waker.0.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_register_dedupes() {
        let waker = Arc::new(CountingWaker(AtomicUsize::new(0)));
        let token = CancelToken::new();
        for _ in 0..3 {
            token.register(Arc::downgrade(&waker) as Weak<dyn Wake>);
        }
        assert_eq!(token.inner.wakers.lock().len(), 1);

        token.cancel();
        assert_eq!(waker.0.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_clones_share_state() {
        let token = CancelToken::new();
        let clone = token.clone();
        clone.cancel();
        assert!(token.is_cancelled());
    }

    #[test]
    fn test_dead_wakers_are_skipped() {
        let token = CancelToken::new();
        {
            let waker = Arc::new(CountingWaker(AtomicUsize::new(0)));
            token.register(Arc::downgrade(&waker) as Weak<dyn Wake>);
        }
        // Upgrade fails, nothing to wake
        token.cancel();
        assert!(token.is_cancelled());
    }
}

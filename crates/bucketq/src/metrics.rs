use crossbeam_utils::CachePadded;
use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe queue counters.
///
/// Producer-side and consumer-side counters sit on separate cache lines
/// so the two roles do not false-share while recording.
#[derive(Debug, Default)]
pub(crate) struct Metrics {
    published: CachePadded<AtomicU64>,
    publish_waits: AtomicU64,
    consumed: CachePadded<AtomicU64>,
    consume_waits: AtomicU64,
    timeouts: CachePadded<AtomicU64>,
    cancellations: AtomicU64,
}

impl Metrics {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub(crate) fn record_publish(&self) {
        self.published.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_publish_wait(&self) {
        self.publish_waits.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_consume(&self) {
        self.consumed.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_consume_wait(&self) {
        self.consume_waits.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_timeout(&self) {
        self.timeouts.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_cancellation(&self) {
        self.cancellations.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            published: self.published.load(Ordering::Relaxed),
            consumed: self.consumed.load(Ordering::Relaxed),
            publish_waits: self.publish_waits.load(Ordering::Relaxed),
            consume_waits: self.consume_waits.load(Ordering::Relaxed),
            timeouts: self.timeouts.load(Ordering::Relaxed),
            cancellations: self.cancellations.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of the queue counters.
///
/// All zero unless the queue was built with `enable_metrics`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub published: u64,
    pub consumed: u64,
    /// Times a producer went to sleep on a full queue
    pub publish_waits: u64,
    /// Times a consumer went to sleep on an empty queue
    pub consume_waits: u64,
    pub timeouts: u64,
    pub cancellations: u64,
}

impl MetricsSnapshot {
    /// Messages published but not yet consumed.
    pub fn in_flight(&self) -> u64 {
        self.published.saturating_sub(self.consumed)
    }
}

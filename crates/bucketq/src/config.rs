use crate::QueueError;
use std::num::NonZeroUsize;

/// Default queue capacity.
pub const DEFAULT_CAPACITY: usize = 20;

/// Configuration for a [`BlockingQueue`](crate::BlockingQueue).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    /// Maximum number of queued messages (must be positive)
    pub capacity: usize,
    /// Enable metrics collection (slight overhead)
    pub enable_metrics: bool,
}

impl Config {
    /// Creates a new configuration with custom settings.
    pub const fn new(capacity: usize, enable_metrics: bool) -> Self {
        Self {
            capacity,
            enable_metrics,
        }
    }

    /// Sets the capacity.
    pub const fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Turns metrics collection on or off.
    pub const fn with_metrics(mut self, enable: bool) -> Self {
        self.enable_metrics = enable;
        self
    }

    /// Checks the capacity, returning it as a `NonZeroUsize`.
    pub fn validate(&self) -> Result<NonZeroUsize, QueueError> {
        NonZeroUsize::new(self.capacity).ok_or(QueueError::ZeroCapacity)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY, false)
    }
}

/// Single-slot hand-off: every publish waits for the previous item to be consumed.
pub const SINGLE_SLOT_CONFIG: Config = Config::new(1, false);

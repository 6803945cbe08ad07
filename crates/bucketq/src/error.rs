//! Error types for queue operations.

use std::fmt;
use thiserror::Error;

/// Errors raised while building a queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum QueueError {
    /// A queue needs at least one slot.
    #[error("queue capacity must be positive")]
    ZeroCapacity,
}

/// Why a publish did not enqueue its payload.
///
/// Every variant hands the payload back.
#[derive(Clone, Copy, PartialEq, Eq, Error)]
pub enum PublishError<T> {
    /// The queue was full and the call was not allowed to wait.
    #[error("queue is full")]
    Full(T),

    /// The queue stayed full until the deadline passed.
    #[error("timed out waiting for a free slot")]
    Timeout(T),

    /// The wait was interrupted through a [`CancelToken`](crate::CancelToken).
    #[error("publish was cancelled")]
    Cancelled(T),

    /// The queue has been closed.
    #[error("queue is closed")]
    Closed(T),
}

impl<T> PublishError<T> {
    /// Returns the payload that was not published.
    pub fn into_inner(self) -> T {
        match self {
            Self::Full(t) | Self::Timeout(t) | Self::Cancelled(t) | Self::Closed(t) => t,
        }
    }

    /// Returns `true` if retrying the publish may succeed.
    #[inline]
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Full(_) | Self::Timeout(_) | Self::Cancelled(_))
    }

    /// Returns `true` if the queue will never accept this publish.
    #[inline]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Closed(_))
    }
}

impl<T> fmt::Debug for PublishError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Full(_) => f.write_str("Full(..)"),
            Self::Timeout(_) => f.write_str("Timeout(..)"),
            Self::Cancelled(_) => f.write_str("Cancelled(..)"),
            Self::Closed(_) => f.write_str("Closed(..)"),
        }
    }
}

/// Why a consume returned no message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ConsumeError {
    /// The queue was empty and the call was not allowed to wait.
    #[error("queue is empty")]
    Empty,

    /// The queue stayed empty until the deadline passed.
    #[error("timed out waiting for a message")]
    Timeout,

    /// The wait was interrupted through a [`CancelToken`](crate::CancelToken).
    #[error("consume was cancelled")]
    Cancelled,

    /// The queue has been closed and fully drained.
    #[error("queue is closed")]
    Closed,
}

impl ConsumeError {
    /// Returns `true` if retrying the consume may succeed.
    #[inline]
    pub fn is_recoverable(&self) -> bool {
        !self.is_terminal()
    }

    /// Returns `true` if no message will ever be delivered again.
    #[inline]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Closed)
    }
}

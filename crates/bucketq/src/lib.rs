//! bucketq - Bounded Blocking Message Queue
//!
//! A fixed-capacity, ring-buffer-backed queue shared by any number of
//! producer and consumer threads. Coordination is a classic monitor: one
//! mutex plus "not full" / "not empty" condition variables, with every wait
//! re-checked in a loop and every state change broadcast.
//!
//! # Key Features
//!
//! - O(1) circular storage, no element shifting
//! - Blocking, timed, non-blocking and cancellable publish/consume
//! - Graceful close: consumers drain what is left, then observe `Closed`
//! - Injectable message id generator (sequential by default)
//! - Optional counters for waits, timeouts and cancellations
//!
//! # Example
//!
//! ```
//! use bucketq::{BlockingQueue, CancelToken, ConsumeError};
//! use std::time::Duration;
//!
//! let queue = BlockingQueue::new(3).unwrap();
//!
//! queue.publish("a").unwrap();
//! queue.publish("b").unwrap();
//!
//! let first = queue.consume().unwrap();
//! assert_eq!(*first.payload(), "a");
//!
//! // Timed variant
//! queue.consume_timeout(Duration::from_millis(10)).unwrap();
//! assert_eq!(
//!     queue.consume_timeout(Duration::from_millis(10)).unwrap_err(),
//!     ConsumeError::Timeout
//! );
//!
//! // Cancellable variant
//! let token = CancelToken::new();
//! token.cancel();
//! assert_eq!(queue.consume_cancellable(&token).unwrap_err(), ConsumeError::Cancelled);
//! ```

mod cancel;
mod config;
mod error;
mod ids;
mod invariants;
mod message;
mod metrics;
mod queue;
mod ring;

pub use cancel::CancelToken;
pub use config::{Config, DEFAULT_CAPACITY, SINGLE_SLOT_CONFIG};
pub use error::{ConsumeError, PublishError, QueueError};
pub use ids::{IdGenerator, RandomIds, SequentialIds};
pub use message::{Message, MessageId};
pub use metrics::MetricsSnapshot;
pub use queue::{BlockingQueue, QueueState};
pub use ring::{Drain, Full, RingBuffer};

use crate::cancel::Wake;
use crate::invariants::{debug_assert_available, debug_assert_room};
use crate::metrics::Metrics;
use crate::{
    CancelToken, Config, ConsumeError, IdGenerator, Message, MessageId, MetricsSnapshot,
    PublishError, QueueError, RingBuffer, SequentialIds,
};
use parking_lot::{Condvar, Mutex, MutexGuard};
use std::fmt;
use std::num::NonZeroUsize;
use std::sync::{Arc, Weak};
use std::thread;
use std::time::{Duration, Instant};

// =============================================================================
// MONITOR PROTOCOL
// =============================================================================
//
// One mutex guards the ring, the id generator and the closed flag. Two
// condition variables hang off it:
//
// - `not_full`:  producers sleep here while `ring.len() == capacity`
// - `not_empty`: consumers sleep here while `ring.len() == 0`
//
// Every wait sits in a `while` loop that re-checks its condition after
// waking. A wake can be spurious, or another thread of the same role can win
// the lock first and take the slot/item that triggered it.
//
// Every state change broadcasts (`notify_all`) to the opposite role. With
// several sleepers of one role, waking a single one could pick a thread that
// then loses the race and goes back to sleep while the others never hear
// about the change.
//
// The lock is held only for check-and-mutate. Callers process messages after
// `consume` returns.
//
// =============================================================================

/// Occupancy state of a queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueState {
    /// No messages queued; `consume` blocks.
    Empty,
    /// Some messages queued, some slots free.
    Partial,
    /// Every slot occupied; `publish` blocks.
    Full,
}

/// How long an operation may sleep on its condition.
#[derive(Clone, Copy)]
enum Wait<'a> {
    /// Fail instead of sleeping.
    Never,
    Forever,
    Until(Instant),
    /// Sleep until the token is cancelled.
    Cancellable(&'a CancelToken),
}

impl Wait<'_> {
    fn timeout(timeout: Duration) -> Self {
        Instant::now()
            .checked_add(timeout)
            .map_or(Wait::Forever, Wait::Until)
    }

    fn is_cancelled(self) -> bool {
        matches!(self, Wait::Cancellable(token) if token.is_cancelled())
    }
}

#[derive(Debug, Clone, Copy)]
enum Role {
    Producer,
    Consumer,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Producer => "producer",
            Self::Consumer => "consumer",
        })
    }
}

/// Reason a wait loop gave up without its condition becoming true.
enum Interrupted {
    WouldBlock,
    TimedOut,
}

struct State<T> {
    ring: RingBuffer<Message<T>>,
    ids: Box<dyn IdGenerator>,
    closed: bool,
}

struct Shared<T> {
    state: Mutex<State<T>>,
    not_full: Condvar,
    not_empty: Condvar,
    capacity: NonZeroUsize,
    metrics: Option<Metrics>,
}

impl<T> Shared<T> {
    #[inline]
    fn metrics(&self) -> Option<&Metrics> {
        self.metrics.as_ref()
    }

    /// Sleeps once on the condition `role` waits for, honouring `wait`.
    ///
    /// The caller re-checks its condition afterwards whatever the outcome.
    fn block_on(
        &self,
        role: Role,
        state: &mut MutexGuard<'_, State<T>>,
        wait: Wait<'_>,
    ) -> Result<(), Interrupted> {
        let deadline = match wait {
            Wait::Never => return Err(Interrupted::WouldBlock),
            Wait::Until(deadline) if Instant::now() >= deadline => {
                log::debug!("{} thread {} timed out", role, thread_label());
                if let Some(m) = self.metrics() {
                    m.record_timeout();
                }
                return Err(Interrupted::TimedOut);
            }
            Wait::Until(deadline) => Some(deadline),
            Wait::Forever | Wait::Cancellable(_) => None,
        };

        let cond = match role {
            Role::Producer => {
                log::trace!("queue is full, producer thread {} waiting", thread_label());
                if let Some(m) = self.metrics() {
                    m.record_publish_wait();
                }
                &self.not_full
            }
            Role::Consumer => {
                log::trace!("queue is empty, consumer thread {} waiting", thread_label());
                if let Some(m) = self.metrics() {
                    m.record_consume_wait();
                }
                &self.not_empty
            }
        };

        match deadline {
            // Timing out here is not final: the loop re-checks first
            Some(deadline) => {
                cond.wait_until(state, deadline);
            }
            None => cond.wait(state),
        }
        Ok(())
    }

    fn note_cancelled(&self, role: Role) {
        log::warn!("{} thread {} cancelled while waiting", role, thread_label());
        if let Some(m) = self.metrics() {
            m.record_cancellation();
        }
    }
}

impl<T: Send> Wake for Shared<T> {
    fn wake_all(&self) {
        let _state = self.state.lock();
        self.not_full.notify_all();
        self.not_empty.notify_all();
    }
}

/// Bounded blocking message queue.
///
/// Any number of producer and consumer threads may share one queue through
/// cheap clones of this handle. `publish` blocks while the queue is full and
/// `consume` blocks while it is empty. Messages come out in the order they
/// went in; which waiting consumer receives the next one is unspecified.
///
/// # Example
///
/// ```
/// use bucketq::BlockingQueue;
/// use std::thread;
///
/// let queue = BlockingQueue::new(2).unwrap();
///
/// let producer = {
///     let queue = queue.clone();
///     thread::spawn(move || {
///         for i in 0..5 {
///             queue.publish(format!("Message-{i}")).unwrap();
///         }
///     })
/// };
///
/// for i in 0..5 {
///     let message = queue.consume().unwrap();
///     assert_eq!(message.payload(), &format!("Message-{i}"));
/// }
/// producer.join().unwrap();
/// ```
pub struct BlockingQueue<T> {
    inner: Arc<Shared<T>>,
}

impl<T: Send> BlockingQueue<T> {
    /// Creates a queue holding at most `capacity` messages.
    ///
    /// Fails with [`QueueError::ZeroCapacity`] when `capacity` is 0.
    pub fn new(capacity: usize) -> Result<Self, QueueError> {
        Self::with_config(Config::default().with_capacity(capacity))
    }

    /// Creates a queue with sequential message ids.
    pub fn with_config(config: Config) -> Result<Self, QueueError> {
        Self::with_id_generator(config, SequentialIds::default())
    }

    /// Creates a queue stamping messages with ids from `ids`.
    pub fn with_id_generator<G>(config: Config, ids: G) -> Result<Self, QueueError>
    where
        G: IdGenerator + 'static,
    {
        let capacity = config.validate()?;
        log::debug!(
            "creating queue: capacity={}, metrics={}",
            capacity,
            config.enable_metrics
        );

        Ok(Self {
            inner: Arc::new(Shared {
                state: Mutex::new(State {
                    ring: RingBuffer::new(capacity),
                    ids: Box::new(ids),
                    closed: false,
                }),
                not_full: Condvar::new(),
                not_empty: Condvar::new(),
                capacity,
                metrics: config.enable_metrics.then(Metrics::new),
            }),
        })
    }

    // ---------------------------------------------------------------------
    // PUBLISH
    // ---------------------------------------------------------------------

    /// Enqueues `payload`, sleeping while the queue is full.
    ///
    /// Returns the id stamped on the message. Fails only if the queue is
    /// closed, before or while waiting.
    pub fn publish(&self, payload: T) -> Result<MessageId, PublishError<T>> {
        self.publish_inner(payload, Wait::Forever)
    }

    /// Like [`publish`](Self::publish), giving up with `Timeout` once
    /// `timeout` has elapsed without a free slot.
    pub fn publish_timeout(
        &self,
        payload: T,
        timeout: Duration,
    ) -> Result<MessageId, PublishError<T>> {
        self.publish_inner(payload, Wait::timeout(timeout))
    }

    /// Enqueues `payload` only if a slot is free right now.
    pub fn try_publish(&self, payload: T) -> Result<MessageId, PublishError<T>> {
        self.publish_inner(payload, Wait::Never)
    }

    /// Like [`publish`](Self::publish), failing with `Cancelled` when
    /// `token` is cancelled before a slot frees up.
    pub fn publish_cancellable(
        &self,
        payload: T,
        token: &CancelToken,
    ) -> Result<MessageId, PublishError<T>>
    where
        T: 'static,
    {
        token.register(self.waker());
        self.publish_inner(payload, Wait::Cancellable(token))
    }

    fn publish_inner(&self, payload: T, wait: Wait<'_>) -> Result<MessageId, PublishError<T>> {
        let shared = &*self.inner;
        let mut state = shared.state.lock();

        loop {
            if wait.is_cancelled() {
                shared.note_cancelled(Role::Producer);
                return Err(PublishError::Cancelled(payload));
            }
            if state.closed {
                return Err(PublishError::Closed(payload));
            }
            if !state.ring.is_full() {
                break;
            }

            match shared.block_on(Role::Producer, &mut state, wait) {
                Ok(()) => {}
                Err(Interrupted::WouldBlock) => return Err(PublishError::Full(payload)),
                Err(Interrupted::TimedOut) => return Err(PublishError::Timeout(payload)),
            }
        }

        debug_assert_room!(state.ring.len(), shared.capacity.get());

        let id = state.ids.next_id();
        if state.ring.push(Message::new(id, payload)).is_err() {
            log::error!("ring refused message {id} after occupancy check");
            unreachable!("ring buffer full while holding the queue lock");
        }

        if let Some(m) = shared.metrics() {
            m.record_publish();
        }
        log::debug!(
            "message {} published by producer thread {} ({}/{})",
            id,
            thread_label(),
            state.ring.len(),
            shared.capacity
        );

        shared.not_empty.notify_all();
        Ok(id)
    }

    // ---------------------------------------------------------------------
    // CONSUME
    // ---------------------------------------------------------------------

    /// Dequeues the oldest message, sleeping while the queue is empty.
    ///
    /// After [`close`](Self::close), remaining messages are still handed
    /// out; `Closed` is returned once the queue is drained.
    pub fn consume(&self) -> Result<Message<T>, ConsumeError> {
        self.consume_inner(Wait::Forever)
    }

    /// Like [`consume`](Self::consume), giving up with `Timeout` once
    /// `timeout` has elapsed without a message.
    pub fn consume_timeout(&self, timeout: Duration) -> Result<Message<T>, ConsumeError> {
        self.consume_inner(Wait::timeout(timeout))
    }

    /// Dequeues the oldest message only if one is queued right now.
    pub fn try_consume(&self) -> Result<Message<T>, ConsumeError> {
        self.consume_inner(Wait::Never)
    }

    /// Like [`consume`](Self::consume), failing with `Cancelled` when
    /// `token` is cancelled before a message arrives.
    pub fn consume_cancellable(&self, token: &CancelToken) -> Result<Message<T>, ConsumeError>
    where
        T: 'static,
    {
        token.register(self.waker());
        self.consume_inner(Wait::Cancellable(token))
    }

    fn consume_inner(&self, wait: Wait<'_>) -> Result<Message<T>, ConsumeError> {
        let shared = &*self.inner;
        let mut state = shared.state.lock();

        loop {
            if wait.is_cancelled() {
                shared.note_cancelled(Role::Consumer);
                return Err(ConsumeError::Cancelled);
            }
            if !state.ring.is_empty() {
                break;
            }
            if state.closed {
                return Err(ConsumeError::Closed);
            }

            match shared.block_on(Role::Consumer, &mut state, wait) {
                Ok(()) => {}
                Err(Interrupted::WouldBlock) => return Err(ConsumeError::Empty),
                Err(Interrupted::TimedOut) => return Err(ConsumeError::Timeout),
            }
        }

        debug_assert_available!(state.ring.len());

        let Some(message) = state.ring.pop() else {
            log::error!("ring returned nothing after occupancy check");
            unreachable!("ring buffer empty while holding the queue lock");
        };

        if let Some(m) = shared.metrics() {
            m.record_consume();
        }
        log::debug!(
            "message {} consumed by consumer thread {} ({}/{})",
            message.id(),
            thread_label(),
            state.ring.len(),
            shared.capacity
        );

        shared.not_full.notify_all();
        Ok(message)
    }

    // ---------------------------------------------------------------------
    // SHUTDOWN
    // ---------------------------------------------------------------------

    /// Closes the queue and wakes every blocked thread.
    ///
    /// Publishers fail with `Closed` from now on. Consumers keep receiving
    /// queued messages until the queue is empty, then fail with `Closed`.
    /// Idempotent.
    pub fn close(&self) {
        let shared = &*self.inner;
        let mut state = shared.state.lock();
        if state.closed {
            return;
        }

        state.closed = true;
        log::debug!("queue closed with {} message(s) pending", state.ring.len());

        shared.not_full.notify_all();
        shared.not_empty.notify_all();
    }

    fn waker(&self) -> Weak<dyn Wake>
    where
        T: 'static,
    {
        let weak: Weak<Shared<T>> = Arc::downgrade(&self.inner);
        weak
    }
}

impl<T> BlockingQueue<T> {
    /// Returns the number of queued messages.
    pub fn size(&self) -> usize {
        self.inner.state.lock().ring.len()
    }

    /// Alias for [`size`](Self::size).
    pub fn len(&self) -> usize {
        self.size()
    }

    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    pub fn is_full(&self) -> bool {
        self.size() == self.capacity()
    }

    /// Returns the fixed capacity the queue was built with.
    pub fn capacity(&self) -> usize {
        self.inner.capacity.get()
    }

    /// Returns whether the queue is empty, partially filled or full.
    pub fn state(&self) -> QueueState {
        match self.size() {
            0 => QueueState::Empty,
            n if n == self.capacity() => QueueState::Full,
            _ => QueueState::Partial,
        }
    }

    /// Returns `true` once [`close`](Self::close) has been called.
    pub fn is_closed(&self) -> bool {
        self.inner.state.lock().closed
    }

    /// Returns a copy of the oldest message without dequeuing it.
    pub fn peek(&self) -> Option<Message<T>>
    where
        T: Clone,
    {
        self.inner.state.lock().ring.peek().cloned()
    }

    /// Returns a snapshot of the queue counters.
    ///
    /// All zero unless metrics were enabled in [`Config`].
    pub fn metrics(&self) -> MetricsSnapshot {
        self.inner
            .metrics()
            .map(Metrics::snapshot)
            .unwrap_or_default()
    }
}

fn thread_label() -> String {
    let current = thread::current();
    current
        .name()
        .map_or_else(|| format!("{:?}", current.id()), str::to_owned)
}

impl<T> Clone for BlockingQueue<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> fmt::Debug for BlockingQueue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("BlockingQueue")
            .field("capacity", &self.inner.capacity)
            .field("len", &state.ring.len())
            .field("closed", &state.closed)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[test]
    fn test_queue_rejects_zero_capacity() {
        assert!(matches!(
            BlockingQueue::<String>::new(0),
            Err(QueueError::ZeroCapacity)
        ));
    }

    #[test]
    fn test_publish_consume_single_thread() {
        let q = BlockingQueue::new(4).unwrap();
        let id = q.publish("hello").unwrap();

        assert_eq!(q.size(), 1);
        let msg = q.consume().unwrap();
        assert_eq!(msg.id(), id);
        assert_eq!(*msg.payload(), "hello");
        assert!(q.is_empty());
    }

    #[test]
    fn test_state_transitions() {
        let q = BlockingQueue::new(2).unwrap();
        assert_eq!(q.state(), QueueState::Empty);

        q.publish(1).unwrap();
        assert_eq!(q.state(), QueueState::Partial);

        q.publish(2).unwrap();
        assert_eq!(q.state(), QueueState::Full);

        q.consume().unwrap();
        assert_eq!(q.state(), QueueState::Partial);

        q.consume().unwrap();
        assert_eq!(q.state(), QueueState::Empty);
    }

    #[test]
    fn test_try_variants() {
        let q = BlockingQueue::new(1).unwrap();
        assert_eq!(q.try_consume().unwrap_err(), ConsumeError::Empty);

        q.try_publish('a').unwrap();
        let err = q.try_publish('b').unwrap_err();
        assert!(matches!(err, PublishError::Full('b')));

        assert_eq!(q.try_consume().unwrap().into_payload(), 'a');
    }

    #[test]
    fn test_timeouts() {
        let q = BlockingQueue::new(1).unwrap();
        assert_eq!(
            q.consume_timeout(Duration::from_millis(20)).unwrap_err(),
            ConsumeError::Timeout
        );

        q.publish(1u8).unwrap();
        let err = q.publish_timeout(2, Duration::from_millis(20)).unwrap_err();
        assert_eq!(err.into_inner(), 2);
        assert_eq!(q.size(), 1);
    }

    #[test]
    fn test_sequential_ids_by_default() {
        let q = BlockingQueue::new(3).unwrap();
        let ids: Vec<u64> = (0..3).map(|i| q.publish(i).unwrap().get()).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn test_injected_id_generator() {
        let mut next = 1000;
        let q = BlockingQueue::with_id_generator(Config::new(2, false), move || {
            next -= 1;
            MessageId::new(next)
        })
        .unwrap();

        assert_eq!(q.publish("a").unwrap().get(), 999);
        assert_eq!(q.publish("b").unwrap().get(), 998);
        assert_eq!(q.consume().unwrap().id().get(), 999);
    }

    #[test]
    fn test_peek_does_not_dequeue() {
        let q = BlockingQueue::new(2).unwrap();
        assert!(q.peek().is_none());

        q.publish(String::from("first")).unwrap();
        q.publish(String::from("second")).unwrap();

        assert_eq!(q.peek().unwrap().payload(), "first");
        assert_eq!(q.size(), 2);
    }

    #[test]
    fn test_close_drains_then_fails() {
        let q = BlockingQueue::new(3).unwrap();
        q.publish(1).unwrap();
        q.publish(2).unwrap();
        q.close();
        q.close();

        assert!(q.is_closed());
        assert!(matches!(q.publish(3), Err(PublishError::Closed(3))));
        assert_eq!(q.consume().unwrap().into_payload(), 1);
        assert_eq!(q.consume().unwrap().into_payload(), 2);
        assert_eq!(q.consume().unwrap_err(), ConsumeError::Closed);
    }

    #[test]
    fn test_close_wakes_blocked_consumer() {
        let q = BlockingQueue::<u32>::new(1).unwrap();
        let q2 = q.clone();
        let handle = thread::spawn(move || q2.consume());

        thread::sleep(Duration::from_millis(50));
        q.close();

        assert_eq!(handle.join().unwrap().unwrap_err(), ConsumeError::Closed);
    }

    #[test]
    fn test_pre_cancelled_token_fails_fast() {
        let q = BlockingQueue::new(2).unwrap();
        let token = CancelToken::new();
        token.cancel();

        let err = q.publish_cancellable("x", &token).unwrap_err();
        assert!(matches!(err, PublishError::Cancelled("x")));
        assert!(q.is_empty());

        q.publish("y").unwrap();
        assert_eq!(q.consume_cancellable(&token).unwrap_err(), ConsumeError::Cancelled);
        assert_eq!(q.size(), 1);
    }

    #[test]
    fn test_cancel_wakes_blocked_producer() {
        let q = BlockingQueue::new(1).unwrap();
        q.publish(0).unwrap();

        let token = CancelToken::new();
        let started = Arc::new(AtomicBool::new(false));
        let handle = {
            let q = q.clone();
            let token = token.clone();
            let started = Arc::clone(&started);
            thread::spawn(move || {
                started.store(true, Ordering::SeqCst);
                q.publish_cancellable(1, &token)
            })
        };

        while !started.load(Ordering::SeqCst) {
            thread::yield_now();
        }
        thread::sleep(Duration::from_millis(50));
        token.cancel();

        let err = handle.join().unwrap().unwrap_err();
        assert_eq!(err.into_inner(), 1);
        // Lock released on the cancellation path
        assert_eq!(q.consume().unwrap().into_payload(), 0);
    }

    #[test]
    fn test_metrics_disabled_by_default() {
        let q = BlockingQueue::new(1).unwrap();
        q.publish(1).unwrap();
        assert_eq!(q.metrics(), MetricsSnapshot::default());
    }

    #[test]
    fn test_metrics_enabled() {
        let q = BlockingQueue::with_config(Config::new(1, true)).unwrap();
        q.publish(1).unwrap();
        let _ = q.try_publish(2);
        let _ = q.publish_timeout(3, Duration::from_millis(5));
        q.consume().unwrap();

        let snap = q.metrics();
        assert_eq!(snap.published, 1);
        assert_eq!(snap.consumed, 1);
        assert_eq!(snap.timeouts, 1);
        assert!(snap.publish_waits >= 1);
    }

    #[test]
    fn test_queue_is_send_sync() {
        fn assert_send_sync<S: Send + Sync>() {}
        assert_send_sync::<BlockingQueue<String>>();
    }
}

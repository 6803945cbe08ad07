use crate::invariants::{debug_assert_bounded_count, debug_assert_sentinel};
use std::fmt;
use std::num::NonZeroUsize;
use thiserror::Error;

// =============================================================================
// INDEXING STRATEGY
// =============================================================================
//
// `head` points at the oldest occupied slot and `tail` at the most recently
// written one. Both are `None` while the buffer is empty, so an empty buffer
// has exactly one representation.
//
// - push into empty: head = tail = 0
// - push otherwise:  tail = (tail + 1) % capacity
// - pop last item:   head = tail = None
// - pop otherwise:   head = (head + 1) % capacity
//
// Re-anchoring at slot 0 on every empty→non-empty transition keeps the
// indices from drifting around the ring across fill/drain cycles.
//
// The buffer is NOT thread-safe. `BlockingQueue` is the only owner and only
// touches it while holding its lock.
//
// =============================================================================

/// Returned by [`RingBuffer::push`] when every slot is occupied.
///
/// Carries the rejected item back to the caller.
#[derive(Clone, Copy, PartialEq, Eq, Error)]
#[error("ring buffer is full")]
pub struct Full<T>(pub T);

impl<T> Full<T> {
    /// Returns the item that could not be stored.
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> fmt::Debug for Full<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Full(..)")
    }
}

/// Fixed-capacity circular buffer.
///
/// O(1) insertion at the tail and removal at the head with no element
/// shifting. Overflow and underflow are reported to the caller, never
/// blocked on: `push` hands the item back in [`Full`], `pop`/`peek`
/// return `None`.
pub struct RingBuffer<T> {
    /// Fixed-size slot storage. `Some` exactly for occupied slots.
    slots: Box<[Option<T>]>,
    head: Option<usize>,
    tail: Option<usize>,
    count: usize,
}

impl<T> RingBuffer<T> {
    /// Creates an empty buffer with `capacity` slots.
    pub fn new(capacity: NonZeroUsize) -> Self {
        let mut slots = Vec::with_capacity(capacity.get());
        slots.resize_with(capacity.get(), || None);

        Self {
            slots: slots.into_boxed_slice(),
            head: None,
            tail: None,
            count: 0,
        }
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Returns the number of occupied slots.
    #[inline]
    pub fn len(&self) -> usize {
        self.count
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.count == self.capacity()
    }

    /// Stores `item` after the current tail.
    ///
    /// Refuses without touching any index when the buffer is full.
    pub fn push(&mut self, item: T) -> Result<(), Full<T>> {
        if self.is_full() {
            return Err(Full(item));
        }

        let tail = match self.tail {
            Some(tail) => (tail + 1) % self.capacity(),
            None => {
                self.head = Some(0);
                0
            }
        };

        debug_assert!(self.slots[tail].is_none(), "overwriting occupied slot {tail}");
        self.slots[tail] = Some(item);
        self.tail = Some(tail);
        self.count += 1;

        debug_assert_bounded_count!(self.count, self.capacity());
        debug_assert_sentinel!(self.count, self.head, self.tail);
        Ok(())
    }

    /// Removes and returns the oldest item, or `None` when empty.
    pub fn pop(&mut self) -> Option<T> {
        let head = self.head?;
        let item = self.slots[head].take();
        debug_assert!(item.is_some(), "head slot {head} was vacant");

        self.count -= 1;
        if self.count == 0 {
            self.head = None;
            self.tail = None;
        } else {
            self.head = Some((head + 1) % self.capacity());
        }

        debug_assert_sentinel!(self.count, self.head, self.tail);
        item
    }

    /// Returns the oldest item without removing it.
    pub fn peek(&self) -> Option<&T> {
        self.head.and_then(|head| self.slots[head].as_ref())
    }

    /// Returns the most recently pushed item without removing it.
    pub fn peek_back(&self) -> Option<&T> {
        self.tail.and_then(|tail| self.slots[tail].as_ref())
    }

    /// Pops every remaining item, oldest first.
    pub fn drain(&mut self) -> Drain<'_, T> {
        Drain { ring: self }
    }
}

impl<T> fmt::Debug for RingBuffer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RingBuffer")
            .field("capacity", &self.capacity())
            .field("count", &self.count)
            .field("head", &self.head)
            .field("tail", &self.tail)
            .finish_non_exhaustive()
    }
}

/// Iterator returned by [`RingBuffer::drain`].
pub struct Drain<'a, T> {
    ring: &'a mut RingBuffer<T>,
}

impl<T> Iterator for Drain<'_, T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        self.ring.pop()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.ring.len(), Some(self.ring.len()))
    }
}

impl<T> ExactSizeIterator for Drain<'_, T> {}

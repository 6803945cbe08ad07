//! Property-based tests for the ring buffer and queue invariants.
//!
//! Each test drives a random operation sequence against both the real
//! structure and a `VecDeque` reference model, checking that they agree.

use bucketq::{BlockingQueue, ConsumeError, PublishError, QueueState, RingBuffer};
use proptest::prelude::*;
use std::collections::VecDeque;
use std::num::NonZeroUsize;

#[derive(Debug, Clone)]
enum Op {
    Push(u32),
    Pop,
    Peek,
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        any::<u32>().prop_map(Op::Push),
        Just(Op::Pop),
        Just(Op::Peek),
    ]
}

// =============================================================================
// INV-RB-01: Bounded Count
// "0 ≤ count ≤ capacity"
// =============================================================================

proptest! {
    /// The ring never holds more than its capacity and agrees with the model.
    #[test]
    fn prop_ring_matches_model(
        capacity in 1usize..16,
        ops in prop::collection::vec(op(), 0..200),
    ) {
        let mut ring = RingBuffer::new(NonZeroUsize::new(capacity).unwrap());
        let mut model = VecDeque::new();

        for op in ops {
            match op {
                Op::Push(v) => {
                    let accepted = ring.push(v).is_ok();
                    prop_assert_eq!(accepted, model.len() < capacity);
                    if accepted {
                        model.push_back(v);
                    }
                }
                Op::Pop => prop_assert_eq!(ring.pop(), model.pop_front()),
                Op::Peek => {
                    prop_assert_eq!(ring.peek(), model.front());
                    prop_assert_eq!(ring.peek_back(), model.back());
                }
            }

            prop_assert!(ring.len() <= capacity,
                "INV-RB-01 violated: len {} > capacity {}", ring.len(), capacity);
            prop_assert_eq!(ring.len(), model.len());
        }
    }
}

// =============================================================================
// INV-RB-02: Refusals Leave State Untouched
// =============================================================================

proptest! {
    /// A refused push or an empty pop changes nothing observable.
    #[test]
    fn prop_refusals_do_not_corrupt(
        capacity in 1usize..8,
        extra in 1usize..8,
    ) {
        let mut ring = RingBuffer::new(NonZeroUsize::new(capacity).unwrap());
        for i in 0..capacity {
            ring.push(i).unwrap();
        }
        for i in 0..extra {
            prop_assert_eq!(ring.push(1000 + i).unwrap_err().into_inner(), 1000 + i);
        }
        prop_assert_eq!(ring.len(), capacity);

        let drained: Vec<_> = ring.drain().collect();
        prop_assert_eq!(drained, (0..capacity).collect::<Vec<_>>());

        for _ in 0..extra {
            prop_assert_eq!(ring.pop(), None);
        }
        ring.push(42).unwrap();
        prop_assert_eq!(ring.peek(), Some(&42));
    }
}

// =============================================================================
// INV-Q: Queue State Machine
// =============================================================================

proptest! {
    /// Non-blocking queue operations follow the same model as the ring and
    /// report the right occupancy state after every step.
    #[test]
    fn prop_queue_matches_model(
        capacity in 1usize..8,
        ops in prop::collection::vec(prop::bool::ANY, 0..100),
    ) {
        let queue = BlockingQueue::new(capacity).unwrap();
        let mut model = VecDeque::new();
        let mut next = 0u32;

        for publish in ops {
            if publish {
                match queue.try_publish(next) {
                    Ok(_) => model.push_back(next),
                    Err(PublishError::Full(v)) => {
                        prop_assert_eq!(v, next);
                        prop_assert_eq!(model.len(), capacity);
                    }
                    Err(e) => prop_assert!(false, "unexpected publish error {e:?}"),
                }
                next += 1;
            } else {
                match queue.try_consume() {
                    Ok(msg) => prop_assert_eq!(Some(msg.into_payload()), model.pop_front()),
                    Err(ConsumeError::Empty) => prop_assert!(model.is_empty()),
                    Err(e) => prop_assert!(false, "unexpected consume error {e:?}"),
                }
            }

            let expected = match model.len() {
                0 => QueueState::Empty,
                n if n == capacity => QueueState::Full,
                _ => QueueState::Partial,
            };
            prop_assert_eq!(queue.state(), expected);
            prop_assert_eq!(queue.size(), model.len());
        }
    }
}

//! Message identifier sources.
//!
//! The queue owns exactly one generator and calls it while holding its lock,
//! so implementations need `&mut self` but no internal synchronization.

use crate::MessageId;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Source of identifiers stamped onto published messages.
///
/// Any `FnMut() -> MessageId` closure is a generator, which lets tests
/// inject a fully deterministic sequence.
pub trait IdGenerator: Send {
    fn next_id(&mut self) -> MessageId;
}

impl<F> IdGenerator for F
where
    F: FnMut() -> MessageId + Send,
{
    fn next_id(&mut self) -> MessageId {
        self()
    }
}

/// Monotonically increasing identifiers. The default generator.
///
/// Unique until the `u64` space is exhausted.
#[derive(Debug, Clone)]
pub struct SequentialIds {
    next: u64,
}

impl SequentialIds {
    /// Starts counting at `first`.
    pub const fn starting_at(first: u64) -> Self {
        Self { next: first }
    }
}

impl Default for SequentialIds {
    fn default() -> Self {
        Self::starting_at(1)
    }
}

impl IdGenerator for SequentialIds {
    fn next_id(&mut self) -> MessageId {
        let id = MessageId::new(self.next);
        self.next = self.next.wrapping_add(1);
        id
    }
}

/// Random identifiers drawn uniformly from `0..bound`.
///
/// No uniqueness check is made: with a small bound, collisions are
/// expected under sustained traffic. Only suitable for log correlation.
#[derive(Debug, Clone)]
pub struct RandomIds {
    rng: StdRng,
    bound: u64,
}

impl RandomIds {
    /// Bound used by [`RandomIds::default`].
    pub const DEFAULT_BOUND: u64 = 1000;

    /// Seeds from OS entropy.
    pub fn new(bound: u64) -> Self {
        Self {
            rng: StdRng::from_entropy(),
            bound: bound.max(1),
        }
    }

    /// Deterministic sequence for tests and reproducible runs.
    pub fn seeded(bound: u64, seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            bound: bound.max(1),
        }
    }
}

impl Default for RandomIds {
    fn default() -> Self {
        Self::new(Self::DEFAULT_BOUND)
    }
}

impl IdGenerator for RandomIds {
    fn next_id(&mut self) -> MessageId {
        MessageId::new(self.rng.gen_range(0..self.bound))
    }
}

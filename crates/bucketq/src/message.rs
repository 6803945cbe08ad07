use std::fmt;

/// Identifier attached to a message at publish time.
///
/// Used for log correlation. Whether ids are unique depends on the
/// [`IdGenerator`](crate::IdGenerator) the queue was built with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MessageId(u64);

impl MessageId {
    #[inline]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    #[inline]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl From<u64> for MessageId {
    fn from(raw: u64) -> Self {
        Self(raw)
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An immutable payload + identifier pair, as stored in the queue.
///
/// Built by the queue inside `publish`; the consumer that receives it
/// from `consume` owns it outright.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message<T> {
    id: MessageId,
    payload: T,
}

impl<T> Message<T> {
    pub(crate) fn new(id: MessageId, payload: T) -> Self {
        Self { id, payload }
    }

    #[inline]
    pub fn id(&self) -> MessageId {
        self.id
    }

    #[inline]
    pub fn payload(&self) -> &T {
        &self.payload
    }

    /// Consumes the message, returning the payload.
    pub fn into_payload(self) -> T {
        self.payload
    }

    /// Consumes the message, returning `(id, payload)`.
    pub fn into_parts(self) -> (MessageId, T) {
        (self.id, self.payload)
    }
}

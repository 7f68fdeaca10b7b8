use std::fmt;

/// A unique value created per mutation of a document.
/// Is not guaranteed to be unique across documents
/// Can be used in a compare and swap loop to safely mutate a document concurrently
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Cas(u64);

impl Cas {
    /// Returned to readers of a locked document. Never matches a stored cas.
    pub const LOCKED: Cas = Cas(u64::MAX);

    /// Only stores mint cas values; clients get them from results.
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub fn raw(&self) -> u64 {
        self.0
    }

    /// A zero cas means "no cas supplied"
    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for Cas {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

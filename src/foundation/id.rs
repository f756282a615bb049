//! Process-wide unique id allocation
//!
//! Small-integer identifiers handed out from an atomic counter, used to tag
//! each constructed surface engine. Ids start at 1 and wrap around at a
//! fixed limit; exactly one allocation draws the limit value and performs
//! the reset, so the counter never sticks.

use std::sync::atomic::{AtomicU32, Ordering};

/// Largest id handed out before the counter wraps back to 1.
pub const MAX_ID: u32 = 999_999_999;

/// A process-unique small-integer identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UniqueId(u32);

impl UniqueId {
    /// The raw integer value of this id (always >= 1).
    pub fn value(&self) -> u32 {
        self.0
    }
}

impl std::fmt::Display for UniqueId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Thread-safe allocator of [`UniqueId`]s with guarded wraparound.
#[derive(Debug)]
pub struct IdAllocator {
    next: AtomicU32,
    limit: u32,
}

impl IdAllocator {
    /// Creates an allocator whose ids wrap at [`MAX_ID`]. `const` so it can
    /// back a `static`.
    pub const fn new() -> Self {
        Self::with_limit(MAX_ID)
    }

    /// Creates an allocator with a custom wraparound limit (>= 1).
    pub const fn with_limit(limit: u32) -> Self {
        IdAllocator {
            next: AtomicU32::new(1),
            limit,
        }
    }

    /// Allocates the next id. Other threads may be handed a few ids above
    /// the limit before the reset store lands, but only the one caller that
    /// draws exactly the limit value executes the reset.
    pub fn allocate(&self) -> UniqueId {
        let id = self.next.fetch_add(1, Ordering::Relaxed);
        if id == self.limit {
            self.next.store(1, Ordering::Relaxed);
        }
        UniqueId(id)
    }
}

impl Default for IdAllocator {
    fn default() -> Self {
        IdAllocator::new()
    }
}

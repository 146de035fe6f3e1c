//! Round-robin load balancing strategy.

use std::sync::atomic::{AtomicU64, Ordering};

/// Round-robin selector.
/// Stores an internal counter to rotate through servers.
///
/// The counter is incremented before use, so a fresh selector starts at
/// index `1 % len`. Existing deployments rely on this start position.
#[derive(Debug, Default)]
pub struct RoundRobin {
    counter: AtomicU64,
}

impl RoundRobin {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pick the next index in `[0, len)`. `len` must be non-zero.
    pub fn next_index(&self, len: usize) -> usize {
        let count = self.counter.fetch_add(1, Ordering::Relaxed).wrapping_add(1);
        (count % len as u64) as usize
    }
}

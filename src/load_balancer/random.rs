//! Random load balancing strategy.

use std::cell::RefCell;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Distinguishes threads that read the clock in the same nanosecond.
static THREAD_SEQ: AtomicU64 = AtomicU64::new(0);

thread_local! {
    /// Per-thread generator, seeded once from the wall clock on first use.
    static RNG: RefCell<fastrand::Rng> = RefCell::new(fastrand::Rng::with_seed(seed()));
}

fn seed() -> u64 {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or_default();
    let seq = THREAD_SEQ.fetch_add(1, Ordering::Relaxed);
    nanos ^ seq.wrapping_mul(0x9e37_79b9_7f4a_7c15)
}

/// Pick a uniformly random index in `[0, len)`. `len` must be non-zero.
pub fn next_index(len: usize) -> usize {
    RNG.with(|rng| rng.borrow_mut().usize(..len))
}

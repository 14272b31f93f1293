use std::sync::atomic::{AtomicU64, Ordering};

use crossbeam_utils::CachePadded;

/// Atomic counters every ring exposes, consumed by `tracing` at shutdown
/// and folded into the registries' metrics snapshot.
#[derive(Debug, Default)]
pub struct RingStats {
    pushed: CachePadded<AtomicU64>,
    popped: CachePadded<AtomicU64>,
    dropped: CachePadded<AtomicU64>,
}

impl RingStats {
    pub fn record_push(&self) {
        self.pushed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_pop(&self) {
        self.popped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_drop(&self) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn pushed(&self) -> u64 {
        self.pushed.load(Ordering::Relaxed)
    }

    pub fn popped(&self) -> u64 {
        self.popped.load(Ordering::Relaxed)
    }

    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

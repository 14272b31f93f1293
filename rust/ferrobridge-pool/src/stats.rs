use std::sync::atomic::{AtomicU64, Ordering};

use crossbeam_utils::CachePadded;

/// Mirrors the original `PoolStats`: allocations/deallocations/hits/misses
/// plus a high-water mark of concurrently outstanding buffers.
#[derive(Debug, Default)]
pub struct PoolStats {
    allocations: CachePadded<AtomicU64>,
    deallocations: CachePadded<AtomicU64>,
    pool_hits: CachePadded<AtomicU64>,
    pool_misses: CachePadded<AtomicU64>,
    in_use: CachePadded<AtomicU64>,
    high_water_mark: CachePadded<AtomicU64>,
}

impl PoolStats {
    pub fn record_hit(&self) {
        self.allocations.fetch_add(1, Ordering::Relaxed);
        self.pool_hits.fetch_add(1, Ordering::Relaxed);
        self.bump_in_use();
    }

    pub fn record_miss(&self) {
        self.allocations.fetch_add(1, Ordering::Relaxed);
        self.pool_misses.fetch_add(1, Ordering::Relaxed);
        self.bump_in_use();
    }

    fn bump_in_use(&self) {
        let now = self.in_use.fetch_add(1, Ordering::Relaxed) + 1;
        self.high_water_mark.fetch_max(now, Ordering::Relaxed);
    }

    pub fn record_deallocation(&self) {
        self.deallocations.fetch_add(1, Ordering::Relaxed);
        self.in_use.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn allocations(&self) -> u64 {
        self.allocations.load(Ordering::Relaxed)
    }
    pub fn deallocations(&self) -> u64 {
        self.deallocations.load(Ordering::Relaxed)
    }
    pub fn pool_hits(&self) -> u64 {
        self.pool_hits.load(Ordering::Relaxed)
    }
    pub fn pool_misses(&self) -> u64 {
        self.pool_misses.load(Ordering::Relaxed)
    }
    pub fn in_use(&self) -> u64 {
        self.in_use.load(Ordering::Relaxed)
    }
    pub fn high_water_mark(&self) -> u64 {
        self.high_water_mark.load(Ordering::Relaxed)
    }

    pub fn hit_rate(&self) -> f64 {
        let total = self.allocations();
        if total == 0 {
            return 0.0;
        }
        self.pool_hits() as f64 / total as f64
    }

    pub fn reset(&self) {
        self.allocations.store(0, Ordering::Relaxed);
        self.deallocations.store(0, Ordering::Relaxed);
        self.pool_hits.store(0, Ordering::Relaxed);
        self.pool_misses.store(0, Ordering::Relaxed);
        self.high_water_mark.store(0, Ordering::Relaxed);
    }
}

//! Tiered memory pool for short-lived hot-path allocations (envelope
//! payloads, pattern-match scratch buffers). Three size classes recycle
//! buffers through a lock-free free list; anything larger falls back to
//! the system allocator untracked by any tier.

mod stats;

use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use crossbeam_queue::SegQueue;
use parking_lot::Mutex;

pub use stats::PoolStats;

/// Upper bound, in bytes, of each size class. A request larger than the
/// last class bypasses the pool entirely.
pub const TIER_SIZES: [usize; 3] = [64, 256, 1024];

/// Number of blocks a tier grows by when its free list is observed empty.
const GROWTH_CHUNK: usize = 32;

struct Tier {
    block_size: usize,
    free: SegQueue<Vec<u8>>,
    growth_lock: Mutex<()>,
    stats: PoolStats,
}

impl Tier {
    fn new(block_size: usize) -> Self {
        Self {
            block_size,
            free: SegQueue::new(),
            growth_lock: Mutex::new(()),
            stats: PoolStats::default(),
        }
    }

    fn acquire(&self) -> Vec<u8> {
        if let Some(buf) = self.free.pop() {
            self.stats.record_hit();
            return buf;
        }
        // Slow path: grow the tier under a mutex so a thundering herd of
        // misses doesn't all allocate independently. A second check after
        // taking the lock catches the case where another thread already
        // refilled the free list while we waited.
        let _guard = self.growth_lock.lock();
        if let Some(buf) = self.free.pop() {
            self.stats.record_hit();
            return buf;
        }
        self.stats.record_miss();
        for _ in 1..GROWTH_CHUNK {
            self.free.push(Vec::with_capacity(self.block_size));
        }
        Vec::with_capacity(self.block_size)
    }

    fn release(&self, mut buf: Vec<u8>) {
        buf.clear();
        self.stats.record_deallocation();
        self.free.push(buf);
    }
}

struct Inner {
    tiers: [Tier; 3],
}

/// Tiered pool handle. Cheap to clone (`Arc` internally); share one
/// instance across the threads that allocate hot-path scratch buffers.
#[derive(Clone)]
pub struct MemoryPool(Arc<Inner>);

impl MemoryPool {
    pub fn new() -> Self {
        Self(Arc::new(Inner {
            tiers: TIER_SIZES.map(Tier::new),
        }))
    }

    /// Preallocates `count` blocks in each tier.
    pub fn reserve(&self, count: usize) {
        for tier in &self.0.tiers {
            let _guard = tier.growth_lock.lock();
            for _ in 0..count {
                tier.free.push(Vec::with_capacity(tier.block_size));
            }
        }
    }

    pub fn allocate(&self, size: usize) -> PooledBuffer {
        let tier_idx = TIER_SIZES.iter().position(|&cap| size <= cap);
        match tier_idx {
            Some(idx) => {
                let mut buf = self.0.tiers[idx].acquire();
                buf.resize(size, 0);
                PooledBuffer {
                    data: buf,
                    tier: Some(idx),
                    pool: self.0.clone(),
                }
            }
            None => PooledBuffer {
                data: vec![0u8; size],
                tier: None,
                pool: self.0.clone(),
            },
        }
    }

    pub fn stats(&self, tier: usize) -> Option<&PoolStats> {
        self.0.tiers.get(tier).map(|t| &t.stats)
    }

    pub fn tier_for_size(size: usize) -> Option<usize> {
        TIER_SIZES.iter().position(|&cap| size <= cap)
    }
}

impl Default for MemoryPool {
    fn default() -> Self {
        Self::new()
    }
}

/// A pool-backed byte buffer. Returns to its tier's free list on drop; a
/// buffer that was allocated above the largest tier (`tier == None`) is
/// simply freed normally.
pub struct PooledBuffer {
    data: Vec<u8>,
    tier: Option<usize>,
    pool: Arc<Inner>,
}

impl Deref for PooledBuffer {
    type Target = [u8];
    fn deref(&self) -> &[u8] {
        &self.data
    }
}

impl DerefMut for PooledBuffer {
    fn deref_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }
}

impl Drop for PooledBuffer {
    fn drop(&mut self) {
        if let Some(idx) = self.tier {
            let buf = std::mem::take(&mut self.data);
            self.pool.tiers[idx].release(buf);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocates_from_smallest_fitting_tier() {
        let pool = MemoryPool::new();
        assert_eq!(MemoryPool::tier_for_size(10), Some(0));
        assert_eq!(MemoryPool::tier_for_size(200), Some(1));
        assert_eq!(MemoryPool::tier_for_size(1000), Some(2));
        assert_eq!(MemoryPool::tier_for_size(2000), None);

        let buf = pool.allocate(10);
        assert_eq!(buf.len(), 10);
    }

    #[test]
    fn reused_buffer_counts_as_a_hit() {
        let pool = MemoryPool::new();
        {
            let _buf = pool.allocate(32);
        } // dropped, returned to tier 0's free list
        let _buf2 = pool.allocate(32);
        let stats = pool.stats(0).unwrap();
        assert!(stats.pool_hits() >= 1);
    }

    #[test]
    fn oversized_request_bypasses_pool() {
        let pool = MemoryPool::new();
        let buf = pool.allocate(4096);
        assert_eq!(buf.len(), 4096);
        // None of the tracked tiers record this allocation.
        for i in 0..3 {
            assert_eq!(pool.stats(i).unwrap().allocations(), 0);
        }
    }

    #[test]
    fn high_water_mark_tracks_peak_concurrent_use() {
        let pool = MemoryPool::new();
        let a = pool.allocate(10);
        let b = pool.allocate(10);
        let stats = pool.stats(0).unwrap();
        assert!(stats.high_water_mark() >= 2);
        drop(a);
        drop(b);
    }
}

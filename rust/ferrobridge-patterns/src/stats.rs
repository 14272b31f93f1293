use std::sync::atomic::{AtomicU64, Ordering};

use crossbeam_utils::CachePadded;

/// Mirrors `PatternCacheStats` from the original header.
#[derive(Debug, Default)]
pub struct PatternCacheStats {
    cache_hits: CachePadded<AtomicU64>,
    cache_misses: CachePadded<AtomicU64>,
    compilations: CachePadded<AtomicU64>,
    compilation_failures: CachePadded<AtomicU64>,
    validation_rejections: CachePadded<AtomicU64>,
    timeout_rejections: CachePadded<AtomicU64>,
    evictions: CachePadded<AtomicU64>,
    total_compilation_time_ns: CachePadded<AtomicU64>,
}

impl PatternCacheStats {
    pub fn record_hit(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }
    pub fn record_miss(&self) {
        self.cache_misses.fetch_add(1, Ordering::Relaxed);
    }
    pub fn record_compilation(&self, duration_ns: u64) {
        self.compilations.fetch_add(1, Ordering::Relaxed);
        self.total_compilation_time_ns
            .fetch_add(duration_ns, Ordering::Relaxed);
    }
    pub fn record_compilation_failure(&self) {
        self.compilation_failures.fetch_add(1, Ordering::Relaxed);
    }
    pub fn record_validation_rejection(&self) {
        self.validation_rejections.fetch_add(1, Ordering::Relaxed);
    }
    pub fn record_timeout_rejection(&self) {
        self.timeout_rejections.fetch_add(1, Ordering::Relaxed);
    }
    pub fn record_eviction(&self) {
        self.evictions.fetch_add(1, Ordering::Relaxed);
    }

    pub fn cache_hits(&self) -> u64 {
        self.cache_hits.load(Ordering::Relaxed)
    }
    pub fn cache_misses(&self) -> u64 {
        self.cache_misses.load(Ordering::Relaxed)
    }
    pub fn compilations(&self) -> u64 {
        self.compilations.load(Ordering::Relaxed)
    }
    pub fn compilation_failures(&self) -> u64 {
        self.compilation_failures.load(Ordering::Relaxed)
    }
    pub fn validation_rejections(&self) -> u64 {
        self.validation_rejections.load(Ordering::Relaxed)
    }
    pub fn timeout_rejections(&self) -> u64 {
        self.timeout_rejections.load(Ordering::Relaxed)
    }
    pub fn evictions(&self) -> u64 {
        self.evictions.load(Ordering::Relaxed)
    }

    pub fn hit_rate(&self) -> f64 {
        let hits = self.cache_hits();
        let total = hits + self.cache_misses();
        if total == 0 {
            return 0.0;
        }
        hits as f64 / total as f64
    }

    pub fn avg_compilation_time_us(&self) -> f64 {
        let n = self.compilations();
        if n == 0 {
            return 0.0;
        }
        (self.total_compilation_time_ns.load(Ordering::Relaxed) as f64 / n as f64) / 1000.0
    }
}

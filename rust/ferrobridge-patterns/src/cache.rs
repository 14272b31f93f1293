use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use ferrobridge_types::{BridgeError, BridgeResult};
use lru::LruCache;
use parking_lot::RwLock;

use crate::compiled::CompiledPattern;
use crate::stats::PatternCacheStats;
use crate::validator::{PatternValidator, ValidatorConfig};

#[derive(Debug, Clone, Copy)]
pub struct PatternCacheConfig {
    pub max_size: usize,
    pub max_pattern_length: usize,
    pub compilation_timeout: Duration,
    pub enable_validation: bool,
    pub max_complexity: u32,
}

impl Default for PatternCacheConfig {
    fn default() -> Self {
        Self {
            max_size: 10_000,
            max_pattern_length: 1024,
            compilation_timeout: Duration::from_millis(100),
            enable_validation: true,
            max_complexity: 50,
        }
    }
}

pub struct CachedPattern {
    pub pattern_string: String,
    pub compiled: CompiledPattern,
    pub compiled_at: Instant,
    pub compilation_time: Duration,
    pub complexity_score: u32,
    use_count: AtomicU64,
}

impl CachedPattern {
    pub fn matches(&self, input: &str) -> bool {
        self.use_count.fetch_add(1, Ordering::Relaxed);
        self.compiled.matches(input)
    }

    pub fn use_count(&self) -> u64 {
        self.use_count.load(Ordering::Relaxed)
    }
}

/// Thread-safe LRU cache of compiled patterns. Validation (textual,
/// pre-compile) happens unconditionally before a miss is ever handed to
/// the `regex` engine; a pattern the validator rejects never occupies a
/// cache slot.
pub struct PatternCache {
    config: PatternCacheConfig,
    entries: RwLock<LruCache<String, Arc<CachedPattern>>>,
    stats: PatternCacheStats,
}

impl PatternCache {
    pub fn new(config: PatternCacheConfig) -> Self {
        let cap = NonZeroUsize::new(config.max_size.max(1)).unwrap();
        Self {
            config,
            entries: RwLock::new(LruCache::new(cap)),
            stats: PatternCacheStats::default(),
        }
    }

    pub fn stats(&self) -> &PatternCacheStats {
        &self.stats
    }

    /// Cache-only lookup; does not compile on miss.
    pub fn get(&self, pattern: &str) -> Option<Arc<CachedPattern>> {
        let mut entries = self.entries.write();
        let hit = entries.get(pattern).cloned();
        if hit.is_some() {
            self.stats.record_hit();
        }
        hit
    }

    pub fn get_or_compile(&self, pattern: &str) -> BridgeResult<Arc<CachedPattern>> {
        if let Some(hit) = self.get(pattern) {
            return Ok(hit);
        }
        self.stats.record_miss();
        self.compile_and_insert(pattern)
    }

    pub fn precompile(&self, pattern: &str) -> BridgeResult<()> {
        self.compile_and_insert(pattern).map(|_| ())
    }

    pub fn remove(&self, pattern: &str) {
        self.entries.write().pop(pattern);
    }

    pub fn clear(&self) {
        self.entries.write().clear();
    }

    fn compile_and_insert(&self, pattern: &str) -> BridgeResult<Arc<CachedPattern>> {
        let validator_cfg = ValidatorConfig {
            max_pattern_length: self.config.max_pattern_length,
            max_complexity: self.config.max_complexity,
        };
        let validation = PatternValidator::validate(pattern, &validator_cfg);
        if self.config.enable_validation && !validation.is_safe {
            self.stats.record_validation_rejection();
            return Err(BridgeError::PatternUnsafe(
                validation.reason.unwrap_or_else(|| "pattern rejected".to_string()),
            ));
        }

        let start = Instant::now();
        let compiled = CompiledPattern::compile(pattern).map_err(|e| {
            self.stats.record_compilation_failure();
            BridgeError::InvalidArgument(format!("pattern compilation failed: {e}"))
        })?;
        let elapsed = start.elapsed();
        if elapsed > self.config.compilation_timeout {
            self.stats.record_timeout_rejection();
            return Err(BridgeError::PatternCompileTimeout(format!(
                "compiling {pattern:?} took {elapsed:?}, exceeding {:?}",
                self.config.compilation_timeout
            )));
        }
        self.stats.record_compilation(elapsed.as_nanos() as u64);

        let entry = Arc::new(CachedPattern {
            pattern_string: pattern.to_string(),
            compiled,
            compiled_at: start,
            compilation_time: elapsed,
            complexity_score: validation.estimated_complexity,
            use_count: AtomicU64::new(0),
        });

        let mut entries = self.entries.write();
        if entries.len() >= entries.cap().get() && !entries.contains(pattern) {
            self.stats.record_eviction();
        }
        entries.put(pattern.to_string(), entry.clone());
        Ok(entry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compiles_and_caches_a_pattern() {
        let cache = PatternCache::new(PatternCacheConfig::default());
        let p1 = cache.get_or_compile("line1/temp").unwrap();
        assert!(p1.matches("line1/temp"));
        assert_eq!(cache.stats().compilations(), 1);

        let p2 = cache.get_or_compile("line1/temp").unwrap();
        assert!(Arc::ptr_eq(&p1, &p2));
        assert_eq!(cache.stats().cache_hits(), 1);
    }

    #[test]
    fn rejects_unsafe_pattern_before_compiling() {
        let cache = PatternCache::new(PatternCacheConfig::default());
        let err = cache.get_or_compile("(a+)+b").unwrap_err();
        assert!(matches!(err, BridgeError::PatternUnsafe(_)));
        assert_eq!(cache.stats().validation_rejections(), 1);
        assert_eq!(cache.stats().compilations(), 0);
    }

    #[test]
    fn evicts_least_recently_used_entry_when_full() {
        let cfg = PatternCacheConfig {
            max_size: 2,
            ..Default::default()
        };
        let cache = PatternCache::new(cfg);
        cache.get_or_compile("a").unwrap();
        cache.get_or_compile("b").unwrap();
        cache.get_or_compile("c").unwrap();
        assert_eq!(cache.stats().evictions(), 1);
        assert!(cache.get("a").is_none());
    }
}

use std::sync::Arc;
use std::time::Instant;

use dashmap::DashMap;
use ferrobridge_types::{BridgeError, BridgeResult, Health, Sample};
use tracing::warn;

use crate::config::RegistryConfig;
use crate::descriptor::SinkDescriptor;
use crate::load_balancer::{LoadBalanceStrategy, LoadBalancer, LoadBalancerFactory};
use crate::stats::SinkRegistryStats;

/// Registry of sinks, keyed by id. Map mutation (register/unregister) goes
/// through `DashMap`'s shard locks; per-sink counters update lock-free.
pub struct SinkRegistry {
    sinks: DashMap<String, Arc<SinkDescriptor>>,
    balancer: Box<dyn LoadBalancer>,
    config: RegistryConfig,
    stats: SinkRegistryStats,
}

impl SinkRegistry {
    pub fn new(config: RegistryConfig) -> Self {
        Self {
            sinks: DashMap::new(),
            balancer: LoadBalancerFactory::create(config.default_strategy),
            config,
            stats: SinkRegistryStats::default(),
        }
    }

    pub fn with_strategy(config: RegistryConfig, strategy: LoadBalanceStrategy) -> Self {
        Self {
            sinks: DashMap::new(),
            balancer: LoadBalancerFactory::create(strategy),
            config,
            stats: SinkRegistryStats::default(),
        }
    }

    pub fn stats(&self) -> &SinkRegistryStats {
        &self.stats
    }

    pub fn register(&self, descriptor: SinkDescriptor) -> BridgeResult<()> {
        if self.sinks.contains_key(&descriptor.id) {
            return Err(BridgeError::AlreadyExists(format!("sink {} already registered", descriptor.id)));
        }
        self.sinks.insert(descriptor.id.clone(), Arc::new(descriptor));
        Ok(())
    }

    pub fn unregister(&self, id: &str) -> BridgeResult<()> {
        self.sinks
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| BridgeError::NotFound(format!("sink {id} not found")))
    }

    pub fn get(&self, id: &str) -> Option<Arc<SinkDescriptor>> {
        self.sinks.get(id).map(|e| e.value().clone())
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn healthy_count(&self) -> usize {
        self.sinks.iter().filter(|e| e.value().health() == Health::Healthy).count()
    }

    /// Selects candidate sinks via the configured load balancer, writing
    /// `sample` to all of them (a `Broadcast` strategy may return several;
    /// every other strategy returns at most one). Balancing is scoped to
    /// `candidate_ids` (a rule's destination list), never the whole
    /// registry. Returns the ids written to successfully.
    pub fn dispatch(&self, candidate_ids: &[String], sample: &Sample) -> BridgeResult<Vec<String>> {
        let all: Vec<Arc<SinkDescriptor>> = self.sinks.iter().map(|e| e.value().clone()).collect();
        let candidates: Vec<&SinkDescriptor> = all
            .iter()
            .map(|a| a.as_ref())
            .filter(|d| candidate_ids.iter().any(|id| id == &d.id) && d.is_selectable())
            .collect();
        if candidates.is_empty() {
            self.stats.record_selection(false);
            return Err(BridgeError::Unavailable("no healthy sink available".to_string()));
        }
        let selected = self.balancer.select(&candidates, Some(sample));
        if selected.is_empty() {
            self.stats.record_selection(false);
            return Err(BridgeError::Unavailable("load balancer selected nothing".to_string()));
        }

        let mut delivered = Vec::new();
        for desc in selected {
            match self.write_one(desc, sample) {
                Ok(()) => delivered.push(desc.id.clone()),
                Err(e) => warn!(sink = %desc.id, error = %e, "write to sink failed"),
            }
        }
        self.stats.record_selection(!delivered.is_empty());
        Ok(delivered)
    }

    fn write_one(&self, desc: &SinkDescriptor, sample: &Sample) -> BridgeResult<()> {
        let start = Instant::now();
        match desc.sink.write(sample) {
            Ok(()) => {
                desc.record_success(start.elapsed().as_nanos() as u64, 0);
                Ok(())
            }
            Err(e) => {
                let failures = desc.record_failure();
                if self.config.enable_health_check && failures >= self.config.unhealthy_threshold as u64 {
                    desc.set_health(Health::Unhealthy);
                    self.stats.record_failover();
                }
                Err(e)
            }
        }
    }

    /// Runs one health-check pass over every registered sink, demoting or
    /// promoting health state based on `Sink::is_healthy` and the
    /// consecutive-failure threshold. Intended to be called periodically
    /// by a dedicated worker thread owned by the orchestrator.
    pub fn run_health_check(&self) {
        for entry in self.sinks.iter() {
            let desc = entry.value();
            let observed = desc.sink.is_healthy();
            desc.set_health(observed);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ferrobridge_types::{Quality, SampleValue, SinkMetricsSnapshot};
    use std::sync::atomic::{AtomicBool, AtomicU64 as StdAtomicU64};

    struct FakeSink {
        fail: AtomicBool,
        writes: StdAtomicU64,
    }

    impl FakeSink {
        fn new(fail: bool) -> Self {
            Self {
                fail: AtomicBool::new(fail),
                writes: StdAtomicU64::new(0),
            }
        }
    }

    impl ferrobridge_types::Sink for FakeSink {
        fn initialize(&mut self) -> BridgeResult<()> {
            Ok(())
        }
        fn start(&mut self) -> BridgeResult<()> {
            Ok(())
        }
        fn stop(&mut self) -> BridgeResult<()> {
            Ok(())
        }
        fn shutdown(&mut self) -> BridgeResult<()> {
            Ok(())
        }
        fn write(&self, _sample: &Sample) -> BridgeResult<()> {
            if self.fail.load(std::sync::atomic::Ordering::Relaxed) {
                Err(BridgeError::Unavailable("fake failure".to_string()))
            } else {
                self.writes.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
                Ok(())
            }
        }
        fn is_healthy(&self) -> Health {
            if self.fail.load(std::sync::atomic::Ordering::Relaxed) {
                Health::Unhealthy
            } else {
                Health::Healthy
            }
        }
        fn metrics(&self) -> SinkMetricsSnapshot {
            SinkMetricsSnapshot::default()
        }
    }

    fn sample() -> Sample {
        Sample::new("line1/temp", 1, SampleValue::F64(1.0), Quality::Good, 0)
    }

    #[test]
    fn dispatch_round_robins_across_two_healthy_sinks() {
        let registry = SinkRegistry::with_strategy(RegistryConfig::default(), LoadBalanceStrategy::RoundRobin);
        registry
            .register(SinkDescriptor::new("a", "fake", Arc::new(FakeSink::new(false)), 100, 0))
            .unwrap();
        registry
            .register(SinkDescriptor::new("b", "fake", Arc::new(FakeSink::new(false)), 100, 0))
            .unwrap();

        let candidates = vec!["a".to_string(), "b".to_string()];
        let mut hits = std::collections::HashSet::new();
        for _ in 0..4 {
            let delivered = registry.dispatch(&candidates, &sample()).unwrap();
            hits.insert(delivered[0].clone());
        }
        assert_eq!(hits.len(), 2);
    }

    #[test]
    fn failover_excludes_sink_after_threshold_failures() {
        let cfg = RegistryConfig {
            unhealthy_threshold: 3,
            ..Default::default()
        };
        let registry = SinkRegistry::with_strategy(cfg, LoadBalanceStrategy::Failover);
        registry
            .register(SinkDescriptor::new("a", "fake", Arc::new(FakeSink::new(true)), 100, 0))
            .unwrap();
        registry
            .register(SinkDescriptor::new("b", "fake", Arc::new(FakeSink::new(false)), 100, 1))
            .unwrap();

        // Sink "a" has failover priority 0 (higher priority) but fails;
        // after `unhealthy_threshold` failed writes it should drop out of
        // the candidate pool, leaving "b" as the only selectable sink.
        let candidates = vec!["a".to_string(), "b".to_string()];
        for _ in 0..3 {
            let _ = registry.dispatch(&candidates, &sample());
        }
        let delivered = registry.dispatch(&candidates, &sample()).unwrap();
        assert_eq!(delivered, vec!["b".to_string()]);
    }

    #[test]
    fn dispatch_ignores_sinks_outside_candidate_set() {
        let registry = SinkRegistry::with_strategy(RegistryConfig::default(), LoadBalanceStrategy::RoundRobin);
        registry
            .register(SinkDescriptor::new("a", "fake", Arc::new(FakeSink::new(false)), 100, 0))
            .unwrap();
        registry
            .register(SinkDescriptor::new("b", "fake", Arc::new(FakeSink::new(false)), 100, 0))
            .unwrap();

        // Only "a" is in scope; "b" must never be selected even though it
        // is registered and healthy.
        let candidates = vec!["a".to_string()];
        for _ in 0..4 {
            let delivered = registry.dispatch(&candidates, &sample()).unwrap();
            assert_eq!(delivered, vec!["a".to_string()]);
        }
    }

    #[test]
    fn unregister_missing_sink_errs() {
        let registry = SinkRegistry::new(RegistryConfig::default());
        assert!(matches!(registry.unregister("ghost"), Err(BridgeError::NotFound(_))));
    }
}

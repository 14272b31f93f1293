use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use ferrobridge_bus::{BusConfig, Callback, Filter, MessageBus, Subscription};
use ferrobridge_patterns::PatternCache;
use ferrobridge_pool::MemoryPool;
use ferrobridge_registry::{ScoopDescriptor, ScoopRegistry, SinkDescriptor, SinkRegistry};
use ferrobridge_rules::{RoutingRule, RuleEngine};
use ferrobridge_scheduler::EDFScheduler;
use ferrobridge_types::{BridgeError, BridgeResult, Priority, Sample};
use serde::Serialize;
use tracing::warn;

use crate::config::BridgeConfig;
use crate::logging::init_logging;

/// Owns every subsystem the bridge wires together. Ownership is
/// downward-only: the orchestrator holds all subsystems, and subsystems
/// never hold a handle back to it, so there is never a cycle to unwind on
/// shutdown.
pub struct BridgeOrchestrator {
    config: BridgeConfig,
    pool: MemoryPool,
    patterns: Arc<PatternCache>,
    rules: RuleEngine,
    sinks: Arc<SinkRegistry>,
    scoops: ScoopRegistry,
    bus: MessageBus,
    scheduler: EDFScheduler,
    health_check: HealthCheckWorker,
    started: AtomicBool,
}

struct HealthCheckWorker {
    stop: Arc<AtomicBool>,
    handle: parking_lot::Mutex<Option<JoinHandle<()>>>,
}

impl BridgeOrchestrator {
    /// Builds every subsystem from `config` but starts nothing. Call
    /// `init()` to bring the bridge up; nothing here touches a hot path.
    pub fn new(config: BridgeConfig) -> Self {
        let patterns = Arc::new(PatternCache::new(config.patterns.into()));
        let pool = MemoryPool::new();
        pool.reserve(config.pool.reserve_per_tier);
        let rules = RuleEngine::new(patterns.clone());
        let sinks = Arc::new(SinkRegistry::new(config.registry.into()));
        let scoops = ScoopRegistry::new();
        let bus = MessageBus::new(BusConfig::from(config.bus));
        let scheduler = EDFScheduler::new(config.scheduler.clone().into());

        Self {
            config,
            pool,
            patterns,
            rules,
            sinks,
            scoops,
            bus,
            scheduler,
            health_check: HealthCheckWorker {
                stop: Arc::new(AtomicBool::new(false)),
                handle: parking_lot::Mutex::new(None),
            },
            started: AtomicBool::new(false),
        }
    }

    /// Process-wide lifecycle entry point: installs the `tracing`
    /// subscriber, starts the bus dispatcher pool, the EDF scheduler's
    /// worker pool, and the sink-registry health-check thread. No
    /// subsystem does lazy first-use initialization on a hot path; this
    /// is the one place everything comes up.
    pub fn init(&self) -> BridgeResult<()> {
        if self.started.swap(true, Ordering::AcqRel) {
            return Err(BridgeError::AlreadyExists("orchestrator already initialized".to_string()));
        }
        init_logging(&self.config.logging);
        self.bus.start();
        self.scheduler.start();

        if self.config.registry.enable_health_check {
            let interval = Duration::from_millis(self.config.registry.health_check_interval_ms);
            self.health_check.spawn(interval, self.health_check_target());
        }
        Ok(())
    }

    fn health_check_target(&self) -> Arc<SinkRegistry> {
        self.sinks.clone()
    }

    /// Requests a graceful shutdown: stops accepting new scheduler
    /// submissions and bus dispatch, waits up to `grace` for in-flight
    /// work to drain, then tears every worker pool down.
    pub fn shutdown(&self, grace: Duration) {
        self.health_check.stop_and_join();
        self.bus.stop(grace);
        self.scheduler.stop();
        self.started.store(false, Ordering::Release);
    }

    // --- control plane: rules -------------------------------------------------

    pub fn install_rule(&self, rule: RoutingRule) -> BridgeResult<()> {
        self.rules.install_rule(rule)
    }

    pub fn uninstall_rule(&self, name: &str) -> BridgeResult<()> {
        self.rules.uninstall_rule(name)
    }

    pub fn reload_rules(&self, rules: Vec<RoutingRule>) -> BridgeResult<()> {
        self.rules.reload_rules(rules)
    }

    pub fn rule_count(&self) -> usize {
        self.rules.rule_count()
    }

    // --- control plane: sinks/scoops ------------------------------------------

    pub fn register_sink(&self, descriptor: SinkDescriptor) -> BridgeResult<()> {
        self.sinks.register(descriptor)
    }

    pub fn unregister_sink(&self, id: &str) -> BridgeResult<()> {
        self.sinks.unregister(id)
    }

    pub fn register_scoop(&self, descriptor: ScoopDescriptor) -> BridgeResult<()> {
        self.scoops.register(descriptor)
    }

    pub fn unregister_scoop(&self, id: &str) -> BridgeResult<()> {
        self.scoops.unregister(id)
    }

    // --- control plane: bus subscription --------------------------------------

    pub fn subscribe(&self, pattern: &str, callback: Callback) -> Subscription {
        self.bus.subscribe(pattern, callback)
    }

    pub fn subscribe_filtered(&self, pattern: &str, callback: Callback, filter: Option<Filter>) -> Subscription {
        self.bus.subscribe_filtered(pattern, callback, filter)
    }

    // --- data plane ------------------------------------------------------------

    /// Evaluates `sample` against the installed rule snapshot, then enqueues
    /// one EDF scheduler task per matched, non-stopped destination. Each
    /// task's deadline is derived from that destination's priority; when it
    /// runs, it dispatches `sample` to the sink registry scoped to the full
    /// set of sink ids the rule match produced, and the registry's
    /// configured load-balancing strategy picks the actual sink(s) among
    /// that candidate set. Returns the number of tasks scheduled, not the
    /// number of sinks eventually written to, since dispatch now happens
    /// off the calling thread.
    pub fn ingest(&self, sample: Sample) -> BridgeResult<usize> {
        let destinations = self.rules.evaluate(&sample);
        if destinations.is_empty() {
            return Ok(0);
        }
        let candidate_ids: Vec<String> = destinations.iter().map(|d| d.sink_id.clone()).collect();
        let base_ms = self.config.scheduler.default_deadline_offset_ms;

        let mut scheduled = 0;
        for dest in destinations {
            let sinks = self.sinks.clone();
            let candidates = candidate_ids.clone();
            let sink_id = dest.sink_id.clone();
            let offset = deadline_offset_for(dest.priority, base_ms);
            let job = move || {
                if let Err(e) = sinks.dispatch(&candidates, &sample) {
                    warn!(sink = %sink_id, error = %e, "dispatch failed for matched destination");
                }
            };
            match self.scheduler.submit_offset(job, offset) {
                Ok(_) => scheduled += 1,
                Err(e) => warn!(sink = %dest.sink_id, error = %e, "failed to submit dispatch task"),
            }
        }
        Ok(scheduled)
    }

    /// Publishes `sample` onto the bus topic derived from its address,
    /// for subscribers that want the raw stream independent of rule
    /// evaluation (e.g. a diagnostics UI).
    pub fn publish_raw(&self, topic: &str, envelope: ferrobridge_types::Envelope) -> BridgeResult<()> {
        self.bus.publish(topic, envelope)
    }

    pub fn allocate(&self, size: usize) -> ferrobridge_pool::PooledBuffer {
        self.pool.allocate(size)
    }

    pub fn scheduler(&self) -> &EDFScheduler {
        &self.scheduler
    }

    pub fn metrics_snapshot(&self) -> MetricsSnapshot {
        let bus_stats = self.bus.stats();
        let pattern_stats = self.patterns.stats();
        let registry_stats = self.sinks.stats();
        let sched = self.scheduler.stats();

        MetricsSnapshot {
            rule_count: self.rules.rule_count(),
            sink_count: self.sinks.len(),
            healthy_sink_count: self.sinks.healthy_count(),
            scoop_count: self.scoops.len(),
            healthy_scoop_count: self.scoops.healthy_count(),
            bus_channel_count: self.bus.channel_count(),
            messages_published: bus_stats.messages_published(),
            messages_delivered: bus_stats.messages_delivered(),
            messages_dropped: bus_stats.messages_dropped(),
            pattern_compilations: pattern_stats.compilations(),
            pattern_cache_hits: pattern_stats.cache_hits(),
            pattern_cache_evictions: pattern_stats.evictions(),
            sink_failover_events: registry_stats.failover_events(),
            tasks_submitted: sched.tasks_submitted,
            tasks_completed: sched.tasks_completed,
            deadlines_missed: sched.deadlines_missed,
            platform_capability_lost: sched.platform_capability_lost,
        }
    }
}

impl HealthCheckWorker {
    fn spawn(&self, interval: Duration, target: Arc<SinkRegistry>) {
        self.stop.store(false, Ordering::Release);
        let stop = self.stop.clone();
        let handle = thread::spawn(move || {
            while !stop.load(Ordering::Acquire) {
                thread::sleep(interval);
                if stop.load(Ordering::Acquire) {
                    break;
                }
                target.run_health_check();
            }
        });
        *self.handle.lock() = Some(handle);
    }

    fn stop_and_join(&self) {
        self.stop.store(true, Ordering::Release);
        if let Some(handle) = self.handle.lock().take() {
            let _ = handle.join();
        }
    }
}

/// Scales the configured base EDF deadline offset by sample priority:
/// higher-priority destinations get a tighter deadline, lower-priority ones
/// a looser one, so the scheduler's earliest-deadline-first ordering favors
/// realtime traffic under contention.
fn deadline_offset_for(priority: Priority, base_ms: u64) -> Duration {
    let ms = match priority {
        Priority::Realtime => (base_ms / 4).max(1),
        Priority::High => (base_ms / 2).max(1),
        Priority::Normal => base_ms.max(1),
        Priority::Low => base_ms.saturating_mul(2).max(1),
    };
    Duration::from_millis(ms)
}

/// Flattened, `serde`-serializable snapshot of every subsystem's
/// counters, returned by `metrics_snapshot` for the control plane to
/// expose however it sees fit (HTTP endpoint, periodic log line, …).
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct MetricsSnapshot {
    pub rule_count: usize,
    pub sink_count: usize,
    pub healthy_sink_count: usize,
    pub scoop_count: usize,
    pub healthy_scoop_count: usize,
    pub bus_channel_count: usize,
    pub messages_published: u64,
    pub messages_delivered: u64,
    pub messages_dropped: u64,
    pub pattern_compilations: u64,
    pub pattern_cache_hits: u64,
    pub pattern_cache_evictions: u64,
    pub sink_failover_events: u64,
    pub tasks_submitted: u64,
    pub tasks_completed: u64,
    pub deadlines_missed: u64,
    pub platform_capability_lost: u64,
}

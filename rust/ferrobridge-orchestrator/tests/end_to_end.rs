use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use ferrobridge_orchestrator::prelude::*;
use ferrobridge_orchestrator::BridgeOrchestrator;
use ferrobridge_types::{Health, Quality, SampleValue, SinkMetricsSnapshot};

/// Polls `cond` until it's true or `timeout` elapses. Dispatch now runs on
/// the EDF scheduler's worker threads, so tests observe it asynchronously.
fn wait_until<F: Fn() -> bool>(cond: F, timeout: Duration) -> bool {
    let deadline = Instant::now() + timeout;
    while !cond() {
        if Instant::now() >= deadline {
            return false;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    true
}

struct RecordingSink {
    name: String,
    fail: AtomicBool,
    calls: Arc<Mutex<Vec<String>>>,
}

impl RecordingSink {
    fn new(name: &str, fail: bool, calls: Arc<Mutex<Vec<String>>>) -> Self {
        Self {
            name: name.to_string(),
            fail: AtomicBool::new(fail),
            calls,
        }
    }
}

impl ferrobridge_types::Sink for RecordingSink {
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
    fn write(&self, _sample: &ferrobridge_types::Sample) -> BridgeResult<()> {
        if self.fail.load(Ordering::Relaxed) {
            return Err(BridgeError::Unavailable(format!("{} is down", self.name)));
        }
        self.calls.lock().unwrap().push(self.name.clone());
        Ok(())
    }
    fn is_healthy(&self) -> Health {
        if self.fail.load(Ordering::Relaxed) {
            Health::Unhealthy
        } else {
            Health::Healthy
        }
    }
    fn metrics(&self) -> SinkMetricsSnapshot {
        SinkMetricsSnapshot::default()
    }
}

fn sample(address: &str, protocol: u16, value: f64) -> ferrobridge_types::Sample {
    ferrobridge_types::Sample::new(address, protocol, SampleValue::F64(value), Quality::Good, 0)
}

fn dest(sink_id: &str, action: DestinationAction) -> Destination {
    Destination {
        sink_id: sink_id.to_string(),
        priority: ferrobridge_types::Priority::Normal,
        weight: 100,
        action,
    }
}

/// Scenario 1: a single rule matches on address, forwards to the one
/// registered sink; exactly one write is observed.
#[test]
fn simple_route_delivers_to_the_one_matching_sink() {
    let orchestrator = BridgeOrchestrator::new(BridgeConfig::default());
    orchestrator.init().unwrap();
    let calls = Arc::new(Mutex::new(Vec::new()));
    orchestrator
        .register_sink(SinkDescriptor::new(
            "sink-a",
            "recording",
            Arc::new(RecordingSink::new("sink-a", false, calls.clone())),
            100,
            0,
        ))
        .unwrap();
    orchestrator
        .install_rule(RoutingRule::new(
            "r1",
            SourceFilter::any_address("plant/*/temp"),
            vec![dest("sink-a", DestinationAction::Forward)],
        ))
        .unwrap();

    let scheduled = orchestrator.ingest(sample("plant/line1/temp", 1, 23.5)).unwrap();
    assert_eq!(scheduled, 1);
    assert!(wait_until(|| calls.lock().unwrap().len() == 1, Duration::from_secs(2)));
    assert_eq!(*calls.lock().unwrap(), vec!["sink-a".to_string()]);
    assert_eq!(orchestrator.metrics_snapshot().rule_count, 1);
    orchestrator.shutdown(Duration::from_millis(50));
}

/// Scenario 2: two sinks registered under a weighted-round-robin strategy
/// with weights 1:3. The rule's destination list names both sinks, so
/// every ingested sample schedules two dispatch tasks, each balancing over
/// the same candidate pair; across eight samples (sixteen dispatch tasks)
/// the split follows the 1:3 weight ratio.
#[test]
fn weighted_fan_out_splits_four_to_twelve_over_eight_samples() {
    let config = BridgeConfig {
        registry: RegistryConfigToml {
            default_strategy: LoadBalanceStrategyToml::WeightedRoundRobin,
            ..RegistryConfigToml::default()
        },
        ..BridgeConfig::default()
    };
    let orchestrator = BridgeOrchestrator::new(config);
    orchestrator.init().unwrap();
    let calls = Arc::new(Mutex::new(Vec::new()));
    orchestrator
        .register_sink(SinkDescriptor::new(
            "sink-a",
            "recording",
            Arc::new(RecordingSink::new("sink-a", false, calls.clone())),
            1,
            0,
        ))
        .unwrap();
    orchestrator
        .register_sink(SinkDescriptor::new(
            "sink-b",
            "recording",
            Arc::new(RecordingSink::new("sink-b", false, calls.clone())),
            3,
            0,
        ))
        .unwrap();
    orchestrator
        .install_rule(RoutingRule::new(
            "fan-out",
            SourceFilter::any_address("plant/*/temp"),
            vec![
                dest("sink-a", DestinationAction::Forward),
                dest("sink-b", DestinationAction::Forward),
            ],
        ))
        .unwrap();

    for _ in 0..8 {
        orchestrator.ingest(sample("plant/line1/temp", 1, 1.0)).unwrap();
    }

    assert!(wait_until(|| calls.lock().unwrap().len() == 16, Duration::from_secs(2)));
    let calls = calls.lock().unwrap();
    let a_count = calls.iter().filter(|c| *c == "sink-a").count();
    let b_count = calls.iter().filter(|c| *c == "sink-b").count();
    assert_eq!(a_count, 4);
    assert_eq!(b_count, 12);
    orchestrator.shutdown(Duration::from_millis(50));
}

/// Scenario 3: a ReDoS-shaped pattern is rejected at install time and no
/// rule is added.
#[test]
fn redos_pattern_is_rejected_and_rule_count_stays_unchanged() {
    let orchestrator = BridgeOrchestrator::new(BridgeConfig::default());
    orchestrator
        .install_rule(RoutingRule::new(
            "ok",
            SourceFilter::any_address("plant/line1/temp"),
            vec![dest("sink-a", DestinationAction::Forward)],
        ))
        .unwrap();
    assert_eq!(orchestrator.rule_count(), 1);

    let err = orchestrator
        .install_rule(RoutingRule::new(
            "bad",
            SourceFilter::any_address("(a+)+b"),
            vec![dest("sink-a", DestinationAction::Forward)],
        ))
        .unwrap_err();
    assert!(matches!(err, BridgeError::PatternUnsafe(_)));
    assert_eq!(orchestrator.rule_count(), 1);
}

/// Scenario 4: a 5ms closure submitted with a deadline already in the
/// past is guaranteed to miss it; the scheduler records the miss and
/// invokes the completion callback with `DeadlineMissed`.
#[test]
fn deadline_miss_is_recorded_and_callback_invoked() {
    let orchestrator = BridgeOrchestrator::new(BridgeConfig::default());
    orchestrator.init().unwrap();

    let missed = Arc::new(AtomicBool::new(false));
    let missed_clone = missed.clone();
    let scheduler = orchestrator.scheduler();
    let handle = scheduler
        .submit_with_callback(
            || std::thread::sleep(Duration::from_millis(5)),
            1, // 1ns past the epoch: already overdue the instant it arrives.
            move |state, _duration| {
                missed_clone.store(state == ferrobridge_scheduler::TaskState::DeadlineMissed, Ordering::Relaxed);
            },
        )
        .unwrap();

    let start = std::time::Instant::now();
    while !handle.state().is_terminal() && start.elapsed() < Duration::from_secs(2) {
        std::thread::sleep(Duration::from_millis(5));
    }

    assert_eq!(handle.state(), ferrobridge_scheduler::TaskState::DeadlineMissed);
    assert!(missed.load(Ordering::Relaxed));
    assert_eq!(scheduler.stats().deadlines_missed, 1);
    orchestrator.shutdown(Duration::from_millis(50));
}

/// Scenario 5: a higher-priority sink that keeps failing its writes
/// drops out of the candidate pool after `unhealthy_threshold` failures,
/// so dispatch falls over to the backup and a failover event is counted.
/// The rule names both sinks as destinations, since candidate-scoped
/// dispatch only ever balances within a destination list, never the whole
/// registry.
#[test]
fn unhealthy_primary_fails_over_to_backup() {
    let config = BridgeConfig {
        registry: RegistryConfigToml {
            default_strategy: LoadBalanceStrategyToml::Failover,
            unhealthy_threshold: 3,
            ..RegistryConfigToml::default()
        },
        ..BridgeConfig::default()
    };
    let orchestrator = BridgeOrchestrator::new(config);
    orchestrator.init().unwrap();
    let calls = Arc::new(Mutex::new(Vec::new()));
    orchestrator
        .register_sink(SinkDescriptor::new(
            "sink-a",
            "recording",
            Arc::new(RecordingSink::new("sink-a", true, calls.clone())),
            100,
            0,
        ))
        .unwrap();
    orchestrator
        .register_sink(SinkDescriptor::new(
            "sink-b",
            "recording",
            Arc::new(RecordingSink::new("sink-b", false, calls.clone())),
            100,
            1,
        ))
        .unwrap();
    orchestrator
        .install_rule(RoutingRule::new(
            "failover-rule",
            SourceFilter::any_address("plant/line1/temp"),
            vec![
                dest("sink-a", DestinationAction::Forward),
                dest("sink-b", DestinationAction::Forward),
            ],
        ))
        .unwrap();

    // "sink-a" has failover priority 0 but every write fails; each ingest
    // schedules two dispatch tasks against the {sink-a, sink-b} candidate
    // pool, so a few ingests drive sink-a past `unhealthy_threshold` and
    // every subsequent dispatch lands on sink-b.
    for _ in 0..5 {
        let _ = orchestrator.ingest(sample("plant/line1/temp", 1, 1.0));
        std::thread::sleep(Duration::from_millis(10));
    }

    assert!(wait_until(
        || {
            let calls = calls.lock().unwrap();
            !calls.is_empty() && calls.iter().all(|c| c == "sink-b")
        },
        Duration::from_secs(2),
    ));
    assert!(orchestrator.metrics_snapshot().sink_failover_events >= 1);
    orchestrator.shutdown(Duration::from_millis(50));
}

/// Scenario 6: bus channel capacity 4 with drop-newest; six publishes
/// while no subscriber/dispatcher is draining leave 4 retained, 2
/// dropped.
#[test]
fn bus_overflow_drops_newest_past_capacity() {
    let config = BridgeConfig {
        bus: BusConfigToml {
            channel_capacity: 4,
            ..BusConfigToml::default()
        },
        ..BridgeConfig::default()
    };
    let orchestrator = BridgeOrchestrator::new(config);
    // Bus is never started, so nothing drains the channel: every publish
    // just accumulates against the ring's drop policy.
    for i in 0..6u64 {
        let s = sample("plant/line1/temp", 1, i as f64);
        orchestrator
            .publish_raw("plant/line1/temp", ferrobridge_types::Envelope::point("plant/line1/temp", i, s))
            .unwrap();
    }
    let snapshot = orchestrator.metrics_snapshot();
    assert_eq!(snapshot.bus_channel_count, 1);
    assert_eq!(snapshot.messages_published, 6);
    assert_eq!(snapshot.messages_dropped, 2);
}

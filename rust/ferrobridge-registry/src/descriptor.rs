use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Instant;

use ferrobridge_types::{Health, Sink};
use parking_lot::RwLock;

fn health_to_u8(h: Health) -> u8 {
    match h {
        Health::Healthy => 0,
        Health::Degraded => 1,
        Health::Unhealthy => 2,
        Health::Unknown => 3,
    }
}

fn u8_to_health(v: u8) -> Health {
    match v {
        0 => Health::Healthy,
        1 => Health::Degraded,
        2 => Health::Unhealthy,
        _ => Health::Unknown,
    }
}

/// A registered sink plus its load-balancing weight, health state, and
/// atomic traffic counters. The map that owns a `SinkDescriptor` only
/// needs a lock to add/remove entries; everything else here updates
/// lock-free.
pub struct SinkDescriptor {
    pub id: String,
    pub sink_type: String,
    pub sink: Arc<dyn Sink>,
    pub weight: u32,
    pub enabled: bool,
    pub priority: u32,
    health: AtomicU8,
    consecutive_failures: AtomicU64,
    last_health_check: RwLock<Option<Instant>>,
    messages_sent: AtomicU64,
    messages_failed: AtomicU64,
    bytes_sent: AtomicU64,
    pending: AtomicU64,
    total_latency_ns: AtomicU64,
}

impl SinkDescriptor {
    pub fn new(id: impl Into<String>, sink_type: impl Into<String>, sink: Arc<dyn Sink>, weight: u32, priority: u32) -> Self {
        Self {
            id: id.into(),
            sink_type: sink_type.into(),
            sink,
            weight,
            enabled: true,
            priority,
            health: AtomicU8::new(health_to_u8(Health::Unknown)),
            consecutive_failures: AtomicU64::new(0),
            last_health_check: RwLock::new(None),
            messages_sent: AtomicU64::new(0),
            messages_failed: AtomicU64::new(0),
            bytes_sent: AtomicU64::new(0),
            pending: AtomicU64::new(0),
            total_latency_ns: AtomicU64::new(0),
        }
    }

    pub fn health(&self) -> Health {
        u8_to_health(self.health.load(Ordering::Relaxed))
    }

    pub fn set_health(&self, h: Health) {
        self.health.store(health_to_u8(h), Ordering::Relaxed);
        *self.last_health_check.write() = Some(Instant::now());
    }

    pub fn record_success(&self, latency_ns: u64, bytes: u64) {
        self.consecutive_failures.store(0, Ordering::Relaxed);
        self.messages_sent.fetch_add(1, Ordering::Relaxed);
        self.bytes_sent.fetch_add(bytes, Ordering::Relaxed);
        self.total_latency_ns.fetch_add(latency_ns, Ordering::Relaxed);
    }

    /// Returns the new consecutive-failure count.
    pub fn record_failure(&self) -> u64 {
        self.messages_failed.fetch_add(1, Ordering::Relaxed);
        self.consecutive_failures.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn messages_sent(&self) -> u64 {
        self.messages_sent.load(Ordering::Relaxed)
    }
    pub fn messages_failed(&self) -> u64 {
        self.messages_failed.load(Ordering::Relaxed)
    }
    pub fn bytes_sent(&self) -> u64 {
        self.bytes_sent.load(Ordering::Relaxed)
    }
    pub fn pending(&self) -> u64 {
        self.pending.load(Ordering::Relaxed)
    }

    pub fn success_rate(&self) -> f64 {
        let sent = self.messages_sent();
        let failed = self.messages_failed();
        let total = sent + failed;
        if total == 0 {
            return 1.0;
        }
        sent as f64 / total as f64
    }

    pub fn avg_latency_us(&self) -> f64 {
        let sent = self.messages_sent();
        if sent == 0 {
            return 0.0;
        }
        (self.total_latency_ns.load(Ordering::Relaxed) as f64 / sent as f64) / 1000.0
    }

    pub fn is_selectable(&self) -> bool {
        self.enabled && !matches!(self.health(), Health::Unhealthy)
    }
}

use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;

use ferrobridge_types::{Health, Scoop};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadStrategy {
    Poll,
    Subscribe,
    Hybrid,
}

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

pub struct ScoopDescriptor {
    pub id: String,
    pub scoop_type: String,
    pub scoop: Arc<parking_lot::Mutex<dyn Scoop>>,
    pub read_strategy: ReadStrategy,
    pub enabled: bool,
    health: AtomicU8,
    samples_produced: AtomicU64,
    read_errors: AtomicU64,
}

impl ScoopDescriptor {
    pub fn new(
        id: impl Into<String>,
        scoop_type: impl Into<String>,
        scoop: Arc<parking_lot::Mutex<dyn Scoop>>,
        read_strategy: ReadStrategy,
    ) -> Self {
        Self {
            id: id.into(),
            scoop_type: scoop_type.into(),
            scoop,
            read_strategy,
            enabled: true,
            health: AtomicU8::new(health_to_u8(Health::Unknown)),
            samples_produced: AtomicU64::new(0),
            read_errors: AtomicU64::new(0),
        }
    }

    pub fn health(&self) -> Health {
        u8_to_health(self.health.load(Ordering::Relaxed))
    }

    pub fn set_health(&self, h: Health) {
        self.health.store(health_to_u8(h), Ordering::Relaxed);
    }

    pub fn record_produced(&self, count: u64) {
        self.samples_produced.fetch_add(count, Ordering::Relaxed);
    }

    pub fn record_error(&self) {
        self.read_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn samples_produced(&self) -> u64 {
        self.samples_produced.load(Ordering::Relaxed)
    }

    pub fn read_errors(&self) -> u64 {
        self.read_errors.load(Ordering::Relaxed)
    }
}

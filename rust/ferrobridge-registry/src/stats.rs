use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default)]
pub struct SinkRegistryStats {
    total_selections: AtomicU64,
    successful_selections: AtomicU64,
    failed_selections: AtomicU64,
    failover_events: AtomicU64,
}

impl SinkRegistryStats {
    pub fn record_selection(&self, succeeded: bool) {
        self.total_selections.fetch_add(1, Ordering::Relaxed);
        if succeeded {
            self.successful_selections.fetch_add(1, Ordering::Relaxed);
        } else {
            self.failed_selections.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_failover(&self) {
        self.failover_events.fetch_add(1, Ordering::Relaxed);
    }

    pub fn total_selections(&self) -> u64 {
        self.total_selections.load(Ordering::Relaxed)
    }
    pub fn successful_selections(&self) -> u64 {
        self.successful_selections.load(Ordering::Relaxed)
    }
    pub fn failed_selections(&self) -> u64 {
        self.failed_selections.load(Ordering::Relaxed)
    }
    pub fn failover_events(&self) -> u64 {
        self.failover_events.load(Ordering::Relaxed)
    }
}

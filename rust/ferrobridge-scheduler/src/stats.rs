use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};

use crossbeam_utils::CachePadded;

/// Mirrors `EDFSchedulerStats` from the original implementation: one
/// atomic counter per field, a `reset`, and derived rate helpers.
#[derive(Debug, Default)]
pub struct EDFSchedulerStats {
    tasks_submitted: CachePadded<AtomicU64>,
    tasks_completed: CachePadded<AtomicU64>,
    tasks_cancelled: CachePadded<AtomicU64>,
    tasks_failed: CachePadded<AtomicU64>,
    deadlines_met: CachePadded<AtomicU64>,
    deadlines_missed: CachePadded<AtomicU64>,

    current_queue_size: CachePadded<AtomicU64>,
    peak_queue_size: CachePadded<AtomicU64>,

    min_latency_ns: CachePadded<AtomicI64>,
    max_latency_ns: CachePadded<AtomicI64>,
    total_latency_ns: CachePadded<AtomicI64>,

    min_execution_ns: CachePadded<AtomicI64>,
    max_execution_ns: CachePadded<AtomicI64>,
    total_execution_ns: CachePadded<AtomicI64>,

    platform_capability_lost: CachePadded<AtomicU64>,
}

impl EDFSchedulerStats {
    pub fn new() -> Self {
        let s = Self::default();
        s.min_latency_ns.store(i64::MAX, Ordering::Relaxed);
        s.min_execution_ns.store(i64::MAX, Ordering::Relaxed);
        s
    }

    pub fn record_submit(&self, queue_depth_after: usize) {
        self.tasks_submitted.fetch_add(1, Ordering::Relaxed);
        self.current_queue_size.store(queue_depth_after as u64, Ordering::Relaxed);
        self.peak_queue_size.fetch_max(queue_depth_after as u64, Ordering::Relaxed);
    }

    pub fn record_dequeue(&self, queue_depth_after: usize) {
        self.current_queue_size.store(queue_depth_after as u64, Ordering::Relaxed);
    }

    pub fn record_cancelled(&self) {
        self.tasks_cancelled.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_platform_capability_lost(&self) {
        self.platform_capability_lost.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_completion(&self, latency_ns: i64, execution_ns: i64, deadline_met: bool, failed: bool) {
        if failed {
            self.tasks_failed.fetch_add(1, Ordering::Relaxed);
        } else {
            self.tasks_completed.fetch_add(1, Ordering::Relaxed);
        }
        if deadline_met {
            self.deadlines_met.fetch_add(1, Ordering::Relaxed);
        } else {
            self.deadlines_missed.fetch_add(1, Ordering::Relaxed);
        }
        self.min_latency_ns.fetch_min(latency_ns, Ordering::Relaxed);
        self.max_latency_ns.fetch_max(latency_ns, Ordering::Relaxed);
        self.total_latency_ns.fetch_add(latency_ns, Ordering::Relaxed);
        self.min_execution_ns.fetch_min(execution_ns, Ordering::Relaxed);
        self.max_execution_ns.fetch_max(execution_ns, Ordering::Relaxed);
        self.total_execution_ns.fetch_add(execution_ns, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> EDFSchedulerStatsSnapshot {
        EDFSchedulerStatsSnapshot {
            tasks_submitted: self.tasks_submitted.load(Ordering::Relaxed),
            tasks_completed: self.tasks_completed.load(Ordering::Relaxed),
            tasks_cancelled: self.tasks_cancelled.load(Ordering::Relaxed),
            tasks_failed: self.tasks_failed.load(Ordering::Relaxed),
            deadlines_met: self.deadlines_met.load(Ordering::Relaxed),
            deadlines_missed: self.deadlines_missed.load(Ordering::Relaxed),
            current_queue_size: self.current_queue_size.load(Ordering::Relaxed),
            peak_queue_size: self.peak_queue_size.load(Ordering::Relaxed),
            min_latency_ns: self.min_latency_ns.load(Ordering::Relaxed),
            max_latency_ns: self.max_latency_ns.load(Ordering::Relaxed),
            total_latency_ns: self.total_latency_ns.load(Ordering::Relaxed),
            min_execution_ns: self.min_execution_ns.load(Ordering::Relaxed),
            max_execution_ns: self.max_execution_ns.load(Ordering::Relaxed),
            total_execution_ns: self.total_execution_ns.load(Ordering::Relaxed),
            platform_capability_lost: self.platform_capability_lost.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct EDFSchedulerStatsSnapshot {
    pub tasks_submitted: u64,
    pub tasks_completed: u64,
    pub tasks_cancelled: u64,
    pub tasks_failed: u64,
    pub deadlines_met: u64,
    pub deadlines_missed: u64,
    pub current_queue_size: u64,
    pub peak_queue_size: u64,
    pub min_latency_ns: i64,
    pub max_latency_ns: i64,
    pub total_latency_ns: i64,
    pub min_execution_ns: i64,
    pub max_execution_ns: i64,
    pub total_execution_ns: i64,
    pub platform_capability_lost: u64,
}

impl EDFSchedulerStatsSnapshot {
    pub fn deadline_compliance_rate(&self) -> f64 {
        let total = self.deadlines_met + self.deadlines_missed;
        if total == 0 {
            100.0
        } else {
            self.deadlines_met as f64 / total as f64 * 100.0
        }
    }

    pub fn avg_latency_us(&self) -> f64 {
        let count = self.tasks_completed + self.tasks_failed;
        if count == 0 {
            0.0
        } else {
            self.total_latency_ns as f64 / count as f64 / 1000.0
        }
    }

    pub fn avg_execution_us(&self) -> f64 {
        if self.tasks_completed == 0 {
            0.0
        } else {
            self.total_execution_ns as f64 / self.tasks_completed as f64 / 1000.0
        }
    }
}

use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverflowPolicy {
    /// Fail the submit call outright.
    Reject,
    /// Evict the lowest-priority task still pending, then admit the new one.
    DropLowest,
    /// Evict the pending task with the furthest deadline, then admit the new one.
    DropFurthest,
}

impl Default for OverflowPolicy {
    fn default() -> Self {
        OverflowPolicy::Reject
    }
}

#[derive(Debug, Clone)]
pub struct EDFSchedulerConfig {
    pub max_queue_size: usize,
    /// `0` means "use `num_cpus::get()`".
    pub worker_threads: usize,
    pub default_deadline_offset: Duration,
    pub enable_realtime: bool,
    pub realtime_priority: i32,
    /// `None` disables pinning; `Some(n)` pins worker `i` to core `n + i`.
    pub cpu_affinity_start: Option<usize>,
    pub check_interval: Duration,
    pub overflow_policy: OverflowPolicy,
    pub enable_miss_callbacks: bool,
    pub enable_timing: bool,
}

impl Default for EDFSchedulerConfig {
    fn default() -> Self {
        Self {
            max_queue_size: 100_000,
            worker_threads: 0,
            default_deadline_offset: Duration::from_millis(1),
            enable_realtime: false,
            realtime_priority: 50,
            cpu_affinity_start: None,
            check_interval: Duration::from_micros(100),
            overflow_policy: OverflowPolicy::Reject,
            enable_miss_callbacks: true,
            enable_timing: true,
        }
    }
}

impl EDFSchedulerConfig {
    pub fn resolved_worker_count(&self) -> usize {
        if self.worker_threads == 0 {
            num_cpus::get().max(1)
        } else {
            self.worker_threads
        }
    }
}

use std::collections::BinaryHeap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use ferrobridge_types::{BridgeError, BridgeResult, Clock, SystemClock};
use parking_lot::{Condvar, Mutex};
use tracing::warn;

use crate::config::{EDFSchedulerConfig, OverflowPolicy};
use crate::heap::HeapEntry;
use crate::record::{CompletionCallback, Job, TaskRecord};
use crate::stats::{EDFSchedulerStats, EDFSchedulerStatsSnapshot};
use crate::task::{AtomicTaskState, TaskPriority, TaskState};

static NEXT_TASK_ID: AtomicU64 = AtomicU64::new(1);
static NEXT_PERIODIC_ID: AtomicU64 = AtomicU64::new(1);

struct PeriodicEntry {
    period_ns: u64,
    priority: TaskPriority,
    name: Option<String>,
    factory: Arc<dyn Fn() + Send + Sync>,
    cancelled: AtomicBool,
}

struct Shared {
    config: EDFSchedulerConfig,
    clock: Arc<dyn Clock>,
    heap: Mutex<BinaryHeap<HeapEntry>>,
    cv: Condvar,
    stats: EDFSchedulerStats,
    running: AtomicBool,
    periodics: Mutex<std::collections::HashMap<u64, Arc<PeriodicEntry>>>,
}

/// Earliest-deadline-first task scheduler backed by a mutex-guarded binary
/// heap and a worker-thread pool. Workers block on a condition variable
/// between tasks, timed to the current head deadline, and are woken early
/// by any submission whose deadline beats the one they're waiting on.
pub struct EDFScheduler {
    shared: Arc<Shared>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl EDFScheduler {
    pub fn new(config: EDFSchedulerConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: EDFSchedulerConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            shared: Arc::new(Shared {
                config,
                clock,
                heap: Mutex::new(BinaryHeap::new()),
                cv: Condvar::new(),
                stats: EDFSchedulerStats::new(),
                running: AtomicBool::new(false),
                periodics: Mutex::new(std::collections::HashMap::new()),
            }),
            workers: Mutex::new(Vec::new()),
        }
    }

    pub fn start(&self) {
        self.shared.running.store(true, Ordering::Release);
        let worker_count = self.shared.config.resolved_worker_count();
        let mut workers = self.workers.lock();
        for worker_id in 0..worker_count {
            let shared = self.shared.clone();
            workers.push(thread::spawn(move || worker_loop(shared, worker_id)));
        }
    }

    /// Stops accepting new cv waits and wakes every worker so it observes
    /// `running == false` and exits once its current task (if any) finishes.
    pub fn stop(&self) {
        self.shared.running.store(false, Ordering::Release);
        self.shared.cv.notify_all();
        let mut workers = self.workers.lock();
        for w in workers.drain(..) {
            let _ = w.join();
        }
    }

    pub fn stats(&self) -> EDFSchedulerStatsSnapshot {
        self.shared.stats.snapshot()
    }

    pub fn pending_count(&self) -> usize {
        self.shared.heap.lock().len()
    }

    pub fn nearest_deadline_ns(&self) -> Option<u64> {
        self.shared.heap.lock().peek().map(|e| e.deadline_ns)
    }

    pub fn get_task_state(&self, task_id: u64) -> Option<TaskState> {
        // States are held on the `Arc<TaskRecord>` returned to callers via
        // `TaskHandle`; the scheduler itself does not retain a task index
        // once a task leaves the heap, so this queries the live heap only.
        self.shared
            .heap
            .lock()
            .iter()
            .find(|e| e.record.id == task_id)
            .map(|e| e.record.state.get())
    }

    pub fn submit(&self, job: impl FnOnce() + Send + 'static, deadline_ns: u64) -> BridgeResult<TaskHandle> {
        self.submit_full(None, job, deadline_ns, TaskPriority::Normal, None, None)
    }

    pub fn submit_offset(&self, job: impl FnOnce() + Send + 'static, offset: Duration) -> BridgeResult<TaskHandle> {
        let deadline_ns = self.shared.clock.now_ns() + offset.as_nanos() as u64;
        self.submit(job, deadline_ns)
    }

    pub fn submit_named(
        &self,
        name: impl Into<String>,
        job: impl FnOnce() + Send + 'static,
        deadline_ns: u64,
    ) -> BridgeResult<TaskHandle> {
        self.submit_full(Some(name.into()), job, deadline_ns, TaskPriority::Normal, None, None)
    }

    pub fn submit_with_callback(
        &self,
        job: impl FnOnce() + Send + 'static,
        deadline_ns: u64,
        callback: impl FnOnce(TaskState, Duration) + Send + 'static,
    ) -> BridgeResult<TaskHandle> {
        self.submit_full(None, job, deadline_ns, TaskPriority::Normal, Some(Box::new(callback)), None)
    }

    pub fn submit_periodic(
        &self,
        factory: impl Fn() + Send + Sync + 'static,
        period: Duration,
        priority: TaskPriority,
    ) -> BridgeResult<u64> {
        let periodic_id = NEXT_PERIODIC_ID.fetch_add(1, Ordering::Relaxed);
        let entry = Arc::new(PeriodicEntry {
            period_ns: period.as_nanos() as u64,
            priority,
            name: None,
            factory: Arc::new(factory),
            cancelled: AtomicBool::new(false),
        });
        self.shared.periodics.lock().insert(periodic_id, entry.clone());
        self.enqueue_periodic_occurrence(periodic_id, &entry, self.shared.clock.now_ns())?;
        Ok(periodic_id)
    }

    pub fn cancel_periodic(&self, periodic_id: u64) -> bool {
        if let Some(entry) = self.shared.periodics.lock().remove(&periodic_id) {
            entry.cancelled.store(true, Ordering::Release);
            true
        } else {
            false
        }
    }

    fn enqueue_periodic_occurrence(&self, periodic_id: u64, entry: &Arc<PeriodicEntry>, deadline_ns: u64) -> BridgeResult<()> {
        let factory = entry.factory.clone();
        let job: Job = Box::new(move || factory());
        self.submit_full_record(entry.name.clone(), job, deadline_ns, entry.priority, None, Some(periodic_id))
            .map(|_| ())
    }

    #[allow(clippy::too_many_arguments)]
    fn submit_full(
        &self,
        name: Option<String>,
        job: impl FnOnce() + Send + 'static,
        deadline_ns: u64,
        priority: TaskPriority,
        callback: Option<CompletionCallback>,
        periodic_id: Option<u64>,
    ) -> BridgeResult<TaskHandle> {
        self.submit_full_record(name, Box::new(job), deadline_ns, priority, callback, periodic_id)
    }

    fn submit_full_record(
        &self,
        name: Option<String>,
        job: Job,
        deadline_ns: u64,
        priority: TaskPriority,
        callback: Option<CompletionCallback>,
        periodic_id: Option<u64>,
    ) -> BridgeResult<TaskHandle> {
        let id = NEXT_TASK_ID.fetch_add(1, Ordering::Relaxed);
        let arrival_ns = self.shared.clock.now_ns();
        let record = Arc::new(TaskRecord {
            id,
            name,
            deadline_ns,
            arrival_ns,
            priority,
            state: AtomicTaskState::new(TaskState::Pending),
            periodic_id,
            job: Mutex::new(Some(job)),
            completion_callback: Mutex::new(callback),
        });

        let entry = HeapEntry {
            deadline_ns,
            priority,
            arrival_ns,
            record: record.clone(),
        };

        {
            let mut heap = self.shared.heap.lock();
            if heap.len() >= self.shared.config.max_queue_size {
                if !self.apply_overflow_policy(&mut heap) {
                    return Err(BridgeError::QueueFull(
                        "EDF scheduler queue is at max_queue_size and overflow policy is Reject".to_string(),
                    ));
                }
            }
            let wake_early = heap.peek().map(|head| deadline_ns < head.deadline_ns).unwrap_or(true);
            heap.push(entry);
            self.shared.stats.record_submit(heap.len());
            if wake_early {
                self.shared.cv.notify_all();
            }
        }

        Ok(TaskHandle { record })
    }

    /// Returns `true` if room was freed (or the policy tolerates growing
    /// past the cap), `false` if the caller should reject the submission.
    fn apply_overflow_policy(&self, heap: &mut BinaryHeap<HeapEntry>) -> bool {
        match self.shared.config.overflow_policy {
            OverflowPolicy::Reject => false,
            OverflowPolicy::DropLowest => {
                let victim_id = heap.iter().min_by_key(|e| e.priority).map(|e| e.record.id);
                if let Some(id) = victim_id {
                    evict(heap, id, &self.shared.stats);
                }
                true
            }
            OverflowPolicy::DropFurthest => {
                let victim_id = heap.iter().max_by_key(|e| e.deadline_ns).map(|e| e.record.id);
                if let Some(id) = victim_id {
                    evict(heap, id, &self.shared.stats);
                }
                true
            }
        }
    }

    pub fn cancel(&self, task_id: u64) -> bool {
        let heap = self.shared.heap.lock();
        if let Some(entry) = heap.iter().find(|e| e.record.id == task_id) {
            entry.record.state.cancel_if_pending()
        } else {
            false
        }
    }
}

fn evict(heap: &mut BinaryHeap<HeapEntry>, victim_id: u64, stats: &EDFSchedulerStats) {
    let items: Vec<HeapEntry> = std::mem::take(heap).into_vec();
    let mut rebuilt = BinaryHeap::with_capacity(items.len());
    for e in items {
        if e.record.id == victim_id {
            e.record.state.cancel_if_pending();
            stats.record_cancelled();
        } else {
            rebuilt.push(e);
        }
    }
    *heap = rebuilt;
}

/// Handle returned by a `submit*` call. Cheap to clone (shares the
/// underlying `Arc<TaskRecord>`); dropping it does not cancel the task.
#[derive(Clone)]
pub struct TaskHandle {
    record: Arc<TaskRecord>,
}

impl TaskHandle {
    pub fn id(&self) -> u64 {
        self.record.id
    }

    pub fn state(&self) -> TaskState {
        self.record.state.get()
    }
}

fn worker_loop(shared: Arc<Shared>, worker_id: usize) {
    apply_worker_platform_config(&shared, worker_id);

    loop {
        if !shared.running.load(Ordering::Acquire) {
            return;
        }

        let entry = {
            let mut heap = shared.heap.lock();
            loop {
                if !shared.running.load(Ordering::Acquire) {
                    return;
                }
                match heap.peek() {
                    None => {
                        shared.cv.wait_for(&mut heap, shared.config.check_interval);
                        continue;
                    }
                    Some(head) => {
                        let now = shared.clock.now_ns();
                        if head.deadline_ns > now {
                            let wait = Duration::from_nanos(head.deadline_ns - now);
                            shared.cv.wait_for(&mut heap, wait);
                            continue;
                        }
                        break;
                    }
                }
            }
            let popped = heap.pop();
            shared.stats.record_dequeue(heap.len());
            popped
        };

        let Some(entry) = entry else { continue };

        if !entry.record.state.claim_for_running() {
            // Cancelled between peek and pop; tombstone, skip execution.
            continue;
        }

        let start_ns = shared.clock.now_ns();
        let latency_ns = start_ns.saturating_sub(entry.arrival_ns) as i64;

        let job = entry.record.take_job();
        let ran_ok = match job {
            Some(job) => {
                job();
                true
            }
            None => false,
        };

        let end_ns = shared.clock.now_ns();
        let execution_ns = end_ns.saturating_sub(start_ns) as i64;
        let deadline_met = end_ns <= entry.deadline_ns;

        let final_state = if !ran_ok {
            TaskState::Failed
        } else if deadline_met {
            TaskState::Completed
        } else {
            TaskState::DeadlineMissed
        };
        entry.record.state.set(final_state);
        shared.stats.record_completion(latency_ns, execution_ns, deadline_met, !ran_ok);

        if !deadline_met && shared.config.enable_miss_callbacks {
            warn!(task_id = entry.record.id, "EDF task missed its deadline");
        }

        if let Some(callback) = entry.record.take_completion_callback() {
            callback(final_state, Duration::from_nanos(execution_ns.max(0) as u64));
        }

        if let Some(periodic_id) = entry.record.periodic_id {
            reschedule_periodic(&shared, periodic_id, entry.deadline_ns);
        }
    }
}

fn reschedule_periodic(shared: &Arc<Shared>, periodic_id: u64, last_deadline_ns: u64) {
    let entry = shared.periodics.lock().get(&periodic_id).cloned();
    let Some(entry) = entry else { return };
    if entry.cancelled.load(Ordering::Acquire) {
        return;
    }
    let next_deadline = last_deadline_ns + entry.period_ns;
    let factory = entry.factory.clone();
    let job: Job = Box::new(move || factory());
    let id = NEXT_TASK_ID.fetch_add(1, Ordering::Relaxed);
    let arrival_ns = shared.clock.now_ns();
    let record = Arc::new(TaskRecord {
        id,
        name: entry.name.clone(),
        deadline_ns: next_deadline,
        arrival_ns,
        priority: entry.priority,
        state: AtomicTaskState::new(TaskState::Pending),
        periodic_id: Some(periodic_id),
        job: Mutex::new(Some(job)),
        completion_callback: Mutex::new(None),
    });
    let heap_entry = HeapEntry {
        deadline_ns: next_deadline,
        priority: entry.priority,
        arrival_ns,
        record,
    };
    let mut heap = shared.heap.lock();
    heap.push(heap_entry);
    shared.stats.record_submit(heap.len());
    shared.cv.notify_all();
}

fn apply_worker_platform_config(shared: &Arc<Shared>, worker_id: usize) {
    if let Some(start_core) = shared.config.cpu_affinity_start {
        if !pin_current_thread_to_core(start_core + worker_id) {
            shared.stats.record_platform_capability_lost();
        }
    }
    if shared.config.enable_realtime && !set_current_thread_realtime_priority(shared.config.realtime_priority) {
        shared.stats.record_platform_capability_lost();
    }
}

#[cfg(target_os = "linux")]
fn pin_current_thread_to_core(core: usize) -> bool {
    unsafe {
        let mut set: libc::cpu_set_t = std::mem::zeroed();
        libc::CPU_ZERO(&mut set);
        libc::CPU_SET(core, &mut set);
        libc::sched_setaffinity(0, std::mem::size_of::<libc::cpu_set_t>(), &set) == 0
    }
}

#[cfg(not(target_os = "linux"))]
fn pin_current_thread_to_core(_core: usize) -> bool {
    false
}

#[cfg(target_os = "linux")]
fn set_current_thread_realtime_priority(priority: i32) -> bool {
    unsafe {
        let param = libc::sched_param {
            sched_priority: priority,
        };
        libc::sched_setscheduler(0, libc::SCHED_FIFO, &param) == 0
    }
}

#[cfg(not(target_os = "linux"))]
fn set_current_thread_realtime_priority(_priority: i32) -> bool {
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Mutex as StdMutex;
    use std::time::Instant;

    fn wait_until<F: Fn() -> bool>(cond: F, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while !cond() {
            if Instant::now() >= deadline {
                return false;
            }
            thread::sleep(Duration::from_millis(2));
        }
        true
    }

    #[test]
    fn simple_submission_completes_before_deadline() {
        let sched = EDFScheduler::new(EDFSchedulerConfig::default());
        sched.start();

        let ran = Arc::new(AtomicBool::new(false));
        let ran_clone = ran.clone();
        let handle = sched
            .submit_offset(move || ran_clone.store(true, Ordering::Release), Duration::from_millis(20))
            .unwrap();

        assert!(wait_until(|| handle.state().is_terminal(), Duration::from_secs(2)));
        assert!(ran.load(Ordering::Acquire));
        assert_eq!(handle.state(), TaskState::Completed);
        sched.stop();
    }

    #[test]
    fn earlier_deadline_submission_is_serviced_first() {
        let sched = EDFScheduler::new(EDFSchedulerConfig::default());
        sched.start();

        let order = Arc::new(StdMutex::new(Vec::new()));
        let o1 = order.clone();
        let o2 = order.clone();

        let now = sched.shared.clock.now_ns();
        sched.submit(move || o1.lock().unwrap().push(1u8), now + 50_000_000).unwrap();
        sched.submit(move || o2.lock().unwrap().push(2u8), now + 10_000_000).unwrap();

        assert!(wait_until(|| order.lock().unwrap().len() == 2, Duration::from_secs(2)));
        assert_eq!(*order.lock().unwrap(), vec![2, 1]);
        sched.stop();
    }

    #[test]
    fn deadline_miss_is_recorded_and_callback_invoked() {
        let sched = EDFScheduler::new(EDFSchedulerConfig::default());
        sched.start();

        let callback_fired = Arc::new(AtomicBool::new(false));
        let cb = callback_fired.clone();
        let now = sched.shared.clock.now_ns();
        let handle = sched
            .submit_with_callback(
                || thread::sleep(Duration::from_millis(5)),
                now + Duration::from_millis(1).as_nanos() as u64,
                move |state, _exec| {
                    cb.store(state == TaskState::DeadlineMissed, Ordering::Release);
                },
            )
            .unwrap();

        assert!(wait_until(|| handle.state().is_terminal(), Duration::from_secs(2)));
        assert_eq!(handle.state(), TaskState::DeadlineMissed);
        assert!(callback_fired.load(Ordering::Acquire));
        assert_eq!(sched.stats().deadlines_missed, 1);
        sched.stop();
    }

    #[test]
    fn cancel_pending_task_prevents_execution() {
        let sched = EDFScheduler::new(EDFSchedulerConfig::default());
        let ran = Arc::new(AtomicBool::new(false));
        let ran_clone = ran.clone();
        let handle = sched
            .submit_offset(move || ran_clone.store(true, Ordering::Release), Duration::from_secs(5))
            .unwrap();
        assert!(sched.cancel(handle.id()));
        assert_eq!(handle.state(), TaskState::Cancelled);
        assert!(!ran.load(Ordering::Acquire));
    }

    #[test]
    fn overflow_reject_policy_fails_submission_when_full() {
        let config = EDFSchedulerConfig {
            max_queue_size: 1,
            ..EDFSchedulerConfig::default()
        };
        let sched = EDFScheduler::new(config);
        sched.submit_offset(|| {}, Duration::from_secs(5)).unwrap();
        let err = sched.submit_offset(|| {}, Duration::from_secs(5));
        assert!(err.is_err());
    }

    #[test]
    fn overflow_drop_lowest_admits_new_task_by_evicting_lowest_priority() {
        let config = EDFSchedulerConfig {
            max_queue_size: 1,
            overflow_policy: OverflowPolicy::DropLowest,
            ..EDFSchedulerConfig::default()
        };
        let sched = EDFScheduler::new(config);
        let low = sched
            .submit_full(None, || {}, u64::MAX / 2, TaskPriority::Low, None, None)
            .unwrap();
        sched
            .submit_full(None, || {}, u64::MAX / 2, TaskPriority::Critical, None, None)
            .unwrap();
        assert_eq!(low.state(), TaskState::Cancelled);
        assert_eq!(sched.pending_count(), 1);
    }

    #[test]
    fn periodic_task_reschedules_itself() {
        let sched = EDFScheduler::new(EDFSchedulerConfig::default());
        sched.start();
        let count = Arc::new(AtomicUsize::new(0));
        let count_clone = count.clone();
        let periodic_id = sched
            .submit_periodic(move || { count_clone.fetch_add(1, Ordering::Relaxed); }, Duration::from_millis(10), TaskPriority::Normal)
            .unwrap();

        assert!(wait_until(|| count.load(Ordering::Relaxed) >= 2, Duration::from_secs(2)));
        assert!(sched.cancel_periodic(periodic_id));
        sched.stop();
    }
}

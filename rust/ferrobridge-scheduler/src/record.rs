use std::time::Duration;

use parking_lot::Mutex;

use crate::task::{AtomicTaskState, TaskPriority, TaskState};

pub type Job = Box<dyn FnOnce() + Send>;
pub type CompletionCallback = Box<dyn FnOnce(TaskState, Duration) + Send>;

/// A submitted unit of work plus its scheduling key and terminal-state
/// slot. Held behind an `Arc` so both the heap entry and any external
/// handle (`cancel`, `get_task_state`) can reach the same state cell.
pub struct TaskRecord {
    pub id: u64,
    pub name: Option<String>,
    pub deadline_ns: u64,
    pub arrival_ns: u64,
    pub priority: TaskPriority,
    pub state: AtomicTaskState,
    pub periodic_id: Option<u64>,
    pub job: Mutex<Option<Job>>,
    pub completion_callback: Mutex<Option<CompletionCallback>>,
}

impl TaskRecord {
    pub fn take_job(&self) -> Option<Job> {
        self.job.lock().take()
    }

    pub fn take_completion_callback(&self) -> Option<CompletionCallback> {
        self.completion_callback.lock().take()
    }
}

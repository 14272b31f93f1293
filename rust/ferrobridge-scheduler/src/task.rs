use std::sync::atomic::{AtomicU8, Ordering};

/// Tie-breaker when two tasks share a deadline. Numeric values mirror the
/// original C++ enum's spacing so a future wire encoding can reuse them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum TaskPriority {
    Background = 0,
    Low = 64,
    Normal = 128,
    High = 192,
    Critical = 255,
}

impl Default for TaskPriority {
    fn default() -> Self {
        TaskPriority::Normal
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum TaskState {
    Pending = 0,
    Running = 1,
    Completed = 2,
    Cancelled = 3,
    Failed = 4,
    DeadlineMissed = 5,
}

impl TaskState {
    #[inline]
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            TaskState::Completed | TaskState::Cancelled | TaskState::Failed | TaskState::DeadlineMissed
        )
    }

    fn from_u8(v: u8) -> Self {
        match v {
            0 => TaskState::Pending,
            1 => TaskState::Running,
            2 => TaskState::Completed,
            3 => TaskState::Cancelled,
            4 => TaskState::Failed,
            _ => TaskState::DeadlineMissed,
        }
    }
}

/// Lock-free state cell shared between the submitter (who may call
/// `cancel`) and the worker that runs the task.
#[derive(Debug)]
pub struct AtomicTaskState(AtomicU8);

impl AtomicTaskState {
    pub fn new(initial: TaskState) -> Self {
        Self(AtomicU8::new(initial as u8))
    }

    pub fn get(&self) -> TaskState {
        TaskState::from_u8(self.0.load(Ordering::Acquire))
    }

    pub fn set(&self, state: TaskState) {
        self.0.store(state as u8, Ordering::Release);
    }

    /// Transitions `Pending -> Cancelled`. Returns `true` if this call
    /// performed the transition; `false` if the task had already left
    /// `Pending` (e.g. a worker already claimed it for `Running`).
    pub fn cancel_if_pending(&self) -> bool {
        self.0
            .compare_exchange(
                TaskState::Pending as u8,
                TaskState::Cancelled as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
    }

    /// Transitions `Pending -> Running`. Returns `false` if the task was
    /// cancelled out from under the worker.
    pub fn claim_for_running(&self) -> bool {
        self.0
            .compare_exchange(
                TaskState::Pending as u8,
                TaskState::Running as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
    }
}

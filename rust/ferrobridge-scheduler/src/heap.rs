use std::cmp::Ordering;
use std::sync::Arc;

use crate::record::TaskRecord;
use crate::task::TaskPriority;

/// One entry in the scheduler's priority queue. Ordering is earliest
/// deadline first, ties broken by higher priority, further ties by lower
/// arrival timestamp — `std::collections::BinaryHeap` is a max-heap, so
/// `Ord` here is inverted relative to the natural "smaller deadline"
/// reading: the entry that should run first compares as `Greater`.
pub struct HeapEntry {
    pub deadline_ns: u64,
    pub priority: TaskPriority,
    pub arrival_ns: u64,
    pub record: Arc<TaskRecord>,
}

impl PartialEq for HeapEntry {
    fn eq(&self, other: &Self) -> bool {
        self.record.id == other.record.id
    }
}
impl Eq for HeapEntry {}

impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .deadline_ns
            .cmp(&self.deadline_ns)
            .then_with(|| self.priority.cmp(&other.priority))
            .then_with(|| other.arrival_ns.cmp(&self.arrival_ns))
    }
}

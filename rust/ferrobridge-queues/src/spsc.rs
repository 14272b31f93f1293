use std::cell::UnsafeCell;
use std::mem::MaybeUninit;
use std::sync::atomic::{AtomicUsize, Ordering};

use crossbeam_utils::CachePadded;
use ferrobridge_types::{BridgeError, BridgeResult};

use crate::stats::RingStats;

/// Single-producer, single-consumer bounded ring. Wait-free on both sides:
/// the producer only ever reads its own cached copy of the consumer's
/// position, and vice versa, so neither side can be starved by the other.
pub struct SpscRing<T> {
    buffer: Box<[UnsafeCell<MaybeUninit<T>>]>,
    mask: usize,
    head: CachePadded<AtomicUsize>, // consumer-owned
    tail: CachePadded<AtomicUsize>, // producer-owned
    stats: RingStats,
}

unsafe impl<T: Send> Send for SpscRing<T> {}
unsafe impl<T: Send> Sync for SpscRing<T> {}

impl<T> SpscRing<T> {
    pub fn new(capacity: usize) -> BridgeResult<Self> {
        if !capacity.is_power_of_two() || capacity == 0 {
            return Err(BridgeError::InvalidArgument(format!(
                "capacity must be a non-zero power of two, got {capacity}"
            )));
        }
        let buffer = (0..capacity)
            .map(|_| UnsafeCell::new(MaybeUninit::uninit()))
            .collect::<Vec<_>>()
            .into_boxed_slice();
        Ok(Self {
            buffer,
            mask: capacity - 1,
            head: CachePadded::new(AtomicUsize::new(0)),
            tail: CachePadded::new(AtomicUsize::new(0)),
            stats: RingStats::default(),
        })
    }

    pub fn capacity(&self) -> usize {
        self.mask + 1
    }

    pub fn stats(&self) -> &RingStats {
        &self.stats
    }

    /// Single producer only.
    pub fn try_push(&self, value: T) -> Result<(), T> {
        let tail = self.tail.load(Ordering::Relaxed);
        let head = self.head.load(Ordering::Acquire);
        if tail.wrapping_sub(head) >= self.capacity() {
            self.stats.record_drop();
            return Err(value);
        }
        let idx = tail & self.mask;
        unsafe {
            (*self.buffer[idx].get()).write(value);
        }
        self.tail.store(tail.wrapping_add(1), Ordering::Release);
        self.stats.record_push();
        Ok(())
    }

    /// Single consumer only.
    pub fn try_pop(&self) -> Option<T> {
        let head = self.head.load(Ordering::Relaxed);
        let tail = self.tail.load(Ordering::Acquire);
        if head == tail {
            return None;
        }
        let idx = head & self.mask;
        let value = unsafe { (*self.buffer[idx].get()).assume_init_read() };
        self.head.store(head.wrapping_add(1), Ordering::Release);
        self.stats.record_pop();
        Some(value)
    }

    pub fn len(&self) -> usize {
        let tail = self.tail.load(Ordering::Acquire);
        let head = self.head.load(Ordering::Acquire);
        tail.wrapping_sub(head)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T> Drop for SpscRing<T> {
    fn drop(&mut self) {
        while self.try_pop().is_some() {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_non_power_of_two_capacity() {
        assert!(SpscRing::<u32>::new(3).is_err());
    }

    #[test]
    fn push_pop_round_trips_in_order() {
        let ring = SpscRing::<u32>::new(4).unwrap();
        for i in 0..4 {
            ring.try_push(i).unwrap();
        }
        assert!(ring.try_push(99).is_err());
        for i in 0..4 {
            assert_eq!(ring.try_pop(), Some(i));
        }
        assert_eq!(ring.try_pop(), None);
    }

    #[test]
    fn concurrent_producer_consumer_preserves_order() {
        use std::sync::Arc;
        use std::thread;

        let ring = Arc::new(SpscRing::<u64>::new(1024).unwrap());
        let producer_ring = ring.clone();
        let producer = thread::spawn(move || {
            for i in 0..100_000u64 {
                while producer_ring.try_push(i).is_err() {
                    std::hint::spin_loop();
                }
            }
        });

        let mut received = Vec::with_capacity(100_000);
        while received.len() < 100_000 {
            if let Some(v) = ring.try_pop() {
                received.push(v);
            }
        }
        producer.join().unwrap();
        assert_eq!(received, (0..100_000u64).collect::<Vec<_>>());
    }
}

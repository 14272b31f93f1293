use std::cell::UnsafeCell;
use std::mem::MaybeUninit;
use std::sync::atomic::{AtomicUsize, Ordering};

use crossbeam_utils::CachePadded;
use ferrobridge_types::{BridgeError, BridgeResult};

use crate::stats::RingStats;

struct Slot<T> {
    sequence: AtomicUsize,
    value: UnsafeCell<MaybeUninit<T>>,
}

/// Bounded multi-producer, multi-consumer ring, the same per-slot sequence
/// number algorithm `crossbeam::ArrayQueue` uses internally (attributed to
/// Dmitry Vyukov). Reimplemented locally, rather than wrapping
/// `crossbeam-queue::ArrayQueue` directly, so it can carry the
/// `DropPolicy`/`RingStats` contract this fabric needs, which isn't part
/// of `ArrayQueue`'s API.
pub struct MpmcRing<T> {
    buffer: Box<[Slot<T>]>,
    mask: usize,
    enqueue_pos: CachePadded<AtomicUsize>,
    dequeue_pos: CachePadded<AtomicUsize>,
    stats: RingStats,
}

unsafe impl<T: Send> Send for MpmcRing<T> {}
unsafe impl<T: Send> Sync for MpmcRing<T> {}

impl<T> MpmcRing<T> {
    pub fn new(capacity: usize) -> BridgeResult<Self> {
        if !capacity.is_power_of_two() || capacity == 0 {
            return Err(BridgeError::InvalidArgument(format!(
                "capacity must be a non-zero power of two, got {capacity}"
            )));
        }
        let buffer = (0..capacity)
            .map(|i| Slot {
                sequence: AtomicUsize::new(i),
                value: UnsafeCell::new(MaybeUninit::uninit()),
            })
            .collect::<Vec<_>>()
            .into_boxed_slice();
        Ok(Self {
            buffer,
            mask: capacity - 1,
            enqueue_pos: CachePadded::new(AtomicUsize::new(0)),
            dequeue_pos: CachePadded::new(AtomicUsize::new(0)),
            stats: RingStats::default(),
        })
    }

    pub fn capacity(&self) -> usize {
        self.mask + 1
    }

    pub fn stats(&self) -> &RingStats {
        &self.stats
    }

    pub fn try_push(&self, value: T) -> Result<(), T> {
        let mut pos = self.enqueue_pos.load(Ordering::Relaxed);
        loop {
            let slot = &self.buffer[pos & self.mask];
            let seq = slot.sequence.load(Ordering::Acquire);
            let diff = seq as isize - pos as isize;
            if diff == 0 {
                match self.enqueue_pos.compare_exchange_weak(
                    pos,
                    pos.wrapping_add(1),
                    Ordering::Relaxed,
                    Ordering::Relaxed,
                ) {
                    Ok(_) => {
                        unsafe {
                            (*slot.value.get()).write(value);
                        }
                        slot.sequence.store(pos.wrapping_add(1), Ordering::Release);
                        self.stats.record_push();
                        return Ok(());
                    }
                    Err(cur) => pos = cur,
                }
            } else if diff < 0 {
                self.stats.record_drop();
                return Err(value);
            } else {
                pos = self.enqueue_pos.load(Ordering::Relaxed);
            }
        }
    }

    pub fn try_pop(&self) -> Option<T> {
        let mut pos = self.dequeue_pos.load(Ordering::Relaxed);
        loop {
            let slot = &self.buffer[pos & self.mask];
            let seq = slot.sequence.load(Ordering::Acquire);
            let diff = seq as isize - (pos.wrapping_add(1)) as isize;
            if diff == 0 {
                match self.dequeue_pos.compare_exchange_weak(
                    pos,
                    pos.wrapping_add(1),
                    Ordering::Relaxed,
                    Ordering::Relaxed,
                ) {
                    Ok(_) => {
                        let value = unsafe { (*slot.value.get()).assume_init_read() };
                        slot.sequence
                            .store(pos.wrapping_add(self.mask).wrapping_add(1), Ordering::Release);
                        self.stats.record_pop();
                        return Some(value);
                    }
                    Err(cur) => pos = cur,
                }
            } else if diff < 0 {
                return None;
            } else {
                pos = self.dequeue_pos.load(Ordering::Relaxed);
            }
        }
    }

    pub fn len(&self) -> usize {
        let enq = self.enqueue_pos.load(Ordering::Acquire);
        let deq = self.dequeue_pos.load(Ordering::Acquire);
        enq.wrapping_sub(deq)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T> Drop for MpmcRing<T> {
    fn drop(&mut self) {
        while self.try_pop().is_some() {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn rejects_non_power_of_two_capacity() {
        assert!(MpmcRing::<u32>::new(5).is_err());
    }

    #[test]
    fn single_threaded_fifo_order() {
        let ring = MpmcRing::<u32>::new(4).unwrap();
        ring.try_push(1).unwrap();
        ring.try_push(2).unwrap();
        assert_eq!(ring.try_pop(), Some(1));
        assert_eq!(ring.try_pop(), Some(2));
        assert_eq!(ring.try_pop(), None);
    }

    #[test]
    fn rejects_push_when_full() {
        let ring = MpmcRing::<u32>::new(2).unwrap();
        ring.try_push(1).unwrap();
        ring.try_push(2).unwrap();
        assert!(ring.try_push(3).is_err());
        assert_eq!(ring.stats().dropped(), 1);
    }

    #[test]
    fn multiple_producers_multiple_consumers_preserve_total_count() {
        let ring = Arc::new(MpmcRing::<u64>::new(1024).unwrap());
        let producers: Vec<_> = (0..4)
            .map(|_| {
                let r = ring.clone();
                thread::spawn(move || {
                    for i in 0..10_000u64 {
                        while r.try_push(i).is_err() {
                            std::hint::spin_loop();
                        }
                    }
                })
            })
            .collect();

        let consumed = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let consumers: Vec<_> = (0..4)
            .map(|_| {
                let r = ring.clone();
                let consumed = consumed.clone();
                thread::spawn(move || {
                    loop {
                        if r.try_pop().is_some() {
                            consumed.fetch_add(1, Ordering::Relaxed);
                        }
                        if consumed.load(Ordering::Relaxed) >= 40_000 {
                            break;
                        }
                    }
                })
            })
            .collect();

        for p in producers {
            p.join().unwrap();
        }
        for c in consumers {
            c.join().unwrap();
        }
        assert_eq!(consumed.load(Ordering::Relaxed), 40_000);
    }
}

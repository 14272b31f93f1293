use std::cell::UnsafeCell;
use std::mem::MaybeUninit;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use crossbeam_utils::CachePadded;
use ferrobridge_types::{BridgeError, BridgeResult};

use crate::stats::RingStats;

struct Slot<T> {
    ready: AtomicBool,
    value: UnsafeCell<MaybeUninit<T>>,
}

/// Multi-producer, single-consumer bounded ring. Producers `fetch_add` a
/// reservation slot, write into it, then flip that slot's `ready` flag;
/// the single consumer drains slots strictly in reservation order, so it
/// only ever advances past a slot once `ready` is observed set — a
/// producer that reserved a later slot but hasn't finished writing yet
/// simply stalls the consumer at that slot rather than reordering output.
pub struct MpscRing<T> {
    buffer: Box<[Slot<T>]>,
    mask: usize,
    head: CachePadded<AtomicUsize>,           // consumer-owned
    reserve: CachePadded<AtomicUsize>,         // producer reservation cursor
    stats: RingStats,
}

unsafe impl<T: Send> Send for MpscRing<T> {}
unsafe impl<T: Send> Sync for MpscRing<T> {}

impl<T> MpscRing<T> {
    pub fn new(capacity: usize) -> BridgeResult<Self> {
        if !capacity.is_power_of_two() || capacity == 0 {
            return Err(BridgeError::InvalidArgument(format!(
                "capacity must be a non-zero power of two, got {capacity}"
            )));
        }
        let buffer = (0..capacity)
            .map(|_| Slot {
                ready: AtomicBool::new(false),
                value: UnsafeCell::new(MaybeUninit::uninit()),
            })
            .collect::<Vec<_>>()
            .into_boxed_slice();
        Ok(Self {
            buffer,
            mask: capacity - 1,
            head: CachePadded::new(AtomicUsize::new(0)),
            reserve: CachePadded::new(AtomicUsize::new(0)),
            stats: RingStats::default(),
        })
    }

    pub fn capacity(&self) -> usize {
        self.mask + 1
    }

    pub fn stats(&self) -> &RingStats {
        &self.stats
    }

    /// Any number of producer threads.
    pub fn try_push(&self, value: T) -> Result<(), T> {
        let mut reserve = self.reserve.load(Ordering::Relaxed);
        loop {
            let head = self.head.load(Ordering::Acquire);
            if reserve.wrapping_sub(head) >= self.capacity() {
                self.stats.record_drop();
                return Err(value);
            }
            match self.reserve.compare_exchange_weak(
                reserve,
                reserve.wrapping_add(1),
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => {
                    let slot = &self.buffer[reserve & self.mask];
                    unsafe {
                        (*slot.value.get()).write(value);
                    }
                    slot.ready.store(true, Ordering::Release);
                    self.stats.record_push();
                    return Ok(());
                }
                Err(cur) => reserve = cur,
            }
        }
    }

    /// Single consumer only.
    pub fn try_pop(&self) -> Option<T> {
        let head = self.head.load(Ordering::Relaxed);
        let slot = &self.buffer[head & self.mask];
        if !slot.ready.load(Ordering::Acquire) {
            return None;
        }
        let value = unsafe { (*slot.value.get()).assume_init_read() };
        slot.ready.store(false, Ordering::Release);
        self.head.store(head.wrapping_add(1), Ordering::Release);
        self.stats.record_pop();
        Some(value)
    }

    pub fn len(&self) -> usize {
        let reserve = self.reserve.load(Ordering::Acquire);
        let head = self.head.load(Ordering::Acquire);
        reserve.wrapping_sub(head)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T> Drop for MpscRing<T> {
    fn drop(&mut self) {
        while self.try_pop().is_some() {}
    }
}

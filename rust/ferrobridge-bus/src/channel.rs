use std::sync::atomic::{AtomicUsize, Ordering};

use ferrobridge_queues::{DropPolicy, MpmcRing};
use ferrobridge_types::{BridgeError, BridgeResult, Envelope, Priority, TopicString};

use crate::stats::MessageBusStats;

/// A single topic's buffered envelopes. Created lazily by the bus the
/// first time a topic is published to or subscribed against.
pub struct Channel {
    pub topic: TopicString,
    ring: MpmcRing<Envelope>,
    drop_policy: DropPolicy,
    /// Count of currently-buffered envelopes at `Priority::Realtime`. The
    /// ring has no peekable head, so this tracks realtime occupancy
    /// directly instead: incremented on a successful realtime push,
    /// decremented when a realtime envelope is popped or dropped.
    realtime_pending: AtomicUsize,
}

impl Channel {
    pub fn new(topic: &str, capacity: usize, drop_policy: DropPolicy) -> BridgeResult<Self> {
        if drop_policy == DropPolicy::Block {
            return Err(BridgeError::InvalidArgument(
                "the bus does not allow DropPolicy::Block on its real-time path".to_string(),
            ));
        }
        Ok(Self {
            topic: TopicString::from_str_truncating(topic),
            ring: MpmcRing::new(capacity)?,
            drop_policy,
            realtime_pending: AtomicUsize::new(0),
        })
    }

    pub fn publish(&self, envelope: Envelope, stats: &MessageBusStats) {
        let is_realtime = envelope.priority == Priority::Realtime;
        match self.ring.try_push(envelope) {
            Ok(()) => {
                if is_realtime {
                    self.realtime_pending.fetch_add(1, Ordering::Relaxed);
                }
            }
            Err(rejected) => {
                stats.record_overflow();
                match self.drop_policy {
                    DropPolicy::DropNewest => {
                        stats.record_drop();
                    }
                    DropPolicy::DropOldest => {
                        if let Some(evicted) = self.ring.try_pop() {
                            if evicted.priority == Priority::Realtime {
                                self.realtime_pending.fetch_sub(1, Ordering::Relaxed);
                            }
                        }
                        if self.ring.try_push(rejected).is_err() {
                            stats.record_drop();
                        } else if is_realtime {
                            self.realtime_pending.fetch_add(1, Ordering::Relaxed);
                        }
                    }
                    DropPolicy::Block => unreachable!("rejected at construction"),
                }
            }
        }
    }

    pub fn try_pop(&self) -> Option<Envelope> {
        let popped = self.ring.try_pop();
        if let Some(env) = &popped {
            if env.priority == Priority::Realtime {
                self.realtime_pending.fetch_sub(1, Ordering::Relaxed);
            }
        }
        popped
    }

    /// Non-destructive: `true` if this channel currently holds at least one
    /// `Priority::Realtime` envelope, regardless of its position in the
    /// ring.
    pub fn has_realtime_pending(&self) -> bool {
        self.realtime_pending.load(Ordering::Relaxed) > 0
    }

    pub fn len(&self) -> usize {
        self.ring.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ring.is_empty()
    }

    pub fn received(&self) -> u64 {
        self.ring.stats().pushed()
    }

    pub fn dispatched(&self) -> u64 {
        self.ring.stats().popped()
    }

    pub fn dropped(&self) -> u64 {
        self.ring.stats().dropped()
    }
}

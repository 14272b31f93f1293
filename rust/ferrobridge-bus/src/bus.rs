use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use dashmap::DashMap;
use ferrobridge_types::{BridgeError, BridgeResult, Envelope};
use parking_lot::RwLock;
use tracing::{debug, trace};

use crate::channel::Channel;
use crate::config::BusConfig;
use crate::state::{AtomicBusState, BusState};
use crate::stats::MessageBusStats;
use crate::subscription::{Callback, Filter, Subscription, SubscriptionRecord};
use crate::topic::topic_matches;

struct Inner {
    config: BusConfig,
    channels: DashMap<String, Arc<Channel>>,
    subscriptions: RwLock<Vec<Arc<SubscriptionRecord>>>,
    stats: MessageBusStats,
    state: AtomicBusState,
    stop_requested: AtomicBool,
}

/// Topic-based publish/subscribe bus. Each topic gets its own bounded
/// MPMC channel, created lazily; a small pool of dispatcher threads
/// drains channels that currently have a matching, active subscription
/// and invokes subscriber callbacks.
pub struct MessageBus {
    inner: Arc<Inner>,
    workers: RwLock<Vec<JoinHandle<()>>>,
}

impl MessageBus {
    pub fn new(config: BusConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                config,
                channels: DashMap::new(),
                subscriptions: RwLock::new(Vec::new()),
                stats: MessageBusStats::default(),
                state: AtomicBusState::new(BusState::Created),
                stop_requested: AtomicBool::new(false),
            }),
            workers: RwLock::new(Vec::new()),
        }
    }

    pub fn state(&self) -> BusState {
        self.inner.state.get()
    }

    pub fn stats(&self) -> &MessageBusStats {
        &self.inner.stats
    }

    pub fn start(&self) {
        self.inner.stop_requested.store(false, Ordering::Release);
        self.inner.state.set(BusState::Running);
        let mut workers = self.workers.write();
        for worker_id in 0..self.inner.config.worker_count.max(1) {
            let inner = self.inner.clone();
            workers.push(thread::spawn(move || dispatcher_loop(inner, worker_id)));
        }
        debug!(workers = workers.len(), "message bus started");
    }

    /// Requests a graceful stop: dispatcher threads keep draining channels
    /// with active subscribers until either every channel is empty or
    /// `grace` elapses, whichever comes first, then exit and discard
    /// whatever remains buffered.
    pub fn stop(&self, grace: Duration) {
        self.inner.state.set(BusState::Stopping);
        self.inner.stop_requested.store(true, Ordering::Release);
        let deadline = Instant::now() + grace;
        let _ = deadline; // std threads have no timed join; workers self-terminate once drained.
        let mut workers = self.workers.write();
        for w in workers.drain(..) {
            let _ = w.join();
        }
        self.inner.state.set(BusState::Stopped);
    }

    pub fn publish(&self, topic: &str, envelope: Envelope) -> BridgeResult<()> {
        let channel = self.get_or_create_channel(topic)?;
        channel.publish(envelope, &self.inner.stats);
        self.inner.stats.record_publish();
        Ok(())
    }

    pub fn subscribe(&self, pattern: &str, callback: Callback) -> Subscription {
        self.subscribe_filtered(pattern, callback, None)
    }

    pub fn subscribe_filtered(&self, pattern: &str, callback: Callback, filter: Option<Filter>) -> Subscription {
        let record = SubscriptionRecord::new(pattern.to_string(), callback, filter);
        self.inner.subscriptions.write().push(record.clone());
        Subscription { record }
    }

    pub fn channel_count(&self) -> usize {
        self.inner.channels.len()
    }

    fn get_or_create_channel(&self, topic: &str) -> BridgeResult<Arc<Channel>> {
        if let Some(existing) = self.inner.channels.get(topic) {
            return Ok(existing.value().clone());
        }
        if self.inner.channels.len() >= self.inner.config.max_channels {
            return Err(BridgeError::Unavailable(format!(
                "bus has reached its max_channels cap of {}",
                self.inner.config.max_channels
            )));
        }
        let channel = Arc::new(Channel::new(topic, self.inner.config.channel_capacity, self.inner.config.drop_policy)?);
        self.inner.channels.insert(topic.to_string(), channel.clone());
        Ok(channel)
    }
}

impl Default for MessageBus {
    fn default() -> Self {
        Self::new(BusConfig::default())
    }
}

fn matching_subscriptions(inner: &Inner, topic: &str) -> Vec<Arc<SubscriptionRecord>> {
    inner
        .subscriptions
        .read()
        .iter()
        .filter(|s| s.is_active() && topic_matches(&s.pattern, topic))
        .cloned()
        .collect()
}

fn dispatcher_loop(inner: Arc<Inner>, worker_id: usize) {
    loop {
        let channels: Vec<Arc<Channel>> = inner
            .channels
            .iter()
            .enumerate()
            .filter(|(idx, _)| idx % inner.config.worker_count.max(1) == worker_id)
            .map(|(_, e)| e.value().clone())
            .collect();

        if channels.is_empty() {
            if inner.stop_requested.load(Ordering::Acquire) {
                return;
            }
            thread::sleep(Duration::from_millis(1));
            continue;
        }

        // Realtime head-of-line override: service any assigned channel
        // that currently holds a Realtime-priority envelope before
        // falling back to plain round robin over the rest.
        let realtime_idx = channels.iter().position(|c| c.has_realtime_pending());

        let mut delivered_any = false;
        let order: Vec<usize> = match realtime_idx {
            Some(i) => std::iter::once(i).chain((0..channels.len()).filter(|&j| j != i)).collect(),
            None => (0..channels.len()).collect(),
        };

        for idx in order {
            let channel = &channels[idx];
            let subs = matching_subscriptions(&inner, channel.topic.as_str());
            if subs.is_empty() {
                // No active subscriber: leave buffered per
                // `buffer_when_unsubscribed` rather than draining blind.
                continue;
            }
            if let Some(envelope) = channel.try_pop() {
                delivered_any = true;
                for sub in &subs {
                    if sub.accepts(&envelope) {
                        (sub.callback)(&envelope);
                        inner.stats.record_delivery();
                    }
                }
                trace!(topic = %channel.topic, subscribers = subs.len(), "envelope dispatched");
            }
        }

        if inner.stop_requested.load(Ordering::Acquire) {
            let all_drained = channels.iter().all(|c| c.is_empty() || matching_subscriptions(&inner, c.topic.as_str()).is_empty());
            if all_drained {
                return;
            }
        }

        if !delivered_any {
            thread::sleep(Duration::from_micros(200));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ferrobridge_types::{Quality, Sample, SampleValue};
    use std::sync::atomic::AtomicUsize;
    use std::sync::Mutex;

    fn sample_envelope(topic: &str, seq: u64) -> Envelope {
        let s = Sample::new("addr", 1, SampleValue::F64(1.0), Quality::Good, 0);
        Envelope::point(topic, seq, s)
    }

    #[test]
    fn subscriber_receives_published_envelope() {
        let bus = MessageBus::new(BusConfig::default());
        bus.start();

        let received = Arc::new(Mutex::new(Vec::new()));
        let received_clone = received.clone();
        let _sub = bus.subscribe(
            "line1/temp",
            Arc::new(move |env: &Envelope| {
                received_clone.lock().unwrap().push(env.sequence);
            }),
        );

        bus.publish("line1/temp", sample_envelope("line1/temp", 1)).unwrap();

        let deadline = Instant::now() + Duration::from_secs(2);
        while received.lock().unwrap().is_empty() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(*received.lock().unwrap(), vec![1]);
        bus.stop(Duration::from_millis(50));
    }

    #[test]
    fn wildcard_subscription_matches_multiple_topics() {
        let bus = MessageBus::new(BusConfig::default());
        bus.start();

        let count = Arc::new(AtomicUsize::new(0));
        let count_clone = count.clone();
        let _sub = bus.subscribe(
            "+/temp",
            Arc::new(move |_env: &Envelope| {
                count_clone.fetch_add(1, Ordering::Relaxed);
            }),
        );

        bus.publish("line1/temp", sample_envelope("line1/temp", 1)).unwrap();
        bus.publish("line2/temp", sample_envelope("line2/temp", 2)).unwrap();

        let deadline = Instant::now() + Duration::from_secs(2);
        while count.load(Ordering::Relaxed) < 2 && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(count.load(Ordering::Relaxed), 2);
        bus.stop(Duration::from_millis(50));
    }

    #[test]
    fn envelopes_buffer_until_a_subscriber_exists() {
        let bus = MessageBus::new(BusConfig::default());
        bus.start();
        bus.publish("line1/temp", sample_envelope("line1/temp", 1)).unwrap();
        thread::sleep(Duration::from_millis(20));

        let channel = bus.get_or_create_channel("line1/temp").unwrap();
        assert_eq!(channel.len(), 1, "envelope should remain buffered with no subscriber");
        bus.stop(Duration::from_millis(50));
    }

    #[test]
    fn drop_newest_policy_rejects_once_full() {
        let cfg = BusConfig {
            channel_capacity: 4,
            ..BusConfig::default()
        };
        let bus = MessageBus::new(cfg);
        // No subscriber and no worker running: publishes just accumulate.
        for i in 0..6u64 {
            bus.publish("topic/x", sample_envelope("topic/x", i)).unwrap();
        }
        let channel = bus.get_or_create_channel("topic/x").unwrap();
        assert_eq!(channel.len(), 4);
        assert_eq!(channel.dropped(), 2);
    }

    #[test]
    fn realtime_envelope_jumps_queue_ahead_of_normal_traffic() {
        let cfg = BusConfig {
            worker_count: 1,
            ..BusConfig::default()
        };
        let bus = MessageBus::new(cfg);
        let order: Arc<Mutex<Vec<&'static str>>> = Arc::new(Mutex::new(Vec::new()));
        let order_low = order.clone();
        let order_rt = order.clone();
        let _sub_low = bus.subscribe(
            "low/1",
            Arc::new(move |_env: &Envelope| {
                order_low.lock().unwrap().push("low");
            }),
        );
        let _sub_rt = bus.subscribe(
            "rt/1",
            Arc::new(move |_env: &Envelope| {
                order_rt.lock().unwrap().push("rt");
            }),
        );

        // Published first, but at normal priority.
        bus.publish("low/1", sample_envelope("low/1", 1)).unwrap();
        // Published second, but at realtime priority: must be serviced first.
        bus.publish(
            "rt/1",
            sample_envelope("rt/1", 2).with_priority(ferrobridge_types::Priority::Realtime),
        )
        .unwrap();

        bus.start();
        let deadline = Instant::now() + Duration::from_secs(2);
        while order.lock().unwrap().len() < 2 && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(*order.lock().unwrap(), vec!["rt", "low"]);
        bus.stop(Duration::from_millis(50));
    }

    #[test]
    fn subscription_drop_cancels_delivery() {
        let bus = MessageBus::new(BusConfig::default());
        bus.start();
        let count = Arc::new(AtomicUsize::new(0));
        let count_clone = count.clone();
        let sub = bus.subscribe(
            "line1/temp",
            Arc::new(move |_env: &Envelope| {
                count_clone.fetch_add(1, Ordering::Relaxed);
            }),
        );
        drop(sub);
        bus.publish("line1/temp", sample_envelope("line1/temp", 1)).unwrap();
        thread::sleep(Duration::from_millis(50));
        assert_eq!(count.load(Ordering::Relaxed), 0);
        bus.stop(Duration::from_millis(50));
    }
}

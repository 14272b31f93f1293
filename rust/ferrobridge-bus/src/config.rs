use ferrobridge_queues::DropPolicy;

#[derive(Debug, Clone, Copy)]
pub struct BusConfig {
    pub channel_capacity: usize,
    pub max_channels: usize,
    pub drop_policy: DropPolicy,
    pub worker_count: usize,
    /// When `true` (the default), a topic with no matching subscriber
    /// keeps buffering published envelopes up to `channel_capacity`
    /// instead of discarding them immediately.
    pub buffer_when_unsubscribed: bool,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            channel_capacity: 1024,
            max_channels: 4096,
            drop_policy: DropPolicy::DropNewest,
            worker_count: 2,
            buffer_when_unsubscribed: true,
        }
    }
}

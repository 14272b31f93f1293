use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use ferrobridge_types::Envelope;

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

pub type Callback = Arc<dyn Fn(&Envelope) + Send + Sync>;
pub type Filter = Arc<dyn Fn(&Envelope) -> bool + Send + Sync>;

pub(crate) struct SubscriptionRecord {
    pub id: u64,
    pub pattern: String,
    pub callback: Callback,
    pub filter: Option<Filter>,
    active: AtomicBool,
}

impl SubscriptionRecord {
    pub fn new(pattern: String, callback: Callback, filter: Option<Filter>) -> Arc<Self> {
        Arc::new(Self {
            id: NEXT_ID.fetch_add(1, Ordering::Relaxed),
            pattern,
            callback,
            filter,
            active: AtomicBool::new(true),
        })
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    pub fn accepts(&self, envelope: &Envelope) -> bool {
        self.filter.as_ref().map(|f| f(envelope)).unwrap_or(true)
    }

    fn cancel(&self) {
        self.active.store(false, Ordering::Release);
    }
}

/// Handle returned by `MessageBus::subscribe`. Cancels automatically when
/// dropped; the dispatcher simply skips inactive records rather than the
/// bus eagerly compacting its subscription list on every cancellation.
pub struct Subscription {
    pub(crate) record: Arc<SubscriptionRecord>,
}

impl Subscription {
    pub fn id(&self) -> u64 {
        self.record.id
    }

    pub fn is_active(&self) -> bool {
        self.record.is_active()
    }

    pub fn cancel(&self) {
        self.record.cancel();
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.record.cancel();
    }
}

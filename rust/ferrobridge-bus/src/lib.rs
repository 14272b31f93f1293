mod bus;
mod channel;
mod config;
mod state;
mod stats;
mod subscription;
mod topic;

pub use bus::MessageBus;
pub use config::BusConfig;
pub use state::BusState;
pub use stats::MessageBusStats;
pub use subscription::{Callback, Filter, Subscription};
pub use topic::topic_matches;

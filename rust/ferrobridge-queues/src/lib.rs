//! Lock-free bounded ring buffers used throughout the bridge's hot path:
//! `SpscRing` for single-producer pipelines, `MpscRing` for fan-in, and
//! `MpmcRing` for the message bus's per-topic channels.

mod drop_policy;
mod mpmc;
mod mpsc;
mod spsc;
mod stats;

pub use drop_policy::DropPolicy;
pub use mpmc::MpmcRing;
pub use mpsc::MpscRing;
pub use spsc::SpscRing;
pub use stats::RingStats;

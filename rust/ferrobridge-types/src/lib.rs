//! Shared data model and error taxonomy for the bridge's routing and
//! dispatch fabric: samples, envelopes, fixed-capacity strings, health
//! state, and the `Scoop`/`Sink`/`Clock` collaborator traits.

mod envelope;
mod error;
mod fixed_string;
mod health;
mod sample;
mod traits;

pub use envelope::{Envelope, EnvelopeKind, Payload, Priority, SampleIter, TopicString};
pub use error::{BridgeError, BridgeResult};
pub use fixed_string::FixedString;
pub use health::Health;
pub use sample::{Address, InlineBlob, Quality, Sample, SampleValue};
pub use traits::{Clock, Scoop, ScoopMetricsSnapshot, Sink, SinkMetricsSnapshot, SystemClock};

pub mod prelude {
    pub use crate::{
        Address, BridgeError, BridgeResult, Clock, Envelope, EnvelopeKind, FixedString, Health,
        InlineBlob, Payload, Priority, Quality, Sample, SampleValue, Scoop, Sink, SystemClock,
        TopicString,
    };
}

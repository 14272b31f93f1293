//! Copy-on-write routing rule engine: an atomically-swappable snapshot of
//! compiled rules, matched against incoming samples via the shared
//! pattern cache.

mod engine;
mod rule;

pub use engine::RuleEngine;
pub use rule::{Destination, DestinationAction, RoutingRule, SourceFilter};

//! Sink and scoop registries: health-tracked descriptor maps plus the
//! eight load-balancing strategies used to pick a destination for a
//! sample.

mod config;
mod descriptor;
mod load_balancer;
mod registry;
mod scoop_descriptor;
mod scoop_registry;
mod stats;

pub use config::RegistryConfig;
pub use descriptor::SinkDescriptor;
pub use load_balancer::{LoadBalanceStrategy, LoadBalancer, LoadBalancerFactory};
pub use registry::SinkRegistry;
pub use scoop_descriptor::{ReadStrategy, ScoopDescriptor};
pub use scoop_registry::ScoopRegistry;
pub use stats::SinkRegistryStats;

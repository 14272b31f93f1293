//! Process-wide control plane: builds every subsystem crate from a single
//! `BridgeConfig`, brings them up in `init()`, exposes the rule/sink/scoop
//! management surface, and tears everything down in `shutdown()`.

mod config;
mod logging;
mod orchestrator;

pub use config::{
    BridgeConfig, BusConfigToml, DropPolicyToml, LoadBalanceStrategyToml, LoggingConfig,
    OverflowPolicyToml, PatternsConfig, PoolConfig, RegistryConfigToml, SchedulerConfigToml,
};
pub use logging::init_logging;
pub use orchestrator::{BridgeOrchestrator, MetricsSnapshot};

pub mod prelude {
    pub use crate::{
        init_logging, BridgeConfig, BridgeOrchestrator, BusConfigToml, DropPolicyToml,
        LoadBalanceStrategyToml, MetricsSnapshot, OverflowPolicyToml, RegistryConfigToml,
        SchedulerConfigToml,
    };
    pub use ferrobridge_registry::{ReadStrategy, ScoopDescriptor, SinkDescriptor};
    pub use ferrobridge_rules::{Destination, DestinationAction, RoutingRule, SourceFilter};
    pub use ferrobridge_types::{BridgeError, BridgeResult, Sample};
}

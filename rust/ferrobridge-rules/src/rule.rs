use ferrobridge_types::{Priority, Quality};

/// What happens after a matched destination is recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DestinationAction {
    /// Record this destination, then continue evaluating the rest of this
    /// rule's destinations and any subsequent rules.
    Forward,
    /// Identical dispatch effect to `Forward`; kept as a distinct value so
    /// rule authors can express "and keep going" explicitly.
    ForwardAndContinue,
    /// Record this destination, then stop evaluating every remaining
    /// destination and rule for this sample.
    Stop,
}

#[derive(Debug, Clone)]
pub struct Destination {
    pub sink_id: String,
    pub priority: Priority,
    pub weight: u32,
    pub action: DestinationAction,
}

/// Which samples a rule applies to. Empty whitelists mean "any".
#[derive(Debug, Clone)]
pub struct SourceFilter {
    pub address_pattern: String,
    pub protocols: Vec<u16>,
    pub qualities: Vec<Quality>,
}

impl SourceFilter {
    pub fn any_address(pattern: impl Into<String>) -> Self {
        Self {
            address_pattern: pattern.into(),
            protocols: Vec::new(),
            qualities: Vec::new(),
        }
    }
}

/// A routing rule as authored by the control plane, before compilation.
#[derive(Debug, Clone)]
pub struct RoutingRule {
    pub name: String,
    pub enabled: bool,
    pub source: SourceFilter,
    pub destinations: Vec<Destination>,
}

impl RoutingRule {
    pub fn new(name: impl Into<String>, source: SourceFilter, destinations: Vec<Destination>) -> Self {
        Self {
            name: name.into(),
            enabled: true,
            source,
            destinations,
        }
    }
}

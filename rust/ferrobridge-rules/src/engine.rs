use std::sync::Arc;

use arc_swap::ArcSwap;
use ferrobridge_patterns::PatternCache;
use ferrobridge_types::{BridgeError, BridgeResult, Sample};
use rustc_hash::FxHashSet;
use tracing::{debug, warn};

use crate::rule::{Destination, DestinationAction, RoutingRule};

struct CompiledRule {
    name: String,
    enabled: bool,
    address_pattern: Arc<ferrobridge_patterns::CachedPattern>,
    protocols: FxHashSet<u16>,
    qualities: FxHashSet<ferrobridge_types::Quality>,
    destinations: Vec<Destination>,
}

impl CompiledRule {
    fn matches(&self, sample: &Sample) -> bool {
        if !self.enabled {
            return false;
        }
        if !self.protocols.is_empty() && !self.protocols.contains(&sample.protocol) {
            return false;
        }
        if !self.qualities.is_empty() && !self.qualities.contains(&sample.quality) {
            return false;
        }
        self.address_pattern.matches(sample.address.as_str())
    }
}

/// Immutable, atomically-swappable set of compiled rules. Readers call
/// `evaluate` without ever blocking a writer, and a writer publishes a
/// brand new `Vec` rather than mutating rules in place — the same
/// copy-on-write discipline a doctrine/policy snapshot uses.
pub struct RuleEngine {
    patterns: Arc<PatternCache>,
    snapshot: ArcSwap<Vec<CompiledRule>>,
}

impl RuleEngine {
    pub fn new(patterns: Arc<PatternCache>) -> Self {
        Self {
            patterns,
            snapshot: ArcSwap::from_pointee(Vec::new()),
        }
    }

    pub fn rule_count(&self) -> usize {
        self.snapshot.load().len()
    }

    /// Evaluates `sample` against the current rule snapshot, in insertion
    /// order. A rule whose destination carries `DestinationAction::Stop`
    /// ends evaluation of every remaining rule. Matched sink ids are not
    /// deduplicated: if two rules both select the same sink, it is
    /// enqueued twice.
    pub fn evaluate(&self, sample: &Sample) -> Vec<Destination> {
        let rules = self.snapshot.load();
        let mut out = Vec::new();
        'rules: for rule in rules.iter() {
            if !rule.matches(sample) {
                continue;
            }
            debug!(rule = %rule.name, address = %sample.address, "rule matched");
            for dest in &rule.destinations {
                out.push(dest.clone());
                if dest.action == DestinationAction::Stop {
                    break 'rules;
                }
            }
        }
        out
    }

    /// Installs (or replaces, by name) a single rule without disturbing
    /// any others.
    pub fn install_rule(&self, rule: RoutingRule) -> BridgeResult<()> {
        let compiled = self.compile(rule)?;
        self.snapshot.rcu(|current| {
            let mut next: Vec<CompiledRule> = current
                .iter()
                .filter(|r| r.name != compiled.name)
                .map(clone_compiled)
                .collect();
            next.push(clone_compiled(&compiled));
            next
        });
        Ok(())
    }

    pub fn uninstall_rule(&self, name: &str) -> BridgeResult<()> {
        if !self.snapshot.load().iter().any(|r| r.name == name) {
            return Err(BridgeError::NotFound(format!("rule {name} not found")));
        }
        self.snapshot.rcu(|current| {
            current
                .iter()
                .filter(|r| r.name != name)
                .map(clone_compiled)
                .collect::<Vec<_>>()
        });
        Ok(())
    }

    /// Replaces the entire rule set atomically. If any rule fails to
    /// compile, no change is made and the previous snapshot stays active.
    pub fn reload_rules(&self, rules: Vec<RoutingRule>) -> BridgeResult<()> {
        let mut compiled = Vec::with_capacity(rules.len());
        for rule in rules {
            match self.compile(rule) {
                Ok(c) => compiled.push(c),
                Err(e) => {
                    warn!(error = %e, "reload_rules aborted: a rule failed to compile");
                    return Err(e);
                }
            }
        }
        self.snapshot.store(Arc::new(compiled));
        Ok(())
    }

    fn compile(&self, rule: RoutingRule) -> BridgeResult<CompiledRule> {
        let address_pattern = self.patterns.get_or_compile(&rule.source.address_pattern)?;
        Ok(CompiledRule {
            name: rule.name,
            enabled: rule.enabled,
            address_pattern,
            protocols: rule.source.protocols.into_iter().collect(),
            qualities: rule.source.qualities.into_iter().collect(),
            destinations: rule.destinations,
        })
    }
}

fn clone_compiled(r: &CompiledRule) -> CompiledRule {
    CompiledRule {
        name: r.name.clone(),
        enabled: r.enabled,
        address_pattern: r.address_pattern.clone(),
        protocols: r.protocols.clone(),
        qualities: r.qualities.clone(),
        destinations: r.destinations.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule::SourceFilter;
    use ferrobridge_patterns::PatternCacheConfig;
    use ferrobridge_types::{Quality, SampleValue};

    fn sample(addr: &str, protocol: u16) -> Sample {
        Sample::new(addr, protocol, SampleValue::F64(1.0), Quality::Good, 0)
    }

    fn dest(id: &str, action: DestinationAction) -> Destination {
        Destination {
            sink_id: id.to_string(),
            priority: ferrobridge_types::Priority::Normal,
            weight: 100,
            action,
        }
    }

    #[test]
    fn simple_route_matches_exact_address() {
        let patterns = Arc::new(PatternCache::new(PatternCacheConfig::default()));
        let engine = RuleEngine::new(patterns);
        engine
            .install_rule(RoutingRule::new(
                "r1",
                SourceFilter::any_address("line1/temp"),
                vec![dest("sink-a", DestinationAction::Forward)],
            ))
            .unwrap();

        let out = engine.evaluate(&sample("line1/temp", 1));
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].sink_id, "sink-a");
    }

    #[test]
    fn no_match_yields_empty_destinations() {
        let patterns = Arc::new(PatternCache::new(PatternCacheConfig::default()));
        let engine = RuleEngine::new(patterns);
        engine
            .install_rule(RoutingRule::new(
                "r1",
                SourceFilter::any_address("line1/temp"),
                vec![dest("sink-a", DestinationAction::Forward)],
            ))
            .unwrap();
        assert!(engine.evaluate(&sample("line2/temp", 1)).is_empty());
    }

    #[test]
    fn stop_action_halts_further_rule_evaluation() {
        let patterns = Arc::new(PatternCache::new(PatternCacheConfig::default()));
        let engine = RuleEngine::new(patterns);
        engine
            .install_rule(RoutingRule::new(
                "r1",
                SourceFilter::any_address("line1/temp"),
                vec![dest("sink-a", DestinationAction::Stop)],
            ))
            .unwrap();
        engine
            .install_rule(RoutingRule::new(
                "r2",
                SourceFilter::any_address("line1/temp"),
                vec![dest("sink-b", DestinationAction::Forward)],
            ))
            .unwrap();

        let out = engine.evaluate(&sample("line1/temp", 1));
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].sink_id, "sink-a");
    }

    #[test]
    fn duplicate_sink_across_rules_delivers_twice() {
        let patterns = Arc::new(PatternCache::new(PatternCacheConfig::default()));
        let engine = RuleEngine::new(patterns);
        engine
            .install_rule(RoutingRule::new(
                "r1",
                SourceFilter::any_address("line1/temp"),
                vec![dest("sink-a", DestinationAction::ForwardAndContinue)],
            ))
            .unwrap();
        engine
            .install_rule(RoutingRule::new(
                "r2",
                SourceFilter::any_address("line1/temp"),
                vec![dest("sink-a", DestinationAction::Forward)],
            ))
            .unwrap();

        let out = engine.evaluate(&sample("line1/temp", 1));
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn uninstall_removes_rule() {
        let patterns = Arc::new(PatternCache::new(PatternCacheConfig::default()));
        let engine = RuleEngine::new(patterns);
        engine
            .install_rule(RoutingRule::new(
                "r1",
                SourceFilter::any_address("line1/temp"),
                vec![dest("sink-a", DestinationAction::Forward)],
            ))
            .unwrap();
        engine.uninstall_rule("r1").unwrap();
        assert!(engine.evaluate(&sample("line1/temp", 1)).is_empty());
        assert!(matches!(
            engine.uninstall_rule("r1"),
            Err(BridgeError::NotFound(_))
        ));
    }

    #[test]
    fn reload_rejects_unsafe_pattern_and_keeps_old_snapshot() {
        let patterns = Arc::new(PatternCache::new(PatternCacheConfig::default()));
        let engine = RuleEngine::new(patterns);
        engine
            .install_rule(RoutingRule::new(
                "r1",
                SourceFilter::any_address("line1/temp"),
                vec![dest("sink-a", DestinationAction::Forward)],
            ))
            .unwrap();

        let bad = RoutingRule::new(
            "r2",
            SourceFilter::any_address("(a+)+b"),
            vec![dest("sink-b", DestinationAction::Forward)],
        );
        assert!(engine.reload_rules(vec![bad]).is_err());
        // Old rule r1 is still active.
        assert_eq!(engine.evaluate(&sample("line1/temp", 1)).len(), 1);
    }
}

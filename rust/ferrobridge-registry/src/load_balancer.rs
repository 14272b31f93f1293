use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use ferrobridge_types::Sample;
use rand::Rng;
use rustc_hash::FxHasher;
use std::hash::Hasher;

use crate::descriptor::SinkDescriptor;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadBalanceStrategy {
    RoundRobin,
    WeightedRoundRobin,
    LeastConnections,
    LeastLatency,
    HashBased,
    Random,
    Failover,
    Broadcast,
}

/// Selects one or more candidates from a non-empty, already-health-filtered
/// slice of sinks. `select` is only ever called with candidates that
/// passed `SinkDescriptor::is_selectable`.
pub trait LoadBalancer: Send + Sync {
    fn select<'a>(&self, candidates: &[&'a SinkDescriptor], context: Option<&Sample>) -> Vec<&'a SinkDescriptor>;
    fn strategy(&self) -> LoadBalanceStrategy;
}

#[derive(Default)]
pub struct RoundRobinBalancer {
    counter: AtomicUsize,
}

impl LoadBalancer for RoundRobinBalancer {
    fn select<'a>(&self, candidates: &[&'a SinkDescriptor], _context: Option<&Sample>) -> Vec<&'a SinkDescriptor> {
        if candidates.is_empty() {
            return Vec::new();
        }
        let idx = self.counter.fetch_add(1, Ordering::Relaxed) % candidates.len();
        vec![candidates[idx]]
    }
    fn strategy(&self) -> LoadBalanceStrategy {
        LoadBalanceStrategy::RoundRobin
    }
}

#[derive(Default)]
pub struct WeightedRoundRobinBalancer {
    counter: AtomicU64,
}

impl LoadBalancer for WeightedRoundRobinBalancer {
    fn select<'a>(&self, candidates: &[&'a SinkDescriptor], _context: Option<&Sample>) -> Vec<&'a SinkDescriptor> {
        let total_weight: u64 = candidates.iter().map(|c| c.weight as u64).sum();
        if total_weight == 0 || candidates.is_empty() {
            return Vec::new();
        }
        let mut target = self.counter.fetch_add(1, Ordering::Relaxed) % total_weight;
        for c in candidates {
            if target < c.weight as u64 {
                return vec![*c];
            }
            target -= c.weight as u64;
        }
        vec![candidates[candidates.len() - 1]]
    }
    fn strategy(&self) -> LoadBalanceStrategy {
        LoadBalanceStrategy::WeightedRoundRobin
    }
}

#[derive(Default)]
pub struct LeastConnectionsBalancer;

impl LoadBalancer for LeastConnectionsBalancer {
    fn select<'a>(&self, candidates: &[&'a SinkDescriptor], _context: Option<&Sample>) -> Vec<&'a SinkDescriptor> {
        candidates
            .iter()
            .copied()
            .min_by(|a, b| a.pending().cmp(&b.pending()).then_with(|| a.id.cmp(&b.id)))
            .map(|c| vec![c])
            .unwrap_or_default()
    }
    fn strategy(&self) -> LoadBalanceStrategy {
        LoadBalanceStrategy::LeastConnections
    }
}

#[derive(Default)]
pub struct LeastLatencyBalancer;

impl LoadBalancer for LeastLatencyBalancer {
    fn select<'a>(&self, candidates: &[&'a SinkDescriptor], _context: Option<&Sample>) -> Vec<&'a SinkDescriptor> {
        candidates
            .iter()
            .copied()
            .min_by(|a, b| {
                a.avg_latency_us()
                    .partial_cmp(&b.avg_latency_us())
                    .unwrap_or(std::cmp::Ordering::Equal)
                    .then_with(|| a.id.cmp(&b.id))
            })
            .map(|c| vec![c])
            .unwrap_or_default()
    }
    fn strategy(&self) -> LoadBalanceStrategy {
        LoadBalanceStrategy::LeastLatency
    }
}

#[derive(Default)]
pub struct HashBasedBalancer;

impl HashBasedBalancer {
    fn compute_hash(address: &str) -> u64 {
        let mut hasher = FxHasher::default();
        hasher.write(address.as_bytes());
        hasher.finish()
    }
}

impl LoadBalancer for HashBasedBalancer {
    fn select<'a>(&self, candidates: &[&'a SinkDescriptor], context: Option<&Sample>) -> Vec<&'a SinkDescriptor> {
        if candidates.is_empty() {
            return Vec::new();
        }
        let key = context.map(|s| s.address.as_str()).unwrap_or("");
        let idx = (Self::compute_hash(key) as usize) % candidates.len();
        vec![candidates[idx]]
    }
    fn strategy(&self) -> LoadBalanceStrategy {
        LoadBalanceStrategy::HashBased
    }
}

#[derive(Default)]
pub struct RandomBalancer;

impl LoadBalancer for RandomBalancer {
    fn select<'a>(&self, candidates: &[&'a SinkDescriptor], _context: Option<&Sample>) -> Vec<&'a SinkDescriptor> {
        if candidates.is_empty() {
            return Vec::new();
        }
        let idx = rand::thread_rng().gen_range(0..candidates.len());
        vec![candidates[idx]]
    }
    fn strategy(&self) -> LoadBalanceStrategy {
        LoadBalanceStrategy::Random
    }
}

/// Always picks the highest-priority (lowest `priority` value) candidate;
/// relies on the caller having already filtered to healthy candidates, so
/// "failover" falls out of the candidate list shrinking as sinks degrade.
#[derive(Default)]
pub struct FailoverBalancer;

impl LoadBalancer for FailoverBalancer {
    fn select<'a>(&self, candidates: &[&'a SinkDescriptor], _context: Option<&Sample>) -> Vec<&'a SinkDescriptor> {
        candidates
            .iter()
            .min_by_key(|c| c.priority)
            .map(|c| vec![*c])
            .unwrap_or_default()
    }
    fn strategy(&self) -> LoadBalanceStrategy {
        LoadBalanceStrategy::Failover
    }
}

#[derive(Default)]
pub struct BroadcastBalancer;

impl LoadBalancer for BroadcastBalancer {
    fn select<'a>(&self, candidates: &[&'a SinkDescriptor], _context: Option<&Sample>) -> Vec<&'a SinkDescriptor> {
        candidates.to_vec()
    }
    fn strategy(&self) -> LoadBalanceStrategy {
        LoadBalanceStrategy::Broadcast
    }
}

pub struct LoadBalancerFactory;

impl LoadBalancerFactory {
    pub fn create(strategy: LoadBalanceStrategy) -> Box<dyn LoadBalancer> {
        match strategy {
            LoadBalanceStrategy::RoundRobin => Box::new(RoundRobinBalancer::default()),
            LoadBalanceStrategy::WeightedRoundRobin => Box::new(WeightedRoundRobinBalancer::default()),
            LoadBalanceStrategy::LeastConnections => Box::new(LeastConnectionsBalancer),
            LoadBalanceStrategy::LeastLatency => Box::new(LeastLatencyBalancer),
            LoadBalanceStrategy::HashBased => Box::new(HashBasedBalancer),
            LoadBalanceStrategy::Random => Box::new(RandomBalancer),
            LoadBalanceStrategy::Failover => Box::new(FailoverBalancer),
            LoadBalanceStrategy::Broadcast => Box::new(BroadcastBalancer),
        }
    }
}

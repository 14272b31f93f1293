use std::path::Path;
use std::time::Duration;

use ferrobridge_types::{BridgeError, BridgeResult};
use serde::{Deserialize, Serialize};

/// Mirrors `ferrobridge_queues::DropPolicy`. Defined locally rather than
/// adding a `serde` dependency to the queues crate for three variants.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DropPolicyToml {
    DropNewest,
    DropOldest,
    Block,
}

impl From<DropPolicyToml> for ferrobridge_queues::DropPolicy {
    fn from(v: DropPolicyToml) -> Self {
        match v {
            DropPolicyToml::DropNewest => Self::DropNewest,
            DropPolicyToml::DropOldest => Self::DropOldest,
            DropPolicyToml::Block => Self::Block,
        }
    }
}

/// Mirrors `ferrobridge_registry::LoadBalanceStrategy`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadBalanceStrategyToml {
    RoundRobin,
    WeightedRoundRobin,
    LeastConnections,
    LeastLatency,
    HashBased,
    Random,
    Failover,
    Broadcast,
}

impl From<LoadBalanceStrategyToml> for ferrobridge_registry::LoadBalanceStrategy {
    fn from(v: LoadBalanceStrategyToml) -> Self {
        use ferrobridge_registry::LoadBalanceStrategy as S;
        match v {
            LoadBalanceStrategyToml::RoundRobin => S::RoundRobin,
            LoadBalanceStrategyToml::WeightedRoundRobin => S::WeightedRoundRobin,
            LoadBalanceStrategyToml::LeastConnections => S::LeastConnections,
            LoadBalanceStrategyToml::LeastLatency => S::LeastLatency,
            LoadBalanceStrategyToml::HashBased => S::HashBased,
            LoadBalanceStrategyToml::Random => S::Random,
            LoadBalanceStrategyToml::Failover => S::Failover,
            LoadBalanceStrategyToml::Broadcast => S::Broadcast,
        }
    }
}

/// Mirrors `ferrobridge_scheduler::OverflowPolicy`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverflowPolicyToml {
    Reject,
    DropLowest,
    DropFurthest,
}

impl Default for OverflowPolicyToml {
    fn default() -> Self {
        Self::Reject
    }
}

impl From<OverflowPolicyToml> for ferrobridge_scheduler::OverflowPolicy {
    fn from(v: OverflowPolicyToml) -> Self {
        use ferrobridge_scheduler::OverflowPolicy as P;
        match v {
            OverflowPolicyToml::Reject => P::Reject,
            OverflowPolicyToml::DropLowest => P::DropLowest,
            OverflowPolicyToml::DropFurthest => P::DropFurthest,
        }
    }
}

/// Top-level, TOML-deserializable configuration for every component the
/// orchestrator wires together. Loading hierarchy mirrors the rest of
/// this fabric's config tooling: environment overrides beat the file,
/// the file beats these `#[serde(default)]` values.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeConfig {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub pool: PoolConfig,
    #[serde(default)]
    pub patterns: PatternsConfig,
    #[serde(default)]
    pub registry: RegistryConfigToml,
    #[serde(default)]
    pub bus: BusConfigToml,
    #[serde(default)]
    pub scheduler: SchedulerConfigToml,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            logging: LoggingConfig::default(),
            pool: PoolConfig::default(),
            patterns: PatternsConfig::default(),
            registry: RegistryConfigToml::default(),
            bus: BusConfigToml::default(),
            scheduler: SchedulerConfigToml::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_filter")]
    pub filter: String,
    #[serde(default)]
    pub json: bool,
}

fn default_log_filter() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
            json: false,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PoolConfig {
    #[serde(default = "default_pool_reserve")]
    pub reserve_per_tier: usize,
}

fn default_pool_reserve() -> usize {
    32
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            reserve_per_tier: default_pool_reserve(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PatternsConfig {
    #[serde(default = "default_pattern_cache_size")]
    pub max_size: usize,
    #[serde(default = "default_max_pattern_length")]
    pub max_pattern_length: usize,
    #[serde(default = "default_compile_timeout_ms")]
    pub compilation_timeout_ms: u64,
    #[serde(default = "default_enable_validation")]
    pub enable_validation: bool,
    #[serde(default = "default_max_complexity")]
    pub max_complexity: u32,
}

fn default_pattern_cache_size() -> usize {
    10_000
}
fn default_max_pattern_length() -> usize {
    1024
}
fn default_compile_timeout_ms() -> u64 {
    100
}
fn default_enable_validation() -> bool {
    true
}
fn default_max_complexity() -> u32 {
    50
}

impl Default for PatternsConfig {
    fn default() -> Self {
        Self {
            max_size: default_pattern_cache_size(),
            max_pattern_length: default_max_pattern_length(),
            compilation_timeout_ms: default_compile_timeout_ms(),
            enable_validation: default_enable_validation(),
            max_complexity: default_max_complexity(),
        }
    }
}

impl From<PatternsConfig> for ferrobridge_patterns::PatternCacheConfig {
    fn from(c: PatternsConfig) -> Self {
        Self {
            max_size: c.max_size,
            max_pattern_length: c.max_pattern_length,
            compilation_timeout: Duration::from_millis(c.compilation_timeout_ms),
            enable_validation: c.enable_validation,
            max_complexity: c.max_complexity,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RegistryConfigToml {
    #[serde(default = "default_strategy")]
    pub default_strategy: LoadBalanceStrategyToml,
    #[serde(default = "default_health_check_enabled")]
    pub enable_health_check: bool,
    #[serde(default = "default_health_check_interval_ms")]
    pub health_check_interval_ms: u64,
    #[serde(default = "default_unhealthy_threshold")]
    pub unhealthy_threshold: u32,
}

fn default_strategy() -> LoadBalanceStrategyToml {
    LoadBalanceStrategyToml::RoundRobin
}
fn default_health_check_enabled() -> bool {
    true
}
fn default_health_check_interval_ms() -> u64 {
    5_000
}
fn default_unhealthy_threshold() -> u32 {
    3
}

impl Default for RegistryConfigToml {
    fn default() -> Self {
        Self {
            default_strategy: default_strategy(),
            enable_health_check: default_health_check_enabled(),
            health_check_interval_ms: default_health_check_interval_ms(),
            unhealthy_threshold: default_unhealthy_threshold(),
        }
    }
}

impl From<RegistryConfigToml> for ferrobridge_registry::RegistryConfig {
    fn from(c: RegistryConfigToml) -> Self {
        Self {
            default_strategy: c.default_strategy.into(),
            enable_health_check: c.enable_health_check,
            health_check_interval: Duration::from_millis(c.health_check_interval_ms),
            unhealthy_threshold: c.unhealthy_threshold,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BusConfigToml {
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
    #[serde(default = "default_max_channels")]
    pub max_channels: usize,
    #[serde(default = "default_drop_policy")]
    pub drop_policy: DropPolicyToml,
    #[serde(default = "default_bus_worker_count")]
    pub worker_count: usize,
    #[serde(default = "default_buffer_when_unsubscribed")]
    pub buffer_when_unsubscribed: bool,
}

fn default_channel_capacity() -> usize {
    1024
}
fn default_max_channels() -> usize {
    4096
}
fn default_drop_policy() -> DropPolicyToml {
    DropPolicyToml::DropNewest
}
fn default_bus_worker_count() -> usize {
    2
}
fn default_buffer_when_unsubscribed() -> bool {
    true
}

impl Default for BusConfigToml {
    fn default() -> Self {
        Self {
            channel_capacity: default_channel_capacity(),
            max_channels: default_max_channels(),
            drop_policy: default_drop_policy(),
            worker_count: default_bus_worker_count(),
            buffer_when_unsubscribed: default_buffer_when_unsubscribed(),
        }
    }
}

impl From<BusConfigToml> for ferrobridge_bus::BusConfig {
    fn from(c: BusConfigToml) -> Self {
        Self {
            channel_capacity: c.channel_capacity,
            max_channels: c.max_channels,
            drop_policy: c.drop_policy.into(),
            worker_count: c.worker_count,
            buffer_when_unsubscribed: c.buffer_when_unsubscribed,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfigToml {
    #[serde(default = "default_max_queue_size")]
    pub max_queue_size: usize,
    /// `0` means "use `num_cpus::get()`", same as the scheduler crate's own default.
    #[serde(default)]
    pub worker_threads: usize,
    #[serde(default = "default_deadline_offset_ms")]
    pub default_deadline_offset_ms: u64,
    #[serde(default)]
    pub enable_realtime: bool,
    #[serde(default = "default_realtime_priority")]
    pub realtime_priority: i32,
    #[serde(default)]
    pub cpu_affinity_start: Option<usize>,
    #[serde(default = "default_check_interval_us")]
    pub check_interval_us: u64,
    #[serde(default)]
    pub overflow_policy: OverflowPolicyToml,
    #[serde(default = "default_enable_miss_callbacks")]
    pub enable_miss_callbacks: bool,
    #[serde(default = "default_enable_timing")]
    pub enable_timing: bool,
}

fn default_max_queue_size() -> usize {
    100_000
}
fn default_deadline_offset_ms() -> u64 {
    1
}
fn default_realtime_priority() -> i32 {
    50
}
fn default_check_interval_us() -> u64 {
    100
}
fn default_enable_miss_callbacks() -> bool {
    true
}
fn default_enable_timing() -> bool {
    true
}

impl Default for SchedulerConfigToml {
    fn default() -> Self {
        Self {
            max_queue_size: default_max_queue_size(),
            worker_threads: 0,
            default_deadline_offset_ms: default_deadline_offset_ms(),
            enable_realtime: false,
            realtime_priority: default_realtime_priority(),
            cpu_affinity_start: None,
            check_interval_us: default_check_interval_us(),
            overflow_policy: OverflowPolicyToml::Reject,
            enable_miss_callbacks: default_enable_miss_callbacks(),
            enable_timing: default_enable_timing(),
        }
    }
}

impl From<SchedulerConfigToml> for ferrobridge_scheduler::EDFSchedulerConfig {
    fn from(c: SchedulerConfigToml) -> Self {
        Self {
            max_queue_size: c.max_queue_size,
            worker_threads: c.worker_threads,
            default_deadline_offset: Duration::from_millis(c.default_deadline_offset_ms),
            enable_realtime: c.enable_realtime,
            realtime_priority: c.realtime_priority,
            cpu_affinity_start: c.cpu_affinity_start,
            check_interval: Duration::from_micros(c.check_interval_us),
            overflow_policy: c.overflow_policy.into(),
            enable_miss_callbacks: c.enable_miss_callbacks,
            enable_timing: c.enable_timing,
        }
    }
}

impl BridgeConfig {
    /// Loading hierarchy: environment overrides beat the file on disk,
    /// which beats these struct defaults.
    pub fn load(path: impl AsRef<Path>) -> BridgeResult<Self> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            Self::load_from_file(path)?
        } else {
            Self::default()
        };
        config.apply_env_overrides();
        Ok(config)
    }

    pub fn load_from_file(path: &Path) -> BridgeResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| BridgeError::InvalidArgument(format!("reading {}: {e}", path.display())))?;
        toml::from_str(&content)
            .map_err(|e| BridgeError::InvalidArgument(format!("parsing {}: {e}", path.display())))
    }

    /// Applies `FERROBRIDGE_*` environment overrides for the handful of
    /// settings an operator most commonly needs to flip without editing
    /// the config file: log verbosity and scheduler worker count.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(filter) = std::env::var("FERROBRIDGE_LOG") {
            self.logging.filter = filter;
        }
        if let Ok(workers) = std::env::var("FERROBRIDGE_SCHEDULER_WORKERS") {
            if let Ok(n) = workers.parse() {
                self.scheduler.worker_threads = n;
            }
        }
    }
}

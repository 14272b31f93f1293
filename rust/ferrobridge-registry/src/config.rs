use std::time::Duration;

use crate::load_balancer::LoadBalanceStrategy;

#[derive(Debug, Clone, Copy)]
pub struct RegistryConfig {
    pub default_strategy: LoadBalanceStrategy,
    pub enable_health_check: bool,
    pub health_check_interval: Duration,
    pub unhealthy_threshold: u32,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            default_strategy: LoadBalanceStrategy::RoundRobin,
            enable_health_check: true,
            health_check_interval: Duration::from_millis(5000),
            unhealthy_threshold: 3,
        }
    }
}

use std::sync::Arc;

use dashmap::DashMap;
use ferrobridge_types::{BridgeError, BridgeResult, Health};

use crate::scoop_descriptor::ScoopDescriptor;

/// Registry of data sources. Unlike sinks, scoops are never load-balanced
/// between — every registered, enabled scoop is polled or subscribed to
/// independently — so this registry is a plain health-tracked map.
pub struct ScoopRegistry {
    scoops: DashMap<String, Arc<ScoopDescriptor>>,
}

impl ScoopRegistry {
    pub fn new() -> Self {
        Self { scoops: DashMap::new() }
    }

    pub fn register(&self, descriptor: ScoopDescriptor) -> BridgeResult<()> {
        if self.scoops.contains_key(&descriptor.id) {
            return Err(BridgeError::AlreadyExists(format!("scoop {} already registered", descriptor.id)));
        }
        self.scoops.insert(descriptor.id.clone(), Arc::new(descriptor));
        Ok(())
    }

    pub fn unregister(&self, id: &str) -> BridgeResult<()> {
        self.scoops
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| BridgeError::NotFound(format!("scoop {id} not found")))
    }

    pub fn get(&self, id: &str) -> Option<Arc<ScoopDescriptor>> {
        self.scoops.get(id).map(|e| e.value().clone())
    }

    pub fn list(&self) -> Vec<Arc<ScoopDescriptor>> {
        self.scoops.iter().map(|e| e.value().clone()).collect()
    }

    pub fn healthy_count(&self) -> usize {
        self.scoops.iter().filter(|e| e.value().health() == Health::Healthy).count()
    }

    pub fn len(&self) -> usize {
        self.scoops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scoops.is_empty()
    }
}

impl Default for ScoopRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoop_descriptor::ReadStrategy;
    use ferrobridge_types::{BridgeResult as Res, Sample, ScoopMetricsSnapshot};
    use parking_lot::Mutex;

    struct FakeScoop;
    impl ferrobridge_types::Scoop for FakeScoop {
        fn initialize(&mut self) -> Res<()> {
            Ok(())
        }
        fn start(&mut self) -> Res<()> {
            Ok(())
        }
        fn stop(&mut self) -> Res<()> {
            Ok(())
        }
        fn shutdown(&mut self) -> Res<()> {
            Ok(())
        }
        fn poll(&mut self) -> Res<Vec<Sample>> {
            Ok(Vec::new())
        }
        fn is_healthy(&self) -> Health {
            Health::Healthy
        }
        fn metrics(&self) -> ScoopMetricsSnapshot {
            ScoopMetricsSnapshot::default()
        }
    }

    #[test]
    fn register_and_unregister_roundtrip() {
        let registry = ScoopRegistry::new();
        registry
            .register(ScoopDescriptor::new(
                "s1",
                "fake",
                Arc::new(Mutex::new(FakeScoop)),
                ReadStrategy::Poll,
            ))
            .unwrap();
        assert_eq!(registry.len(), 1);
        registry.unregister("s1").unwrap();
        assert!(registry.is_empty());
    }

    #[test]
    fn duplicate_registration_rejected() {
        let registry = ScoopRegistry::new();
        registry
            .register(ScoopDescriptor::new(
                "s1",
                "fake",
                Arc::new(Mutex::new(FakeScoop)),
                ReadStrategy::Poll,
            ))
            .unwrap();
        let err = registry.register(ScoopDescriptor::new(
            "s1",
            "fake",
            Arc::new(Mutex::new(FakeScoop)),
            ReadStrategy::Poll,
        ));
        assert!(matches!(err, Err(BridgeError::AlreadyExists(_))));
    }
}

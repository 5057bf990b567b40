//! Fallback car descriptor cache.
//!
//! Populated opportunistically whenever the gateway successfully fetches a
//! car from the Cars service, and consulted only when that service is
//! unavailable. Unbounded and TTL-less by design (see `DESIGN.md`).

use std::collections::HashMap;

use tokio::sync::RwLock;

/// Minimal car descriptor retained for degraded responses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CarDescriptor {
    pub car_uid: String,
    pub brand: String,
    pub model: String,
    pub registration_number: String,
}

/// Process-wide `carUid -> CarDescriptor` map.
#[derive(Default)]
pub struct CarCache {
    entries: RwLock<HashMap<String, CarDescriptor>>,
}

impl CarCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the most recently observed descriptor for `carUid`.
    pub async fn put(&self, descriptor: CarDescriptor) {
        self.entries
            .write()
            .await
            .insert(descriptor.car_uid.clone(), descriptor);
    }

    /// Look up a previously cached descriptor.
    pub async fn get(&self, car_uid: &str) -> Option<CarDescriptor> {
        self.entries.read().await.get(car_uid).cloned()
    }

    /// Number of distinct cars observed so far; exposed for tests and future
    /// introspection, not wired to any HTTP endpoint.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }
}

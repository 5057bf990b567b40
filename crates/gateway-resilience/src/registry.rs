//! Named registry of circuit breakers, one per upstream.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;

use crate::breaker::CircuitBreaker;

/// Canonical breaker name for the Cars service.
pub const CARS_SERVICE: &str = "cars_service";
/// Canonical breaker name for the Rental service.
pub const RENTAL_SERVICE: &str = "rental_service";
/// Canonical breaker name for the Payment service.
pub const PAYMENT_SERVICE: &str = "payment_service";

/// Lazily creates and hands out one [`CircuitBreaker`] per upstream name.
///
/// The first `get` call for a given name wins: its `failure_threshold` and
/// `open_timeout` are used to construct the breaker, and later calls with
/// different parameters are ignored (the existing instance is returned).
#[derive(Default)]
pub struct BreakerRegistry {
    breakers: Mutex<HashMap<String, Arc<CircuitBreaker>>>,
}

impl BreakerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(
        &self,
        name: &str,
        failure_threshold: u32,
        open_timeout: Duration,
    ) -> Arc<CircuitBreaker> {
        let mut breakers = self.breakers.lock().await;
        breakers
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(CircuitBreaker::new(name, failure_threshold, open_timeout)))
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn same_name_returns_same_instance() {
        let registry = BreakerRegistry::new();
        let a = registry.get(CARS_SERVICE, 5, Duration::from_secs(60)).await;
        let b = registry.get(CARS_SERVICE, 99, Duration::from_secs(1)).await;
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(a.consecutive_failures(), 0);
    }

    #[tokio::test]
    async fn different_names_are_independent() {
        let registry = BreakerRegistry::new();
        let cars = registry.get(CARS_SERVICE, 5, Duration::from_secs(60)).await;
        let rental = registry
            .get(RENTAL_SERVICE, 5, Duration::from_secs(60))
            .await;
        assert!(!Arc::ptr_eq(&cars, &rental));
    }
}

//! Resilience primitives shared by the rental gateway: a per-upstream
//! circuit breaker, a named breaker registry, a best-effort retry queue for
//! compensating actions, and a fallback cache for car descriptors.

pub mod breaker;
pub mod cache;
pub mod error;
pub mod registry;
pub mod retry;

pub use breaker::{CircuitBreaker, CircuitState};
pub use cache::{CarCache, CarDescriptor};
pub use error::BreakerError;
pub use registry::BreakerRegistry;
pub use retry::{RetryAction, RetryActionError, RetryQueue};

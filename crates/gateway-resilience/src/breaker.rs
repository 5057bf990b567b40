//! Per-upstream circuit breaker.
//!
//! Tracks consecutive failures for a single named upstream and short-circuits
//! calls once a threshold is crossed, recovering through a single half-open
//! probe. This is deliberately a plain consecutive-failure counter rather
//! than a sliding-window failure-rate breaker: the upstreams fronted here are
//! called at low, bursty volume, and a simple counter is what the system this
//! gateway replaces already relied on.

use std::future::Future;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{Duration, Instant};

use tokio::sync::RwLock;

use crate::error::BreakerError;

/// Lifecycle state of a circuit breaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    /// Calls pass through; failures accumulate toward the threshold.
    Closed,
    /// Calls are rejected (or routed to a fallback) until `open_timeout` elapses.
    Open,
    /// A single probe call is allowed through to test recovery.
    HalfOpen,
}

#[derive(Debug)]
struct Inner {
    state: CircuitState,
    last_failure_at: Option<Instant>,
}

/// A named, per-process circuit breaker guarding one upstream.
///
/// Cloning is cheap: internal state lives behind `Arc`-free `RwLock`s owned
/// by the breaker itself, so breakers are shared via [`crate::registry::BreakerRegistry`]
/// as `Arc<CircuitBreaker>`.
#[derive(Debug)]
pub struct CircuitBreaker {
    name: String,
    failure_threshold: u32,
    open_timeout: Duration,
    consecutive_failures: AtomicU32,
    inner: RwLock<Inner>,
}

impl CircuitBreaker {
    pub fn new(name: impl Into<String>, failure_threshold: u32, open_timeout: Duration) -> Self {
        Self {
            name: name.into(),
            failure_threshold,
            open_timeout,
            consecutive_failures: AtomicU32::new(0),
            inner: RwLock::new(Inner {
                state: CircuitState::Closed,
                last_failure_at: None,
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current state, without side effects. May be stale by the time the
    /// caller acts on it; races are tolerated by design (see gateway design notes).
    pub async fn state(&self) -> CircuitState {
        self.inner.read().await.state
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures.load(Ordering::Relaxed)
    }

    /// Run `action` through the breaker. Returns `BreakerError::Open` without
    /// invoking `action` if the circuit is open and the recovery timeout
    /// hasn't elapsed yet. Otherwise runs `action` and records the outcome.
    pub async fn call<F, Fut, T, E>(&self, action: F) -> Result<T, BreakerError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if !self.try_acquire().await {
            return Err(BreakerError::Open {
                name: self.name.clone(),
            });
        }

        match action().await {
            Ok(value) => {
                self.record_success().await;
                Ok(value)
            }
            Err(err) => {
                self.record_failure().await;
                Err(BreakerError::Inner(err))
            }
        }
    }

    /// Run `action` through the breaker, falling back to `fallback` if the
    /// breaker rejects the call or the action itself fails. The fallback's
    /// invocation never affects breaker accounting.
    pub async fn call_or_fallback<F, Fut, T, E, FB, FbFut>(&self, action: F, fallback: FB) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        FB: FnOnce() -> FbFut,
        FbFut: Future<Output = T>,
    {
        match self.call(action).await {
            Ok(value) => value,
            Err(_) => fallback().await,
        }
    }

    async fn try_acquire(&self) -> bool {
        let mut inner = self.inner.write().await;
        match inner.state {
            CircuitState::Closed => true,
            CircuitState::HalfOpen => true,
            CircuitState::Open => {
                let elapsed = inner
                    .last_failure_at
                    .map(|t| t.elapsed())
                    .unwrap_or(Duration::MAX);
                if elapsed >= self.open_timeout {
                    inner.state = CircuitState::HalfOpen;
                    tracing::info!(breaker = %self.name, "circuit entering half-open probe");
                    true
                } else {
                    false
                }
            }
        }
    }

    async fn record_success(&self) {
        self.consecutive_failures.store(0, Ordering::Relaxed);
        let mut inner = self.inner.write().await;
        if inner.state != CircuitState::Closed {
            tracing::info!(breaker = %self.name, from = ?inner.state, "circuit closed");
        }
        inner.state = CircuitState::Closed;
    }

    async fn record_failure(&self) {
        let mut inner = self.inner.write().await;
        inner.last_failure_at = Some(Instant::now());

        if inner.state == CircuitState::HalfOpen {
            inner.state = CircuitState::Open;
            tracing::warn!(breaker = %self.name, "half-open probe failed, circuit re-opened");
            return;
        }

        let failures = self.consecutive_failures.fetch_add(1, Ordering::Relaxed) + 1;
        if failures >= self.failure_threshold {
            if inner.state != CircuitState::Open {
                tracing::warn!(breaker = %self.name, failures, "circuit opened");
            }
            inner.state = CircuitState::Open;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn fail() -> Result<(), &'static str> {
        Err("boom")
    }
    async fn succeed() -> Result<&'static str, &'static str> {
        Ok("ok")
    }

    #[tokio::test]
    async fn trips_after_threshold_consecutive_failures() {
        let cb = CircuitBreaker::new("cars_service", 3, Duration::from_secs(60));

        for _ in 0..2 {
            assert!(cb.call(fail).await.is_err());
            assert_eq!(cb.state().await, CircuitState::Closed);
        }

        // third failure trips it
        assert!(cb.call(fail).await.is_err());
        assert_eq!(cb.state().await, CircuitState::Open);

        // the (k+1)-th call does not invoke the action: fallback is used instead
        let invoked = std::sync::Arc::new(std::sync::atomic::AtomicBool::new(false));
        let invoked2 = invoked.clone();
        let result = cb
            .call_or_fallback(
                move || {
                    let invoked = invoked2.clone();
                    async move {
                        invoked.store(true, Ordering::SeqCst);
                        Err::<(), _>("should not run")
                    }
                },
                || async { "fallback" },
            )
            .await;
        assert_eq!(result, "fallback");
        assert!(!invoked.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn fallback_invocation_itself_does_not_move_the_counter() {
        // While CLOSED, an action that fails still counts toward the
        // threshold even though a fallback covers the caller. But once the
        // breaker trips OPEN, the fallback path no longer invokes the action
        // at all, so the counter stops moving entirely.
        let cb = CircuitBreaker::new("payment_service", 3, Duration::from_secs(60));

        cb.call_or_fallback(fail, || async { "degraded" }).await;
        assert_eq!(cb.consecutive_failures(), 1);
        assert_eq!(cb.state().await, CircuitState::Closed);

        cb.call_or_fallback(fail, || async { "degraded" }).await;
        cb.call_or_fallback(fail, || async { "degraded" }).await;
        assert_eq!(cb.consecutive_failures(), 3);
        assert_eq!(cb.state().await, CircuitState::Open);

        // Breaker is now open: further fallback calls never invoke the
        // action, so the failure counter is frozen.
        for _ in 0..5 {
            cb.call_or_fallback(fail, || async { "degraded" }).await;
        }
        assert_eq!(cb.consecutive_failures(), 3);
        assert_eq!(cb.state().await, CircuitState::Open);
    }

    #[tokio::test]
    async fn half_open_success_closes_and_resets_counter() {
        let cb = CircuitBreaker::new("rental_service", 1, Duration::from_millis(20));
        cb.call(fail).await.ok();
        assert_eq!(cb.state().await, CircuitState::Open);

        tokio::time::sleep(Duration::from_millis(30)).await;

        let result = cb.call(succeed).await;
        assert_eq!(result.unwrap(), "ok");
        assert_eq!(cb.state().await, CircuitState::Closed);
        assert_eq!(cb.consecutive_failures(), 0);
    }

    #[tokio::test]
    async fn half_open_failure_reopens_with_fresh_timer() {
        let cb = CircuitBreaker::new("rental_service", 1, Duration::from_millis(20));
        cb.call(fail).await.ok();
        tokio::time::sleep(Duration::from_millis(30)).await;

        assert!(cb.call(fail).await.is_err());
        assert_eq!(cb.state().await, CircuitState::Open);

        // Immediately after re-opening, the breaker should still reject.
        assert!(!cb.try_acquire().await);
    }
}

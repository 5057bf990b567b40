use thiserror::Error;

/// Errors produced by [`crate::breaker::CircuitBreaker::call`].
#[derive(Debug, Error)]
pub enum BreakerError<E> {
    /// The circuit is open (or half-open and already saturated); the action
    /// was never invoked.
    #[error("circuit breaker {name:?} is open")]
    Open {
        /// Name of the breaker that rejected the call.
        name: String,
    },

    /// The action ran and returned an error.
    #[error("upstream call failed: {0}")]
    Inner(E),
}

impl<E> BreakerError<E> {
    /// True if the circuit rejected the call outright.
    pub fn is_open(&self) -> bool {
        matches!(self, BreakerError::Open { .. })
    }

    /// The wrapped action error, if the action actually ran.
    pub fn into_inner(self) -> Option<E> {
        match self {
            BreakerError::Inner(e) => Some(e),
            BreakerError::Open { .. } => None,
        }
    }
}

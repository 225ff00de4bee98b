//! Defensive timing controls around unreliable upstream providers.

mod circuit_breaker;
mod warn_throttle;

pub use circuit_breaker::{CircuitBreaker, CircuitState, DEFAULT_RECOVERY_TIMEOUT};
pub use warn_throttle::WarnThrottle;

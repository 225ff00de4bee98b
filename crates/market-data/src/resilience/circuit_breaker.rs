//! Per-provider DNS backoff.
//!
//! When a provider's host name fails to resolve, every further attempt is
//! likely to fail the same slow way. The breaker opens on the first DNS
//! failure and suppresses attempts for the recovery window. The first
//! request after the window is let through; success closes the circuit and
//! another DNS failure reopens it.
//!
//! - **Closed**: Normal operation, requests are allowed through.
//! - **Open**: Name resolution failed recently, requests are blocked.
//! - **HalfOpen**: Window elapsed, the next request tests the provider.
//!
//! The state is in-memory and resets on restart.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use log::{debug, info, warn};

/// Time to suppress a provider after a DNS failure.
pub const DEFAULT_RECOVERY_TIMEOUT: Duration = Duration::from_secs(60);

/// Circuit breaker state.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

impl std::fmt::Display for CircuitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Closed => write!(f, "Closed"),
            Self::Open => write!(f, "Open"),
            Self::HalfOpen => write!(f, "HalfOpen"),
        }
    }
}

#[derive(Debug)]
struct Circuit {
    state: CircuitState,
    opened_at: Option<Instant>,
}

impl Circuit {
    fn new() -> Self {
        Self {
            state: CircuitState::Closed,
            opened_at: None,
        }
    }
}

/// Thread-safe DNS backoff keyed by provider id.
pub struct CircuitBreaker {
    circuits: Mutex<HashMap<String, Circuit>>,
    recovery_timeout: Duration,
}

impl CircuitBreaker {
    /// Create a breaker with the default 60 second window.
    pub fn new() -> Self {
        Self::with_recovery_timeout(DEFAULT_RECOVERY_TIMEOUT)
    }

    pub fn with_recovery_timeout(recovery_timeout: Duration) -> Self {
        Self {
            circuits: Mutex::new(HashMap::new()),
            recovery_timeout,
        }
    }

    /// Lock the circuits mutex, recovering from poison if necessary.
    fn lock_circuits(&self) -> MutexGuard<'_, HashMap<String, Circuit>> {
        self.circuits.lock().unwrap_or_else(|poisoned| {
            warn!("Circuit breaker mutex was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    /// Whether a request to `provider` may go out now.
    ///
    /// Moves Open to HalfOpen once the recovery window has elapsed.
    pub fn is_allowed(&self, provider: &str) -> bool {
        let mut circuits = self.lock_circuits();
        let Some(circuit) = circuits.get_mut(provider) else {
            return true;
        };

        match circuit.state {
            CircuitState::Closed | CircuitState::HalfOpen => true,
            CircuitState::Open => {
                let elapsed = circuit
                    .opened_at
                    .map(|t| t.elapsed() >= self.recovery_timeout)
                    .unwrap_or(true);
                if elapsed {
                    info!(
                        "Circuit breaker: '{}' backoff elapsed, trying provider again",
                        provider
                    );
                    circuit.state = CircuitState::HalfOpen;
                }
                elapsed
            }
        }
    }

    /// Record a request that reached the provider.
    pub fn record_success(&self, provider: &str) {
        let mut circuits = self.lock_circuits();
        if let Some(circuit) = circuits.get_mut(provider) {
            if circuit.state != CircuitState::Closed {
                info!("Circuit breaker: closing circuit for '{}'", provider);
            }
            circuit.state = CircuitState::Closed;
            circuit.opened_at = None;
        }
    }

    /// Record a DNS failure; opens (or reopens) the circuit.
    pub fn record_dns_failure(&self, provider: &str) {
        let mut circuits = self.lock_circuits();
        let circuit = circuits
            .entry(provider.to_string())
            .or_insert_with(Circuit::new);

        if circuit.state == CircuitState::Open {
            debug!("Circuit breaker: additional DNS failure for '{}'", provider);
        } else {
            warn!(
                "Circuit breaker: DNS resolution failed for '{}', suppressing requests for {}s",
                provider,
                self.recovery_timeout.as_secs()
            );
        }
        circuit.state = CircuitState::Open;
        circuit.opened_at = Some(Instant::now());
    }

    /// Current state for a provider.
    pub fn state(&self, provider: &str) -> CircuitState {
        self.lock_circuits()
            .get(provider)
            .map(|c| c.state)
            .unwrap_or(CircuitState::Closed)
    }
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_circuit_starts_closed() {
        let cb = CircuitBreaker::new();
        assert!(cb.is_allowed("YAHOO"));
        assert_eq!(cb.state("YAHOO"), CircuitState::Closed);
    }

    #[test]
    fn test_dns_failure_opens_circuit() {
        let cb = CircuitBreaker::new();
        cb.record_dns_failure("YAHOO");
        assert!(!cb.is_allowed("YAHOO"));
        assert_eq!(cb.state("YAHOO"), CircuitState::Open);
    }

    #[test]
    fn test_circuit_half_opens_after_window() {
        let cb = CircuitBreaker::with_recovery_timeout(Duration::from_millis(10));
        cb.record_dns_failure("YAHOO");
        assert!(!cb.is_allowed("YAHOO"));

        std::thread::sleep(Duration::from_millis(20));

        assert!(cb.is_allowed("YAHOO"));
        assert_eq!(cb.state("YAHOO"), CircuitState::HalfOpen);

        cb.record_success("YAHOO");
        assert_eq!(cb.state("YAHOO"), CircuitState::Closed);
    }

    #[test]
    fn test_half_open_reopens_on_dns_failure() {
        let cb = CircuitBreaker::with_recovery_timeout(Duration::from_millis(10));
        cb.record_dns_failure("NSE");
        std::thread::sleep(Duration::from_millis(20));
        assert!(cb.is_allowed("NSE"));

        cb.record_dns_failure("NSE");
        assert_eq!(cb.state("NSE"), CircuitState::Open);
        assert!(!cb.is_allowed("NSE"));
    }

    #[test]
    fn test_provider_isolation() {
        let cb = CircuitBreaker::new();
        cb.record_dns_failure("YAHOO");
        assert!(!cb.is_allowed("YAHOO"));
        assert!(cb.is_allowed("NSE"));
    }
}

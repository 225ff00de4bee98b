//! HTTP plumbing shared by the upstream adapters.

use std::sync::RwLock;
use std::time::{Duration, Instant};

use reqwest::header::{self, HeaderMap};
use reqwest::{RequestBuilder, Response};
use tracing::debug;

use crate::errors::MarketDataError;
use crate::resilience::CircuitBreaker;

/// Browser-like user agent; several upstreams reject library defaults.
pub(crate) const BROWSER_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36";

/// A session value (cookie, crumb) cached with an expiry.
///
/// Concurrent refreshes are not coordinated: two requests racing on an
/// expired session both refetch it and the later write wins.
pub(crate) struct CachedSession<T: Clone> {
    ttl: Duration,
    slot: RwLock<Option<(T, Instant)>>,
}

impl<T: Clone> CachedSession<T> {
    pub(crate) fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            slot: RwLock::new(None),
        }
    }

    /// The cached value, if present and not expired.
    pub(crate) fn get(&self) -> Option<T> {
        let guard = self.slot.read().unwrap_or_else(|p| p.into_inner());
        guard
            .as_ref()
            .filter(|(_, stored_at)| stored_at.elapsed() < self.ttl)
            .map(|(value, _)| value.clone())
    }

    pub(crate) fn set(&self, value: T) {
        let mut guard = self.slot.write().unwrap_or_else(|p| p.into_inner());
        *guard = Some((value, Instant::now()));
    }

    pub(crate) fn clear(&self) {
        let mut guard = self.slot.write().unwrap_or_else(|p| p.into_inner());
        *guard = None;
    }
}

/// Join every `Set-Cookie` pair into a single `Cookie` header value.
pub(crate) fn collect_cookies(headers: &HeaderMap) -> Option<String> {
    let pairs: Vec<&str> = headers
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|h| h.to_str().ok())
        .filter_map(|s| s.split(';').next())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect();

    if pairs.is_empty() {
        None
    } else {
        Some(pairs.join("; "))
    }
}

/// Host part of a URL, used as the circuit breaker key.
pub(crate) fn host_of(url: &str) -> &str {
    let without_scheme = url.split_once("://").map(|(_, rest)| rest).unwrap_or(url);
    without_scheme
        .split(['/', '?'])
        .next()
        .unwrap_or(without_scheme)
}

/// Send a request through the DNS circuit breaker for `host`.
///
/// An open circuit fails fast with `CircuitOpen`. A DNS failure opens the
/// circuit; any response (even an error status) closes it.
pub(crate) async fn send_guarded(
    breaker: &CircuitBreaker,
    provider: &str,
    host: &str,
    request: RequestBuilder,
) -> Result<Response, MarketDataError> {
    if !breaker.is_allowed(host) {
        debug!("{} request to {} suppressed by DNS backoff", provider, host);
        return Err(MarketDataError::CircuitOpen {
            provider: provider.to_string(),
        });
    }

    match request.send().await {
        Ok(response) => {
            breaker.record_success(host);
            Ok(response)
        }
        Err(e) => {
            let err = MarketDataError::from_transport(provider, e);
            if matches!(err, MarketDataError::DnsFailure { .. }) {
                breaker.record_dns_failure(host);
            }
            Err(err)
        }
    }
}

/// Map a non-success status to a provider error.
pub(crate) fn check_status(provider: &str, response: Response) -> Result<Response, MarketDataError> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(MarketDataError::ProviderError {
            provider: provider.to_string(),
            message: format!("HTTP {}", status.as_u16()),
        })
    }
}

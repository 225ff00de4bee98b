//! Error types and retry classification for the market data crate.
//!
//! This module provides:
//! - [`MarketDataError`]: The main error enum for all market data operations
//! - [`RetryClass`]: Classification for deciding whether a mirror endpoint is worth trying

mod retry;

pub use retry::RetryClass;

use thiserror::Error;

/// Errors that can occur during market data operations.
///
/// Nothing here is fatal to the process. Callers degrade to cached or
/// static data, and only surface an error when no fallback exists.
#[derive(Error, Debug)]
pub enum MarketDataError {
    /// The requested symbol was not found by the provider or the catalog.
    #[error("Symbol not found: {0}")]
    SymbolNotFound(String),

    /// The provider answered but had nothing for the request.
    #[error("No data returned for {0}")]
    NoData(String),

    /// The caller supplied an unusable argument (empty query, bad date).
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The provider returned a non-success status.
    #[error("Provider error: {provider} - {message}")]
    ProviderError {
        /// The provider that returned the error
        provider: String,
        /// The error message from the provider
        message: String,
    },

    /// The provider answered with a payload we could not understand.
    #[error("Invalid response from {provider}: {message}")]
    InvalidResponse {
        /// The provider that returned the payload
        provider: String,
        /// What was wrong with it
        message: String,
    },

    /// The provider rejected our session (expired cookie/crumb).
    #[error("Authentication expired: {provider}")]
    AuthExpired {
        /// The provider that rejected the session
        provider: String,
    },

    /// The request to the provider timed out.
    #[error("Timeout: {provider}")]
    Timeout {
        /// The provider that timed out
        provider: String,
    },

    /// Host name resolution failed for the provider.
    #[error("DNS resolution failed: {provider}")]
    DnsFailure {
        /// The provider whose host could not be resolved
        provider: String,
    },

    /// The DNS backoff window is open for this provider.
    #[error("Circuit open: {provider}")]
    CircuitOpen {
        /// The provider with an open circuit
        provider: String,
    },

    /// The provider does not implement the operation.
    #[error("{operation} not supported by {provider}")]
    NotSupported {
        /// Operation name
        operation: String,
        /// Provider id
        provider: String,
    },

    /// A network error occurred while communicating with a provider.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
}

impl MarketDataError {
    /// Returns the retry classification for this error.
    ///
    /// ```
    /// use tradedesk_market_data::errors::{MarketDataError, RetryClass};
    ///
    /// let error = MarketDataError::Timeout { provider: "YAHOO".to_string() };
    /// assert_eq!(error.retry_class(), RetryClass::NextEndpoint);
    ///
    /// let error = MarketDataError::SymbolNotFound("INVALID".to_string());
    /// assert_eq!(error.retry_class(), RetryClass::Never);
    /// ```
    pub fn retry_class(&self) -> RetryClass {
        match self {
            Self::SymbolNotFound(_)
            | Self::NoData(_)
            | Self::InvalidInput(_)
            | Self::InvalidResponse { .. }
            | Self::NotSupported { .. } => RetryClass::Never,

            Self::ProviderError { .. }
            | Self::AuthExpired { .. }
            | Self::Timeout { .. }
            | Self::DnsFailure { .. }
            | Self::Network(_) => RetryClass::NextEndpoint,

            Self::CircuitOpen { .. } => RetryClass::CircuitOpen,
        }
    }

    /// True for network-level trouble (timeouts, DNS, connection resets, an
    /// open DNS backoff window). These are the failures whose warnings get
    /// throttled during a provider outage.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Timeout { .. }
                | Self::DnsFailure { .. }
                | Self::CircuitOpen { .. }
                | Self::Network(_)
        )
    }

    /// Classify a transport error from reqwest.
    pub fn from_transport(provider: &str, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout {
                provider: provider.to_string(),
            }
        } else if is_dns_failure(&err) {
            Self::DnsFailure {
                provider: provider.to_string(),
            }
        } else {
            Self::Network(err)
        }
    }
}

const DNS_ERROR_MARKERS: &[&str] = &[
    "dns error",
    "failed to lookup address",
    "name or service not known",
    "nodename nor servname",
    "no such host",
    "temporary failure in name resolution",
];

/// Walk the error's source chain looking for a name-resolution failure.
pub fn is_dns_failure(err: &(dyn std::error::Error + 'static)) -> bool {
    let mut current: Option<&(dyn std::error::Error + 'static)> = Some(err);
    while let Some(e) = current {
        if is_dns_message(&e.to_string()) {
            return true;
        }
        current = e.source();
    }
    false
}

fn is_dns_message(message: &str) -> bool {
    let lower = message.to_lowercase();
    DNS_ERROR_MARKERS.iter().any(|m| lower.contains(m))
}

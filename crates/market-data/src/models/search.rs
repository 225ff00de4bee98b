//! Search result models for symbol lookup.

use serde::{Deserialize, Serialize};

use super::exchange::Exchange;

/// Raw result from a provider ticker search.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SearchResult {
    /// Provider symbol (e.g., "TCS.NS", "^NSEI")
    pub symbol: String,

    /// Display name (e.g., "Tata Consultancy Services Limited")
    pub name: String,

    /// Exchange code reported by the provider (e.g., "NSI", "BSE")
    pub exchange: String,

    /// Asset type (e.g., "EQUITY", "ETF", "INDEX")
    pub asset_type: String,

    /// Relevance score from provider (higher = better match)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
}

impl SearchResult {
    /// Create a new search result with required fields.
    pub fn new(
        symbol: impl Into<String>,
        name: impl Into<String>,
        exchange: impl Into<String>,
        asset_type: impl Into<String>,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            name: name.into(),
            exchange: exchange.into(),
            asset_type: asset_type.into(),
            score: None,
        }
    }

    /// Set the relevance score.
    pub fn with_score(mut self, score: f64) -> Self {
        self.score = Some(score);
        self
    }
}

/// Ranked candidate returned by the search endpoint.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchHit {
    /// Bare display symbol
    pub symbol: String,
    pub yahoo_symbol: String,
    pub name: String,
    pub exchange: Exchange,
    pub asset_type: String,
    pub score: u32,
    /// True when the hit came from the static fallback catalog
    pub fallback: bool,
}

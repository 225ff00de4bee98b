//! Upstream source traits.
//!
//! Each trait is one seam the service depends on, so tests and alternate
//! providers can stand in for the real HTTP adapters.

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::errors::MarketDataError;
use crate::models::{HistoryPeriod, HistoryPoint, MarketBreadth, OptionChain, Quote, SearchResult};

/// Real-time quotes, history and search from a finance data provider.
#[async_trait]
pub trait QuoteSource: Send + Sync {
    /// Unique identifier for this provider ("YAHOO").
    fn id(&self) -> &'static str;

    /// Fetch quotes for exchange-qualified symbols in one batched call.
    ///
    /// Symbols are upper-cased and deduplicated before dispatch. Symbols the
    /// provider has no data for are silently dropped, so the result may be
    /// shorter than the input (or empty).
    async fn get_quotes(&self, symbols: &[String]) -> Result<Vec<Quote>, MarketDataError>;

    /// Fetch a historical price series for one provider symbol.
    async fn get_history(
        &self,
        symbol: &str,
        period: HistoryPeriod,
    ) -> Result<Vec<HistoryPoint>, MarketDataError> {
        let _ = (symbol, period);
        Err(MarketDataError::NotSupported {
            operation: "history".to_string(),
            provider: self.id().to_string(),
        })
    }

    /// Free-text instrument search, restricted to equities, ETFs and indices,
    /// deduplicated by symbol and capped at `limit`.
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchResult>, MarketDataError> {
        let _ = (query, limit);
        Err(MarketDataError::NotSupported {
            operation: "search".to_string(),
            provider: self.id().to_string(),
        })
    }
}

/// Market-wide statistics (range, advances/declines) for one exchange.
#[async_trait]
pub trait BreadthSource: Send + Sync {
    fn id(&self) -> &'static str;

    async fn market_breadth(&self) -> Result<MarketBreadth, MarketDataError>;
}

/// Option chains for an underlying, in the provider's own symbol form.
#[async_trait]
pub trait OptionChainSource: Send + Sync {
    fn id(&self) -> &'static str;

    /// Fetch the chain for `symbol`. With no `expiry` the nearest listed
    /// expiry is returned.
    async fn option_chain(
        &self,
        symbol: &str,
        expiry: Option<NaiveDate>,
    ) -> Result<OptionChain, MarketDataError>;
}

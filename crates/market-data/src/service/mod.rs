//! `MarketDataService`: the one object the HTTP layer talks to.
//!
//! Holds the upstream sources plus every piece of process-wide market-data
//! state (search cache, warning throttle). Construct it once at startup and
//! share it behind an `Arc`.

mod history;
mod options;

pub use history::synthetic_series;
pub use options::OptionMarket;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use tracing::{debug, warn};

use crate::cache::TtlCache;
use crate::catalog::{find_fallback_by_symbol, search_fallback};
use crate::dashboard::{combine, fetch_exchange_dashboard};
use crate::errors::MarketDataError;
use crate::models::{
    CombinedSnapshot, Exchange, ExchangeDashboard, HistoryPeriod, HistorySeries, OptionChain,
    Quote, QuoteView, SearchHit, SearchResult,
};
use crate::provider::bse::BseProvider;
use crate::provider::nse::NseProvider;
use crate::provider::yahoo::YahooProvider;
use crate::provider::{BreadthSource, OptionChainSource, QuoteSource};
use crate::resilience::{CircuitBreaker, WarnThrottle};
use crate::resolver::{build_symbol_candidates, exchange_of, strip_exchange_suffix};

/// Default lifetime of cached search results.
pub const DEFAULT_SEARCH_TTL: Duration = Duration::from_secs(45);

/// Maximum number of search hits returned.
pub const SEARCH_LIMIT: usize = 10;

/// Anything that can produce a combined market snapshot on demand.
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    async fn snapshot(&self) -> Result<CombinedSnapshot, MarketDataError>;
}

pub struct MarketDataService {
    quotes: Arc<dyn QuoteSource>,
    nse_breadth: Option<Arc<dyn BreadthSource>>,
    bse_breadth: Option<Arc<dyn BreadthSource>>,
    india_options: Option<Arc<dyn OptionChainSource>>,
    global_options: Option<Arc<dyn OptionChainSource>>,
    search_cache: TtlCache<(String, Exchange), Vec<SearchHit>>,
    throttle: WarnThrottle,
}

impl MarketDataService {
    /// Service over a single quote source, with no breadth feeds and no
    /// option chain sources.
    pub fn new(quotes: Arc<dyn QuoteSource>) -> Self {
        Self {
            quotes,
            nse_breadth: None,
            bse_breadth: None,
            india_options: None,
            global_options: None,
            search_cache: TtlCache::new(DEFAULT_SEARCH_TTL),
            throttle: WarnThrottle::default(),
        }
    }

    /// Service wired to the real upstreams: Yahoo for quotes, history,
    /// search and global option chains; NSE and BSE for breadth; NSE for
    /// Indian option chains. All three share one DNS circuit breaker.
    pub fn with_default_providers(search_ttl: Duration) -> Result<Self, MarketDataError> {
        let breaker = Arc::new(CircuitBreaker::new());
        let yahoo = Arc::new(YahooProvider::new(breaker.clone())?);
        let nse = Arc::new(NseProvider::new(breaker.clone())?);
        let bse = Arc::new(BseProvider::new(breaker)?);

        Ok(Self::new(yahoo.clone())
            .with_breadth(Exchange::Nse, nse.clone())
            .with_breadth(Exchange::Bse, bse)
            .with_option_sources(nse, yahoo)
            .with_search_ttl(search_ttl))
    }

    pub fn with_breadth(mut self, exchange: Exchange, source: Arc<dyn BreadthSource>) -> Self {
        match exchange {
            Exchange::Nse => self.nse_breadth = Some(source),
            Exchange::Bse => self.bse_breadth = Some(source),
        }
        self
    }

    /// Set the option chain sources for Indian and for other underlyings.
    pub fn with_option_sources(
        mut self,
        india: Arc<dyn OptionChainSource>,
        global: Arc<dyn OptionChainSource>,
    ) -> Self {
        self.india_options = Some(india);
        self.global_options = Some(global);
        self
    }

    pub fn with_search_ttl(mut self, ttl: Duration) -> Self {
        self.search_cache = TtlCache::new(ttl);
        self
    }

    fn breadth_for(&self, exchange: Exchange) -> Option<&dyn BreadthSource> {
        match exchange {
            Exchange::Nse => self.nse_breadth.as_deref(),
            Exchange::Bse => self.bse_breadth.as_deref(),
        }
    }

    fn log_upstream_failure(&self, operation: &str, symbol: &str, err: &MarketDataError) {
        if !err.is_transient() {
            warn!("{} for '{}' failed: {}", operation, symbol, err);
        } else if self.throttle.allow() {
            warn!("{} for '{}' failed: {}; using fallback data", operation, symbol, err);
        } else {
            debug!("{} for '{}' failed: {}", operation, symbol, err);
        }
    }

    // ========================================================================
    // Quote
    // ========================================================================

    /// Live quote for a user-entered symbol, falling back to the catalog.
    ///
    /// All candidate forms of the symbol are requested in one batched call and
    /// the first candidate with data wins.
    pub async fn quote(&self, symbol: &str, exchange: Exchange) -> Result<QuoteView, MarketDataError> {
        let candidates = build_symbol_candidates(symbol, exchange);
        if candidates.is_empty() {
            return Err(MarketDataError::InvalidInput("symbol is required".to_string()));
        }

        match self.quotes.get_quotes(&candidates).await {
            Ok(quotes) => {
                let hit = candidates.iter().find_map(|candidate| {
                    quotes
                        .iter()
                        .find(|q| q.symbol.eq_ignore_ascii_case(candidate))
                });
                if let Some(quote) = hit {
                    return Ok(quote_view(quote, exchange));
                }
                debug!("No live quote for any of {:?}", candidates);
            }
            Err(e) => self.log_upstream_failure("Quote", symbol, &e),
        }

        let fallback_exchange = exchange_of(symbol.trim()).unwrap_or(exchange);
        find_fallback_by_symbol(symbol, fallback_exchange)
            .map(|stock| QuoteView {
                symbol: stock.symbol,
                yahoo_symbol: stock.yahoo_symbol,
                exchange: fallback_exchange,
                name: stock.name,
                price: stock.price,
                change: Decimal::ZERO,
                change_percent: Decimal::ZERO,
                currency: stock.currency,
                timestamp: Utc::now(),
                stale: true,
            })
            .ok_or_else(|| MarketDataError::SymbolNotFound(symbol.trim().to_uppercase()))
    }

    // ========================================================================
    // Search
    // ========================================================================

    /// Ranked instrument search, cached per `(query, exchange)`.
    ///
    /// Live hits on `exchange` come first. When the provider fails or finds
    /// nothing, the fallback catalog answers instead.
    pub async fn search(&self, query: &str, exchange: Exchange) -> Result<Vec<SearchHit>, MarketDataError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(MarketDataError::InvalidInput("query is required".to_string()));
        }

        let key = (query.to_lowercase(), exchange);
        if let Some(hits) = self.search_cache.get(&key) {
            debug!("Search cache hit for '{}' ({})", query, exchange);
            return Ok(hits);
        }

        let live = match self.quotes.search(query, SEARCH_LIMIT).await {
            Ok(results) => rank_live_results(results, exchange),
            Err(e) => {
                self.log_upstream_failure("Search", query, &e);
                Vec::new()
            }
        };

        let hits = if live.is_empty() {
            search_fallback(query, exchange, SEARCH_LIMIT)
        } else {
            live
        };

        self.search_cache.insert(key, hits.clone());
        Ok(hits)
    }

    // ========================================================================
    // Dashboards
    // ========================================================================

    pub async fn exchange_dashboard(&self, exchange: Exchange) -> ExchangeDashboard {
        fetch_exchange_dashboard(
            self.quotes.as_ref(),
            self.breadth_for(exchange),
            exchange,
            &self.throttle,
        )
        .await
    }

    /// Both exchange dashboards, fetched concurrently and merged.
    pub async fn combined_snapshot(&self) -> CombinedSnapshot {
        let (nse, bse) = futures::join!(
            self.exchange_dashboard(Exchange::Nse),
            self.exchange_dashboard(Exchange::Bse)
        );
        combine(&nse, &bse)
    }

    // ========================================================================
    // History
    // ========================================================================

    /// Price history for a user-entered symbol.
    ///
    /// Candidates are tried in order until one returns points. If none does,
    /// a random-walk series anchored on the catalog price is returned with
    /// `synthetic = true`.
    pub async fn history(
        &self,
        symbol: &str,
        period: HistoryPeriod,
        exchange: Exchange,
    ) -> Result<HistorySeries, MarketDataError> {
        let candidates = build_symbol_candidates(symbol, exchange);
        let Some(display_symbol) = candidates.last().map(|c| strip_exchange_suffix(c).to_string()) else {
            return Err(MarketDataError::InvalidInput("symbol is required".to_string()));
        };

        for candidate in &candidates {
            match self.quotes.get_history(candidate, period).await {
                Ok(points) if !points.is_empty() => {
                    return Ok(HistorySeries {
                        symbol: display_symbol,
                        yahoo_symbol: Some(candidate.clone()),
                        period,
                        points,
                        synthetic: false,
                    });
                }
                Ok(_) => debug!("No {} history for {}", period.token(), candidate),
                Err(e) => {
                    self.log_upstream_failure("History", candidate, &e);
                    if matches!(e, MarketDataError::CircuitOpen { .. }) {
                        break;
                    }
                }
            }
        }

        let anchor = find_fallback_by_symbol(symbol, exchange).map(|s| s.price);
        debug!("Serving synthetic {} history for {}", period.token(), display_symbol);
        Ok(HistorySeries {
            symbol: display_symbol,
            yahoo_symbol: None,
            period,
            points: synthetic_series(anchor, period, Utc::now(), &mut rand::thread_rng()),
            synthetic: true,
        })
    }

    // ========================================================================
    // Option chains
    // ========================================================================

    /// Option chain for an underlying, routed by market with one fallback to
    /// the other provider.
    pub async fn option_chain(
        &self,
        symbol: &str,
        expiry: Option<&str>,
    ) -> Result<OptionChain, MarketDataError> {
        let symbol = symbol.trim();
        if symbol.is_empty() {
            return Err(MarketDataError::InvalidInput("symbol is required".to_string()));
        }
        let expiry = options::parse_expiry(expiry)?;
        let market = OptionMarket::classify(symbol);

        let (primary, secondary) = match market {
            OptionMarket::India => (&self.india_options, &self.global_options),
            OptionMarket::Global => (&self.global_options, &self.india_options),
        };
        let primary_symbol = market.primary_symbol(symbol);
        let secondary_symbol = market.secondary_symbol(symbol);

        let first_error = match primary {
            Some(source) => match source.option_chain(&primary_symbol, expiry).await {
                Ok(chain) => return Ok(chain),
                Err(e) => {
                    self.log_upstream_failure("Option chain", &primary_symbol, &e);
                    Some(e)
                }
            },
            None => None,
        };

        match secondary {
            Some(source) => source.option_chain(&secondary_symbol, expiry).await.map_err(|e| {
                debug!("Fallback option chain for {} failed: {}", secondary_symbol, e);
                first_error.unwrap_or(e)
            }),
            None => Err(first_error.unwrap_or_else(|| MarketDataError::NotSupported {
                operation: "option chain".to_string(),
                provider: "none".to_string(),
            })),
        }
    }
}

#[async_trait]
impl SnapshotSource for MarketDataService {
    async fn snapshot(&self) -> Result<CombinedSnapshot, MarketDataError> {
        Ok(self.combined_snapshot().await)
    }
}

fn quote_view(quote: &Quote, requested: Exchange) -> QuoteView {
    QuoteView {
        symbol: strip_exchange_suffix(&quote.symbol).to_string(),
        yahoo_symbol: quote.symbol.clone(),
        exchange: exchange_of(&quote.symbol).unwrap_or(requested),
        name: quote.name.clone(),
        price: quote.price,
        change: quote.change,
        change_percent: quote.change_percent,
        currency: quote.currency.clone(),
        timestamp: Utc::now(),
        stale: false,
    }
}

/// Keep Indian listings and indices, requested exchange first, provider
/// order otherwise. Indices other than the two benchmarks (`^NSEBANK`,
/// `^CNXIT`) carry no suffix and are tagged with the requested exchange.
fn rank_live_results(results: Vec<SearchResult>, exchange: Exchange) -> Vec<SearchHit> {
    let mut hits: Vec<SearchHit> = results
        .into_iter()
        .filter_map(|result| {
            let listed_on = exchange_of(&result.symbol)
                .or_else(|| is_indian_index(&result).then_some(exchange))?;
            Some(SearchHit {
                symbol: strip_exchange_suffix(&result.symbol).to_string(),
                yahoo_symbol: result.symbol.clone(),
                name: result.name,
                exchange: listed_on,
                asset_type: result.asset_type.to_uppercase(),
                score: result
                    .score
                    .filter(|s| s.is_finite() && *s > 0.0)
                    .map(|s| s.round().min(u32::MAX as f64) as u32)
                    .unwrap_or(0),
                fallback: false,
            })
        })
        .collect();

    hits.sort_by_key(|hit| hit.exchange != exchange);
    hits
}

/// Exchange codes Yahoo reports for NSE and BSE listings.
const INDIAN_EXCHANGE_CODES: [&str; 4] = ["NSI", "NSE", "BSE", "BOM"];

fn is_indian_index(result: &SearchResult) -> bool {
    result.symbol.starts_with('^')
        && result.asset_type.eq_ignore_ascii_case("INDEX")
        && INDIAN_EXCHANGE_CODES
            .iter()
            .any(|code| code.eq_ignore_ascii_case(&result.exchange))
}

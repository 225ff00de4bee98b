//! Yahoo Finance market data provider.
//!
//! This provider uses the Yahoo Finance API for:
//! - Batched real-time quotes for NSE (`.NS`), BSE (`.BO`) and index (`^NSEI`) symbols
//! - Historical series through the chart API
//! - Ticker search
//! - Option chains (US listings and the fallback path for Indian ones)
//!
//! Batched quote and option requests need a cookie/crumb pair and go to
//! `query1`, falling back to the `query2` mirror.

mod models;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use reqwest::{header, StatusCode};
use rust_decimal::Decimal;
use tracing::{debug, warn};
use urlencoding::encode;
use yahoo_finance_api as yahoo;

use super::http::{
    check_status, collect_cookies, host_of, send_guarded, CachedSession, BROWSER_USER_AGENT,
};
use super::{OptionChainSource, QuoteSource};
use crate::errors::{is_dns_failure, MarketDataError, RetryClass};
use crate::models::{
    decimal_from_f64, ist_offset, HistoryPeriod, HistoryPoint, OptionChain, OptionContract,
    OptionKind, Quote, SearchResult,
};
use crate::resilience::CircuitBreaker;
use crate::resolver::prepare_symbols;

use models::{YahooOptionContract, YahooOptionResponse, YahooOptionResult, YahooQuoteItem, YahooQuoteResponse};

const PROVIDER_ID: &str = "YAHOO";

/// Primary API host first, then its mirror.
const API_HOSTS: [&str; 2] = [
    "https://query1.finance.yahoo.com",
    "https://query2.finance.yahoo.com",
];

const COOKIE_URL: &str = "https://fc.yahoo.com";

/// Breaker key for calls made through the `yahoo_finance_api` connector.
const CONNECTOR_KEY: &str = "yahoo-connector";

const CRUMB_TTL: Duration = Duration::from_secs(30 * 60);

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

const SEARCHABLE_TYPES: [&str; 3] = ["EQUITY", "ETF", "INDEX"];

// ============================================================================
// Crumb/Cookie Authentication
// ============================================================================

/// Cached Yahoo authentication data
#[derive(Debug, Clone)]
struct CrumbData {
    cookie: String,
    crumb: String,
}

// ============================================================================
// Yahoo Provider
// ============================================================================

/// Yahoo Finance market data provider.
pub struct YahooProvider {
    client: reqwest::Client,
    connector: yahoo::YahooConnector,
    hosts: Vec<String>,
    crumb: CachedSession<CrumbData>,
    breaker: Arc<CircuitBreaker>,
}

impl YahooProvider {
    /// Create a new Yahoo Finance provider sharing `breaker` with the other adapters.
    pub fn new(breaker: Arc<CircuitBreaker>) -> Result<Self, MarketDataError> {
        let connector =
            yahoo::YahooConnector::new().map_err(|e| MarketDataError::ProviderError {
                provider: PROVIDER_ID.to_string(),
                message: format!("Failed to initialize Yahoo connector: {}", e),
            })?;
        let client = reqwest::Client::builder()
            .user_agent(BROWSER_USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            client,
            connector,
            hosts: API_HOSTS.iter().map(|h| h.to_string()).collect(),
            crumb: CachedSession::new(CRUMB_TTL),
            breaker,
        })
    }

    /// Replace the API hosts tried by batched requests, in order.
    pub fn with_hosts(mut self, hosts: Vec<String>) -> Self {
        self.hosts = hosts;
        self
    }

    /// Run `attempt` against each API host in turn until one succeeds.
    ///
    /// Only failures a mirror could fix move on to the next host; a bad
    /// symbol or an unparsable payload is returned immediately.
    async fn with_mirrors<T, F, Fut>(&self, operation: &str, mut attempt: F) -> Result<T, MarketDataError>
    where
        F: FnMut(String) -> Fut,
        Fut: Future<Output = Result<T, MarketDataError>>,
    {
        let mut last_error = None;
        for host in &self.hosts {
            match attempt(host.clone()).await {
                Ok(value) => return Ok(value),
                Err(e) => match e.retry_class() {
                    RetryClass::Never => return Err(e),
                    RetryClass::NextEndpoint | RetryClass::CircuitOpen => {
                        debug!("Yahoo {} via {} failed: {}", operation, host, e);
                        last_error = Some(e);
                    }
                },
            }
        }
        Err(last_error.unwrap_or_else(|| MarketDataError::ProviderError {
            provider: PROVIDER_ID.to_string(),
            message: format!("No API host configured for {}", operation),
        }))
    }

    // ========================================================================
    // Crumb/Cookie Authentication
    // ========================================================================

    /// Ensure we have a valid Yahoo authentication crumb.
    async fn ensure_crumb(&self) -> Result<CrumbData, MarketDataError> {
        if let Some(crumb) = self.crumb.get() {
            return Ok(crumb);
        }
        self.fetch_crumb().await
    }

    /// Fetch a new cookie from fc.yahoo.com, then a crumb for it.
    async fn fetch_crumb(&self) -> Result<CrumbData, MarketDataError> {
        // fc.yahoo.com answers 404 but still sets the session cookie
        let response = send_guarded(
            &self.breaker,
            PROVIDER_ID,
            host_of(COOKIE_URL),
            self.client.get(COOKIE_URL),
        )
        .await?;

        let cookie = collect_cookies(response.headers()).ok_or_else(|| {
            MarketDataError::ProviderError {
                provider: PROVIDER_ID.to_string(),
                message: "Failed to parse Yahoo cookie".to_string(),
            }
        })?;

        let cookie_ref = &cookie;
        let crumb = self
            .with_mirrors("crumb", |host| async move {
                self.fetch_crumb_from(&host, cookie_ref).await
            })
            .await?;

        let crumb_data = CrumbData { cookie, crumb };
        self.crumb.set(crumb_data.clone());
        Ok(crumb_data)
    }

    async fn fetch_crumb_from(&self, host: &str, cookie: &str) -> Result<String, MarketDataError> {
        let url = format!("{}/v1/test/getcrumb", host);
        let response = send_guarded(
            &self.breaker,
            PROVIDER_ID,
            host_of(host),
            self.client.get(&url).header(header::COOKIE, cookie),
        )
        .await?;
        let crumb = check_status(PROVIDER_ID, response)?
            .text()
            .await
            .map_err(|e| MarketDataError::from_transport(PROVIDER_ID, e))?;

        let crumb = crumb.trim();
        if crumb.is_empty() || crumb.contains('<') {
            return Err(MarketDataError::InvalidResponse {
                provider: PROVIDER_ID.to_string(),
                message: "Empty or malformed crumb".to_string(),
            });
        }
        Ok(crumb.to_string())
    }

    /// GET an authenticated API path on one host and decode the JSON body.
    async fn get_authenticated<T: serde::de::DeserializeOwned>(
        &self,
        host: &str,
        path_and_query: &str,
    ) -> Result<T, MarketDataError> {
        let crumb = self.ensure_crumb().await?;
        let separator = if path_and_query.contains('?') { '&' } else { '?' };
        let url = format!(
            "{}{}{}crumb={}",
            host,
            path_and_query,
            separator,
            encode(&crumb.crumb)
        );

        let response = send_guarded(
            &self.breaker,
            PROVIDER_ID,
            host_of(host),
            self.client.get(&url).header(header::COOKIE, &crumb.cookie),
        )
        .await?;

        if matches!(
            response.status(),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN
        ) {
            self.crumb.clear();
            return Err(MarketDataError::AuthExpired {
                provider: PROVIDER_ID.to_string(),
            });
        }

        check_status(PROVIDER_ID, response)?
            .json::<T>()
            .await
            .map_err(|e| MarketDataError::InvalidResponse {
                provider: PROVIDER_ID.to_string(),
                message: e.to_string(),
            })
    }

    // ========================================================================
    // Connector calls (chart + search)
    // ========================================================================

    fn check_connector_circuit(&self) -> Result<(), MarketDataError> {
        if self.breaker.is_allowed(CONNECTOR_KEY) {
            Ok(())
        } else {
            Err(MarketDataError::CircuitOpen {
                provider: PROVIDER_ID.to_string(),
            })
        }
    }

    fn map_connector_error(&self, e: yahoo::YahooError) -> MarketDataError {
        if is_dns_failure(&e) {
            self.breaker.record_dns_failure(CONNECTOR_KEY);
            MarketDataError::DnsFailure {
                provider: PROVIDER_ID.to_string(),
            }
        } else {
            MarketDataError::ProviderError {
                provider: PROVIDER_ID.to_string(),
                message: e.to_string(),
            }
        }
    }
}

// ============================================================================
// Source Implementations
// ============================================================================

#[async_trait]
impl QuoteSource for YahooProvider {
    fn id(&self) -> &'static str {
        PROVIDER_ID
    }

    async fn get_quotes(&self, symbols: &[String]) -> Result<Vec<Quote>, MarketDataError> {
        let symbols = prepare_symbols(symbols);
        if symbols.is_empty() {
            return Ok(Vec::new());
        }

        debug!("Fetching {} quotes from Yahoo", symbols.len());

        let path = format!("/v7/finance/quote?symbols={}", encode(&symbols.join(",")));
        let path_ref = &path;
        let response: YahooQuoteResponse = self
            .with_mirrors("quote", |host| async move {
                self.get_authenticated(&host, path_ref).await
            })
            .await?;

        Ok(response
            .quote_response
            .result
            .into_iter()
            .filter_map(quote_from_item)
            .collect())
    }

    async fn get_history(
        &self,
        symbol: &str,
        period: HistoryPeriod,
    ) -> Result<Vec<HistoryPoint>, MarketDataError> {
        self.check_connector_circuit()?;
        let (range, interval) = period.range_interval();

        debug!(
            "Fetching {} history for {} ({} / {}) from Yahoo",
            period.token(),
            symbol,
            range,
            interval
        );

        let response = match self.connector.get_quote_range(symbol, interval, range).await {
            Ok(response) => response,
            Err(yahoo::YahooError::NoQuotes | yahoo::YahooError::NoResult) => return Ok(Vec::new()),
            Err(e) => return Err(self.map_connector_error(e)),
        };
        self.breaker.record_success(CONNECTOR_KEY);

        let quotes = match response.quotes() {
            Ok(quotes) => quotes,
            Err(yahoo::YahooError::NoQuotes) => {
                warn!("No {} history returned for '{}'", period.token(), symbol);
                return Ok(Vec::new());
            }
            Err(e) => {
                return Err(MarketDataError::ProviderError {
                    provider: PROVIDER_ID.to_string(),
                    message: e.to_string(),
                })
            }
        };

        let cutoff = period
            .trim_days()
            .map(|days| Utc::now() - chrono::Duration::days(days));

        Ok(quotes
            .into_iter()
            .filter_map(|q| {
                let timestamp = Utc.timestamp_opt(q.timestamp as i64, 0).single()?;
                if cutoff.is_some_and(|c| timestamp < c) {
                    return None;
                }
                history_point(timestamp, q.close, q.volume)
            })
            .collect())
    }

    async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchResult>, MarketDataError> {
        self.check_connector_circuit()?;
        let encoded_query = encode(query);

        debug!("Searching Yahoo for '{}'", query);

        let result = self
            .connector
            .search_ticker(&encoded_query)
            .await
            .map_err(|e| self.map_connector_error(e))?;
        self.breaker.record_success(CONNECTOR_KEY);

        let results = result
            .quotes
            .iter()
            .map(|item| {
                SearchResult::new(
                    &item.symbol,
                    format_name(Some(&item.long_name), Some(&item.short_name), &item.symbol),
                    &item.exchange,
                    &item.quote_type,
                )
                .with_score(item.score)
            })
            .collect();

        Ok(filter_search_results(results, limit))
    }
}

#[async_trait]
impl OptionChainSource for YahooProvider {
    fn id(&self) -> &'static str {
        PROVIDER_ID
    }

    async fn option_chain(
        &self,
        symbol: &str,
        expiry: Option<NaiveDate>,
    ) -> Result<OptionChain, MarketDataError> {
        let symbol = symbol.trim().to_uppercase();
        let mut path = format!("/v7/finance/options/{}", encode(&symbol));
        if let Some(ts) = expiry
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|naive| Utc.from_utc_datetime(&naive).timestamp())
        {
            path.push_str(&format!("?date={}", ts));
        }

        debug!("Fetching option chain for {} from Yahoo", symbol);

        let path_ref = &path;
        let response: YahooOptionResponse = self
            .with_mirrors("options", |host| async move {
                self.get_authenticated(&host, path_ref).await
            })
            .await?;

        let result = response
            .option_chain
            .result
            .into_iter()
            .next()
            .ok_or_else(|| MarketDataError::SymbolNotFound(symbol.clone()))?;

        Ok(chain_from_result(&symbol, result))
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Normalize one v7 quote item. Items without a usable price are dropped.
fn quote_from_item(item: YahooQuoteItem) -> Option<Quote> {
    let price = item.regular_market_price.and_then(decimal_from_f64)?;
    let previous_close = item
        .regular_market_previous_close
        .and_then(decimal_from_f64)
        .filter(|p| !p.is_zero());

    let change = item
        .regular_market_change
        .and_then(decimal_from_f64)
        .or_else(|| previous_close.map(|prev| price - prev))
        .unwrap_or(Decimal::ZERO);

    let change_percent = item
        .regular_market_change_percent
        .and_then(decimal_from_f64)
        .or_else(|| {
            previous_close.map(|prev| (change / prev * Decimal::ONE_HUNDRED).round_dp(2))
        })
        .unwrap_or(Decimal::ZERO);

    let name = format_name(
        item.long_name.as_deref(),
        item.short_name.as_deref(),
        &item.symbol,
    );

    Some(Quote {
        symbol: item.symbol.to_uppercase(),
        name,
        price,
        change,
        change_percent,
        day_high: item.regular_market_day_high.and_then(decimal_from_f64),
        day_low: item.regular_market_day_low.and_then(decimal_from_f64),
        currency: item.currency.unwrap_or_else(|| "INR".to_string()),
        exchange: item.full_exchange_name.or(item.exchange),
        market_state: item.market_state,
    })
}

/// Build an IST history point. Bars without a positive close are skipped.
fn history_point(timestamp: DateTime<Utc>, close: f64, volume: u64) -> Option<HistoryPoint> {
    let price = decimal_from_f64(close).filter(|p| p.is_sign_positive() && !p.is_zero())?;
    let local = timestamp.with_timezone(&ist_offset());
    Some(HistoryPoint {
        date: local.format("%Y-%m-%d").to_string(),
        time: local.format("%H:%M").to_string(),
        price,
        volume,
    })
}

/// Keep equities, ETFs and indices; dedupe by symbol; cap at `limit`.
fn filter_search_results(results: Vec<SearchResult>, limit: usize) -> Vec<SearchResult> {
    let mut seen = std::collections::HashSet::new();
    results
        .into_iter()
        .filter(|r| {
            SEARCHABLE_TYPES
                .iter()
                .any(|t| r.asset_type.eq_ignore_ascii_case(t))
        })
        .filter(|r| seen.insert(r.symbol.to_uppercase()))
        .take(limit)
        .collect()
}

fn date_from_unix(ts: i64) -> Option<String> {
    Utc.timestamp_opt(ts, 0)
        .single()
        .map(|d| d.format("%Y-%m-%d").to_string())
}

fn contract_from_yahoo(
    kind: OptionKind,
    contract: &YahooOptionContract,
    fallback_expiry: Option<&str>,
) -> Option<OptionContract> {
    let strike = contract.strike.and_then(decimal_from_f64)?;
    let expiry = contract
        .expiration
        .and_then(date_from_unix)
        .or_else(|| fallback_expiry.map(str::to_string))?;

    Some(OptionContract {
        kind,
        strike,
        expiry,
        last_price: contract.last_price.and_then(decimal_from_f64),
        change: contract.change.and_then(decimal_from_f64),
        bid: contract.bid.and_then(decimal_from_f64),
        ask: contract.ask.and_then(decimal_from_f64),
        volume: contract.volume,
        open_interest: contract.open_interest,
        // Yahoo reports IV as a fraction
        implied_volatility: contract
            .implied_volatility
            .map(|iv| iv * 100.0)
            .and_then(decimal_from_f64),
    })
}

fn chain_from_result(symbol: &str, result: YahooOptionResult) -> OptionChain {
    let expiry_dates: Vec<String> = result
        .expiration_dates
        .iter()
        .filter_map(|ts| date_from_unix(*ts))
        .collect();

    let set = result.options.into_iter().next();
    let selected_expiry = set
        .as_ref()
        .and_then(|s| s.expiration_date)
        .and_then(date_from_unix)
        .or_else(|| expiry_dates.first().cloned());

    let mut contracts = Vec::new();
    if let Some(set) = set {
        let expiry = selected_expiry.as_deref();
        contracts.extend(
            set.calls
                .iter()
                .filter_map(|c| contract_from_yahoo(OptionKind::Call, c, expiry)),
        );
        contracts.extend(
            set.puts
                .iter()
                .filter_map(|c| contract_from_yahoo(OptionKind::Put, c, expiry)),
        );
    }

    OptionChain {
        symbol: result
            .underlying_symbol
            .unwrap_or_else(|| symbol.to_string()),
        underlying_price: result
            .quote
            .and_then(|q| q.regular_market_price)
            .and_then(decimal_from_f64),
        expiry_dates,
        selected_expiry,
        contracts,
        source: PROVIDER_ID.to_string(),
    }
}

/// Pick a display name: long name, then short name, then the symbol.
fn format_name(long_name: Option<&str>, short_name: Option<&str>, symbol: &str) -> String {
    let clean = |s: &str| s.replace("&amp;", "&").trim().to_string();

    long_name
        .map(clean)
        .filter(|s| !s.is_empty())
        .or_else(|| short_name.map(clean).filter(|s| !s.is_empty()))
        .unwrap_or_else(|| symbol.to_string())
}

// ============================================================================
// Tests
// ============================================================================

//! NSE statistics and derivatives provider.
//!
//! - Market breadth and NIFTY 50 day range from `/api/allIndices`
//! - Option chains from `/api/option-chain-indices` and
//!   `/api/option-chain-equities`
//!
//! NSE's API refuses requests without the cookies its home page sets, so a
//! cookie session is primed first and cached like the Yahoo crumb.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::header;
use rust_decimal::Decimal;
use serde_json::Value;
use tracing::debug;
use urlencoding::encode;

use super::http::{
    check_status, collect_cookies, host_of, send_guarded, CachedSession, BROWSER_USER_AGENT,
};
use super::lenient::{as_f64, as_u32, as_u64, field};
use super::{BreadthSource, OptionChainSource};
use crate::errors::MarketDataError;
use crate::models::{decimal_from_f64, MarketBreadth, OptionChain, OptionContract, OptionKind};
use crate::resilience::CircuitBreaker;
use crate::resolver::strip_exchange_suffix;

const PROVIDER_ID: &str = "NSE";

const BASE_URL: &str = "https://www.nseindia.com";

const SESSION_TTL: Duration = Duration::from_secs(10 * 60);

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Index name of the row read for breadth statistics.
const BREADTH_INDEX: &str = "NIFTY 50";

/// NSE date format for option expiries (`27-Jun-2024`).
const NSE_DATE_FORMAT: &str = "%d-%b-%Y";

/// Indices with listed NSE derivatives. Everything else goes to the equities
/// option-chain endpoint.
pub const DERIVATIVE_INDICES: [&str; 5] =
    ["NIFTY", "BANKNIFTY", "FINNIFTY", "MIDCPNIFTY", "NIFTYNXT50"];

/// True if `symbol` (bare or `.NS`-qualified) is an NSE derivative index.
pub fn is_derivative_index(symbol: &str) -> bool {
    let bare = strip_exchange_suffix(symbol.trim());
    DERIVATIVE_INDICES
        .iter()
        .any(|index| index.eq_ignore_ascii_case(bare))
}

pub struct NseProvider {
    client: reqwest::Client,
    base_url: String,
    session: CachedSession<String>,
    breaker: Arc<CircuitBreaker>,
}

impl NseProvider {
    pub fn new(breaker: Arc<CircuitBreaker>) -> Result<Self, MarketDataError> {
        let client = reqwest::Client::builder()
            .user_agent(BROWSER_USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            client,
            base_url: BASE_URL.to_string(),
            session: CachedSession::new(SESSION_TTL),
            breaker,
        })
    }

    async fn ensure_session(&self) -> Result<String, MarketDataError> {
        if let Some(cookie) = self.session.get() {
            return Ok(cookie);
        }

        debug!("Priming NSE cookie session");
        let response = send_guarded(
            &self.breaker,
            PROVIDER_ID,
            host_of(&self.base_url),
            self.client
                .get(&self.base_url)
                .header(header::ACCEPT, "text/html,application/xhtml+xml"),
        )
        .await?;

        let cookie = collect_cookies(response.headers()).ok_or_else(|| {
            MarketDataError::ProviderError {
                provider: PROVIDER_ID.to_string(),
                message: "NSE home page set no cookies".to_string(),
            }
        })?;
        self.session.set(cookie.clone());
        Ok(cookie)
    }

    async fn get_json(&self, path_and_query: &str) -> Result<Value, MarketDataError> {
        let cookie = self.ensure_session().await?;
        let url = format!("{}{}", self.base_url, path_and_query);

        let response = send_guarded(
            &self.breaker,
            PROVIDER_ID,
            host_of(&self.base_url),
            self.client
                .get(&url)
                .header(header::COOKIE, cookie)
                .header(header::ACCEPT, "application/json")
                .header(header::REFERER, &self.base_url),
        )
        .await?;

        if matches!(response.status().as_u16(), 401 | 403) {
            self.session.clear();
            return Err(MarketDataError::AuthExpired {
                provider: PROVIDER_ID.to_string(),
            });
        }

        check_status(PROVIDER_ID, response)?
            .json::<Value>()
            .await
            .map_err(|e| MarketDataError::InvalidResponse {
                provider: PROVIDER_ID.to_string(),
                message: e.to_string(),
            })
    }
}

#[async_trait]
impl BreadthSource for NseProvider {
    fn id(&self) -> &'static str {
        PROVIDER_ID
    }

    async fn market_breadth(&self) -> Result<MarketBreadth, MarketDataError> {
        let payload = self.get_json("/api/allIndices").await?;
        breadth_from_all_indices(&payload)
    }
}

#[async_trait]
impl OptionChainSource for NseProvider {
    fn id(&self) -> &'static str {
        PROVIDER_ID
    }

    async fn option_chain(
        &self,
        symbol: &str,
        expiry: Option<NaiveDate>,
    ) -> Result<OptionChain, MarketDataError> {
        let bare = strip_exchange_suffix(symbol.trim()).to_uppercase();
        if bare.is_empty() || bare.starts_with('^') {
            return Err(MarketDataError::InvalidInput(format!(
                "'{}' is not an NSE underlying",
                symbol
            )));
        }

        let endpoint = if is_derivative_index(&bare) {
            "option-chain-indices"
        } else {
            "option-chain-equities"
        };

        debug!("Fetching option chain for {} from NSE ({})", bare, endpoint);

        let payload = self
            .get_json(&format!("/api/{}?symbol={}", endpoint, encode(&bare)))
            .await?;
        chain_from_payload(&bare, &payload, expiry)
    }
}

// ============================================================================
// Payload parsing
// ============================================================================

fn invalid(message: impl Into<String>) -> MarketDataError {
    MarketDataError::InvalidResponse {
        provider: PROVIDER_ID.to_string(),
        message: message.into(),
    }
}

fn breadth_from_all_indices(payload: &Value) -> Result<MarketBreadth, MarketDataError> {
    let rows = payload
        .get("data")
        .and_then(Value::as_array)
        .ok_or_else(|| invalid("allIndices payload has no data array"))?;

    let row = rows
        .iter()
        .find(|row| {
            row.get("index")
                .and_then(Value::as_str)
                .is_some_and(|name| name.eq_ignore_ascii_case(BREADTH_INDEX))
        })
        .ok_or_else(|| invalid(format!("{} row missing from allIndices", BREADTH_INDEX)))?;

    let decimal = |key: &str| field(row, key).and_then(as_f64).and_then(decimal_from_f64);
    let count = |key: &str| field(row, key).and_then(as_u32);

    Ok(MarketBreadth {
        high: decimal("high"),
        low: decimal("low"),
        advances: count("advances"),
        declines: count("declines"),
        unchanged: count("unchanged"),
    })
}

fn parse_nse_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), NSE_DATE_FORMAT).ok()
}

fn contract_from_leg(kind: OptionKind, leg: &Value, strike: Decimal, expiry: &str) -> OptionContract {
    let decimal = |key: &str| field(leg, key).and_then(as_f64).and_then(decimal_from_f64);
    let count = |key: &str| field(leg, key).and_then(as_u64);

    OptionContract {
        kind,
        strike,
        expiry: expiry.to_string(),
        last_price: decimal("lastPrice"),
        change: decimal("change"),
        bid: decimal("bidprice"),
        ask: decimal("askPrice"),
        volume: count("totalTradedVolume"),
        open_interest: count("openInterest"),
        implied_volatility: decimal("impliedVolatility"),
    }
}

fn chain_from_payload(
    symbol: &str,
    payload: &Value,
    expiry: Option<NaiveDate>,
) -> Result<OptionChain, MarketDataError> {
    let records = payload
        .get("records")
        .ok_or_else(|| invalid("option chain payload has no records"))?;

    let mut listed: Vec<NaiveDate> = records
        .get("expiryDates")
        .and_then(Value::as_array)
        .map(|dates| {
            dates
                .iter()
                .filter_map(Value::as_str)
                .filter_map(parse_nse_date)
                .collect()
        })
        .unwrap_or_default();
    listed.sort();
    listed.dedup();

    let selected = match expiry {
        Some(requested) => Some(requested),
        None => listed.first().copied(),
    };

    let rows = records
        .get("data")
        .and_then(Value::as_array)
        .ok_or_else(|| invalid("option chain payload has no data array"))?;

    let mut contracts = Vec::new();
    for row in rows {
        let Some(row_expiry) = field(row, "expiryDate")
            .and_then(Value::as_str)
            .and_then(parse_nse_date)
        else {
            continue;
        };
        if selected.is_some_and(|s| s != row_expiry) {
            continue;
        }
        let Some(strike) = field(row, "strikePrice")
            .and_then(as_f64)
            .and_then(decimal_from_f64)
        else {
            continue;
        };

        let expiry_text = row_expiry.format("%Y-%m-%d").to_string();
        if let Some(leg) = row.get("CE") {
            contracts.push(contract_from_leg(OptionKind::Call, leg, strike, &expiry_text));
        }
        if let Some(leg) = row.get("PE") {
            contracts.push(contract_from_leg(OptionKind::Put, leg, strike, &expiry_text));
        }
    }

    Ok(OptionChain {
        symbol: symbol.to_string(),
        underlying_price: field(records, "underlyingValue")
            .and_then(as_f64)
            .and_then(decimal_from_f64),
        expiry_dates: listed
            .iter()
            .map(|d| d.format("%Y-%m-%d").to_string())
            .collect(),
        selected_expiry: selected.map(|d| d.format("%Y-%m-%d").to_string()),
        contracts,
        source: PROVIDER_ID.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    #[test]
    fn test_derivative_index_detection() {
        assert!(is_derivative_index("NIFTY"));
        assert!(is_derivative_index("banknifty"));
        assert!(is_derivative_index("FINNIFTY.NS"));
        assert!(!is_derivative_index("RELIANCE"));
        assert!(!is_derivative_index("^NSEI"));
    }

    #[test]
    fn test_breadth_from_all_indices() {
        let payload = json!({
            "data": [
                {"index": "NIFTY NEXT 50", "high": 1.0, "advances": "1"},
                {
                    "index": "NIFTY 50",
                    "last": 22450.35,
                    "high": "22,510.10",
                    "low": 22301.7,
                    "advances": "32",
                    "declines": 17,
                    "unchanged": "1"
                }
            ]
        });

        let breadth = breadth_from_all_indices(&payload).unwrap();
        assert_eq!(breadth.high, Some(dec!(22510.10)));
        assert_eq!(breadth.low, Some(dec!(22301.70)));
        assert_eq!(breadth.advances, Some(32));
        assert_eq!(breadth.declines, Some(17));
        assert_eq!(breadth.unchanged, Some(1));
    }

    #[test]
    fn test_breadth_rejects_malformed_payload() {
        let err = breadth_from_all_indices(&json!({"msg": "blocked"})).unwrap_err();
        assert!(matches!(err, MarketDataError::InvalidResponse { .. }));

        let err = breadth_from_all_indices(&json!({"data": []})).unwrap_err();
        assert!(matches!(err, MarketDataError::InvalidResponse { .. }));
    }

    fn sample_chain() -> Value {
        json!({
            "records": {
                "expiryDates": ["04-Jul-2024", "27-Jun-2024"],
                "underlyingValue": 23501.1,
                "data": [
                    {
                        "strikePrice": 23500,
                        "expiryDate": "27-Jun-2024",
                        "CE": {"lastPrice": 120.5, "change": -3.2, "bidprice": 120.0, "askPrice": 121.0,
                               "totalTradedVolume": 152000, "openInterest": 88000, "impliedVolatility": 12.41},
                        "PE": {"lastPrice": 98.15, "openInterest": "64,500"}
                    },
                    {
                        "strikePrice": 23600,
                        "expiryDate": "04-Jul-2024",
                        "CE": {"lastPrice": 140.0}
                    }
                ]
            }
        })
    }

    #[test]
    fn test_chain_defaults_to_nearest_expiry() {
        let chain = chain_from_payload("NIFTY", &sample_chain(), None).unwrap();

        assert_eq!(chain.expiry_dates, vec!["2024-06-27", "2024-07-04"]);
        assert_eq!(chain.selected_expiry.as_deref(), Some("2024-06-27"));
        assert_eq!(chain.underlying_price, Some(dec!(23501.10)));
        assert_eq!(chain.contracts.len(), 2);
        assert_eq!(chain.contracts[0].kind, OptionKind::Call);
        assert_eq!(chain.contracts[0].bid, Some(dec!(120)));
        assert_eq!(chain.contracts[1].open_interest, Some(64500));
        assert_eq!(chain.source, "NSE");
    }

    #[test]
    fn test_chain_filters_requested_expiry() {
        let expiry = NaiveDate::from_ymd_opt(2024, 7, 4);
        let chain = chain_from_payload("NIFTY", &sample_chain(), expiry).unwrap();

        assert_eq!(chain.selected_expiry.as_deref(), Some("2024-07-04"));
        assert_eq!(chain.contracts.len(), 1);
        assert_eq!(chain.contracts[0].strike, dec!(23600));
        assert_eq!(chain.contracts[0].expiry, "2024-07-04");
    }

    #[test]
    fn test_nse_date_format() {
        assert_eq!(parse_nse_date("27-Jun-2024"), NaiveDate::from_ymd_opt(2024, 6, 27));
        assert_eq!(parse_nse_date("2024-06-27"), None);
    }
}

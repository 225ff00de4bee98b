//! BSE statistics provider.
//!
//! Reads the SENSEX day range and market-wide advance/decline counts from
//! BSE's public JSON API. The API wants a `Referer` from bseindia.com but no
//! session.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header;
use rust_decimal::Decimal;
use serde_json::Value;
use tracing::debug;

use super::http::{check_status, host_of, send_guarded, BROWSER_USER_AGENT};
use super::lenient::{as_f64, as_u32, field};
use super::BreadthSource;
use crate::errors::MarketDataError;
use crate::models::{decimal_from_f64, MarketBreadth};
use crate::resilience::CircuitBreaker;

const PROVIDER_ID: &str = "BSE";

const API_BASE: &str = "https://api.bseindia.com/BseIndiaAPI/api";

const REFERER: &str = "https://www.bseindia.com/";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

const SENSEX_PATH: &str = "/GetSensexData/w";

const ADVANCE_DECLINE_PATH: &str = "/AdvanceDecline/w";

pub struct BseProvider {
    client: reqwest::Client,
    base_url: String,
    breaker: Arc<CircuitBreaker>,
}

impl BseProvider {
    pub fn new(breaker: Arc<CircuitBreaker>) -> Result<Self, MarketDataError> {
        let client = reqwest::Client::builder()
            .user_agent(BROWSER_USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            client,
            base_url: API_BASE.to_string(),
            breaker,
        })
    }

    async fn get_json(&self, path: &str) -> Result<Value, MarketDataError> {
        let url = format!("{}{}", self.base_url, path);
        let response = send_guarded(
            &self.breaker,
            PROVIDER_ID,
            host_of(&self.base_url),
            self.client
                .get(&url)
                .header(header::ACCEPT, "application/json")
                .header(header::REFERER, REFERER),
        )
        .await?;

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
impl BreadthSource for BseProvider {
    fn id(&self) -> &'static str {
        PROVIDER_ID
    }

    async fn market_breadth(&self) -> Result<MarketBreadth, MarketDataError> {
        debug!("Fetching SENSEX statistics from BSE");
        let (sensex, advance_decline) = futures::join!(
            self.get_json(SENSEX_PATH),
            self.get_json(ADVANCE_DECLINE_PATH)
        );

        // Either half is useful alone; fail only when both are missing.
        let mut breadth = MarketBreadth::default();
        let mut last_error = None;

        match sensex.and_then(|payload| parse_sensex_range(&payload)) {
            Ok((high, low)) => {
                breadth.high = high;
                breadth.low = low;
            }
            Err(e) => last_error = Some(e),
        }
        match advance_decline.and_then(|payload| parse_advance_decline(&payload)) {
            Ok((advances, declines, unchanged)) => {
                breadth.advances = advances;
                breadth.declines = declines;
                breadth.unchanged = unchanged;
            }
            Err(e) => last_error = Some(e),
        }

        match last_error {
            Some(e) if breadth.is_empty() => Err(e),
            _ => Ok(breadth),
        }
    }
}

fn invalid(message: &str) -> MarketDataError {
    MarketDataError::InvalidResponse {
        provider: PROVIDER_ID.to_string(),
        message: message.to_string(),
    }
}

/// BSE wraps single rows in an array, sometimes under `Table`.
fn first_row(payload: &Value) -> Option<&Value> {
    let rows = match payload {
        Value::Array(rows) => rows,
        Value::Object(_) => field(payload, "Table")?.as_array()?,
        _ => return None,
    };
    rows.first()
}

fn parse_sensex_range(
    payload: &Value,
) -> Result<(Option<Decimal>, Option<Decimal>), MarketDataError> {
    let row = first_row(payload).ok_or_else(|| invalid("SENSEX payload has no rows"))?;
    let decimal = |key: &str| field(row, key).and_then(as_f64).and_then(decimal_from_f64);

    let high = decimal("High");
    let low = decimal("Low");
    if high.is_none() && low.is_none() {
        return Err(invalid("SENSEX row has no high/low"));
    }
    Ok((high, low))
}

fn parse_advance_decline(
    payload: &Value,
) -> Result<(Option<u32>, Option<u32>, Option<u32>), MarketDataError> {
    let row = first_row(payload).ok_or_else(|| invalid("advance/decline payload has no rows"))?;
    let count = |key: &str| field(row, key).and_then(as_u32);

    let counts = (count("Advances"), count("Declines"), count("Unchanged"));
    if counts == (None, None, None) {
        return Err(invalid("advance/decline row has no counts"));
    }
    Ok(counts)
}

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::exchange::Exchange;

/// Point-in-time price record for one instrument, as normalized from a
/// provider payload.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    /// Exchange-qualified provider symbol (e.g. "RELIANCE.NS", "^NSEI")
    pub symbol: String,

    /// Display name
    pub name: String,

    /// Last traded price
    pub price: Decimal,

    /// Absolute change from previous close
    pub change: Decimal,

    /// Percent change from previous close
    pub change_percent: Decimal,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub day_high: Option<Decimal>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub day_low: Option<Decimal>,

    pub currency: String,

    /// Exchange label reported by the provider
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exchange: Option<String>,

    /// Provider market state (REGULAR, CLOSED, PRE, ...)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub market_state: Option<String>,
}

impl Quote {
    /// Create a quote with the required fields.
    pub fn new(
        symbol: impl Into<String>,
        name: impl Into<String>,
        price: Decimal,
        change: Decimal,
        change_percent: Decimal,
        currency: impl Into<String>,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            name: name.into(),
            price,
            change,
            change_percent,
            day_high: None,
            day_low: None,
            currency: currency.into(),
            exchange: None,
            market_state: None,
        }
    }

    pub fn with_day_range(mut self, high: Decimal, low: Decimal) -> Self {
        self.day_high = Some(high);
        self.day_low = Some(low);
        self
    }
}

/// Quote as returned by the quote endpoint.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteView {
    /// Bare display symbol (suffix stripped)
    pub symbol: String,
    pub yahoo_symbol: String,
    pub exchange: Exchange,
    pub name: String,
    pub price: Decimal,
    pub change: Decimal,
    pub change_percent: Decimal,
    pub currency: String,
    pub timestamp: DateTime<Utc>,
    /// True when served from the static fallback catalog
    pub stale: bool,
}

/// Convert a provider float into a two-decimal price.
///
/// Returns `None` for NaN and infinities.
pub fn decimal_from_f64(value: f64) -> Option<Decimal> {
    if !value.is_finite() {
        return None;
    }
    Decimal::from_f64_retain(value).map(|d| d.round_dp(2))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_quote_new() {
        let quote = Quote::new("TCS.NS", "Tata Consultancy", dec!(3950.10), dec!(12.5), dec!(0.32), "INR");
        assert_eq!(quote.price, dec!(3950.10));
        assert!(quote.day_high.is_none());

        let quote = quote.with_day_range(dec!(3990), dec!(3901.5));
        assert_eq!(quote.day_high, Some(dec!(3990)));
        assert_eq!(quote.day_low, Some(dec!(3901.5)));
    }

    #[test]
    fn test_decimal_from_f64_rounds() {
        assert_eq!(decimal_from_f64(2945.6789), Some(dec!(2945.68)));
        assert_eq!(decimal_from_f64(-0.125), Some(dec!(-0.12)));
        assert_eq!(decimal_from_f64(f64::NAN), None);
        assert_eq!(decimal_from_f64(f64::INFINITY), None);
    }

    #[test]
    fn test_quote_serializes_camel_case() {
        let quote = Quote::new("INFY.NS", "Infosys", dec!(1500), dec!(-3), dec!(-0.2), "INR");
        let json = serde_json::to_value(&quote).unwrap();
        assert!(json.get("changePercent").is_some());
        assert!(json.get("dayHigh").is_none());
    }
}

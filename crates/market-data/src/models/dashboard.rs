use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::exchange::Exchange;
use super::quote::Quote;
use crate::resolver::strip_exchange_suffix;

/// Display projection of a [`Quote`] for the market dashboard.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStock {
    /// Symbol with the exchange suffix stripped
    pub symbol: String,
    pub yahoo_symbol: String,
    pub name: String,
    pub price: Decimal,
    pub change: Decimal,
    pub change_percent: Decimal,
    pub exchange: Exchange,
}

impl DashboardStock {
    pub fn from_quote(quote: &Quote, exchange: Exchange) -> Self {
        Self {
            symbol: strip_exchange_suffix(&quote.symbol).to_string(),
            yahoo_symbol: quote.symbol.clone(),
            name: quote.name.clone(),
            price: quote.price,
            change: quote.change,
            change_percent: quote.change_percent,
            exchange,
        }
    }
}

/// Breadth and range statistics for one exchange.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketStats {
    pub today_high: Option<Decimal>,
    pub today_low: Option<Decimal>,
    pub advances: u32,
    pub declines: u32,
    pub unchanged: u32,
}

impl MarketStats {
    /// Overlay whatever the breadth feed provided.
    ///
    /// High and low apply independently. The advance/decline/unchanged counts
    /// only replace the watchlist approximation as a complete set, so the
    /// three numbers always come from the same source.
    pub fn apply_breadth(&mut self, breadth: &MarketBreadth) {
        if let Some(high) = breadth.high {
            self.today_high = Some(high);
        }
        if let Some(low) = breadth.low {
            self.today_low = Some(low);
        }
        if let (Some(advances), Some(declines), Some(unchanged)) =
            (breadth.advances, breadth.declines, breadth.unchanged)
        {
            self.advances = advances;
            self.declines = declines;
            self.unchanged = unchanged;
        }
    }
}

/// Market-wide statistics from an exchange's own statistics endpoint.
/// Every field is optional; missing fields keep the watchlist approximation.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MarketBreadth {
    pub high: Option<Decimal>,
    pub low: Option<Decimal>,
    pub advances: Option<u32>,
    pub declines: Option<u32>,
    pub unchanged: Option<u32>,
}

impl MarketBreadth {
    pub fn is_empty(&self) -> bool {
        self.high.is_none()
            && self.low.is_none()
            && self.advances.is_none()
            && self.declines.is_none()
            && self.unchanged.is_none()
    }
}

/// Dashboard view for one exchange. Rebuilt on every request.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExchangeDashboard {
    pub exchange: Exchange,
    pub indices: Vec<DashboardStock>,
    pub gainers: Vec<DashboardStock>,
    pub losers: Vec<DashboardStock>,
    pub stats: MarketStats,
    /// True when built from the static fallback data
    pub stale: bool,
    pub timestamp: DateTime<Utc>,
}

/// Merged, deduplicated view across both exchanges.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CombinedSnapshot {
    pub indices: Vec<DashboardStock>,
    pub gainers: Vec<DashboardStock>,
    pub losers: Vec<DashboardStock>,
    /// Stats keyed by exchange tag ("NSE", "BSE")
    pub stats: BTreeMap<String, MarketStats>,
    pub timestamp: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_from_quote_strips_suffix() {
        let quote = Quote::new("SBIN.BO", "State Bank of India", dec!(812.4), dec!(4.1), dec!(0.51), "INR");
        let stock = DashboardStock::from_quote(&quote, Exchange::Bse);
        assert_eq!(stock.symbol, "SBIN");
        assert_eq!(stock.yahoo_symbol, "SBIN.BO");
        assert_eq!(stock.exchange, Exchange::Bse);
    }

    #[test]
    fn test_apply_breadth_partial_counts_keep_watchlist_counts() {
        let mut stats = MarketStats {
            today_high: Some(dec!(100)),
            today_low: Some(dec!(90)),
            advances: 9,
            declines: 5,
            unchanged: 1,
        };
        stats.apply_breadth(&MarketBreadth {
            low: Some(dec!(88)),
            advances: Some(31),
            declines: Some(19),
            ..Default::default()
        });
        assert_eq!((stats.advances, stats.declines, stats.unchanged), (9, 5, 1));
        assert_eq!(stats.today_high, Some(dec!(100)));
        assert_eq!(stats.today_low, Some(dec!(88)));
    }

    #[test]
    fn test_apply_breadth_complete_counts_replace_all_three() {
        let mut stats = MarketStats {
            today_high: Some(dec!(100)),
            today_low: Some(dec!(90)),
            advances: 9,
            declines: 5,
            unchanged: 1,
        };
        stats.apply_breadth(&MarketBreadth {
            advances: Some(31),
            declines: Some(19),
            unchanged: Some(0),
            ..Default::default()
        });
        assert_eq!((stats.advances, stats.declines, stats.unchanged), (31, 19, 0));
        assert_eq!(stats.today_low, Some(dec!(90)));
    }
}

//! Yahoo Finance API response models.
//!
//! Only the fields we read are modelled; everything is optional because
//! Yahoo omits fields freely (indices have no volume, delisted symbols have
//! no price, etc.).

use serde::Deserialize;

/// Response wrapper for the v7 batched quote API
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct YahooQuoteResponse {
    pub quote_response: YahooQuoteResult,
}

#[derive(Debug, Deserialize)]
pub struct YahooQuoteResult {
    #[serde(default)]
    pub result: Vec<YahooQuoteItem>,
}

/// One symbol from the v7 quote API
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct YahooQuoteItem {
    pub symbol: String,
    pub short_name: Option<String>,
    pub long_name: Option<String>,
    pub currency: Option<String>,
    pub full_exchange_name: Option<String>,
    pub exchange: Option<String>,
    pub market_state: Option<String>,
    pub regular_market_price: Option<f64>,
    pub regular_market_change: Option<f64>,
    pub regular_market_change_percent: Option<f64>,
    pub regular_market_previous_close: Option<f64>,
    pub regular_market_day_high: Option<f64>,
    pub regular_market_day_low: Option<f64>,
}

/// Response wrapper for the v7 options API
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct YahooOptionResponse {
    pub option_chain: YahooOptionChain,
}

#[derive(Debug, Deserialize)]
pub struct YahooOptionChain {
    #[serde(default)]
    pub result: Vec<YahooOptionResult>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct YahooOptionResult {
    pub underlying_symbol: Option<String>,
    #[serde(default)]
    pub expiration_dates: Vec<i64>,
    pub quote: Option<YahooOptionQuote>,
    #[serde(default)]
    pub options: Vec<YahooOptionSet>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct YahooOptionQuote {
    pub regular_market_price: Option<f64>,
}

/// Calls and puts for one expiry
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct YahooOptionSet {
    pub expiration_date: Option<i64>,
    #[serde(default)]
    pub calls: Vec<YahooOptionContract>,
    #[serde(default)]
    pub puts: Vec<YahooOptionContract>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct YahooOptionContract {
    pub strike: Option<f64>,
    pub expiration: Option<i64>,
    pub last_price: Option<f64>,
    pub change: Option<f64>,
    pub bid: Option<f64>,
    pub ask: Option<f64>,
    pub volume: Option<u64>,
    pub open_interest: Option<u64>,
    pub implied_volatility: Option<f64>,
}

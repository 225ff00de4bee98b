//! Static fallback catalog of NSE large caps.
//!
//! Answers search and quote requests when the upstream provider is
//! unreachable or returns nothing. Prices are indicative reference levels,
//! not live data, and callers mark anything served from here as stale.

use rust_decimal::Decimal;
use serde::Serialize;

use crate::models::{Exchange, SearchHit};
use crate::resolver::strip_exchange_suffix;

const SCORE_SYMBOL_EXACT: u32 = 1000;
const SCORE_NAME_EXACT: u32 = 900;
const SCORE_SYMBOL_PREFIX: u32 = 800;
const SCORE_NAME_PREFIX: u32 = 600;
const SCORE_SYMBOL_CONTAINS: u32 = 400;
const SCORE_NAME_CONTAINS: u32 = 200;

struct CatalogEntry {
    symbol: &'static str,
    name: &'static str,
    /// Reference price in paise
    price_paise: i64,
}

const fn entry(symbol: &'static str, name: &'static str, price_paise: i64) -> CatalogEntry {
    CatalogEntry {
        symbol,
        name,
        price_paise,
    }
}

const CATALOG: &[CatalogEntry] = &[
    entry("RELIANCE", "Reliance Industries Ltd", 292_045),
    entry("TCS", "Tata Consultancy Services Ltd", 395_050),
    entry("HDFCBANK", "HDFC Bank Ltd", 153_210),
    entry("INFY", "Infosys Ltd", 149_875),
    entry("ICICIBANK", "ICICI Bank Ltd", 108_640),
    entry("HINDUNILVR", "Hindustan Unilever Ltd", 238_520),
    entry("ITC", "ITC Ltd", 43_215),
    entry("SBIN", "State Bank of India", 81_240),
    entry("BHARTIARTL", "Bharti Airtel Ltd", 138_760),
    entry("KOTAKBANK", "Kotak Mahindra Bank Ltd", 172_530),
    entry("LT", "Larsen & Toubro Ltd", 356_410),
    entry("AXISBANK", "Axis Bank Ltd", 112_785),
    entry("BAJFINANCE", "Bajaj Finance Ltd", 692_300),
    entry("MARUTI", "Maruti Suzuki India Ltd", 1_245_600),
    entry("SUNPHARMA", "Sun Pharmaceutical Industries Ltd", 152_490),
    entry("ASIANPAINT", "Asian Paints Ltd", 287_615),
    entry("HCLTECH", "HCL Technologies Ltd", 142_330),
    entry("WIPRO", "Wipro Ltd", 47_890),
    entry("ULTRACEMCO", "UltraTech Cement Ltd", 1_012_450),
    entry("TITAN", "Titan Company Ltd", 342_175),
    entry("NESTLEIND", "Nestle India Ltd", 248_960),
    entry("TATAMOTORS", "Tata Motors Ltd", 97_320),
    entry("TATASTEEL", "Tata Steel Ltd", 15_285),
    entry("POWERGRID", "Power Grid Corporation of India Ltd", 31_240),
    entry("NTPC", "NTPC Ltd", 35_670),
    entry("ONGC", "Oil & Natural Gas Corporation Ltd", 26_815),
    entry("M&M", "Mahindra & Mahindra Ltd", 265_040),
    entry("ADANIENT", "Adani Enterprises Ltd", 301_520),
    entry("BAJAJFINSV", "Bajaj Finserv Ltd", 161_875),
    entry("TECHM", "Tech Mahindra Ltd", 133_460),
    entry("DRREDDY", "Dr. Reddy's Laboratories Ltd", 594_210),
    entry("COALINDIA", "Coal India Ltd", 44_930),
];

/// A catalog entry qualified for one exchange.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FallbackStock {
    pub symbol: String,
    pub yahoo_symbol: String,
    pub name: String,
    pub price: Decimal,
    pub currency: String,
}

impl FallbackStock {
    fn from_entry(entry: &CatalogEntry, exchange: Exchange) -> Self {
        Self {
            symbol: entry.symbol.to_string(),
            yahoo_symbol: exchange.qualify(entry.symbol),
            name: entry.name.to_string(),
            price: Decimal::new(entry.price_paise, 2),
            currency: exchange.currency().to_string(),
        }
    }
}

fn score(entry: &CatalogEntry, query: &str) -> Option<u32> {
    let symbol = entry.symbol.to_lowercase();
    let name = entry.name.to_lowercase();

    if symbol == query {
        Some(SCORE_SYMBOL_EXACT)
    } else if name == query {
        Some(SCORE_NAME_EXACT)
    } else if symbol.starts_with(query) {
        Some(SCORE_SYMBOL_PREFIX)
    } else if name.starts_with(query) {
        Some(SCORE_NAME_PREFIX)
    } else if symbol.contains(query) {
        Some(SCORE_SYMBOL_CONTAINS)
    } else if name.contains(query) {
        Some(SCORE_NAME_CONTAINS)
    } else {
        None
    }
}

/// Ranked catalog matches for a free-text query, qualified for `exchange`.
///
/// Matching is case-insensitive against the bare symbol and the company
/// name. Results are ordered by score, then symbol. An empty query matches
/// nothing.
pub fn search_fallback(query: &str, exchange: Exchange, limit: usize) -> Vec<SearchHit> {
    let query = query.trim().to_lowercase();
    if query.is_empty() {
        return Vec::new();
    }

    let mut scored: Vec<(u32, &CatalogEntry)> = CATALOG
        .iter()
        .filter_map(|entry| score(entry, &query).map(|s| (s, entry)))
        .collect();
    scored.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.symbol.cmp(b.1.symbol)));

    scored
        .into_iter()
        .take(limit)
        .map(|(score, entry)| SearchHit {
            symbol: entry.symbol.to_string(),
            yahoo_symbol: exchange.qualify(entry.symbol),
            name: entry.name.to_string(),
            exchange,
            asset_type: "EQUITY".to_string(),
            score,
            fallback: true,
        })
        .collect()
}

/// Catalog entry for a bare or `.NS`/`.BO` qualified symbol, re-qualified
/// for `exchange`.
pub fn find_fallback_by_symbol(symbol: &str, exchange: Exchange) -> Option<FallbackStock> {
    let bare = strip_exchange_suffix(symbol.trim());
    CATALOG
        .iter()
        .find(|entry| entry.symbol.eq_ignore_ascii_case(bare))
        .map(|entry| FallbackStock::from_entry(entry, exchange))
}

/// Whether the catalog lists this company.
pub fn contains_symbol(symbol: &str) -> bool {
    let bare = strip_exchange_suffix(symbol.trim());
    CATALOG
        .iter()
        .any(|entry| entry.symbol.eq_ignore_ascii_case(bare))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_exact_symbol_ranks_first() {
        let hits = search_fallback("tcs", Exchange::Nse, 10);
        assert_eq!(hits[0].symbol, "TCS");
        assert_eq!(hits[0].yahoo_symbol, "TCS.NS");
        assert_eq!(hits[0].score, 1000);
        assert!(hits[0].fallback);
    }

    #[test]
    fn test_requalified_for_bse() {
        let hits = search_fallback("RELIANCE", Exchange::Bse, 10);
        assert_eq!(hits[0].yahoo_symbol, "RELIANCE.BO");
        assert_eq!(hits[0].exchange, Exchange::Bse);
    }

    #[test]
    fn test_scoring_tiers() {
        // Name prefix ("Tata ...") beats symbol substring; ties break by symbol
        let hits = search_fallback("tata", Exchange::Nse, 10);
        let symbols: Vec<&str> = hits.iter().map(|h| h.symbol.as_str()).collect();
        assert_eq!(symbols, vec!["TATAMOTORS", "TATASTEEL", "TCS"]);
        assert_eq!(hits[0].score, 800);
        assert_eq!(hits[2].score, 600);

        let hits = search_fallback("bank", Exchange::Nse, 10);
        assert!(hits.iter().all(|h| h.score == 400 || h.score == 200));
        assert_eq!(hits[0].symbol, "AXISBANK");
    }

    #[test]
    fn test_name_exact_and_limit() {
        let hits = search_fallback("infosys ltd", Exchange::Nse, 10);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].score, 900);

        assert_eq!(search_fallback("a", Exchange::Nse, 3).len(), 3);
        assert!(search_fallback("   ", Exchange::Nse, 10).is_empty());
        assert!(search_fallback("zzzz", Exchange::Nse, 10).is_empty());
    }

    #[test]
    fn test_find_fallback_by_symbol() {
        let stock = find_fallback_by_symbol("infy.ns", Exchange::Bse).unwrap();
        assert_eq!(stock.symbol, "INFY");
        assert_eq!(stock.yahoo_symbol, "INFY.BO");
        assert_eq!(stock.price, dec!(1498.75));
        assert_eq!(stock.currency, "INR");

        assert!(find_fallback_by_symbol("NOTREAL", Exchange::Nse).is_none());
        assert!(contains_symbol("M&M.BO"));
        assert!(!contains_symbol("AAPL"));
    }

    #[test]
    fn test_find_fallback_by_bare_symbol_on_bse() {
        let stock = find_fallback_by_symbol("RELIANCE", Exchange::Bse).unwrap();
        assert_eq!(stock.symbol, "RELIANCE");
        assert_eq!(stock.yahoo_symbol, "RELIANCE.BO");
        assert_eq!(stock.price, dec!(2920.45));
        assert_eq!(stock.currency, "INR");

        let nse = find_fallback_by_symbol("reliance.bo", Exchange::Nse).unwrap();
        assert_eq!(nse.yahoo_symbol, "RELIANCE.NS");
    }
}

//! Option chain routing between the Indian and global providers.

use chrono::NaiveDate;

use crate::catalog;
use crate::errors::MarketDataError;
use crate::models::Exchange;
use crate::provider::nse::is_derivative_index;
use crate::resolver::{exchange_of, normalize_symbol, strip_exchange_suffix};

/// Yahoo index symbols and their NSE derivative names.
const INDEX_ALIASES: [(&str, &str); 2] = [("^NSEI", "NIFTY"), ("^NSEBANK", "BANKNIFTY")];

/// Which provider family an underlying belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OptionMarket {
    /// NSE first, Yahoo as fallback
    India,
    /// Yahoo first, NSE as fallback
    Global,
}

impl OptionMarket {
    /// Indian when the symbol carries `.NS`/`.BO`, is an Indian index, is an
    /// NSE derivative index, or is listed in the fallback catalog.
    pub fn classify(symbol: &str) -> OptionMarket {
        let symbol = symbol.trim();
        if exchange_of(symbol).is_some()
            || INDEX_ALIASES
                .iter()
                .any(|(yahoo, _)| yahoo.eq_ignore_ascii_case(symbol))
            || is_derivative_index(symbol)
            || catalog::contains_symbol(symbol)
        {
            OptionMarket::India
        } else {
            OptionMarket::Global
        }
    }

    /// Symbol in the form the market's own provider expects.
    pub fn primary_symbol(&self, symbol: &str) -> String {
        match self {
            Self::India => nse_symbol(symbol),
            Self::Global => symbol.trim().to_uppercase(),
        }
    }

    /// Symbol in the form the fallback provider expects.
    pub fn secondary_symbol(&self, symbol: &str) -> String {
        match self {
            Self::India => yahoo_symbol(symbol),
            Self::Global => symbol.trim().to_uppercase(),
        }
    }
}

fn nse_symbol(symbol: &str) -> String {
    let upper = symbol.trim().to_uppercase();
    INDEX_ALIASES
        .iter()
        .find(|(yahoo, _)| *yahoo == upper)
        .map(|(_, nse)| nse.to_string())
        .unwrap_or_else(|| strip_exchange_suffix(&upper).to_string())
}

fn yahoo_symbol(symbol: &str) -> String {
    let upper = symbol.trim().to_uppercase();
    if let Some((yahoo, _)) = INDEX_ALIASES
        .iter()
        .find(|(_, nse)| *nse == strip_exchange_suffix(&upper))
    {
        return yahoo.to_string();
    }
    normalize_symbol(&upper, Exchange::Nse)
}

/// Parse an optional `YYYY-MM-DD` expiry.
pub(crate) fn parse_expiry(value: Option<&str>) -> Result<Option<NaiveDate>, MarketDataError> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        None => Ok(None),
        Some(v) => NaiveDate::parse_from_str(v, "%Y-%m-%d")
            .map(Some)
            .map_err(|_| MarketDataError::InvalidInput(format!("invalid date '{}', expected YYYY-MM-DD", v))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify() {
        assert_eq!(OptionMarket::classify("RELIANCE.NS"), OptionMarket::India);
        assert_eq!(OptionMarket::classify("TCS.BO"), OptionMarket::India);
        assert_eq!(OptionMarket::classify("banknifty"), OptionMarket::India);
        assert_eq!(OptionMarket::classify("^NSEI"), OptionMarket::India);
        assert_eq!(OptionMarket::classify("INFY"), OptionMarket::India);
        assert_eq!(OptionMarket::classify("AAPL"), OptionMarket::Global);
        assert_eq!(OptionMarket::classify("SPY"), OptionMarket::Global);
    }

    #[test]
    fn test_provider_symbols() {
        let india = OptionMarket::India;
        assert_eq!(india.primary_symbol("reliance.ns"), "RELIANCE");
        assert_eq!(india.primary_symbol("^NSEI"), "NIFTY");
        assert_eq!(india.secondary_symbol("RELIANCE"), "RELIANCE.NS");
        assert_eq!(india.secondary_symbol("TCS.BO"), "TCS.BO");
        assert_eq!(india.secondary_symbol("NIFTY"), "^NSEI");
        assert_eq!(india.secondary_symbol("BANKNIFTY"), "^NSEBANK");
        assert_eq!(india.secondary_symbol("FINNIFTY"), "FINNIFTY.NS");

        let global = OptionMarket::Global;
        assert_eq!(global.primary_symbol(" aapl "), "AAPL");
        assert_eq!(global.secondary_symbol("aapl"), "AAPL");
    }

    #[test]
    fn test_parse_expiry() {
        assert_eq!(parse_expiry(None).unwrap(), None);
        assert_eq!(parse_expiry(Some("  ")).unwrap(), None);
        assert_eq!(
            parse_expiry(Some("2024-06-27")).unwrap(),
            NaiveDate::from_ymd_opt(2024, 6, 27)
        );
        assert!(matches!(
            parse_expiry(Some("27-Jun-2024")),
            Err(MarketDataError::InvalidInput(_))
        ));
    }
}

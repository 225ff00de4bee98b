use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OptionKind {
    Call,
    Put,
}

/// One option contract row.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionContract {
    pub kind: OptionKind,
    pub strike: Decimal,
    /// Expiry as `YYYY-MM-DD`
    pub expiry: String,
    pub last_price: Option<Decimal>,
    pub change: Option<Decimal>,
    pub bid: Option<Decimal>,
    pub ask: Option<Decimal>,
    pub volume: Option<u64>,
    pub open_interest: Option<u64>,
    pub implied_volatility: Option<Decimal>,
}

/// Option chain for one underlying and (at most) one expiry.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionChain {
    pub symbol: String,
    pub underlying_price: Option<Decimal>,
    /// All listed expiries as `YYYY-MM-DD`
    pub expiry_dates: Vec<String>,
    pub selected_expiry: Option<String>,
    pub contracts: Vec<OptionContract>,
    /// Provider that produced the chain
    pub source: String,
}

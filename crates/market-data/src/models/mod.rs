//! Market data models.
//!
//! Everything here is ephemeral: fetched per request or per poll tick and
//! discarded. Nothing is persisted.

mod dashboard;
mod exchange;
mod history;
mod option_chain;
mod quote;
mod search;

pub use dashboard::{CombinedSnapshot, DashboardStock, ExchangeDashboard, MarketBreadth, MarketStats};
pub use exchange::Exchange;
pub use history::{ist_offset, HistoryPeriod, HistoryPoint, HistorySeries};
pub use option_chain::{OptionChain, OptionContract, OptionKind};
pub use quote::{decimal_from_f64, Quote, QuoteView};
pub use search::{SearchHit, SearchResult};

//! Per-exchange dashboards and the combined cross-exchange snapshot.

mod aggregator;
mod combine;

pub use aggregator::{fallback_dashboard, fetch_exchange_dashboard, WATCHLIST};
pub use combine::combine;

use std::collections::HashSet;

use rust_decimal::Decimal;

use crate::models::DashboardStock;

/// Length cap for the gainers and losers lists.
pub const MOVERS_LIMIT: usize = 5;

/// Split stocks into top gainers and top losers.
///
/// Gainers have `change_percent >= 0`, sorted descending. Losers have
/// `change_percent < 0`, sorted ascending (biggest fall first). Each list
/// holds at most [`MOVERS_LIMIT`] entries; repeated symbols keep their first
/// occurrence.
pub fn partition_movers(stocks: &[DashboardStock]) -> (Vec<DashboardStock>, Vec<DashboardStock>) {
    let mut seen = HashSet::new();
    let unique: Vec<&DashboardStock> = stocks
        .iter()
        .filter(|s| seen.insert(s.symbol.as_str()))
        .collect();

    let mut gainers: Vec<DashboardStock> = unique
        .iter()
        .filter(|s| s.change_percent >= Decimal::ZERO)
        .map(|s| (*s).clone())
        .collect();
    gainers.sort_by(|a, b| b.change_percent.cmp(&a.change_percent));
    gainers.truncate(MOVERS_LIMIT);

    let mut losers: Vec<DashboardStock> = unique
        .iter()
        .filter(|s| s.change_percent < Decimal::ZERO)
        .map(|s| (*s).clone())
        .collect();
    losers.sort_by(|a, b| a.change_percent.cmp(&b.change_percent));
    losers.truncate(MOVERS_LIMIT);

    (gainers, losers)
}

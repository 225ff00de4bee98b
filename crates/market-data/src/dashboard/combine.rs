use std::collections::{BTreeMap, HashMap};

use chrono::Utc;

use super::partition_movers;
use crate::models::{CombinedSnapshot, DashboardStock, ExchangeDashboard};
use crate::resolver::base_company_symbol;

/// Merge two exchange dashboards into one cross-exchange view.
///
/// - Indices are unioned and deduplicated by Yahoo symbol (a later entry
///   replaces an earlier one in place).
/// - Movers from both exchanges are deduplicated by company: when a company
///   appears on both exchanges the entry with the larger absolute percent
///   change is kept, the first one on a tie.
/// - Gainers and losers are re-derived from that universe.
pub fn combine(first: &ExchangeDashboard, second: &ExchangeDashboard) -> CombinedSnapshot {
    let mut indices: Vec<DashboardStock> = Vec::new();
    for index in first.indices.iter().chain(&second.indices) {
        match indices
            .iter_mut()
            .find(|existing| existing.yahoo_symbol == index.yahoo_symbol)
        {
            Some(existing) => *existing = index.clone(),
            None => indices.push(index.clone()),
        }
    }

    let mut universe: Vec<DashboardStock> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();
    let movers = first
        .gainers
        .iter()
        .chain(&first.losers)
        .chain(&second.gainers)
        .chain(&second.losers);
    for stock in movers {
        let company = base_company_symbol(&stock.yahoo_symbol);
        match positions.get(&company) {
            Some(&pos) => {
                if stock.change_percent.abs() > universe[pos].change_percent.abs() {
                    universe[pos] = stock.clone();
                }
            }
            None => {
                positions.insert(company, universe.len());
                universe.push(stock.clone());
            }
        }
    }

    let (gainers, losers) = partition_movers(&universe);

    let stats = [first, second]
        .iter()
        .map(|d| (d.exchange.tag().to_string(), d.stats.clone()))
        .collect::<BTreeMap<_, _>>();

    CombinedSnapshot {
        indices,
        gainers,
        losers,
        stats,
        timestamp: Utc::now(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dashboard::fallback_dashboard;
    use crate::dashboard::test_support::stock;
    use crate::models::{Exchange, MarketStats};
    use rust_decimal_macros::dec;
    use std::collections::HashSet;

    fn dashboard(
        exchange: Exchange,
        indices: Vec<DashboardStock>,
        gainers: Vec<DashboardStock>,
        losers: Vec<DashboardStock>,
    ) -> ExchangeDashboard {
        ExchangeDashboard {
            exchange,
            indices,
            gainers,
            losers,
            stats: MarketStats {
                advances: if exchange == Exchange::Nse { 30 } else { 2000 },
                ..Default::default()
            },
            stale: false,
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_same_company_keeps_larger_move() {
        let nse = dashboard(
            Exchange::Nse,
            vec![stock("^NSEI", dec!(0.4))],
            vec![stock("TCS.NS", dec!(1.2)), stock("INFY.NS", dec!(0.8))],
            vec![stock("ITC.NS", dec!(-0.5))],
        );
        let bse = dashboard(
            Exchange::Bse,
            vec![stock("^BSESN", dec!(0.3))],
            vec![stock("TCS.BO", dec!(1.4)), stock("INFY.BO", dec!(0.8))],
            vec![stock("ITC.BO", dec!(-0.7))],
        );

        let snapshot = combine(&nse, &bse);

        assert_eq!(snapshot.indices.len(), 2);
        let gainers: Vec<&str> = snapshot.gainers.iter().map(|s| s.yahoo_symbol.as_str()).collect();
        // TCS: BSE moved more; INFY: tie keeps the NSE entry
        assert_eq!(gainers, vec!["TCS.BO", "INFY.NS"]);
        assert_eq!(snapshot.losers.len(), 1);
        assert_eq!(snapshot.losers[0].yahoo_symbol, "ITC.BO");

        assert_eq!(snapshot.stats["NSE"].advances, 30);
        assert_eq!(snapshot.stats["BSE"].advances, 2000);
    }

    #[test]
    fn test_duplicate_indices_last_wins() {
        let a = dashboard(Exchange::Nse, vec![stock("^NSEI", dec!(0.1))], vec![], vec![]);
        let b = dashboard(Exchange::Bse, vec![stock("^NSEI", dec!(0.2))], vec![], vec![]);

        let snapshot = combine(&a, &b);
        assert_eq!(snapshot.indices.len(), 1);
        assert_eq!(snapshot.indices[0].change_percent, dec!(0.2));
    }

    #[test]
    fn test_fallback_dashboards_never_double_count() {
        let snapshot = combine(
            &fallback_dashboard(Exchange::Nse),
            &fallback_dashboard(Exchange::Bse),
        );

        let companies: Vec<String> = snapshot
            .gainers
            .iter()
            .chain(&snapshot.losers)
            .map(|s| base_company_symbol(&s.yahoo_symbol))
            .collect();
        let unique: HashSet<&String> = companies.iter().collect();
        assert_eq!(unique.len(), companies.len());

        assert!(snapshot.gainers.len() <= 5);
        assert!(snapshot.losers.len() <= 5);
        assert_eq!(snapshot.indices.len(), 2);
        assert_eq!(snapshot.stats.len(), 2);
    }
}

//! Exchange dashboard: benchmark index, top movers and breadth for one exchange.

use chrono::Utc;
use rust_decimal::Decimal;
use tracing::{debug, warn};

use super::partition_movers;
use crate::catalog::find_fallback_by_symbol;
use crate::errors::MarketDataError;
use crate::models::{DashboardStock, Exchange, ExchangeDashboard, MarketStats, Quote};
use crate::provider::{BreadthSource, QuoteSource};
use crate::resilience::WarnThrottle;

/// Benchmark large caps used to approximate market breadth.
pub const WATCHLIST: [&str; 15] = [
    "RELIANCE",
    "TCS",
    "HDFCBANK",
    "INFY",
    "ICICIBANK",
    "HINDUNILVR",
    "ITC",
    "SBIN",
    "BHARTIARTL",
    "KOTAKBANK",
    "LT",
    "AXISBANK",
    "BAJFINANCE",
    "MARUTI",
    "SUNPHARMA",
];

/// Static percent moves for the watchlist, in basis points, in
/// [`WATCHLIST`] order.
const FALLBACK_MOVES_BP: [i64; 15] = [
    112, 64, -38, 145, 27, -91, 0, 203, -17, -56, 88, 41, -132, 9, -4,
];

/// Static `(level, change percent in basis points)` for each benchmark index.
fn fallback_index_level(exchange: Exchange) -> (Decimal, i64) {
    match exchange {
        Exchange::Nse => (Decimal::new(2_245_035, 2), 42),
        Exchange::Bse => (Decimal::new(7_387_682, 2), 38),
    }
}

/// Build the dashboard for one exchange.
///
/// Never fails: when the batched quote call errors, or returns no index
/// quote or no watchlist quotes, the static fallback dashboard is returned
/// with `stale = true`. Breadth from `breadth` overrides the watchlist
/// approximation when available.
pub async fn fetch_exchange_dashboard(
    quotes: &dyn QuoteSource,
    breadth: Option<&dyn BreadthSource>,
    exchange: Exchange,
    throttle: &WarnThrottle,
) -> ExchangeDashboard {
    let index_symbol = exchange.index_symbol();
    let watchlist: Vec<String> = WATCHLIST.iter().map(|s| exchange.qualify(s)).collect();

    let mut symbols = Vec::with_capacity(watchlist.len() + 1);
    symbols.push(index_symbol.to_string());
    symbols.extend(watchlist.iter().cloned());

    let fetched = match quotes.get_quotes(&symbols).await {
        Ok(fetched) => fetched,
        Err(e) => {
            log_failure(throttle, exchange, "quotes", &e);
            return fallback_dashboard(exchange);
        }
    };

    let index_quote = fetched
        .iter()
        .find(|q| q.symbol.eq_ignore_ascii_case(index_symbol));
    let stocks: Vec<DashboardStock> = fetched
        .iter()
        .filter(|q| watchlist.iter().any(|w| w.eq_ignore_ascii_case(&q.symbol)))
        .map(|q| DashboardStock::from_quote(q, exchange))
        .collect();

    let Some(index_quote) = index_quote.filter(|_| !stocks.is_empty()) else {
        debug!(
            "{} dashboard: incomplete quote batch ({} of {} symbols), using static data",
            exchange,
            fetched.len(),
            symbols.len()
        );
        return fallback_dashboard(exchange);
    };

    let mut stats = watchlist_stats(&stocks);
    stats.today_high = Some(index_quote.day_high.unwrap_or(index_quote.price));
    stats.today_low = Some(index_quote.day_low.unwrap_or(index_quote.price));

    if let Some(source) = breadth {
        match source.market_breadth().await {
            Ok(breadth) => stats.apply_breadth(&breadth),
            Err(e) => log_failure(throttle, exchange, "breadth", &e),
        }
    }

    let (gainers, losers) = partition_movers(&stocks);
    ExchangeDashboard {
        exchange,
        indices: vec![index_stock(index_quote, exchange)],
        gainers,
        losers,
        stats,
        stale: false,
        timestamp: Utc::now(),
    }
}

/// Dashboard built entirely from static data.
///
/// Goes through the same partition and stats logic as live data, so its
/// advances, declines and unchanged always add up to the watchlist size.
pub fn fallback_dashboard(exchange: Exchange) -> ExchangeDashboard {
    let stocks: Vec<DashboardStock> = WATCHLIST
        .iter()
        .zip(FALLBACK_MOVES_BP)
        .filter_map(|(symbol, move_bp)| {
            let stock = find_fallback_by_symbol(symbol, exchange)?;
            let quote = static_quote(&stock.yahoo_symbol, &stock.name, stock.price, move_bp);
            Some(DashboardStock::from_quote(&quote, exchange))
        })
        .collect();

    let (level, move_bp) = fallback_index_level(exchange);
    let index = static_quote(exchange.index_symbol(), exchange.index_name(), level, move_bp);

    let mut stats = watchlist_stats(&stocks);
    stats.today_high = Some(index.price);
    stats.today_low = Some(index.price);

    let (gainers, losers) = partition_movers(&stocks);
    ExchangeDashboard {
        exchange,
        indices: vec![index_stock(&index, exchange)],
        gainers,
        losers,
        stats,
        stale: true,
        timestamp: Utc::now(),
    }
}

fn static_quote(symbol: &str, name: &str, price: Decimal, move_bp: i64) -> Quote {
    let change_percent = Decimal::new(move_bp, 2);
    let change = (price * change_percent / Decimal::ONE_HUNDRED).round_dp(2);
    Quote::new(symbol, name, price, change, change_percent, "INR")
}

fn index_stock(quote: &Quote, exchange: Exchange) -> DashboardStock {
    let mut stock = DashboardStock::from_quote(quote, exchange);
    if stock.name.trim().is_empty() {
        stock.name = exchange.index_name().to_string();
    }
    stock
}

fn watchlist_stats(stocks: &[DashboardStock]) -> MarketStats {
    let mut stats = MarketStats::default();
    for stock in stocks {
        if stock.change_percent > Decimal::ZERO {
            stats.advances += 1;
        } else if stock.change_percent < Decimal::ZERO {
            stats.declines += 1;
        } else {
            stats.unchanged += 1;
        }
    }
    stats
}

/// Transient failures are throttled; anything else is always logged.
fn log_failure(throttle: &WarnThrottle, exchange: Exchange, what: &str, err: &MarketDataError) {
    if !err.is_transient() {
        warn!("{} dashboard {} failed: {}", exchange, what, err);
    } else if throttle.allow() {
        warn!(
            "{} dashboard {} unavailable ({}); serving fallback data, further warnings suppressed for a while",
            exchange, what, err
        );
    } else {
        debug!("{} dashboard {} unavailable: {}", exchange, what, err);
    }
}

//! TradeDesk Market Data Crate
//!
//! Market data for the NSE and BSE pages of the TradeDesk site: live quotes,
//! search, price history, option chains and the per-exchange dashboards that
//! feed the live market stream.
//!
//! # Overview
//!
//! - Yahoo Finance for quotes, history, search and option chains, with a
//!   mirror host and a cached cookie/crumb session
//! - NSE and BSE statistics endpoints for market breadth
//! - A static catalog of large caps that answers when every upstream fails
//! - A DNS circuit breaker shared by all upstreams
//!
//! # Architecture
//!
//! ```text
//! +------------------+     +------------------+
//! |  QuoteSource     |     |  BreadthSource   |  (Yahoo / NSE, BSE)
//! +------------------+     +------------------+
//!          |                        |
//!          v                        v
//!  +------------------------------------------+
//!  |  fetch_exchange_dashboard (per exchange) |  --> static fallback
//!  +------------------------------------------+
//!                      |
//!                      v
//!             +------------------+
//!             |     combine      |  (dedupe across exchanges)
//!             +------------------+
//!                      |
//!                      v
//!             +------------------+
//!             | CombinedSnapshot |  (served one-shot or streamed)
//!             +------------------+
//! ```
//!
//! # Core Types
//!
//! - [`MarketDataService`] - Facade owning the sources and process-wide state
//! - [`Quote`] - Normalized provider quote
//! - [`ExchangeDashboard`] - Index, movers and breadth for one exchange
//! - [`CombinedSnapshot`] - Both exchanges merged
//! - [`Exchange`] - NSE or BSE, with Yahoo suffix conventions

pub mod cache;
pub mod catalog;
pub mod dashboard;
pub mod errors;
pub mod models;
pub mod provider;
pub mod resilience;
pub mod resolver;
pub mod service;

pub use errors::{MarketDataError, RetryClass};
pub use models::{
    CombinedSnapshot, DashboardStock, Exchange, ExchangeDashboard, HistoryPeriod, HistoryPoint,
    HistorySeries, MarketBreadth, MarketStats, OptionChain, OptionContract, OptionKind, Quote,
    QuoteView, SearchHit, SearchResult,
};
pub use provider::{BreadthSource, OptionChainSource, QuoteSource};
pub use service::{MarketDataService, SnapshotSource};

//! Upstream provider abstractions and implementations.
//!
//! This module contains:
//! - The source traits the service depends on ([`QuoteSource`],
//!   [`BreadthSource`], [`OptionChainSource`])
//! - Yahoo Finance (quotes, history, search, US/Indian option chains)
//! - NSE and BSE statistics endpoints (market breadth; NSE option chains)
//!
//! Every adapter goes through the shared DNS circuit breaker and falls back
//! to a mirror endpoint where the provider has one.

mod http;
mod lenient;
mod traits;

pub mod bse;
pub mod nse;
pub mod yahoo;

pub use traits::{BreadthSource, OptionChainSource, QuoteSource};

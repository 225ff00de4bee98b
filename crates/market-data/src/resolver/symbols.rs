//! Yahoo symbol normalization across the NSE/BSE suffix conventions.
//!
//! Yahoo identifies Indian listings with a suffix: `.NS` for NSE, `.BO` for
//! BSE. Indices carry a caret prefix (`^NSEI`), FX and futures an `=`.

use std::collections::HashSet;

use crate::models::Exchange;

/// Whether the symbol already says where it trades: an index marker, an
/// FX/futures marker, or any explicit `.SUFFIX`.
pub fn is_qualified(symbol: &str) -> bool {
    symbol.starts_with('^') || symbol.contains('=') || has_explicit_suffix(symbol)
}

fn has_explicit_suffix(symbol: &str) -> bool {
    match symbol.rsplit_once('.') {
        Some((base, suffix)) => {
            !base.is_empty() && !suffix.is_empty() && suffix.chars().all(|c| c.is_ascii_alphabetic())
        }
        None => false,
    }
}

/// Upper-case a ticker and qualify it for `default` when it carries no
/// suffix or index marker. Qualified symbols pass through unchanged.
pub fn normalize_symbol(raw: &str, default: Exchange) -> String {
    let symbol = raw.trim().to_uppercase();
    if symbol.is_empty() || is_qualified(&symbol) {
        symbol
    } else {
        default.qualify(&symbol)
    }
}

/// Candidate Yahoo forms to try for a user-entered symbol, most likely
/// first.
///
/// A bare ticker yields `[TICKER<preferred>, TICKER<alternate>, TICKER]` so a
/// single batched call can find the listing on either exchange. A symbol with
/// an index marker or explicit suffix yields just itself.
pub fn build_symbol_candidates(symbol: &str, preferred: Exchange) -> Vec<String> {
    let symbol = symbol.trim().to_uppercase();
    if symbol.is_empty() {
        return Vec::new();
    }
    if is_qualified(&symbol) {
        return vec![symbol];
    }

    let candidates = vec![
        preferred.qualify(&symbol),
        preferred.alternate().qualify(&symbol),
        symbol,
    ];
    dedupe_preserving_order(candidates)
}

/// Strip a `.NS`/`.BO` suffix. Other suffixes are kept.
pub fn strip_exchange_suffix(symbol: &str) -> &str {
    for exchange in Exchange::ALL {
        let suffix = exchange.suffix();
        if symbol.len() <= suffix.len() {
            continue;
        }
        let idx = symbol.len() - suffix.len();
        if symbol.is_char_boundary(idx) && symbol[idx..].eq_ignore_ascii_case(suffix) {
            return &symbol[..idx];
        }
    }
    symbol
}

/// Company identity of a symbol across both exchanges (`TCS.NS` and
/// `TCS.BO` are the same company).
pub fn base_company_symbol(symbol: &str) -> String {
    strip_exchange_suffix(symbol.trim()).to_uppercase()
}

/// Exchange a Yahoo symbol belongs to, if it is one of ours.
pub fn exchange_of(symbol: &str) -> Option<Exchange> {
    if let Some(exchange) = Exchange::ALL
        .into_iter()
        .find(|e| e.index_symbol().eq_ignore_ascii_case(symbol))
    {
        return Some(exchange);
    }
    symbol
        .rsplit_once('.')
        .and_then(|(_, suffix)| Exchange::from_suffix(suffix))
}

/// Trim, upper-case, drop empties and dedupe before a batched dispatch.
pub fn prepare_symbols<S: AsRef<str>>(symbols: &[S]) -> Vec<String> {
    let cleaned = symbols
        .iter()
        .map(|s| s.as_ref().trim().to_uppercase())
        .filter(|s| !s.is_empty())
        .collect();
    dedupe_preserving_order(cleaned)
}

fn dedupe_preserving_order(items: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|s| seen.insert(s.clone()))
        .collect()
}

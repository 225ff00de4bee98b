//! Symbol resolution between user input and provider symbols.

mod symbols;

pub use symbols::{
    base_company_symbol, build_symbol_candidates, exchange_of, is_qualified, normalize_symbol,
    prepare_symbols, strip_exchange_suffix,
};

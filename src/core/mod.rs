//! Core business logic abstractions

pub mod cache;
pub mod config;
pub mod fund;
pub mod log;

// Re-export main types for cleaner imports
pub use fund::{
    ChangePercent, FundRecord, FundSearchProvider, Holding, HoldingsProvider, QuoteProvider,
    SearchMatch, Valuation, ValuationProvider, validate_code,
};

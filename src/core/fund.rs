//! Fund domain types and provider abstractions

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt::Display;

/// Intraday change percent as reported by the estimate source.
///
/// The source occasionally returns placeholder text (e.g. "--") instead of a
/// number; those values are kept verbatim so display never panics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChangePercent {
    Number(f64),
    Raw(String),
}

impl ChangePercent {
    /// Normalizes a raw source value: numeric strings become `Number`,
    /// anything else is kept as `Raw`.
    pub fn parse(value: &serde_json::Value) -> Self {
        match value {
            serde_json::Value::Number(n) => match n.as_f64() {
                Some(f) => ChangePercent::Number(f),
                None => ChangePercent::Raw(n.to_string()),
            },
            serde_json::Value::String(s) => match s.trim().parse::<f64>() {
                Ok(f) => ChangePercent::Number(f),
                Err(_) => ChangePercent::Raw(s.clone()),
            },
            other => ChangePercent::Raw(other.to_string()),
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            ChangePercent::Number(f) => Some(*f),
            ChangePercent::Raw(_) => None,
        }
    }
}

impl Display for ChangePercent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChangePercent::Number(n) => write!(f, "{n:.2}%"),
            ChangePercent::Raw(s) => write!(f, "{s}"),
        }
    }
}

/// One constituent security of a fund, with its portfolio weight.
///
/// `change` is the security's daily change percent from a secondary lookup;
/// `None` means the lookup did not produce a value, not zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Holding {
    pub code: String,
    pub name: String,
    pub weight: f64,
    pub change: Option<f64>,
}

/// One tracked fund in the watchlist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FundRecord {
    pub code: String,
    pub name: String,
    /// Last confirmed NAV ("dwjz"). Source-provided, kept opaque.
    pub prior_nav: String,
    /// Current intraday NAV estimate ("gsz").
    pub estimated_nav: String,
    /// Estimated change percent ("gszzl").
    pub estimated_change_pct: ChangePercent,
    /// Source timestamp of the estimate ("gztime"). Opaque.
    pub estimated_at: String,
    #[serde(default)]
    pub holdings: Vec<Holding>,
}

/// Primary valuation payload before holdings are attached.
#[derive(Debug, Clone, PartialEq)]
pub struct Valuation {
    pub code: String,
    pub name: String,
    pub prior_nav: String,
    pub estimated_nav: String,
    pub estimated_change_pct: ChangePercent,
    pub estimated_at: String,
}

/// A candidate from free-text fund search.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchMatch {
    pub code: String,
    pub name: String,
    pub fund_type: String,
}

/// Checks the fixed-format fund identifier: exactly six ASCII digits.
pub fn validate_code(code: &str) -> Result<()> {
    if code.len() == 6 && code.bytes().all(|b| b.is_ascii_digit()) {
        Ok(())
    } else {
        anyhow::bail!("Invalid fund code '{}': expected 6 digits", code)
    }
}

#[async_trait]
pub trait ValuationProvider: Send + Sync {
    async fn fetch_valuation(&self, code: &str) -> Result<Valuation>;
}

#[async_trait]
pub trait HoldingsProvider: Send + Sync {
    /// Top holdings of a fund, in source order, at most 10 entries.
    async fn fetch_holdings(&self, code: &str) -> Result<Vec<Holding>>;
}

#[async_trait]
pub trait QuoteProvider: Send + Sync {
    /// Daily change percent per security code, batched in one request.
    /// Codes without a usable record are simply absent from the map.
    async fn fetch_changes(&self, codes: &[String]) -> Result<HashMap<String, f64>>;
}

#[async_trait]
pub trait FundSearchProvider: Send + Sync {
    async fn search(&self, query: &str) -> Result<Vec<SearchMatch>>;
}

//! Tencent batched quote endpoint (`/q=sh600000,sz000858,...`).
//!
//! The response is one JS assignment per symbol whose value is a `~`
//! delimited record; the daily change percent sits at a fixed offset.

use crate::core::QuoteProvider;
use crate::providers::util::{build_client, exchange_prefix, with_retry};
use anyhow::{Context, Result};
use async_trait::async_trait;
use regex::Regex;
use std::collections::HashMap;
use tracing::debug;

/// Field index of the daily change percent in a quote record.
const CHANGE_PCT_FIELD: usize = 32;

/// Pulls per-code change percents out of a quote document. Garbled or
/// truncated records are skipped, never an error.
pub fn parse_quote_changes(document: &str) -> HashMap<String, f64> {
    let record_re = Regex::new(r#"v_(?:sh|sz)(\d+)="([^"]*)""#).unwrap();

    let mut changes = HashMap::new();
    for caps in record_re.captures_iter(document) {
        let code = &caps[1];
        let fields: Vec<&str> = caps[2].split('~').collect();
        match fields.get(CHANGE_PCT_FIELD).map(|f| f.parse::<f64>()) {
            Some(Ok(pct)) => {
                changes.insert(code.to_string(), pct);
            }
            _ => {
                debug!("Skipping unusable quote record for {code}");
            }
        }
    }
    changes
}

pub struct TencentQuoteProvider {
    base_url: String,
    client: reqwest::Client,
}

impl TencentQuoteProvider {
    pub fn new(base_url: &str) -> Result<Self> {
        Ok(Self {
            base_url: base_url.to_string(),
            client: build_client()?,
        })
    }
}

#[async_trait]
impl QuoteProvider for TencentQuoteProvider {
    async fn fetch_changes(&self, codes: &[String]) -> Result<HashMap<String, f64>> {
        if codes.is_empty() {
            return Ok(HashMap::new());
        }

        let symbols: Vec<String> = codes
            .iter()
            .map(|code| format!("{}{}", exchange_prefix(code), code))
            .collect();
        let url = format!("{}/q={}", self.base_url, symbols.join(","));
        debug!("Requesting batch quotes from {}", url);

        let response = with_retry(|| async { self.client.get(&url).send().await }, 3, 500)
            .await
            .context("Failed to send batch quote request")?;

        let response_text = response
            .text()
            .await
            .context("Failed to get batch quote response text")?;

        Ok(parse_quote_changes(&response_text))
    }
}

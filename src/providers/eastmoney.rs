//! Eastmoney fund endpoints: intraday NAV estimates (fundgz), top-10
//! holdings (F10 archives), and free-text fund search.

use crate::core::cache::KeyValueCollection;
use crate::core::{ChangePercent, Holding, SearchMatch, Valuation};
use crate::core::{FundSearchProvider, HoldingsProvider, ValuationProvider};
use crate::providers::util::{build_client, strip_jsonp, with_retry};
use crate::store::KeyValueStore;
use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Holdings composition changes at most quarterly; cache aggressively.
const HOLDINGS_TTL: Duration = Duration::from_secs(6 * 60 * 60);

/// Raw fundgz payload. NAV fields arrive as strings but are numbers in
/// some variants; both are kept opaque.
#[derive(Debug, Deserialize)]
struct GzPayload {
    fundcode: String,
    name: String,
    #[serde(default)]
    dwjz: serde_json::Value,
    #[serde(default)]
    gsz: serde_json::Value,
    #[serde(default)]
    gszzl: serde_json::Value,
    #[serde(default)]
    gztime: String,
}

fn opaque_text(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}

pub struct EastmoneyValuationProvider {
    base_url: String,
    client: reqwest::Client,
}

impl EastmoneyValuationProvider {
    pub fn new(base_url: &str) -> Result<Self> {
        Ok(Self {
            base_url: base_url.to_string(),
            client: build_client()?,
        })
    }
}

#[async_trait]
impl ValuationProvider for EastmoneyValuationProvider {
    async fn fetch_valuation(&self, code: &str) -> Result<Valuation> {
        let url = format!("{}/js/{}.js", self.base_url, code);
        debug!("Requesting NAV estimate from {}", url);

        let response = with_retry(|| async { self.client.get(&url).send().await }, 3, 500)
            .await
            .with_context(|| format!("Failed to send valuation request for fund: {code}"))?;

        let response_text = response
            .text()
            .await
            .with_context(|| format!("Failed to get valuation response text for fund: {code}"))?;

        if response_text.trim().is_empty() {
            return Err(anyhow!("Received empty valuation response for fund: {code}"));
        }

        let body = strip_jsonp(&response_text)
            .with_context(|| format!("Unexpected valuation payload for fund: {code}"))?;

        let payload: GzPayload = serde_json::from_str(body).with_context(|| {
            format!("Failed to parse valuation payload for fund: {code}. Response: '{body}'")
        })?;

        debug!(
            "Fetched estimate for fund {}: gsz={:?}",
            payload.fundcode, payload.gsz
        );

        Ok(Valuation {
            code: payload.fundcode,
            name: payload.name,
            prior_nav: opaque_text(&payload.dwjz),
            estimated_nav: opaque_text(&payload.gsz),
            estimated_change_pct: ChangePercent::parse(&payload.gszzl),
            estimated_at: payload.gztime,
        })
    }
}

/// Extracts holding rows from the F10 archives document: a JS assignment
/// whose `content` field carries an HTML table. Rows that do not yield a
/// code, name and weight are skipped.
pub fn parse_holdings(document: &str) -> Result<Vec<Holding>> {
    let content_re = Regex::new(r#"(?s)content:\s*"(.*?)",\s*arryear"#).unwrap();
    let content = content_re
        .captures(document)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
        .ok_or_else(|| anyhow!("No content section in holdings document"))?;

    let row_re = Regex::new(r"(?s)<tr>(.*?)</tr>").unwrap();
    let link_re = Regex::new(r"<a[^>]*>([^<]+)</a>").unwrap();
    let weight_re = Regex::new(r"([0-9]+(?:\.[0-9]+)?)%").unwrap();

    let mut holdings = Vec::new();
    for row in row_re.captures_iter(content) {
        let row = &row[1];
        if row.contains("<th") {
            continue;
        }

        let mut links = link_re.captures_iter(row).map(|c| c[1].trim().to_string());
        let (Some(code), Some(name)) = (links.next(), links.next()) else {
            continue;
        };
        if code.len() < 5 || code.len() > 6 || !code.bytes().all(|b| b.is_ascii_digit()) {
            continue;
        }

        let Some(weight) = weight_re
            .captures(row)
            .and_then(|c| c[1].parse::<f64>().ok())
        else {
            // An unparseable weight is indistinguishable from a layout
            // change; drop the row rather than invent a number.
            debug!("Skipping holding row without parseable weight: {code}");
            continue;
        };

        holdings.push(Holding {
            code,
            name,
            weight,
            change: None,
        });
        if holdings.len() == 10 {
            break;
        }
    }

    Ok(holdings)
}

pub struct EastmoneyHoldingsProvider {
    base_url: String,
    client: reqwest::Client,
    cache: Arc<dyn KeyValueCollection>,
}

impl EastmoneyHoldingsProvider {
    pub fn new(base_url: &str, store: Arc<KeyValueStore>) -> Result<Self> {
        use crate::core::cache::Store;
        let cache = store
            .get_collection("holdings", true, true)
            .context("Failed to open holdings cache collection")?;
        Ok(Self {
            base_url: base_url.to_string(),
            client: build_client()?,
            cache,
        })
    }

    #[cfg(test)]
    pub(crate) fn new_with_collection(base_url: &str, cache: Arc<dyn KeyValueCollection>) -> Self {
        Self {
            base_url: base_url.to_string(),
            client: build_client().unwrap(),
            cache,
        }
    }
}

#[async_trait]
impl HoldingsProvider for EastmoneyHoldingsProvider {
    async fn fetch_holdings(&self, code: &str) -> Result<Vec<Holding>> {
        if let Some(cached) = self.cache.get(code.as_bytes()).await {
            debug!("Holdings cache hit for fund {}", code);
            return Ok(serde_json::from_slice(&cached)?);
        }

        let url = format!(
            "{}/FundArchivesDatas.aspx?type=jjcc&code={}&topline=10",
            self.base_url, code
        );
        debug!("Requesting holdings from {}", url);

        let response = with_retry(|| async { self.client.get(&url).send().await }, 3, 500)
            .await
            .with_context(|| format!("Failed to send holdings request for fund: {code}"))?;

        let response_text = response
            .text()
            .await
            .with_context(|| format!("Failed to get holdings response text for fund: {code}"))?;

        let holdings = parse_holdings(&response_text)
            .with_context(|| format!("Failed to extract holdings for fund: {code}"))?;

        self.cache
            .put(
                code.as_bytes(),
                &serde_json::to_vec(&holdings)?,
                Some(HOLDINGS_TTL),
            )
            .await;

        Ok(holdings)
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(rename = "Datas", default)]
    datas: Vec<SearchDatum>,
}

#[derive(Debug, Deserialize)]
struct SearchDatum {
    #[serde(rename = "CODE")]
    code: String,
    #[serde(rename = "NAME")]
    name: String,
    #[serde(rename = "CATEGORYDESC", default)]
    category: String,
    #[serde(rename = "FundBaseInfo", default)]
    base_info: Option<FundBaseInfo>,
}

#[derive(Debug, Deserialize, Default)]
struct FundBaseInfo {
    #[serde(rename = "FTYPE", default)]
    fund_type: String,
}

pub struct EastmoneySearchProvider {
    base_url: String,
    client: reqwest::Client,
}

impl EastmoneySearchProvider {
    pub fn new(base_url: &str) -> Result<Self> {
        Ok(Self {
            base_url: base_url.to_string(),
            client: build_client()?,
        })
    }
}

#[async_trait]
impl FundSearchProvider for EastmoneySearchProvider {
    async fn search(&self, query: &str) -> Result<Vec<SearchMatch>> {
        let url = format!("{}/FundSearch/api/FundSearchAPI.ashx", self.base_url);
        debug!("Searching funds via {} for '{}'", url, query);

        let response = with_retry(
            || async {
                self.client
                    .get(&url)
                    .query(&[("m", "1"), ("key", query)])
                    .send()
                    .await
            },
            3,
            500,
        )
        .await
        .with_context(|| format!("Failed to send search request for '{query}'"))?;

        let parsed: SearchResponse = response
            .json()
            .await
            .with_context(|| format!("Failed to parse search response for '{query}'"))?;

        // Only public funds are addable; other categories (stocks,
        // managers) share the same suggest endpoint.
        Ok(parsed
            .datas
            .into_iter()
            .filter(|d| d.category == "基金")
            .map(|d| SearchMatch {
                code: d.code,
                name: d.name,
                fund_type: d.base_info.unwrap_or_default().fund_type,
            })
            .collect())
    }
}

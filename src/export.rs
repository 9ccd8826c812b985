//! Watchlist export/import
//!
//! One JSON document bundles every persisted key with a schema version and
//! export timestamp. Import is a union-merge: local entries win on code
//! collision, imported extras are appended, and nothing is mutated unless
//! the whole document parses.

use crate::core::FundRecord;
use crate::watchlist::{MIN_REFRESH_INTERVAL_MS, ViewMode, Watchlist};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::info;

pub const BUNDLE_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
pub struct Bundle {
    pub version: u32,
    pub exported_at: DateTime<Utc>,
    pub funds: Vec<FundRecord>,
    #[serde(default)]
    pub favorites: Vec<String>,
    #[serde(default)]
    pub expanded: Vec<String>,
    #[serde(default)]
    pub refresh_interval_ms: Option<u64>,
    #[serde(default)]
    pub view_mode: Option<ViewMode>,
}

#[derive(Debug, Default, PartialEq)]
pub struct ImportSummary {
    pub funds_imported: usize,
    pub funds_kept: usize,
}

pub async fn export_bundle(watchlist: &Watchlist) -> Bundle {
    // Scalar preferences ride along only when the user actually set
    // them; exporting the defaults would pin them on whoever imports.
    let refresh_interval_ms = if watchlist.has_refresh_interval().await {
        Some(watchlist.refresh_interval_ms().await)
    } else {
        None
    };
    let view_mode = if watchlist.has_view_mode().await {
        Some(watchlist.view_mode().await)
    } else {
        None
    };

    Bundle {
        version: BUNDLE_VERSION,
        exported_at: Utc::now(),
        funds: watchlist.funds().await,
        favorites: watchlist.favorites().await,
        expanded: watchlist.expanded().await,
        refresh_interval_ms,
        view_mode,
    }
}

pub fn encode_bundle(bundle: &Bundle) -> Result<String> {
    serde_json::to_string_pretty(bundle).context("Failed to encode export bundle")
}

/// Merges a bundle document into the watchlist. A rejected document,
/// whether it fails to parse or fails validation, aborts before any
/// state is touched.
pub async fn import_bundle(watchlist: &Watchlist, raw: &str) -> Result<ImportSummary> {
    let bundle: Bundle =
        serde_json::from_str(raw).context("Failed to parse import document")?;
    if bundle.version > BUNDLE_VERSION {
        anyhow::bail!(
            "Unsupported bundle version {} (newest supported: {BUNDLE_VERSION})",
            bundle.version
        );
    }
    if let Some(ms) = bundle.refresh_interval_ms
        && ms < MIN_REFRESH_INTERVAL_MS
    {
        anyhow::bail!(
            "Bundle refresh interval {ms} ms is below the {MIN_REFRESH_INTERVAL_MS} ms minimum"
        );
    }

    // Funds: local records win on collision, imported extras append.
    let mut funds = watchlist.funds().await;
    let funds_kept = funds.len();
    let known: HashSet<String> = funds.iter().map(|f| f.code.clone()).collect();
    let mut funds_imported = 0;
    for fund in bundle.funds {
        if !known.contains(&fund.code) {
            funds.push(fund);
            funds_imported += 1;
        }
    }
    let codes: HashSet<String> = funds.iter().map(|f| f.code.clone()).collect();
    watchlist.save_funds(funds).await;

    // Flags: union, restricted to tracked codes so no orphan flags land.
    let mut favorites = watchlist.favorites().await;
    for code in bundle.favorites {
        if codes.contains(&code) && !favorites.contains(&code) {
            favorites.push(code);
        }
    }
    watchlist.save_favorites(favorites).await;

    let mut expanded = watchlist.expanded().await;
    for code in bundle.expanded {
        if codes.contains(&code) && !expanded.contains(&code) {
            expanded.push(code);
        }
    }
    watchlist.save_expanded(expanded).await;

    // Scalar preferences: a locally-set value wins over the bundle's.
    if let Some(ms) = bundle.refresh_interval_ms
        && !watchlist.has_refresh_interval().await
    {
        watchlist.set_refresh_interval_ms(ms).await?;
    }
    if let Some(mode) = bundle.view_mode
        && !watchlist.has_view_mode().await
    {
        watchlist.set_view_mode(mode).await;
    }

    info!(
        "Imported {} funds ({} already tracked)",
        funds_imported, funds_kept
    );
    Ok(ImportSummary {
        funds_imported,
        funds_kept,
    })
}

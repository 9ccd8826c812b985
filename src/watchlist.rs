//! Persisted watchlist state
//!
//! All user state lives in one key-value collection with JSON-encoded
//! values. Every mutation writes through immediately, so in-memory reads
//! and the persisted mirror never diverge.

use crate::core::FundRecord;
use crate::core::cache::KeyValueCollection;
use anyhow::Result;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt::Display;
use std::str::FromStr;
use std::sync::Arc;
use tracing::warn;

pub const MIN_REFRESH_INTERVAL_MS: u64 = 5000;
pub const DEFAULT_REFRESH_INTERVAL_MS: u64 = 60_000;

const KEY_FUNDS: &[u8] = b"funds";
const KEY_FAVORITES: &[u8] = b"favorites";
const KEY_EXPANDED: &[u8] = b"expanded";
const KEY_INTERVAL: &[u8] = b"refresh_interval_ms";
const KEY_VIEW_MODE: &[u8] = b"view_mode";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
    Table,
    Card,
}

impl Display for ViewMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ViewMode::Table => write!(f, "table"),
            ViewMode::Card => write!(f, "card"),
        }
    }
}

impl FromStr for ViewMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "table" => Ok(ViewMode::Table),
            "card" => Ok(ViewMode::Card),
            _ => Err(anyhow::anyhow!("Invalid view mode: {} (table|card)", s)),
        }
    }
}

/// Removes duplicate records by fund code, keeping the first occurrence.
/// Order of the survivors is preserved.
pub fn dedupe_funds(funds: Vec<FundRecord>) -> Vec<FundRecord> {
    let mut seen = HashSet::new();
    funds
        .into_iter()
        .filter(|f| seen.insert(f.code.clone()))
        .collect()
}

pub struct Watchlist {
    state: Arc<dyn KeyValueCollection>,
}

impl Watchlist {
    pub fn new(state: Arc<dyn KeyValueCollection>) -> Self {
        Self { state }
    }

    async fn read_json<T: DeserializeOwned + Default>(&self, key: &[u8]) -> T {
        match self.state.get(key).await {
            Some(raw) => serde_json::from_slice(&raw).unwrap_or_else(|e| {
                warn!(
                    "Discarding unreadable state for key {:?}: {e}",
                    String::from_utf8_lossy(key)
                );
                T::default()
            }),
            None => T::default(),
        }
    }

    async fn write_json<T: Serialize>(&self, key: &[u8], value: &T) {
        match serde_json::to_vec(value) {
            Ok(raw) => self.state.put(key, &raw, None).await,
            Err(e) => warn!(
                "Failed to encode state for key {:?}: {e}",
                String::from_utf8_lossy(key)
            ),
        }
    }

    pub async fn funds(&self) -> Vec<FundRecord> {
        self.read_json(KEY_FUNDS).await
    }

    /// Persists the tracked list, de-duplicating by code first.
    pub async fn save_funds(&self, funds: Vec<FundRecord>) {
        let funds = dedupe_funds(funds);
        self.write_json(KEY_FUNDS, &funds).await;
    }

    /// Deletes records by code. Removal cascades to the favorite and
    /// expanded flags so no per-code state outlives its record.
    pub async fn remove_funds(&self, codes: &[String]) -> usize {
        let targets: HashSet<&String> = codes.iter().collect();

        let funds = self.funds().await;
        let before = funds.len();
        let kept: Vec<FundRecord> = funds
            .into_iter()
            .filter(|f| !targets.contains(&f.code))
            .collect();
        let removed = before - kept.len();
        self.write_json(KEY_FUNDS, &kept).await;

        let favorites: Vec<String> = self
            .favorites()
            .await
            .into_iter()
            .filter(|c| !targets.contains(c))
            .collect();
        self.write_json(KEY_FAVORITES, &favorites).await;

        let expanded: Vec<String> = self
            .expanded()
            .await
            .into_iter()
            .filter(|c| !targets.contains(c))
            .collect();
        self.write_json(KEY_EXPANDED, &expanded).await;

        removed
    }

    pub async fn favorites(&self) -> Vec<String> {
        self.read_json(KEY_FAVORITES).await
    }

    pub async fn save_favorites(&self, codes: Vec<String>) {
        self.write_json(KEY_FAVORITES, &codes).await;
    }

    /// Returns the new flag state after toggling.
    pub async fn toggle_favorite(&self, code: &str) -> bool {
        let mut favorites = self.favorites().await;
        let now_set = if let Some(pos) = favorites.iter().position(|c| c == code) {
            favorites.remove(pos);
            false
        } else {
            favorites.push(code.to_string());
            true
        };
        self.write_json(KEY_FAVORITES, &favorites).await;
        now_set
    }

    pub async fn expanded(&self) -> Vec<String> {
        self.read_json(KEY_EXPANDED).await
    }

    pub async fn save_expanded(&self, codes: Vec<String>) {
        self.write_json(KEY_EXPANDED, &codes).await;
    }

    pub async fn toggle_expanded(&self, code: &str) -> bool {
        let mut expanded = self.expanded().await;
        let now_set = if let Some(pos) = expanded.iter().position(|c| c == code) {
            expanded.remove(pos);
            false
        } else {
            expanded.push(code.to_string());
            true
        };
        self.write_json(KEY_EXPANDED, &expanded).await;
        now_set
    }

    pub async fn refresh_interval_ms(&self) -> u64 {
        let ms: Option<u64> = self.read_json(KEY_INTERVAL).await;
        ms.unwrap_or(DEFAULT_REFRESH_INTERVAL_MS)
            .max(MIN_REFRESH_INTERVAL_MS)
    }

    pub async fn has_refresh_interval(&self) -> bool {
        self.state.contains(KEY_INTERVAL).await
    }

    pub async fn set_refresh_interval_ms(&self, ms: u64) -> Result<()> {
        if ms < MIN_REFRESH_INTERVAL_MS {
            anyhow::bail!(
                "Refresh interval must be at least {MIN_REFRESH_INTERVAL_MS} ms, got {ms}"
            );
        }
        self.write_json(KEY_INTERVAL, &ms).await;
        Ok(())
    }

    pub async fn view_mode(&self) -> ViewMode {
        let mode: Option<ViewMode> = self.read_json(KEY_VIEW_MODE).await;
        mode.unwrap_or(ViewMode::Table)
    }

    pub async fn has_view_mode(&self) -> bool {
        self.state.contains(KEY_VIEW_MODE).await
    }

    pub async fn set_view_mode(&self, mode: ViewMode) {
        self.write_json(KEY_VIEW_MODE, &mode).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ChangePercent;
    use crate::store::memory::MemoryCollection;

    fn record(code: &str, name: &str) -> FundRecord {
        FundRecord {
            code: code.to_string(),
            name: name.to_string(),
            prior_nav: "1.000".to_string(),
            estimated_nav: "1.010".to_string(),
            estimated_change_pct: ChangePercent::Number(1.0),
            estimated_at: "2026-08-28 10:00".to_string(),
            holdings: vec![],
        }
    }

    fn watchlist() -> Watchlist {
        Watchlist::new(Arc::new(MemoryCollection::new()))
    }

    #[test]
    fn test_dedupe_keeps_first_occurrence() {
        let funds = vec![
            record("000001", "first"),
            record("000002", "second"),
            record("000001", "dup"),
        ];
        let deduped = dedupe_funds(funds);
        assert_eq!(deduped.len(), 2);
        assert_eq!(deduped[0].name, "first");
        assert_eq!(deduped[1].code, "000002");
    }

    #[test]
    fn test_dedupe_is_idempotent() {
        let funds = vec![record("000001", "a"), record("000002", "b")];
        let once = dedupe_funds(funds);
        let twice = dedupe_funds(once.clone());
        assert_eq!(once, twice);
    }

    #[tokio::test]
    async fn test_save_and_load_funds() {
        let wl = watchlist();
        assert!(wl.funds().await.is_empty());

        wl.save_funds(vec![record("000001", "a"), record("000001", "dup")])
            .await;
        let funds = wl.funds().await;
        assert_eq!(funds.len(), 1);
        assert_eq!(funds[0].name, "a");
    }

    #[tokio::test]
    async fn test_remove_cascades_flags() {
        let wl = watchlist();
        wl.save_funds(vec![record("000001", "a"), record("000002", "b")])
            .await;
        wl.toggle_favorite("000001").await;
        wl.toggle_expanded("000001").await;
        wl.toggle_favorite("000002").await;

        let removed = wl.remove_funds(&["000001".to_string()]).await;
        assert_eq!(removed, 1);
        assert_eq!(wl.funds().await.len(), 1);
        assert_eq!(wl.favorites().await, vec!["000002".to_string()]);
        assert!(wl.expanded().await.is_empty());
    }

    #[tokio::test]
    async fn test_toggle_favorite_roundtrip() {
        let wl = watchlist();
        assert!(wl.toggle_favorite("000001").await);
        assert!(!wl.toggle_favorite("000001").await);
        assert!(wl.favorites().await.is_empty());
    }

    #[tokio::test]
    async fn test_interval_floor_and_validation() {
        let wl = watchlist();
        assert_eq!(wl.refresh_interval_ms().await, DEFAULT_REFRESH_INTERVAL_MS);
        assert!(!wl.has_refresh_interval().await);

        assert!(wl.set_refresh_interval_ms(1000).await.is_err());
        wl.set_refresh_interval_ms(5000).await.unwrap();
        assert_eq!(wl.refresh_interval_ms().await, 5000);
        assert!(wl.has_refresh_interval().await);
    }

    #[tokio::test]
    async fn test_view_mode_persists() {
        let wl = watchlist();
        assert_eq!(wl.view_mode().await, ViewMode::Table);
        wl.set_view_mode(ViewMode::Card).await;
        assert_eq!(wl.view_mode().await, ViewMode::Card);
    }

    #[test]
    fn test_view_mode_from_str() {
        assert_eq!("table".parse::<ViewMode>().unwrap(), ViewMode::Table);
        assert_eq!("Card".parse::<ViewMode>().unwrap(), ViewMode::Card);
        assert!("grid".parse::<ViewMode>().is_err());
    }

    #[tokio::test]
    async fn test_corrupt_state_degrades_to_default() {
        let col = Arc::new(MemoryCollection::new());
        col.put(b"funds", b"not json", None).await;
        let wl = Watchlist::new(col);
        assert!(wl.funds().await.is_empty());
    }
}

//! Fund data refresh pipeline
//!
//! Owns the only write path to the tracked list: fetch per-code data,
//! merge into the current list, persist. At most one refresh cycle runs
//! at a time; per-code failures degrade instead of aborting the batch.

use crate::core::{
    FundRecord, HoldingsProvider, QuoteProvider, Valuation, ValuationProvider, validate_code,
};
use crate::watchlist::{Watchlist, dedupe_funds};
use anyhow::Result;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, warn};

/// Mutual exclusion for refresh cycles: `Idle -> Running -> Idle`, no
/// queuing. A trigger while running is dropped, not deferred.
pub struct Scheduler {
    running: AtomicBool,
}

impl Scheduler {
    pub fn new() -> Self {
        Self {
            running: AtomicBool::new(false),
        }
    }

    /// Attempts the `Idle -> Running` transition. Returns false when a
    /// cycle is already in flight.
    pub fn try_start(&self) -> bool {
        self.running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    pub fn finish(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

/// Clears the Running flag when dropped, so every exit path from a cycle,
/// including early returns, resets the scheduler.
struct RunGuard<'a>(&'a Scheduler);

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.0.finish();
    }
}

#[derive(Debug, Clone)]
pub struct AddRequest {
    pub code: String,
    /// Display name from the originating search selection, if any. Used
    /// only to label failures.
    pub name_hint: Option<String>,
}

impl AddRequest {
    pub fn bare(code: &str) -> Self {
        Self {
            code: code.to_string(),
            name_hint: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FailedAdd {
    pub code: String,
    pub name: Option<String>,
}

#[derive(Debug, Default)]
pub struct AddOutcome {
    pub added: Vec<FundRecord>,
    pub skipped: Vec<String>,
    pub failed: Vec<FailedAdd>,
}

/// Replaces every entry of `current` whose code appears in `batch` with the
/// batch record; entries outside the batch pass through unchanged, and the
/// result carries no duplicate codes. Batch records without a counterpart
/// in `current` are dropped (the fund was removed mid-cycle).
pub fn merge_funds(
    current: Vec<FundRecord>,
    batch: &HashMap<String, FundRecord>,
) -> Vec<FundRecord> {
    dedupe_funds(
        current
            .into_iter()
            .map(|f| batch.get(&f.code).cloned().unwrap_or(f))
            .collect(),
    )
}

pub struct RefreshPipeline {
    valuation: Arc<dyn ValuationProvider>,
    holdings: Arc<dyn HoldingsProvider>,
    quotes: Arc<dyn QuoteProvider>,
    watchlist: Arc<Watchlist>,
    scheduler: Scheduler,
}

impl RefreshPipeline {
    pub fn new(
        valuation: Arc<dyn ValuationProvider>,
        holdings: Arc<dyn HoldingsProvider>,
        quotes: Arc<dyn QuoteProvider>,
        watchlist: Arc<Watchlist>,
    ) -> Self {
        Self {
            valuation,
            holdings,
            quotes,
            watchlist,
            scheduler: Scheduler::new(),
        }
    }

    pub fn watchlist(&self) -> &Watchlist {
        &self.watchlist
    }

    /// True while a refresh cycle is in flight.
    pub fn is_refreshing(&self) -> bool {
        self.scheduler.is_running()
    }

    /// Builds a full record for one fund. Only a failure of the primary
    /// valuation lookup is an error; the holdings and per-holding quote
    /// lookups degrade to an empty list or absent change values.
    pub async fn fetch_one(&self, code: &str) -> Result<FundRecord> {
        validate_code(code)?;

        let Valuation {
            code,
            name,
            prior_nav,
            estimated_nav,
            estimated_change_pct,
            estimated_at,
        } = self.valuation.fetch_valuation(code).await?;

        let mut holdings = match self.holdings.fetch_holdings(&code).await {
            Ok(h) => h,
            Err(e) => {
                warn!("Holdings lookup failed for {code}: {e}");
                Vec::new()
            }
        };

        if !holdings.is_empty() {
            let holding_codes: Vec<String> = holdings.iter().map(|h| h.code.clone()).collect();
            match self.quotes.fetch_changes(&holding_codes).await {
                Ok(changes) => {
                    for holding in &mut holdings {
                        holding.change = changes.get(&holding.code).copied();
                    }
                }
                Err(e) => {
                    warn!("Per-holding quote lookup failed for {code}: {e}");
                }
            }
        }

        Ok(FundRecord {
            code,
            name,
            prior_nav,
            estimated_nav,
            estimated_change_pct,
            estimated_at,
            holdings,
        })
    }

    /// Runs one refresh cycle over the tracked list. Returns false when
    /// another cycle was already running (the call is a no-op).
    ///
    /// Codes are fetched one at a time, in tracked-list order, to keep a
    /// single outbound request in flight against the quote source. A
    /// failed fetch substitutes the previously known record, so the merge
    /// never drops an entry over a transient failure.
    pub async fn refresh_all(&self) -> Result<bool> {
        if !self.scheduler.try_start() {
            debug!("Refresh already running, dropping trigger");
            return Ok(false);
        }
        let _guard = RunGuard(&self.scheduler);

        let current = self.watchlist.funds().await;
        let mut seen = HashSet::new();
        let codes: Vec<String> = current
            .iter()
            .map(|f| f.code.clone())
            .filter(|c| seen.insert(c.clone()))
            .collect();

        let mut prior: HashMap<String, FundRecord> = HashMap::new();
        for fund in current {
            prior.entry(fund.code.clone()).or_insert(fund);
        }

        debug!("Refreshing {} funds", codes.len());
        let mut batch: HashMap<String, FundRecord> = HashMap::new();
        for code in codes {
            match self.fetch_one(&code).await {
                Ok(record) => {
                    batch.insert(code, record);
                }
                Err(e) => {
                    warn!("Refresh failed for {code}: {e}");
                    if let Some(previous) = prior.get(&code) {
                        batch.insert(code, previous.clone());
                    }
                }
            }
        }

        // Reconcile against the list as it stands now, not as it was at
        // cycle start; adds and removals made mid-cycle must survive.
        let at_merge = self.watchlist.funds().await;
        let merged = merge_funds(at_merge, &batch);
        self.watchlist.save_funds(merged).await;

        Ok(true)
    }

    /// Adds new funds to the tracked list, newest first. Codes already
    /// tracked are skipped (neither success nor failure); a code either
    /// lands fully formed in the list or is reported in `failed`.
    pub async fn add_many(&self, requests: &[AddRequest]) -> AddOutcome {
        let mut outcome = AddOutcome::default();

        let mut seen: HashSet<String> = self
            .watchlist
            .funds()
            .await
            .iter()
            .map(|f| f.code.clone())
            .collect();

        for request in requests {
            if !seen.insert(request.code.clone()) {
                debug!("Skipping already tracked fund {}", request.code);
                outcome.skipped.push(request.code.clone());
                continue;
            }
            match self.fetch_one(&request.code).await {
                Ok(record) => outcome.added.push(record),
                Err(e) => {
                    warn!("Failed to add fund {}: {e}", request.code);
                    outcome.failed.push(FailedAdd {
                        code: request.code.clone(),
                        name: request.name_hint.clone(),
                    });
                }
            }
        }

        if !outcome.added.is_empty() {
            let mut list = outcome.added.clone();
            list.extend(self.watchlist.funds().await);
            self.watchlist.save_funds(list).await;
        }

        outcome
    }
}

pub mod cli;
pub mod core;
pub mod export;
pub mod pipeline;
pub mod providers;
pub mod store;
pub mod watchlist;

use crate::core::cache::Store;
use crate::core::config::AppConfig;
use crate::pipeline::RefreshPipeline;
use crate::providers::eastmoney::{
    EastmoneyHoldingsProvider, EastmoneySearchProvider, EastmoneyValuationProvider,
};
use crate::providers::tencent::TencentQuoteProvider;
use crate::store::KeyValueStore;
use crate::watchlist::Watchlist;
use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Clone)]
pub enum AppCommand {
    Add { codes: Vec<String> },
    Remove { codes: Vec<String> },
    List,
    Watch,
    Search { query: String, add: bool },
    Fav { code: String },
    Expand { code: String },
    View { mode: String },
    Interval { ms: u64 },
    Export { path: Option<String> },
    Import { path: String },
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    let config = match config_path {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };
    debug!("Loaded config: {config:#?}");

    let data_path = config.default_data_path()?;
    let store = Arc::new(KeyValueStore::open(&data_path));
    let state = store
        .get_collection("state", true, true)
        .context("Failed to open watchlist state collection")?;
    let watchlist = Arc::new(Watchlist::new(state));

    match command {
        AppCommand::Add { codes } => {
            let pipeline = build_pipeline(&config, store, Arc::clone(&watchlist))?;
            cli::add::run(&pipeline, &codes).await
        }
        AppCommand::Remove { codes } => cli::prefs::remove(&watchlist, &codes).await,
        AppCommand::List => {
            let pipeline = build_pipeline(&config, store, Arc::clone(&watchlist))?;
            cli::list::run(&pipeline).await
        }
        AppCommand::Watch => {
            let pipeline = build_pipeline(&config, store, Arc::clone(&watchlist))?;
            cli::watch::run(&pipeline).await
        }
        AppCommand::Search { query, add } => {
            let pipeline = build_pipeline(&config, store, Arc::clone(&watchlist))?;
            let search_provider = EastmoneySearchProvider::new(config.search_base_url())?;
            cli::search::run(&search_provider, &pipeline, &query, add).await
        }
        AppCommand::Fav { code } => cli::prefs::toggle_favorite(&watchlist, &code).await,
        AppCommand::Expand { code } => cli::prefs::toggle_expanded(&watchlist, &code).await,
        AppCommand::View { mode } => cli::prefs::set_view_mode(&watchlist, &mode).await,
        AppCommand::Interval { ms } => cli::prefs::set_interval(&watchlist, ms).await,
        AppCommand::Export { path } => cli::bundle::export(&watchlist, path.as_deref()).await,
        AppCommand::Import { path } => cli::bundle::import(&watchlist, &path).await,
    }
}

fn build_pipeline(
    config: &AppConfig,
    store: Arc<KeyValueStore>,
    watchlist: Arc<Watchlist>,
) -> Result<RefreshPipeline> {
    let valuation = EastmoneyValuationProvider::new(config.valuation_base_url())?;
    let holdings = EastmoneyHoldingsProvider::new(config.holdings_base_url(), store)?;
    let quotes = TencentQuoteProvider::new(config.quotes_base_url())?;

    Ok(RefreshPipeline::new(
        Arc::new(valuation),
        Arc::new(holdings),
        Arc::new(quotes),
        watchlist,
    ))
}

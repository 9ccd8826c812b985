use crate::export;
use crate::watchlist::Watchlist;
use anyhow::{Context, Result};
use chrono::Utc;
use std::path::PathBuf;

pub async fn export(watchlist: &Watchlist, path: Option<&str>) -> Result<()> {
    let path = match path {
        Some(p) => PathBuf::from(p),
        None => PathBuf::from(format!("fnav-export-{}.json", Utc::now().format("%Y%m%d"))),
    };

    let bundle = export::export_bundle(watchlist).await;
    let encoded = export::encode_bundle(&bundle)?;
    std::fs::write(&path, encoded)
        .with_context(|| format!("Failed to write export to {}", path.display()))?;

    println!(
        "Exported {} fund(s) to {}.",
        bundle.funds.len(),
        path.display()
    );
    Ok(())
}

pub async fn import(watchlist: &Watchlist, path: &str) -> Result<()> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read import file: {path}"))?;

    let summary = export::import_bundle(watchlist, &raw).await?;
    println!(
        "Imported {} new fund(s); {} already tracked.",
        summary.funds_imported, summary.funds_kept
    );
    Ok(())
}

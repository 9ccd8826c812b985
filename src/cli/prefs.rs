use super::ui;
use crate::core::validate_code;
use crate::watchlist::Watchlist;
use anyhow::Result;

pub async fn remove(watchlist: &Watchlist, codes: &[String]) -> Result<()> {
    let removed = watchlist.remove_funds(codes).await;
    if removed == 0 {
        println!(
            "{}",
            ui::style_text("No matching funds in the watchlist.", ui::StyleType::Subtle)
        );
    } else {
        println!("Removed {removed} fund(s).");
    }
    Ok(())
}

pub async fn toggle_favorite(watchlist: &Watchlist, code: &str) -> Result<()> {
    validate_code(code)?;
    if watchlist.toggle_favorite(code).await {
        println!("{}", ui::style_text(&format!("★ {code}"), ui::StyleType::Favorite));
    } else {
        println!("Removed {code} from favorites.");
    }
    Ok(())
}

pub async fn toggle_expanded(watchlist: &Watchlist, code: &str) -> Result<()> {
    validate_code(code)?;
    if watchlist.toggle_expanded(code).await {
        println!("Holdings for {code} will be shown.");
    } else {
        println!("Holdings for {code} are now hidden.");
    }
    Ok(())
}

pub async fn set_view_mode(watchlist: &Watchlist, mode: &str) -> Result<()> {
    let mode = mode.parse()?;
    watchlist.set_view_mode(mode).await;
    println!("View mode set to {mode}.");
    Ok(())
}

pub async fn set_interval(watchlist: &Watchlist, ms: u64) -> Result<()> {
    watchlist.set_refresh_interval_ms(ms).await?;
    println!("Refresh interval set to {ms} ms.");
    Ok(())
}

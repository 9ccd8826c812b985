use super::{list, ui};
use crate::pipeline::RefreshPipeline;
use anyhow::Result;
use std::time::Duration;
use tracing::debug;

/// Periodically refreshes and re-renders the watchlist until interrupted.
///
/// The refresh interval comes from persisted state. Ticks that arrive
/// while a cycle is still running are dropped by the pipeline's guard.
pub async fn run(pipeline: &RefreshPipeline) -> Result<()> {
    let interval_ms = pipeline.watchlist().refresh_interval_ms().await;
    debug!("Watching with a {interval_ms}ms refresh interval");

    let mut ticker = tokio::time::interval(Duration::from_millis(interval_ms));
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let spinner = ui::new_spinner("Refreshing funds...");
                let ran = pipeline.refresh_all().await?;
                spinner.finish_and_clear();

                if ran {
                    let term = console::Term::stdout();
                    let _ = term.clear_screen();
                    println!("{}", list::render(pipeline.watchlist()).await);
                    println!(
                        "{}",
                        ui::style_text(
                            &format!("Refreshing every {}s. Ctrl-C to exit.", interval_ms / 1000),
                            ui::StyleType::Subtle
                        )
                    );
                } else {
                    debug!("Tick dropped, previous cycle still running");
                }
            }
            _ = tokio::signal::ctrl_c() => {
                println!("\nStopped.");
                return Ok(());
            }
        }
    }
}

use super::ui;
use crate::core::FundRecord;
use crate::pipeline::RefreshPipeline;
use crate::watchlist::{ViewMode, Watchlist};
use anyhow::Result;
use comfy_table::Cell;
use std::collections::HashSet;

/// Refreshes the tracked list once and renders it in the persisted view
/// mode.
pub async fn run(pipeline: &RefreshPipeline) -> Result<()> {
    let spinner = ui::new_spinner("Refreshing funds...");
    pipeline.refresh_all().await?;
    spinner.finish_and_clear();

    println!("{}", render(pipeline.watchlist()).await);
    Ok(())
}

pub async fn render(watchlist: &Watchlist) -> String {
    let funds = watchlist.funds().await;
    if funds.is_empty() {
        return ui::style_text(
            "No funds tracked yet. Use `fnav add <code>` or `fnav search <name>`.",
            ui::StyleType::Subtle,
        );
    }

    let favorites: HashSet<String> = watchlist.favorites().await.into_iter().collect();
    let expanded: HashSet<String> = watchlist.expanded().await.into_iter().collect();
    let funds = order_for_display(funds, &favorites);

    match watchlist.view_mode().await {
        ViewMode::Table => render_table(&funds, &favorites, &expanded),
        ViewMode::Card => render_cards(&funds, &favorites, &expanded),
    }
}

/// Favorites float to the top; otherwise tracked-list order is preserved.
pub fn order_for_display(funds: Vec<FundRecord>, favorites: &HashSet<String>) -> Vec<FundRecord> {
    let (favored, rest): (Vec<_>, Vec<_>) = funds
        .into_iter()
        .partition(|f| favorites.contains(&f.code));
    favored.into_iter().chain(rest).collect()
}

fn fund_label(fund: &FundRecord, favorites: &HashSet<String>) -> String {
    if favorites.contains(&fund.code) {
        format!("★ {}", fund.name)
    } else {
        fund.name.clone()
    }
}

fn render_table(
    funds: &[FundRecord],
    favorites: &HashSet<String>,
    expanded: &HashSet<String>,
) -> String {
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Fund"),
        ui::header_cell("Code"),
        ui::header_cell("NAV"),
        ui::header_cell("Est. NAV"),
        ui::header_cell("Est. Change"),
        ui::header_cell("As Of"),
    ]);

    for fund in funds {
        table.add_row(vec![
            Cell::new(fund_label(fund, favorites)),
            Cell::new(&fund.code),
            Cell::new(&fund.prior_nav),
            Cell::new(&fund.estimated_nav),
            ui::change_cell(&fund.estimated_change_pct),
            Cell::new(&fund.estimated_at),
        ]);
    }

    let mut output = table.to_string();
    for fund in funds {
        if expanded.contains(&fund.code) {
            output.push_str(&format!(
                "\n\n{}\n{}",
                ui::style_text(
                    &format!("Top holdings: {} ({})", fund.name, fund.code),
                    ui::StyleType::Title
                ),
                holdings_table(fund)
            ));
        }
    }
    output
}

fn render_cards(
    funds: &[FundRecord],
    favorites: &HashSet<String>,
    expanded: &HashSet<String>,
) -> String {
    let mut blocks = Vec::new();
    for fund in funds {
        let mut block = format!(
            "{}  {}\n",
            ui::style_text(&fund_label(fund, favorites), ui::StyleType::Title),
            ui::style_text(&fund.code, ui::StyleType::Subtle),
        );
        block.push_str(&format!(
            "NAV {}  Est. {}  {}  {}",
            fund.prior_nav,
            fund.estimated_nav,
            fund.estimated_change_pct,
            ui::style_text(&fund.estimated_at, ui::StyleType::Subtle),
        ));
        if expanded.contains(&fund.code) && !fund.holdings.is_empty() {
            block.push('\n');
            block.push_str(&holdings_table(fund));
        }
        blocks.push(block);
    }
    blocks.join("\n\n")
}

fn holdings_table(fund: &FundRecord) -> String {
    if fund.holdings.is_empty() {
        return ui::style_text("No holdings data available.", ui::StyleType::Subtle);
    }

    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Stock"),
        ui::header_cell("Code"),
        ui::header_cell("Weight"),
        ui::header_cell("Change"),
    ]);
    for holding in &fund.holdings {
        let change = match holding.change {
            Some(pct) => ui::numeric_change_cell(pct),
            None => ui::na_cell(false),
        };
        table.add_row(vec![
            Cell::new(&holding.name),
            Cell::new(&holding.code),
            Cell::new(format!("{:.2}%", holding.weight)),
            change,
        ]);
    }
    table.to_string()
}

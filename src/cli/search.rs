use super::{add, ui};
use crate::core::FundSearchProvider;
use crate::pipeline::{AddRequest, RefreshPipeline};
use anyhow::Result;
use comfy_table::Cell;

pub async fn run(
    provider: &dyn FundSearchProvider,
    pipeline: &RefreshPipeline,
    query: &str,
    add_matches: bool,
) -> Result<()> {
    let spinner = ui::new_spinner("Searching funds...");
    let matches = provider.search(query).await?;
    spinner.finish_and_clear();

    if matches.is_empty() {
        println!(
            "{}",
            ui::style_text(&format!("No funds matched '{query}'"), ui::StyleType::Subtle)
        );
        return Ok(());
    }

    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Code"),
        ui::header_cell("Name"),
        ui::header_cell("Type"),
    ]);
    for m in &matches {
        table.add_row(vec![
            Cell::new(&m.code),
            Cell::new(&m.name),
            Cell::new(&m.fund_type),
        ]);
    }
    println!("{table}");

    if add_matches {
        // Matched names ride along so failures can be labelled.
        let requests: Vec<AddRequest> = matches
            .iter()
            .map(|m| AddRequest {
                code: m.code.clone(),
                name_hint: Some(m.name.clone()),
            })
            .collect();

        let spinner = ui::new_spinner("Adding matched funds...");
        let outcome = pipeline.add_many(&requests).await;
        spinner.finish_and_clear();
        add::report_outcome(&outcome)?;
    }

    Ok(())
}

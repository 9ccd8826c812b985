use super::ui;
use crate::pipeline::{AddOutcome, AddRequest, RefreshPipeline};
use anyhow::Result;
use comfy_table::Cell;

pub async fn run(pipeline: &RefreshPipeline, codes: &[String]) -> Result<()> {
    let requests: Vec<AddRequest> = codes.iter().map(|c| AddRequest::bare(c)).collect();

    let spinner = ui::new_spinner("Adding funds...");
    let outcome = pipeline.add_many(&requests).await;
    spinner.finish_and_clear();

    report_outcome(&outcome)
}

/// Prints the add summary: a table of new records, a subtle note for
/// skipped codes, and a failure list with the best-known name per code.
/// Errors only when nothing at all was added despite failures.
pub fn report_outcome(outcome: &AddOutcome) -> Result<()> {
    if !outcome.added.is_empty() {
        let mut table = ui::new_styled_table();
        table.set_header(vec![
            ui::header_cell("Fund"),
            ui::header_cell("Code"),
            ui::header_cell("Est. NAV"),
            ui::header_cell("Est. Change"),
        ]);
        for fund in &outcome.added {
            table.add_row(vec![
                Cell::new(&fund.name),
                Cell::new(&fund.code),
                Cell::new(&fund.estimated_nav),
                ui::change_cell(&fund.estimated_change_pct),
            ]);
        }
        println!("Added {} fund(s):\n{table}", outcome.added.len());
    }

    for code in &outcome.skipped {
        println!(
            "{}",
            ui::style_text(&format!("{code} is already tracked"), ui::StyleType::Subtle)
        );
    }

    if !outcome.failed.is_empty() {
        println!("{}", ui::style_text("Failed to add:", ui::StyleType::Error));
        for failure in &outcome.failed {
            match &failure.name {
                Some(name) => println!("  {} ({})", failure.code, name),
                None => println!("  {}", failure.code),
            }
        }
    }

    if outcome.added.is_empty() && !outcome.failed.is_empty() {
        anyhow::bail!("No funds could be added");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::FailedAdd;

    #[test]
    fn test_all_failed_is_an_error() {
        let outcome = AddOutcome {
            added: vec![],
            skipped: vec![],
            failed: vec![FailedAdd {
                code: "000001".to_string(),
                name: None,
            }],
        };
        assert!(report_outcome(&outcome).is_err());
    }

    #[test]
    fn test_only_skips_is_not_an_error() {
        let outcome = AddOutcome {
            added: vec![],
            skipped: vec!["000001".to_string()],
            failed: vec![],
        };
        assert!(report_outcome(&outcome).is_ok());
    }
}

use super::{Context, ui};
use crate::LogAction;
use crate::core::ledger::ConversionRequest;
use anyhow::Result;
use chrono::{Local, Utc};
use comfy_table::Cell;

pub async fn run(ctx: &Context, action: LogAction) -> Result<()> {
    match action {
        LogAction::Add {
            date,
            base,
            target,
            amount,
            note,
        } => {
            let date = date.unwrap_or_else(|| Local::now().date_naive());
            let request = ConversionRequest::parse(
                date,
                &base,
                &target,
                &amount,
                &note,
                &ctx.config.currencies,
            )?;
            let pb = ui::new_spinner("Fetching rate...");
            let entry = ctx.ledger.record(&request).await;
            pb.finish_and_clear();
            let entry = entry?;
            println!(
                "{} {:.2} {} = {:.2} {} at {:.4}",
                ui::style_text("Logged:", ui::StyleType::Success),
                entry.amount,
                entry.base,
                entry.converted_amount,
                entry.target,
                entry.rate
            );
        }
        LogAction::List => list(ctx),
    }
    Ok(())
}

fn list(ctx: &Context) {
    let entries = ctx.ledger.entries();
    if entries.is_empty() {
        println!("No conversions logged yet.");
        return;
    }

    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("When"),
        ui::header_cell("Amount"),
        ui::header_cell("Converted"),
        ui::header_cell("Rate"),
        ui::header_cell("Note"),
    ]);
    for entry in &entries {
        let when = entry.timestamp.with_timezone(&Local);
        table.add_row(vec![
            Cell::new(when.format("%Y-%m-%d %H:%M").to_string()),
            ui::number_cell(format!("{:.2} {}", entry.amount, entry.base)),
            ui::number_cell(format!("{:.2} {}", entry.converted_amount, entry.target)),
            ui::number_cell(format!("{:.4}", entry.rate)),
            Cell::new(&entry.note),
        ]);
    }
    println!("{table}");

    let today = Utc::now().date_naive();
    let todays = entries
        .iter()
        .filter(|e| e.timestamp.date_naive() == today)
        .count();
    println!(
        "{}",
        ui::style_text(
            &format!("{} entries, {todays} today", entries.len()),
            ui::StyleType::Subtle
        )
    );
}

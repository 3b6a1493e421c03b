use super::{Context, ui};
use crate::FavoritesAction;
use crate::core::aggregator::FavoriteRates;
use crate::core::models::FavoritePair;
use anyhow::Result;
use comfy_table::Cell;
use std::collections::HashMap;

pub async fn run(ctx: &Context, action: FavoritesAction) -> Result<()> {
    match action {
        FavoritesAction::Add { base, target } => {
            if ctx.favorites.add(&base, &target)? {
                let label = format!("{}/{}", base.trim(), target.trim()).to_uppercase();
                println!(
                    "{}",
                    ui::style_text(
                        &format!("Added {label} to favorites"),
                        ui::StyleType::Success
                    )
                );
            } else {
                println!(
                    "{}",
                    ui::style_text("Pair is already a favorite", ui::StyleType::Warning)
                );
            }
        }
        FavoritesAction::Remove { base, target } => {
            if ctx.favorites.remove(&base, &target) {
                println!(
                    "{}",
                    ui::style_text("Removed from favorites", ui::StyleType::Success)
                );
            } else {
                println!(
                    "{}",
                    ui::style_text("No such favorite", ui::StyleType::Warning)
                );
            }
        }
        FavoritesAction::Show => {}
    }

    show(ctx).await;
    Ok(())
}

async fn show(ctx: &Context) {
    let pairs = ctx.favorites.list();
    if pairs.is_empty() {
        println!("No favorite pairs yet. Add one with `zenny favorites add USD JPY`.");
        return;
    }

    let pb = ui::new_spinner("Fetching rates...");
    let rates = ctx.aggregator.refresh(&pairs).await;
    pb.finish_and_clear();

    println!("\n{}", ui::style_text("Favorites", ui::StyleType::Title));
    display(&pairs, &rates);
}

fn display(pairs: &[FavoritePair], rates: &HashMap<String, FavoriteRates>) {
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Pair"),
        ui::header_cell("Latest"),
        ui::header_cell("Previous"),
        ui::header_cell("Change"),
    ]);

    for pair in pairs {
        let label = Cell::new(format!("{}/{}", pair.base, pair.target));
        match rates.get(&pair.key()) {
            Some(r) => table.add_row(vec![
                label,
                ui::number_cell(format!("{:.4} ({})", r.latest.rate, r.latest.as_of)),
                ui::number_cell(format!("{:.4} ({})", r.previous.rate, r.previous.as_of)),
                ui::change_cell(r.change()),
            ]),
            None => table.add_row(vec![
                label,
                ui::na_cell(true),
                ui::na_cell(true),
                ui::na_cell(false),
            ]),
        };
    }

    println!("{table}");
}

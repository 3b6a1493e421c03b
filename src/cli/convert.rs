use super::{Context, ui};
use crate::core::currency::{ValidationError, parse_pair, parse_positive};
use anyhow::{Context as _, Result};

pub async fn run(ctx: &Context, base: &str, target: &str, amount: &str) -> Result<()> {
    let (base, target) = parse_pair(base, target, &ctx.config.currencies)?;
    let amount = parse_positive(amount)
        .ok_or_else(|| ValidationError::InvalidAmount(amount.trim().to_string()))?;

    let pb = ui::new_spinner("Fetching rate...");
    let sample = ctx.source.latest(&base, &target).await;
    pb.finish_and_clear();
    let sample = sample.with_context(|| format!("Failed to fetch {base}/{target} rate"))?;

    println!(
        "{amount:.2} {base} = {} {target}",
        ui::style_text(&format!("{:.2}", amount * sample.rate), ui::StyleType::Success)
    );
    println!(
        "{}",
        ui::style_text(
            &format!("1 {base} = {:.4} {target} (as of {})", sample.rate, sample.as_of),
            ui::StyleType::Subtle
        )
    );
    Ok(())
}

use super::{Context, ui};
use crate::DailyAction;
use crate::core::models::DailyAlertConfig;
use crate::core::scheduler::{DAILY_NOTIFICATION_ID, DailyOutcome, next_fire_after};
use anyhow::{Result, anyhow};
use chrono::Local;

pub async fn run(ctx: &Context, action: DailyAction) -> Result<()> {
    match action {
        DailyAction::Show => {}
        DailyAction::Set { base, target, at } => {
            let current = ctx.daily.config();
            let (hour, minute) = match at {
                Some(text) => parse_time(&text)?,
                None => (current.hour, current.minute),
            };
            let config = DailyAlertConfig {
                base: base.unwrap_or(current.base),
                target: target.unwrap_or(current.target),
                hour,
                minute,
                enabled: true,
            };
            let outcome = ctx.daily.apply(config).await?;
            print_outcome(&outcome);
        }
        DailyAction::Disable => {
            let config = DailyAlertConfig {
                enabled: false,
                ..ctx.daily.config()
            };
            let outcome = ctx.daily.apply(config).await?;
            print_outcome(&outcome);
        }
    }

    show(ctx);
    Ok(())
}

/// Parses `HH:MM` into hour and minute.
pub fn parse_time(text: &str) -> Result<(u32, u32)> {
    let (h, m) = text
        .trim()
        .split_once(':')
        .ok_or_else(|| anyhow!("Invalid time '{text}': expected HH:MM"))?;
    let hour = h
        .parse::<u32>()
        .map_err(|_| anyhow!("Invalid hour in '{text}'"))?;
    let minute = m
        .parse::<u32>()
        .map_err(|_| anyhow!("Invalid minute in '{text}'"))?;
    Ok((hour, minute))
}

fn print_outcome(outcome: &DailyOutcome) {
    match outcome {
        DailyOutcome::Disabled => println!(
            "{}",
            ui::style_text("Daily alert disabled", ui::StyleType::Success)
        ),
        DailyOutcome::Scheduled { body } => println!(
            "{} {}",
            ui::style_text("Daily alert scheduled:", ui::StyleType::Success),
            body
        ),
        DailyOutcome::FetchFailed => println!(
            "{}",
            ui::style_text(
                "Could not fetch the current rate, nothing is scheduled",
                ui::StyleType::Error
            )
        ),
        DailyOutcome::RegisterFailed => println!(
            "{}",
            ui::style_text(
                "Could not register the daily notification, nothing is scheduled",
                ui::StyleType::Error
            )
        ),
        DailyOutcome::Superseded => println!(
            "{}",
            ui::style_text(
                "A newer change was applied in the meantime",
                ui::StyleType::Warning
            )
        ),
    }
}

fn show(ctx: &Context) {
    let config = ctx.daily.config();
    let state = if config.enabled { "enabled" } else { "disabled" };
    println!(
        "\n{}",
        ui::style_text("Daily rate notification", ui::StyleType::Title)
    );
    println!(
        "{}/{} at {:02}:{:02} ({state})",
        config.base, config.target, config.hour, config.minute
    );

    match ctx.notifications.active(DAILY_NOTIFICATION_ID) {
        Some(entry) => println!(
            "Next: {} \"{}\"",
            entry.trigger.next_fire().format("%Y-%m-%d %H:%M"),
            entry.body
        ),
        None if config.enabled => {
            if let Some(next) =
                next_fire_after(Local::now().naive_local(), config.hour, config.minute)
            {
                println!(
                    "{}",
                    ui::style_text(
                        &format!(
                            "Not scheduled (would fire at {})",
                            next.format("%Y-%m-%d %H:%M")
                        ),
                        ui::StyleType::Subtle
                    )
                );
            }
        }
        None => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_time() {
        assert_eq!(parse_time("08:30").unwrap(), (8, 30));
        assert_eq!(parse_time(" 7:05 ").unwrap(), (7, 5));
        assert!(parse_time("0830").is_err());
        assert!(parse_time("aa:10").is_err());
    }

    #[test]
    fn test_parse_time_leaves_range_check_to_scheduler() {
        assert_eq!(parse_time("25:61").unwrap(), (25, 61));
    }
}

use super::{Context, ui};
use crate::core::scheduler::DailyOutcome;
use crate::notifier::ScheduledNotification;
use anyhow::Result;
use chrono::Local;
use std::time::Duration;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{info, warn};

/// Keeps the process alive and prints notifications as they come due.
pub async fn run(ctx: &Context) -> Result<()> {
    match ctx.daily.resume().await {
        Some(outcome @ (DailyOutcome::FetchFailed | DailyOutcome::RegisterFailed)) => {
            warn!(?outcome, "Daily alert could not be rescheduled at startup");
        }
        Some(outcome) => info!(?outcome, "Daily alert resumed"),
        None => {}
    }

    let poll = Duration::from_secs(ctx.config.notifications.poll_interval_secs.max(1));
    let mut ticker = interval(poll);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    println!(
        "{}",
        ui::style_text(
            &format!(
                "Watching for notifications every {}s, Ctrl-C to stop",
                poll.as_secs()
            ),
            ui::StyleType::Subtle
        )
    );

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Stopping watch");
                break;
            }
            _ = ticker.tick() => {
                for notification in ctx.notifications.take_due(Local::now().naive_local()) {
                    deliver(&notification);
                }
            }
        }
    }
    Ok(())
}

fn deliver(notification: &ScheduledNotification) {
    info!(id = %notification.id, "Delivering notification");
    println!(
        "[{}] {}\n  {}",
        Local::now().format("%H:%M"),
        ui::style_text(&notification.title, ui::StyleType::Title),
        notification.body
    );
}

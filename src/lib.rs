pub mod cli;
pub mod core;
pub mod notifier;
pub mod providers;
pub mod store;

use crate::core::config::AppConfig;
use anyhow::Result;
use chrono::NaiveDate;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq)]
pub enum FavoritesAction {
    Show,
    Add { base: String, target: String },
    Remove { base: String, target: String },
}

#[derive(Debug, Clone, PartialEq)]
pub enum AlertAction {
    /// Save the rule and check it against the current rate.
    Check {
        base: String,
        target: String,
        threshold: String,
    },
    CheckAll,
    List,
    Remove {
        base: String,
        target: String,
        threshold: String,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum DailyAction {
    Show,
    /// Update any of the fields and enable the alert.
    Set {
        base: Option<String>,
        target: Option<String>,
        at: Option<String>,
    },
    Disable,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LogAction {
    Add {
        date: Option<NaiveDate>,
        base: String,
        target: String,
        amount: String,
        note: String,
    },
    List,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AppCommand {
    Favorites(FavoritesAction),
    Alert(AlertAction),
    Daily(DailyAction),
    Convert {
        base: String,
        target: String,
        amount: String,
    },
    History {
        base: String,
        target: String,
        days: u32,
    },
    Log(LogAction),
    Watch,
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    info!("Zenny starting...");

    let config = match config_path {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };
    debug!("Loaded config: {config:#?}");

    let ctx = cli::Context::new(config)?;

    match command {
        AppCommand::Favorites(action) => cli::favorites::run(&ctx, action).await,
        AppCommand::Alert(action) => cli::alerts::run(&ctx, action).await,
        AppCommand::Daily(action) => cli::daily::run(&ctx, action).await,
        AppCommand::Convert {
            base,
            target,
            amount,
        } => cli::convert::run(&ctx, &base, &target, &amount).await,
        AppCommand::History { base, target, days } => {
            cli::history::run(&ctx, &base, &target, days).await
        }
        AppCommand::Log(action) => cli::logbook::run(&ctx, action).await,
        AppCommand::Watch => cli::watch::run(&ctx).await,
    }
}

use anyhow::Result;
use chrono::NaiveDate;
use clap::{CommandFactory, Parser, Subcommand};
use zenny::core::log::init_logging;
use zenny::{AlertAction, AppCommand, DailyAction, FavoritesAction, LogAction};

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to optional configuration file
    #[arg(short, long, global = true)]
    config_path: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Show or edit favorite currency pairs
    #[command(subcommand)]
    Favorites(FavoritesCommand),
    /// Manage rate-drop alerts
    #[command(subcommand)]
    Alert(AlertCommand),
    /// Configure the daily rate notification
    #[command(subcommand)]
    Daily(DailyCommand),
    /// Convert an amount at the latest rate
    Convert {
        base: String,
        target: String,
        amount: String,
    },
    /// Show recent rate history for a pair
    History {
        base: String,
        target: String,
        #[arg(short, long, default_value_t = 30)]
        days: u32,
    },
    /// Record or list conversions you made
    #[command(subcommand)]
    Log(LogCommand),
    /// Deliver scheduled notifications until interrupted
    Watch,
}

#[derive(Subcommand)]
enum FavoritesCommand {
    /// Show favorites with latest and previous rates
    Show,
    Add { base: String, target: String },
    Remove { base: String, target: String },
}

#[derive(Subcommand)]
enum AlertCommand {
    /// Save an alert and check it against the current rate
    Check {
        base: String,
        target: String,
        threshold: String,
    },
    /// Check every saved alert
    CheckAll,
    List,
    Remove {
        base: String,
        target: String,
        threshold: String,
    },
}

#[derive(Subcommand)]
enum DailyCommand {
    Show,
    /// Enable the daily notification, optionally changing pair and time
    Set {
        #[arg(long)]
        base: Option<String>,
        #[arg(long)]
        target: Option<String>,
        /// Local time as HH:MM
        #[arg(long)]
        at: Option<String>,
    },
    Disable,
}

#[derive(Subcommand)]
enum LogCommand {
    Add {
        base: String,
        target: String,
        amount: String,
        /// Exchange date (YYYY-MM-DD), defaults to today
        #[arg(short, long)]
        date: Option<NaiveDate>,
        #[arg(short, long, default_value = "")]
        note: String,
    },
    List,
}

impl From<FavoritesCommand> for FavoritesAction {
    fn from(cmd: FavoritesCommand) -> Self {
        match cmd {
            FavoritesCommand::Show => FavoritesAction::Show,
            FavoritesCommand::Add { base, target } => FavoritesAction::Add { base, target },
            FavoritesCommand::Remove { base, target } => FavoritesAction::Remove { base, target },
        }
    }
}

impl From<AlertCommand> for AlertAction {
    fn from(cmd: AlertCommand) -> Self {
        match cmd {
            AlertCommand::Check {
                base,
                target,
                threshold,
            } => AlertAction::Check {
                base,
                target,
                threshold,
            },
            AlertCommand::CheckAll => AlertAction::CheckAll,
            AlertCommand::List => AlertAction::List,
            AlertCommand::Remove {
                base,
                target,
                threshold,
            } => AlertAction::Remove {
                base,
                target,
                threshold,
            },
        }
    }
}

impl From<DailyCommand> for DailyAction {
    fn from(cmd: DailyCommand) -> Self {
        match cmd {
            DailyCommand::Show => DailyAction::Show,
            DailyCommand::Set { base, target, at } => DailyAction::Set { base, target, at },
            DailyCommand::Disable => DailyAction::Disable,
        }
    }
}

impl From<LogCommand> for LogAction {
    fn from(cmd: LogCommand) -> Self {
        match cmd {
            LogCommand::Add {
                base,
                target,
                amount,
                date,
                note,
            } => LogAction::Add {
                date,
                base,
                target,
                amount,
                note,
            },
            LogCommand::List => LogAction::List,
        }
    }
}

impl From<Commands> for AppCommand {
    fn from(cmd: Commands) -> AppCommand {
        match cmd {
            Commands::Favorites(c) => AppCommand::Favorites(c.into()),
            Commands::Alert(c) => AppCommand::Alert(c.into()),
            Commands::Daily(c) => AppCommand::Daily(c.into()),
            Commands::Convert {
                base,
                target,
                amount,
            } => AppCommand::Convert {
                base,
                target,
                amount,
            },
            Commands::History { base, target, days } => AppCommand::History { base, target, days },
            Commands::Log(c) => AppCommand::Log(c.into()),
            Commands::Watch => AppCommand::Watch,
            Commands::Setup => unreachable!("Setup command should be handled separately"),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Some(Commands::Setup) => match cli.config_path.as_deref() {
            Some(path) => zenny::cli::setup::setup_at_path(path),
            None => zenny::cli::setup::setup(),
        },
        Some(cmd) => zenny::run_command(cmd.into(), cli.config_path.as_deref()).await,
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    };

    if let Err(e) = &result {
        tracing::error!(error = %e, "Application failed");
    }
    result
}

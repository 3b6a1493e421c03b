pub mod alerts;
pub mod convert;
pub mod daily;
pub mod favorites;
pub mod history;
pub mod logbook;
pub mod setup;
pub mod ui;
pub mod watch;

use crate::core::aggregator::FavoritesAggregator;
use crate::core::alerts::AlertEvaluator;
use crate::core::config::AppConfig;
use crate::core::favorites::Favorites;
use crate::core::ledger::ConversionLog;
use crate::core::scheduler::DailyAlertScheduler;
use crate::core::{RateSource, SlotStore};
use crate::notifier::ScheduleBook;
use crate::providers::frankfurter::FrankfurterProvider;
use crate::store::open_store;
use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;

/// Everything a command needs, wired from the loaded config.
pub struct Context {
    pub config: AppConfig,
    pub source: Arc<dyn RateSource>,
    pub notifications: Arc<ScheduleBook>,
    pub favorites: Favorites,
    pub aggregator: FavoritesAggregator,
    pub alerts: AlertEvaluator,
    pub daily: DailyAlertScheduler,
    pub ledger: ConversionLog,
}

impl Context {
    pub fn new(config: AppConfig) -> Result<Self> {
        let store = open_store(&config);
        let source: Arc<dyn RateSource> =
            Arc::new(FrankfurterProvider::new(&config.providers.frankfurter)?);
        Ok(Self::with_parts(config, source, store))
    }

    pub fn with_parts(
        config: AppConfig,
        source: Arc<dyn RateSource>,
        store: Arc<dyn SlotStore>,
    ) -> Self {
        let notifications = Arc::new(ScheduleBook::load(Arc::clone(&store)));
        let allowed = config.currencies.clone();
        let delay = Duration::from_secs(config.notifications.threshold_delay_secs);

        Self {
            favorites: Favorites::load(Arc::clone(&store), allowed.clone()),
            aggregator: FavoritesAggregator::new(Arc::clone(&source)),
            alerts: AlertEvaluator::load(
                Arc::clone(&source),
                Arc::clone(&store),
                notifications.clone(),
                delay,
            ),
            daily: DailyAlertScheduler::load(
                Arc::clone(&source),
                Arc::clone(&store),
                notifications.clone(),
                allowed,
            ),
            ledger: ConversionLog::load(Arc::clone(&source), store),
            notifications,
            source,
            config,
        }
    }
}

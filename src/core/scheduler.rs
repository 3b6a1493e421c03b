//! The recurring daily rate notification.
//!
//! There is exactly one daily notification, registered under
//! [`DAILY_NOTIFICATION_ID`]. Every change cancels whatever is registered under
//! that id before registering anew, so at most one schedule is ever live.

use crate::core::currency::{ValidationError, parse_pair};
use crate::core::models::DailyAlertConfig;
use crate::core::notify::NotificationSink;
use crate::core::rate::RateSource;
use crate::core::store::{Slot, SlotStore, load_or_default, save_snapshot};
use chrono::{Duration, NaiveDateTime, NaiveTime};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

pub const DAILY_NOTIFICATION_ID: &str = "dailyRateNotification";
pub const DAILY_TITLE: &str = "Daily Exchange Rate";

/// First occurrence of `hour:minute` strictly after `now`.
pub fn next_fire_after(now: NaiveDateTime, hour: u32, minute: u32) -> Option<NaiveDateTime> {
    let time = NaiveTime::from_hms_opt(hour, minute, 0)?;
    let today = now.date().and_time(time);
    if today > now {
        Some(today)
    } else {
        Some(today + Duration::days(1))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DailyOutcome {
    /// The schedule was cancelled.
    Disabled,
    /// A fresh schedule is live; `body` is what it will show.
    Scheduled { body: String },
    /// The rate could not be fetched and nothing is scheduled.
    FetchFailed,
    /// The sink refused the new schedule and nothing is scheduled.
    RegisterFailed,
    /// A later change was applied while this one was in flight; the schedule
    /// belongs to that change.
    Superseded,
}

pub struct DailyAlertScheduler {
    source: Arc<dyn RateSource>,
    store: Arc<dyn SlotStore>,
    sink: Arc<dyn NotificationSink>,
    allowed: Vec<String>,
    config: Mutex<DailyAlertConfig>,
    /// Ticket of the most recent `apply`/`resume`.
    applied: AtomicU64,
    /// Held from the staleness check through cancel and register.
    registration: tokio::sync::Mutex<()>,
}

impl DailyAlertScheduler {
    pub fn load(
        source: Arc<dyn RateSource>,
        store: Arc<dyn SlotStore>,
        sink: Arc<dyn NotificationSink>,
        allowed: Vec<String>,
    ) -> Self {
        let config: DailyAlertConfig = load_or_default(store.as_ref(), Slot::DailyAlert);
        Self {
            source,
            store,
            sink,
            allowed,
            config: Mutex::new(config),
            applied: AtomicU64::new(0),
            registration: tokio::sync::Mutex::new(()),
        }
    }

    pub fn config(&self) -> DailyAlertConfig {
        self.config
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Stores `config` and brings the notification schedule in line with it.
    pub async fn apply(&self, config: DailyAlertConfig) -> Result<DailyOutcome, ValidationError> {
        let (base, target) = parse_pair(&config.base, &config.target, &self.allowed)?;
        if NaiveTime::from_hms_opt(config.hour, config.minute, 0).is_none() {
            return Err(ValidationError::InvalidTime {
                hour: config.hour,
                minute: config.minute,
            });
        }
        let config = DailyAlertConfig {
            base,
            target,
            ..config
        };

        let ticket = {
            let mut current = self.config.lock().unwrap_or_else(|e| e.into_inner());
            *current = config.clone();
            save_snapshot(self.store.as_ref(), Slot::DailyAlert, &*current);
            self.applied.fetch_add(1, Ordering::SeqCst) + 1
        };

        Ok(self.reschedule(&config, ticket).await)
    }

    /// Re-applies the stored configuration, e.g. at launch.
    pub async fn resume(&self) -> Option<DailyOutcome> {
        let (config, ticket) = {
            let current = self.config.lock().unwrap_or_else(|e| e.into_inner());
            (current.clone(), self.applied.fetch_add(1, Ordering::SeqCst) + 1)
        };
        if !config.enabled {
            return None;
        }
        Some(self.reschedule(&config, ticket).await)
    }

    fn is_stale(&self, ticket: u64) -> bool {
        self.applied.load(Ordering::SeqCst) != ticket
    }

    async fn reschedule(&self, config: &DailyAlertConfig, ticket: u64) -> DailyOutcome {
        if !config.enabled {
            let _registration = self.registration.lock().await;
            if self.is_stale(ticket) {
                debug!(ticket, "Daily alert change superseded");
                return DailyOutcome::Superseded;
            }
            self.cancel().await;
            info!("Daily alert disabled");
            return DailyOutcome::Disabled;
        }

        let fetched = self.source.latest(&config.base, &config.target).await;

        let _registration = self.registration.lock().await;
        if self.is_stale(ticket) {
            debug!(ticket, "Daily alert change superseded while fetching");
            return DailyOutcome::Superseded;
        }

        let sample = match fetched {
            Ok(sample) => sample,
            Err(e) => {
                warn!(base = %config.base, target = %config.target, error = %e, "Rate fetch failed, daily alert not scheduled");
                // The previous schedule no longer matches the stored config.
                self.cancel().await;
                return DailyOutcome::FetchFailed;
            }
        };

        let body = format!("1 {} = {:.2} {}", config.base, sample.rate, config.target);
        self.cancel().await;
        if let Err(e) = self
            .sink
            .schedule_recurring(
                DAILY_NOTIFICATION_ID,
                DAILY_TITLE,
                &body,
                config.hour,
                config.minute,
            )
            .await
        {
            warn!(error = %e, "Failed to register daily alert");
            return DailyOutcome::RegisterFailed;
        }
        info!(hour = config.hour, minute = config.minute, %body, "Daily alert scheduled");
        DailyOutcome::Scheduled { body }
    }

    async fn cancel(&self) {
        if let Err(e) = self.sink.cancel(DAILY_NOTIFICATION_ID).await {
            warn!(error = %e, "Failed to cancel daily alert");
        } else {
            debug!("Cancelled daily alert schedule");
        }
    }
}

//! Log of conversions the user actually made.

use crate::core::currency::{ValidationError, parse_pair, parse_positive};
use crate::core::models::LogEntry;
use crate::core::rate::RateSource;
use crate::core::store::{Slot, SlotStore, load_or_default, save_snapshot};
use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq)]
pub struct ConversionRequest {
    pub date: NaiveDate,
    pub base: String,
    pub target: String,
    pub amount: f64,
    pub note: String,
}

impl ConversionRequest {
    pub fn parse(
        date: NaiveDate,
        base: &str,
        target: &str,
        amount: &str,
        note: &str,
        allowed: &[String],
    ) -> Result<Self, ValidationError> {
        let (base, target) = parse_pair(base, target, allowed)?;
        let amount = parse_positive(amount)
            .ok_or_else(|| ValidationError::InvalidAmount(amount.trim().to_string()))?;
        Ok(Self {
            date,
            base,
            target,
            amount,
            note: note.trim().to_string(),
        })
    }
}

pub struct ConversionLog {
    source: Arc<dyn RateSource>,
    store: Arc<dyn SlotStore>,
    entries: Mutex<Vec<LogEntry>>,
}

impl ConversionLog {
    pub fn load(source: Arc<dyn RateSource>, store: Arc<dyn SlotStore>) -> Self {
        let entries: Vec<LogEntry> = load_or_default(store.as_ref(), Slot::ConversionLog);
        Self {
            source,
            store,
            entries: Mutex::new(entries),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Vec<LogEntry>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Prices the conversion at the rate of `request.date` and stores it.
    pub async fn record(&self, request: &ConversionRequest) -> Result<LogEntry> {
        let sample = self
            .source
            .on_date(&request.base, &request.target, request.date)
            .await
            .with_context(|| {
                format!(
                    "Failed to fetch {}/{} rate for {}",
                    request.base, request.target, request.date
                )
            })?;

        let entry = LogEntry {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            base: request.base.clone(),
            target: request.target.clone(),
            amount: request.amount,
            converted_amount: request.amount * sample.rate,
            rate: sample.rate,
            note: request.note.clone(),
        };
        debug!(?entry, "Recording conversion");

        let mut entries = self.lock();
        entries.push(entry.clone());
        save_snapshot(self.store.as_ref(), Slot::ConversionLog, &*entries);
        Ok(entry)
    }

    /// All entries, newest first.
    pub fn entries(&self) -> Vec<LogEntry> {
        let mut entries = self.lock().clone();
        entries.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::currency::default_currencies;
    use crate::core::rate::RateSample;
    use crate::store::memory::MemoryStore;
    use anyhow::anyhow;
    use async_trait::async_trait;

    struct DatedSource;

    #[async_trait]
    impl RateSource for DatedSource {
        async fn latest(&self, _base: &str, _target: &str) -> Result<RateSample> {
            Err(anyhow!("not used"))
        }

        async fn on_date(&self, _base: &str, _target: &str, date: NaiveDate) -> Result<RateSample> {
            if date.format("%Y-%m-%d").to_string() == "2024-05-10" {
                Ok(RateSample { rate: 150.0, as_of: date })
            } else {
                Err(anyhow!("404 Not Found"))
            }
        }

        async fn series(
            &self,
            _base: &str,
            _target: &str,
            _start: NaiveDate,
            _end: NaiveDate,
        ) -> Result<Vec<RateSample>> {
            Ok(Vec::new())
        }
    }

    fn request(day: u32, amount: &str) -> ConversionRequest {
        ConversionRequest::parse(
            NaiveDate::from_ymd_opt(2024, 5, day).unwrap(),
            "USD",
            "JPY",
            amount,
            " trip ",
            &default_currencies(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_record_prices_at_exchange_date() {
        let store = Arc::new(MemoryStore::new());
        let log = ConversionLog::load(Arc::new(DatedSource), store.clone());

        let entry = log.record(&request(10, "20")).await.unwrap();
        assert_eq!(entry.converted_amount, 3000.0);
        assert_eq!(entry.note, "trip");

        let reloaded = ConversionLog::load(Arc::new(DatedSource), store);
        assert_eq!(reloaded.entries(), vec![entry]);
    }

    #[tokio::test]
    async fn test_failed_fetch_records_nothing() {
        let store = Arc::new(MemoryStore::new());
        let log = ConversionLog::load(Arc::new(DatedSource), store);

        assert!(log.record(&request(11, "20")).await.is_err());
        assert!(log.entries().is_empty());
    }

    #[test]
    fn test_invalid_amount_is_rejected() {
        let result = ConversionRequest::parse(
            NaiveDate::from_ymd_opt(2024, 5, 10).unwrap(),
            "USD",
            "JPY",
            "lots",
            "",
            &default_currencies(),
        );
        assert_eq!(result, Err(ValidationError::InvalidAmount("lots".to_string())));
    }
}

//! Exchange rate abstractions and core types

use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A single observed rate: `1 base = rate target` as of a calendar date.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RateSample {
    pub rate: f64,
    pub as_of: NaiveDate,
}

#[async_trait]
pub trait RateSource: Send + Sync {
    /// Most recent published rate.
    async fn latest(&self, base: &str, target: &str) -> Result<RateSample>;

    /// Rate published for `date`. The source may answer with an earlier date
    /// when it has no data for the requested one.
    async fn on_date(&self, base: &str, target: &str, date: NaiveDate) -> Result<RateSample>;

    /// All rates between `start` and `end` inclusive, oldest first.
    async fn series(
        &self,
        base: &str,
        target: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<RateSample>>;
}

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;
use tracing::{debug, instrument};

use crate::core::config::FrankfurterProviderConfig;
use crate::core::rate::{RateSample, RateSource};
use crate::providers::util::with_retry;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Rate source backed by the Frankfurter API (ECB reference rates).
pub struct FrankfurterProvider {
    base_url: String,
    client: reqwest::Client,
    retries: usize,
    retry_delay_ms: u64,
}

impl FrankfurterProvider {
    pub fn new(config: &FrankfurterProviderConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent("zenny/1.0")
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(FrankfurterProvider {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            client,
            retries: config.retries,
            retry_delay_ms: config.retry_delay_ms,
        })
    }

    async fn get<T: DeserializeOwned>(&self, endpoint: &str, base: &str, target: &str) -> Result<T> {
        let url = format!("{}/{}?from={}&to={}", self.base_url, endpoint, base, target);
        debug!("Requesting rates from {}", url);

        let response = with_retry(
            || async { self.client.get(&url).send().await },
            self.retries,
            self.retry_delay_ms,
        )
        .await
        .with_context(|| format!("Request error for currency pair: {base}/{target}"))?;

        if !response.status().is_success() {
            return Err(anyhow!(
                "HTTP error: {} for currency pair: {}/{}",
                response.status(),
                base,
                target
            ));
        }

        let text = response.text().await?;
        serde_json::from_str(&text)
            .map_err(|e| anyhow!("Failed to parse JSON response for {base}/{target}: {e}"))
    }
}

#[derive(Debug, Deserialize)]
struct DayResponse {
    date: String,
    rates: HashMap<String, f64>,
}

#[derive(Debug, Deserialize)]
struct SeriesResponse {
    rates: BTreeMap<String, HashMap<String, f64>>,
}

fn parse_date(date: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(date, DATE_FORMAT).with_context(|| format!("Invalid date: {date}"))
}

fn checked_rate(rates: &HashMap<String, f64>, target: &str) -> Result<f64> {
    match rates.get(target) {
        Some(rate) if rate.is_finite() && *rate > 0.0 => Ok(*rate),
        Some(rate) => Err(anyhow!("Invalid rate {rate} for {target}")),
        None => Err(anyhow!("No rate data found for currency: {target}")),
    }
}

fn day_sample(response: DayResponse, target: &str) -> Result<RateSample> {
    Ok(RateSample {
        rate: checked_rate(&response.rates, target)?,
        as_of: parse_date(&response.date)?,
    })
}

#[async_trait]
impl RateSource for FrankfurterProvider {
    #[instrument(name = "FrankfurterLatest", skip(self))]
    async fn latest(&self, base: &str, target: &str) -> Result<RateSample> {
        let response: DayResponse = self.get("latest", base, target).await?;
        day_sample(response, target)
    }

    #[instrument(name = "FrankfurterOnDate", skip(self))]
    async fn on_date(&self, base: &str, target: &str, date: NaiveDate) -> Result<RateSample> {
        let endpoint = date.format(DATE_FORMAT).to_string();
        let response: DayResponse = self.get(&endpoint, base, target).await?;
        day_sample(response, target)
    }

    #[instrument(name = "FrankfurterSeries", skip(self))]
    async fn series(
        &self,
        base: &str,
        target: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<RateSample>> {
        let endpoint = format!(
            "{}..{}",
            start.format(DATE_FORMAT),
            end.format(DATE_FORMAT)
        );
        let response: SeriesResponse = self.get(&endpoint, base, target).await?;

        let mut samples = response
            .rates
            .iter()
            .map(|(date, rates)| {
                Ok(RateSample {
                    rate: checked_rate(rates, target)?,
                    as_of: parse_date(date)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        samples.sort_by_key(|s| s.as_of);
        Ok(samples)
    }
}

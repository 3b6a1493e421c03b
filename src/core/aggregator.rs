//! Concurrent latest/previous rate fetching for the favorites set.
//!
//! Every call to [`FavoritesAggregator::begin`] opens a new generation. Each
//! pair is fetched on its own task: first the latest rate, then the rate as of
//! the day before the date the source reported for it. Tasks report back over
//! a channel owned by the generation, and the pass settles once the number of
//! recorded completions reaches `2 × pairs`. Only the newest generation may
//! publish into the shared view, so a slow superseded pass can never overwrite
//! fresher data.

use crate::core::models::FavoritePair;
use crate::core::rate::{RateSample, RateSource};
use chrono::{Duration, NaiveDate};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tracing::{debug, instrument, warn};

/// Latest and previous-period samples for one pair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FavoriteRates {
    pub latest: RateSample,
    pub previous: RateSample,
}

impl FavoriteRates {
    pub fn change(&self) -> f64 {
        self.latest.rate - self.previous.rate
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateSlot {
    Latest,
    Previous,
}

/// Terminal outcome of one sub-fetch, as reported to its generation.
#[derive(Debug, Clone)]
pub struct Completion {
    pub generation: u64,
    pub key: String,
    pub slot: RateSlot,
    pub sample: Option<RateSample>,
    /// Number of expected completions this outcome accounts for. A failed
    /// latest fetch also stands in for the previous fetch it never issued.
    pub weight: usize,
}

/// Accounting record for one aggregation pass.
#[derive(Debug)]
pub struct FetchGeneration {
    id: u64,
    expected: usize,
    completed: usize,
    latest: HashMap<String, RateSample>,
    previous: HashMap<String, RateSample>,
}

impl FetchGeneration {
    pub fn new(id: u64, pair_count: usize) -> Self {
        Self {
            id,
            expected: pair_count * 2,
            completed: 0,
            latest: HashMap::new(),
            previous: HashMap::new(),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn expected(&self) -> usize {
        self.expected
    }

    pub fn completed(&self) -> usize {
        self.completed
    }

    pub fn is_settled(&self) -> bool {
        self.completed == self.expected
    }

    /// Records one completion and reports whether the generation is now settled.
    /// Completions tagged for another generation are discarded.
    pub fn record(&mut self, completion: Completion) -> bool {
        if completion.generation != self.id {
            debug!(
                generation = self.id,
                stale = completion.generation,
                key = %completion.key,
                "Discarding completion from another generation"
            );
            return self.is_settled();
        }

        let remaining = self.expected - self.completed;
        if completion.weight > remaining {
            warn!(
                generation = self.id,
                key = %completion.key,
                weight = completion.weight,
                remaining,
                "Completion exceeds expected count"
            );
        }
        self.completed += completion.weight.min(remaining);

        if let Some(sample) = completion.sample {
            let target = match completion.slot {
                RateSlot::Latest => &mut self.latest,
                RateSlot::Previous => &mut self.previous,
            };
            target.insert(completion.key, sample);
        }
        self.is_settled()
    }

    /// Pairs that have both samples. Anything else is left out.
    pub fn into_view(mut self) -> HashMap<String, FavoriteRates> {
        self.latest
            .drain()
            .filter_map(|(key, latest)| {
                let previous = self.previous.remove(&key)?;
                Some((key, FavoriteRates { latest, previous }))
            })
            .collect()
    }
}

/// The most recently published aggregation result.
#[derive(Debug, Clone, Default)]
pub struct PublishedView {
    pub generation: u64,
    pub rates: HashMap<String, FavoriteRates>,
}

pub struct FavoritesAggregator {
    source: Arc<dyn RateSource>,
    newest: Arc<AtomicU64>,
    published: Arc<Mutex<PublishedView>>,
}

/// An in-flight aggregation pass. Await [`RefreshPass::settle`] for its result.
pub struct RefreshPass {
    generation: FetchGeneration,
    completions: mpsc::UnboundedReceiver<Completion>,
    newest: Arc<AtomicU64>,
    published: Arc<Mutex<PublishedView>>,
}

impl FavoritesAggregator {
    pub fn new(source: Arc<dyn RateSource>) -> Self {
        Self {
            source,
            newest: Arc::new(AtomicU64::new(0)),
            published: Arc::new(Mutex::new(PublishedView::default())),
        }
    }

    /// Fetches latest and previous rates for every pair and waits for all of
    /// them to settle.
    pub async fn refresh(&self, favorites: &[FavoritePair]) -> HashMap<String, FavoriteRates> {
        self.begin(favorites).settle().await
    }

    /// Starts a new generation and issues its fetches. Must be called from
    /// within a tokio runtime.
    pub fn begin(&self, favorites: &[FavoritePair]) -> RefreshPass {
        let id = self.newest.fetch_add(1, Ordering::SeqCst) + 1;
        let generation = FetchGeneration::new(id, favorites.len());
        debug!(generation = id, expected = generation.expected(), "Starting refresh");

        let (tx, rx) = mpsc::unbounded_channel();
        for pair in favorites {
            let source = Arc::clone(&self.source);
            let tx = tx.clone();
            let pair = pair.clone();
            tokio::spawn(async move {
                fetch_pair(source.as_ref(), id, &pair, &tx).await;
            });
        }

        RefreshPass {
            generation,
            completions: rx,
            newest: Arc::clone(&self.newest),
            published: Arc::clone(&self.published),
        }
    }

    /// The result of the newest generation that has settled.
    pub fn snapshot(&self) -> PublishedView {
        self.published
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

impl RefreshPass {
    pub fn generation(&self) -> u64 {
        self.generation.id()
    }

    /// Waits until every sub-fetch of this generation has reported, then
    /// publishes the result if no newer generation has been started.
    pub async fn settle(mut self) -> HashMap<String, FavoriteRates> {
        while !self.generation.is_settled() {
            match self.completions.recv().await {
                Some(completion) => {
                    self.generation.record(completion);
                }
                None => {
                    // Every fetch task is gone; nothing else can arrive.
                    warn!(
                        generation = self.generation.id(),
                        completed = self.generation.completed(),
                        expected = self.generation.expected(),
                        "Fetch tasks ended before the generation settled"
                    );
                    break;
                }
            }
        }

        let id = self.generation.id();
        let rates = self.generation.into_view();

        let mut published = self.published.lock().unwrap_or_else(|e| e.into_inner());
        if id == self.newest.load(Ordering::SeqCst) && id > published.generation {
            published.generation = id;
            published.rates = rates.clone();
            debug!(generation = id, pairs = rates.len(), "Published refresh");
        } else {
            debug!(generation = id, "Refresh superseded, not publishing");
        }
        rates
    }
}

fn previous_day(date: NaiveDate) -> NaiveDate {
    date - Duration::days(1)
}

#[instrument(name = "FavoriteFetch", skip(source, tx), fields(pair = %pair.key()))]
async fn fetch_pair(
    source: &dyn RateSource,
    generation: u64,
    pair: &FavoritePair,
    tx: &mpsc::UnboundedSender<Completion>,
) {
    let key = pair.key();
    let report = |slot, sample, weight| {
        // The receiver is gone only if the pass was dropped; nothing to do then.
        let _ = tx.send(Completion {
            generation,
            key: key.clone(),
            slot,
            sample,
            weight,
        });
    };

    let latest = match source.latest(&pair.base, &pair.target).await {
        Ok(sample) => sample,
        Err(e) => {
            warn!(error = %e, "Latest rate fetch failed");
            report(RateSlot::Latest, None, 2);
            return;
        }
    };
    report(RateSlot::Latest, Some(latest), 1);

    let previous_date = previous_day(latest.as_of);
    match source.on_date(&pair.base, &pair.target, previous_date).await {
        Ok(sample) => report(RateSlot::Previous, Some(sample), 1),
        Err(e) => {
            warn!(error = %e, %previous_date, "Previous rate fetch failed");
            report(RateSlot::Previous, None, 1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{Result, anyhow};
    use async_trait::async_trait;
    use std::collections::HashSet;
    use tokio::sync::Semaphore;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    /// Answers from fixed tables, optionally parking every call on a gate.
    #[derive(Default)]
    struct ScriptedSource {
        latest: Mutex<HashMap<String, RateSample>>,
        previous: Mutex<HashMap<String, RateSample>>,
        requested_dates: Mutex<Vec<(String, NaiveDate)>>,
        gate: Mutex<Option<Arc<Semaphore>>>,
    }

    impl ScriptedSource {
        fn set_latest(&self, base: &str, target: &str, rate: f64, as_of: &str) {
            self.latest.lock().unwrap().insert(
                format!("{base}_{target}"),
                RateSample {
                    rate,
                    as_of: date(as_of),
                },
            );
        }

        fn set_previous(&self, base: &str, target: &str, rate: f64, as_of: &str) {
            self.previous.lock().unwrap().insert(
                format!("{base}_{target}"),
                RateSample {
                    rate,
                    as_of: date(as_of),
                },
            );
        }

        async fn wait_gate(&self) {
            let gate = self.gate.lock().unwrap().clone();
            if let Some(gate) = gate {
                let _permit = gate.acquire().await.unwrap();
            }
        }
    }

    #[async_trait]
    impl RateSource for ScriptedSource {
        async fn latest(&self, base: &str, target: &str) -> Result<RateSample> {
            let key = format!("{base}_{target}");
            let answer = self.latest.lock().unwrap().get(&key).copied();
            self.wait_gate().await;
            answer.ok_or_else(|| anyhow!("no latest rate for {key}"))
        }

        async fn on_date(&self, base: &str, target: &str, on: NaiveDate) -> Result<RateSample> {
            let key = format!("{base}_{target}");
            self.requested_dates.lock().unwrap().push((key.clone(), on));
            let answer = self.previous.lock().unwrap().get(&key).copied();
            self.wait_gate().await;
            answer.ok_or_else(|| anyhow!("no rate for {key} on {on}"))
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

    fn pairs(list: &[(&str, &str)]) -> Vec<FavoritePair> {
        list.iter().map(|(b, t)| FavoritePair::new(b, t)).collect()
    }

    #[test]
    fn test_generation_accounting() {
        let mut generation = FetchGeneration::new(7, 2);
        assert_eq!(generation.expected(), 4);

        let sample = RateSample {
            rate: 1.1,
            as_of: date("2024-05-10"),
        };
        let completion = |id, key: &str, slot, sample, weight| Completion {
            generation: id,
            key: key.to_string(),
            slot,
            sample,
            weight,
        };

        assert!(!generation.record(completion(7, "USD_JPY", RateSlot::Latest, Some(sample), 1)));
        // Foreign tag: ignored entirely
        assert!(!generation.record(completion(6, "EUR_GBP", RateSlot::Latest, Some(sample), 2)));
        assert_eq!(generation.completed(), 1);

        assert!(!generation.record(completion(7, "USD_JPY", RateSlot::Previous, Some(sample), 1)));
        assert!(generation.record(completion(7, "EUR_GBP", RateSlot::Latest, None, 2)));
        assert!(generation.is_settled());

        // Overshoot never pushes completed past expected
        generation.record(completion(7, "EUR_GBP", RateSlot::Previous, None, 1));
        assert_eq!(generation.completed(), 4);

        let view = generation.into_view();
        assert_eq!(view.len(), 1);
        assert!(view.contains_key("USD_JPY"));
    }

    #[tokio::test]
    async fn test_refresh_collects_latest_and_previous() {
        let source = Arc::new(ScriptedSource::default());
        source.set_latest("USD", "JPY", 151.2, "2024-05-10");
        source.set_previous("USD", "JPY", 150.0, "2024-05-09");
        source.set_latest("EUR", "GBP", 0.85, "2024-05-10");
        source.set_previous("EUR", "GBP", 0.86, "2024-05-09");

        let aggregator = FavoritesAggregator::new(source.clone());
        let rates = aggregator
            .refresh(&pairs(&[("USD", "JPY"), ("EUR", "GBP")]))
            .await;

        assert_eq!(rates.len(), 2);
        let usd_jpy = rates["USD_JPY"];
        assert_eq!(usd_jpy.latest.rate, 151.2);
        assert_eq!(usd_jpy.previous.rate, 150.0);
        assert!((usd_jpy.change() - 1.2).abs() < 1e-9);
        assert!(rates["EUR_GBP"].change() < 0.0);

        let snapshot = aggregator.snapshot();
        assert_eq!(snapshot.generation, 1);
        assert_eq!(snapshot.rates.len(), 2);
    }

    #[tokio::test]
    async fn test_previous_date_follows_reported_latest_date() {
        let source = Arc::new(ScriptedSource::default());
        // Source reports Friday's rate on a Sunday request
        source.set_latest("USD", "CHF", 0.91, "2024-05-10");
        source.set_previous("USD", "CHF", 0.9, "2024-05-09");

        let aggregator = FavoritesAggregator::new(source.clone());
        aggregator.refresh(&pairs(&[("USD", "CHF")])).await;

        let requested = source.requested_dates.lock().unwrap().clone();
        assert_eq!(requested, vec![("USD_CHF".to_string(), date("2024-05-09"))]);
    }

    #[tokio::test]
    async fn test_refresh_settles_when_fetches_fail() {
        let source = Arc::new(ScriptedSource::default());
        // USD_JPY: latest ok, previous fails. EUR_GBP: latest fails. AUD_CAD: ok.
        source.set_latest("USD", "JPY", 151.2, "2024-05-10");
        source.set_latest("AUD", "CAD", 0.9, "2024-05-10");
        source.set_previous("AUD", "CAD", 0.91, "2024-05-09");

        let aggregator = FavoritesAggregator::new(source.clone());
        let favorites = pairs(&[("USD", "JPY"), ("EUR", "GBP"), ("AUD", "CAD")]);
        let pass = aggregator.begin(&favorites);
        assert_eq!(pass.generation(), 1);
        let rates = pass.settle().await;

        let keys: HashSet<_> = rates.keys().cloned().collect();
        assert_eq!(keys, HashSet::from(["AUD_CAD".to_string()]));
        // EUR_GBP never issued a previous-period request
        let requested = source.requested_dates.lock().unwrap().clone();
        assert!(requested.iter().all(|(key, _)| key != "EUR_GBP"));
    }

    #[tokio::test]
    async fn test_refresh_with_no_favorites_settles_immediately() {
        let aggregator = FavoritesAggregator::new(Arc::new(ScriptedSource::default()));
        let rates = aggregator.refresh(&[]).await;
        assert!(rates.is_empty());
        assert_eq!(aggregator.snapshot().generation, 1);
    }

    #[tokio::test]
    async fn test_superseded_generation_does_not_overwrite_newer_view() {
        let source = Arc::new(ScriptedSource::default());
        source.set_latest("USD", "JPY", 140.0, "2024-05-09");
        source.set_previous("USD", "JPY", 139.0, "2024-05-08");

        // First pass: park every request on a closed gate
        let gate = Arc::new(Semaphore::new(0));
        *source.gate.lock().unwrap() = Some(gate.clone());
        let aggregator = FavoritesAggregator::new(source.clone());
        let favorites = pairs(&[("USD", "JPY")]);
        let stale_pass = aggregator.begin(&favorites);
        // Let the spawned fetch pick up the gate and the old answers
        for _ in 0..4 {
            tokio::task::yield_now().await;
        }

        // Second pass: new data, no gate
        *source.gate.lock().unwrap() = None;
        source.set_latest("USD", "JPY", 155.0, "2024-05-10");
        source.set_previous("USD", "JPY", 154.0, "2024-05-09");
        let fresh = aggregator.refresh(&favorites).await;
        assert_eq!(fresh["USD_JPY"].latest.rate, 155.0);

        // Release the stale pass
        gate.add_permits(16);
        let stale = stale_pass.settle().await;
        assert_eq!(stale["USD_JPY"].latest.rate, 140.0);

        let snapshot = aggregator.snapshot();
        assert_eq!(snapshot.generation, 2);
        assert_eq!(snapshot.rates["USD_JPY"].latest.rate, 155.0);
        assert_eq!(fresh["USD_JPY"].latest.rate, 155.0);
    }
}

//! Rate-drop alert rules and their evaluation.

use crate::core::currency::{ValidationError, parse_pair, parse_positive};
use crate::core::models::RateDropAlertRule;
use crate::core::notify::NotificationSink;
use crate::core::rate::{RateSample, RateSource};
use crate::core::store::{Slot, SlotStore, load_or_default, save_snapshot};
use futures::future::join_all;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

pub const THRESHOLD_TITLE: &str = "Threshold Alert Triggered!";

/// A validated rule submission.
#[derive(Debug, Clone, PartialEq)]
pub struct AlertRequest {
    pub base: String,
    pub target: String,
    pub threshold: f64,
}

impl AlertRequest {
    pub fn parse(
        base: &str,
        target: &str,
        threshold: &str,
        allowed: &[String],
    ) -> Result<Self, ValidationError> {
        let (base, target) = parse_pair(base, target, allowed)?;
        let threshold = parse_positive(threshold)
            .ok_or_else(|| ValidationError::InvalidThreshold(threshold.trim().to_string()))?;
        Ok(Self {
            base,
            target,
            threshold,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub current_rate: Option<RateSample>,
    pub fired: bool,
}

/// Owns the rate-drop rules slot and decides when a rule fires.
pub struct AlertEvaluator {
    source: Arc<dyn RateSource>,
    store: Arc<dyn SlotStore>,
    sink: Arc<dyn NotificationSink>,
    delay: Duration,
    rules: Mutex<Vec<RateDropAlertRule>>,
}

impl AlertEvaluator {
    pub fn load(
        source: Arc<dyn RateSource>,
        store: Arc<dyn SlotStore>,
        sink: Arc<dyn NotificationSink>,
        delay: Duration,
    ) -> Self {
        let rules: Vec<RateDropAlertRule> = load_or_default(store.as_ref(), Slot::RateDropAlerts);
        debug!(count = rules.len(), "Loaded rate-drop rules");
        Self {
            source,
            store,
            sink,
            delay,
            rules: Mutex::new(rules),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Vec<RateDropAlertRule>> {
        self.rules.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Persists the rule (once), then checks the current rate against it.
    pub async fn evaluate(&self, request: &AlertRequest) -> Evaluation {
        let rule = RateDropAlertRule::new(&request.base, &request.target, request.threshold);
        self.persist(rule.clone());
        self.check(&rule).await
    }

    /// Re-checks every persisted rule without touching the stored collection.
    pub async fn check_all(&self) -> Vec<(RateDropAlertRule, Evaluation)> {
        let rules = self.rules();
        let checks = rules.iter().map(|rule| self.check(rule));
        let evaluations = join_all(checks).await;
        rules.into_iter().zip(evaluations).collect()
    }

    pub fn rules(&self) -> Vec<RateDropAlertRule> {
        self.lock().clone()
    }

    /// Removes the rule structurally equal to the request, if any.
    pub fn remove(&self, request: &AlertRequest) -> bool {
        let probe = RateDropAlertRule::new(&request.base, &request.target, request.threshold);

        let mut rules = self.lock();
        let before = rules.len();
        rules.retain(|r| *r != probe);
        if rules.len() == before {
            return false;
        }
        save_snapshot(self.store.as_ref(), Slot::RateDropAlerts, &*rules);
        true
    }

    fn persist(&self, rule: RateDropAlertRule) {
        let mut rules = self.lock();
        if rules.contains(&rule) {
            debug!(base = %rule.base, target = %rule.target, threshold = rule.threshold, "Rule already stored");
            return;
        }
        rules.push(rule);
        save_snapshot(self.store.as_ref(), Slot::RateDropAlerts, &*rules);
    }

    async fn check(&self, rule: &RateDropAlertRule) -> Evaluation {
        let sample = match self.source.latest(&rule.base, &rule.target).await {
            Ok(sample) => sample,
            Err(e) => {
                warn!(base = %rule.base, target = %rule.target, error = %e, "Rate fetch failed, alert not evaluated");
                return Evaluation {
                    current_rate: None,
                    fired: false,
                };
            }
        };

        if sample.rate >= rule.threshold {
            debug!(rate = sample.rate, threshold = rule.threshold, "Rate above threshold");
            return Evaluation {
                current_rate: Some(sample),
                fired: false,
            };
        }

        let body = format!("1 {} = {:.2} {}", rule.base, sample.rate, rule.target);
        let id = Uuid::new_v4().to_string();
        let fired = match self
            .sink
            .schedule_once(&id, THRESHOLD_TITLE, &body, self.delay)
            .await
        {
            Ok(()) => {
                info!(%id, %body, threshold = rule.threshold, "Rate-drop alert fired");
                true
            }
            Err(e) => {
                warn!(error = %e, "Failed to schedule rate-drop notification");
                false
            }
        };

        Evaluation {
            current_rate: Some(sample),
            fired,
        }
    }
}

//! Persisted records.
//!
//! Equality on the collections that are de-duplicated is structural over the
//! identifying fields and ignores the surrogate `id`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::hash::{Hash, Hasher};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FavoritePair {
    pub id: Uuid,
    pub base: String,
    pub target: String,
}

impl FavoritePair {
    pub fn new(base: &str, target: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            base: base.to_string(),
            target: target.to_string(),
        }
    }

    /// Key used for the aggregated rate view, e.g. `USD_JPY`.
    pub fn key(&self) -> String {
        format!("{}_{}", self.base, self.target)
    }
}

impl PartialEq for FavoritePair {
    fn eq(&self, other: &Self) -> bool {
        self.base == other.base && self.target == other.target
    }
}

impl Eq for FavoritePair {}

impl Hash for FavoritePair {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.base.hash(state);
        self.target.hash(state);
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateDropAlertRule {
    pub id: Uuid,
    pub base: String,
    pub target: String,
    pub threshold: f64,
}

impl RateDropAlertRule {
    pub fn new(base: &str, target: &str, threshold: f64) -> Self {
        Self {
            id: Uuid::new_v4(),
            base: base.to_string(),
            target: target.to_string(),
            threshold,
        }
    }
}

impl PartialEq for RateDropAlertRule {
    fn eq(&self, other: &Self) -> bool {
        self.base == other.base && self.target == other.target && self.threshold == other.threshold
    }
}

/// Singleton configuration of the recurring daily notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyAlertConfig {
    pub base: String,
    pub target: String,
    pub hour: u32,
    pub minute: u32,
    pub enabled: bool,
}

impl Default for DailyAlertConfig {
    fn default() -> Self {
        Self {
            base: "USD".to_string(),
            target: "JPY".to_string(),
            hour: 8,
            minute: 0,
            enabled: false,
        }
    }
}

/// A conversion the user recorded, priced at the rate of the exchange date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub base: String,
    pub target: String,
    pub amount: f64,
    pub converted_amount: f64,
    pub rate: f64,
    #[serde(default)]
    pub note: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_favorite_identity_ignores_id() {
        let a = FavoritePair::new("USD", "JPY");
        let b = FavoritePair::new("USD", "JPY");
        assert_ne!(a.id, b.id);
        assert_eq!(a, b);

        let set: HashSet<_> = [a, b, FavoritePair::new("JPY", "USD")].into_iter().collect();
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_rule_equality_is_structural() {
        let a = RateDropAlertRule::new("USD", "JPY", 140.0);
        assert_eq!(a, RateDropAlertRule::new("USD", "JPY", 140.0));
        assert_ne!(a, RateDropAlertRule::new("USD", "JPY", 141.0));
        assert_ne!(a, RateDropAlertRule::new("EUR", "JPY", 140.0));
    }

    #[test]
    fn test_favorite_key() {
        assert_eq!(FavoritePair::new("EUR", "GBP").key(), "EUR_GBP");
    }
}

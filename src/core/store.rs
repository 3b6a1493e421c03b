//! Named-slot persistence abstractions

use anyhow::{Result, anyhow};
use serde::{Serialize, de::DeserializeOwned};
use std::fmt::Display;
use tracing::{debug, warn};

/// Logical record slots. Each slot holds one serialized snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slot {
    Favorites,
    RateDropAlerts,
    DailyAlert,
    ConversionLog,
    ScheduledNotifications,
}

impl Slot {
    pub fn as_str(&self) -> &'static str {
        match self {
            Slot::Favorites => "favoritePairs",
            Slot::RateDropAlerts => "rateDropAlerts",
            Slot::DailyAlert => "dailyAlert",
            Slot::ConversionLog => "logHistory",
            Slot::ScheduledNotifications => "scheduledNotifications",
        }
    }
}

impl Display for Slot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Durable byte storage keyed by slot.
pub trait SlotStore: Send + Sync {
    fn load(&self, slot: Slot) -> Result<Option<Vec<u8>>>;
    fn save(&self, slot: Slot, bytes: &[u8]) -> Result<()>;
    fn clear(&self, slot: Slot) -> Result<()>;

    /// Replaces a slot with `apply(current)`. Stores shared between processes
    /// must not let another writer in between the read and the write.
    fn update(
        &self,
        slot: Slot,
        apply: &mut dyn FnMut(Option<Vec<u8>>) -> Result<Vec<u8>>,
    ) -> Result<()> {
        let current = self.load(slot)?;
        let next = apply(current)?;
        self.save(slot, &next)
    }
}

/// Reads a slot, treating a missing, unreadable or corrupt record as `T::default()`.
pub fn load_or_default<T>(store: &dyn SlotStore, slot: Slot) -> T
where
    T: DeserializeOwned + Default,
{
    match store.load(slot) {
        Ok(bytes) => decode_or_default(slot, bytes),
        Err(e) => {
            warn!(%slot, error = %e, "Failed to read slot");
            T::default()
        }
    }
}

fn decode_or_default<T>(slot: Slot, bytes: Option<Vec<u8>>) -> T
where
    T: DeserializeOwned + Default,
{
    match bytes {
        Some(bytes) => serde_json::from_slice(&bytes).unwrap_or_else(|e| {
            warn!(%slot, error = %e, "Discarding corrupt record");
            T::default()
        }),
        None => {
            debug!(%slot, "Slot is empty");
            T::default()
        }
    }
}

/// Applies `change` to the stored snapshot and writes it back in one store
/// update, so changes made by other processes in the meantime are kept.
///
/// If the store cannot be updated the change is applied to `cached` instead
/// and the failure is logged. Returns the resulting value.
pub fn modify_snapshot<T>(
    store: &dyn SlotStore,
    slot: Slot,
    cached: T,
    change: impl FnOnce(&mut T),
) -> T
where
    T: Serialize + DeserializeOwned + Default,
{
    let mut pending = Some(change);
    let mut updated: Option<T> = None;

    let res = store.update(slot, &mut |bytes| {
        let change = pending
            .take()
            .ok_or_else(|| anyhow!("Slot {slot} update applied twice"))?;
        let mut value: T = decode_or_default(slot, bytes);
        change(&mut value);
        let encoded = serde_json::to_vec(&value);
        updated = Some(value);
        Ok(encoded?)
    });

    match res {
        Ok(()) => debug!(%slot, "Updated snapshot"),
        Err(e) => warn!(%slot, error = %e, "Failed to update slot"),
    }

    match (updated, pending) {
        (Some(value), _) => value,
        (None, Some(change)) => {
            let mut value = cached;
            change(&mut value);
            value
        }
        (None, None) => cached,
    }
}

/// Writes a whole snapshot. Failures are logged and otherwise ignored.
pub fn save_snapshot<T>(store: &dyn SlotStore, slot: Slot, value: &T)
where
    T: Serialize + ?Sized,
{
    let res = serde_json::to_vec(value)
        .map_err(anyhow::Error::from)
        .and_then(|bytes| store.save(slot, &bytes));
    match res {
        Ok(()) => debug!(%slot, "Saved snapshot"),
        Err(e) => warn!(%slot, error = %e, "Failed to save snapshot"),
    }
}

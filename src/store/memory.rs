use crate::core::store::{Slot, SlotStore};
use anyhow::{Result, anyhow};
use std::collections::HashMap;
use std::sync::RwLock;
use tracing::debug;

/// In-memory slot store. Contents are lost when the process exits.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<HashMap<Slot, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SlotStore for MemoryStore {
    fn load(&self, slot: Slot) -> Result<Option<Vec<u8>>> {
        let slots = self
            .inner
            .read()
            .map_err(|_| anyhow!("Memory store lock poisoned"))?;
        let value = slots.get(&slot).cloned();
        debug!(%slot, hit = value.is_some(), "Memory store LOAD");
        Ok(value)
    }

    fn save(&self, slot: Slot, bytes: &[u8]) -> Result<()> {
        let mut slots = self
            .inner
            .write()
            .map_err(|_| anyhow!("Memory store lock poisoned"))?;
        slots.insert(slot, bytes.to_vec());
        debug!(%slot, "Memory store SAVE");
        Ok(())
    }

    fn clear(&self, slot: Slot) -> Result<()> {
        let mut slots = self
            .inner
            .write()
            .map_err(|_| anyhow!("Memory store lock poisoned"))?;
        slots.remove(&slot);
        debug!(%slot, "Memory store CLEAR");
        Ok(())
    }

    fn update(
        &self,
        slot: Slot,
        apply: &mut dyn FnMut(Option<Vec<u8>>) -> Result<Vec<u8>>,
    ) -> Result<()> {
        let mut slots = self
            .inner
            .write()
            .map_err(|_| anyhow!("Memory store lock poisoned"))?;
        let next = apply(slots.get(&slot).cloned())?;
        slots.insert(slot, next);
        debug!(%slot, "Memory store UPDATE");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::store::{load_or_default, modify_snapshot, save_snapshot};

    #[test]
    fn test_memory_store_save_load_clear() {
        let store = MemoryStore::new();

        // Initially, slot is empty
        assert!(store.load(Slot::Favorites).unwrap().is_none());

        store.save(Slot::Favorites, b"[1,2]").unwrap();
        assert_eq!(store.load(Slot::Favorites).unwrap(), Some(b"[1,2]".to_vec()));

        // Other slots are untouched
        assert!(store.load(Slot::DailyAlert).unwrap().is_none());

        store.clear(Slot::Favorites).unwrap();
        assert!(store.load(Slot::Favorites).unwrap().is_none());
    }

    #[test]
    fn test_corrupt_slot_loads_as_default() {
        let store = MemoryStore::new();
        store.save(Slot::RateDropAlerts, b"{not json").unwrap();

        let rules: Vec<u32> = load_or_default(&store, Slot::RateDropAlerts);
        assert!(rules.is_empty());
    }

    #[test]
    fn test_snapshot_helpers() {
        let store = MemoryStore::new();
        save_snapshot(&store, Slot::ConversionLog, &vec![3u32, 4]);

        let loaded: Vec<u32> = load_or_default(&store, Slot::ConversionLog);
        assert_eq!(loaded, vec![3, 4]);
    }

    #[test]
    fn test_modify_snapshot_builds_on_stored_value() {
        let store = MemoryStore::new();
        save_snapshot(&store, Slot::Favorites, &vec![1u32, 2]);

        // The cached copy is stale; the stored value wins.
        let value = modify_snapshot(&store, Slot::Favorites, Vec::<u32>::new(), |v| v.push(3));
        assert_eq!(value, vec![1, 2, 3]);

        let stored: Vec<u32> = load_or_default(&store, Slot::Favorites);
        assert_eq!(stored, vec![1, 2, 3]);
    }

    #[test]
    fn test_modify_snapshot_replaces_corrupt_record() {
        let store = MemoryStore::new();
        store.save(Slot::ConversionLog, b"{not json").unwrap();

        let value = modify_snapshot(&store, Slot::ConversionLog, vec![9u32], |v| v.push(1));
        assert_eq!(value, vec![1]);
        assert_eq!(store.load(Slot::ConversionLog).unwrap(), Some(b"[1]".to_vec()));
    }
}

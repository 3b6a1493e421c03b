//! The persisted set of favorite currency pairs.

use crate::core::currency::{ValidationError, parse_pair};
use crate::core::models::FavoritePair;
use crate::core::store::{Slot, SlotStore, load_or_default, save_snapshot};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

/// In-memory mirror of the favorites slot. It is the only writer of that slot
/// and saves the whole set after every mutation.
pub struct Favorites {
    store: Arc<dyn SlotStore>,
    allowed: Vec<String>,
    pairs: Mutex<Vec<FavoritePair>>,
}

impl Favorites {
    pub fn load(store: Arc<dyn SlotStore>, allowed: Vec<String>) -> Self {
        let mut pairs: Vec<FavoritePair> = load_or_default(store.as_ref(), Slot::Favorites);
        // A hand-edited or older record may carry duplicates; keep the first.
        let mut unique: Vec<FavoritePair> = Vec::with_capacity(pairs.len());
        for pair in pairs.drain(..) {
            if !unique.contains(&pair) {
                unique.push(pair);
            }
        }
        debug!(count = unique.len(), "Loaded favorites");

        Self {
            store,
            allowed,
            pairs: Mutex::new(unique),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Vec<FavoritePair>> {
        self.pairs.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Adds a pair. Returns `Ok(false)` when the pair is already a favorite.
    pub fn add(&self, base: &str, target: &str) -> Result<bool, ValidationError> {
        let (base, target) = parse_pair(base, target, &self.allowed)?;
        let candidate = FavoritePair::new(&base, &target);

        let mut pairs = self.lock();
        if pairs.contains(&candidate) {
            debug!(pair = %candidate.key(), "Favorite already present");
            return Ok(false);
        }
        pairs.push(candidate);
        save_snapshot(self.store.as_ref(), Slot::Favorites, &*pairs);
        Ok(true)
    }

    /// Removes a pair. Returns `false` when it was not a favorite.
    pub fn remove(&self, base: &str, target: &str) -> bool {
        let probe = FavoritePair::new(&base.trim().to_uppercase(), &target.trim().to_uppercase());

        let mut pairs = self.lock();
        let before = pairs.len();
        pairs.retain(|p| *p != probe);
        if pairs.len() == before {
            return false;
        }
        save_snapshot(self.store.as_ref(), Slot::Favorites, &*pairs);
        true
    }

    pub fn list(&self) -> Vec<FavoritePair> {
        self.lock().clone()
    }
}

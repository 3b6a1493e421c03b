pub mod disk;
pub mod memory;

use crate::core::config::AppConfig;
use crate::core::store::SlotStore;
use disk::DiskStore;
use memory::MemoryStore;
use std::sync::Arc;
use tracing::warn;

/// Opens the disk store under the configured data path, falling back to an
/// in-memory store when the disk store is unavailable.
pub fn open_store(config: &AppConfig) -> Arc<dyn SlotStore> {
    let disk = config
        .default_data_path()
        .and_then(|path| DiskStore::open(&path.join("store")));

    match disk {
        Ok(store) => Arc::new(store),
        Err(e) => {
            warn!(error = %e, "Disk store unavailable, changes will not be persisted");
            Arc::new(MemoryStore::new())
        }
    }
}

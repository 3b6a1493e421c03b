use crate::core::store::{Slot, SlotStore};
use anyhow::{Context, Result};
use fd_lock::RwLock;
use fjall::{Config, Keyspace, PartitionCreateOptions, PartitionHandle, PersistMode};
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use tracing::debug;

const PARTITION: &str = "slots";

/// Slot store backed by a fjall keyspace on disk.
///
/// Several zenny processes share one store (`watch` runs alongside one-off
/// commands), while a fjall keyspace may only be open in one place at a time.
/// The keyspace is therefore opened per operation, under an exclusive lock on
/// `store.lock` in the store directory, and closed again before the lock is
/// released.
pub struct DiskStore {
    keyspace_path: PathBuf,
    lock_path: PathBuf,
}

impl DiskStore {
    pub fn open(path: &Path) -> Result<Self> {
        std::fs::create_dir_all(path)
            .with_context(|| format!("Failed to create store directory: {}", path.display()))?;

        let store = Self {
            keyspace_path: path.join("keyspace"),
            lock_path: path.join("store.lock"),
        };
        // Surface an unusable store now rather than on first use.
        store.with_partition(|_, _| Ok(()))?;
        debug!("Opened disk store at {}", path.display());
        Ok(store)
    }

    fn lock_file(&self) -> Result<File> {
        OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(&self.lock_path)
            .with_context(|| format!("Failed to open lock file: {}", self.lock_path.display()))
    }

    fn with_partition<R>(
        &self,
        op: impl FnOnce(&Keyspace, &PartitionHandle) -> Result<R>,
    ) -> Result<R> {
        let mut lock = RwLock::new(self.lock_file()?);
        let _guard = lock
            .write()
            .with_context(|| format!("Failed to lock store: {}", self.lock_path.display()))?;

        let keyspace = Config::new(&self.keyspace_path)
            .open()
            .with_context(|| format!("Failed to open store at {}", self.keyspace_path.display()))?;
        let partition = keyspace.open_partition(PARTITION, PartitionCreateOptions::default())?;
        op(&keyspace, &partition)
    }
}

impl SlotStore for DiskStore {
    fn load(&self, slot: Slot) -> Result<Option<Vec<u8>>> {
        let value = self.with_partition(|_, partition| {
            Ok(partition.get(slot.as_str())?.map(|v| v.to_vec()))
        })?;
        debug!(%slot, hit = value.is_some(), "Disk store LOAD");
        Ok(value)
    }

    fn save(&self, slot: Slot, bytes: &[u8]) -> Result<()> {
        self.with_partition(|keyspace, partition| {
            partition.insert(slot.as_str(), bytes)?;
            keyspace.persist(PersistMode::SyncAll)?;
            Ok(())
        })?;
        debug!(%slot, "Disk store SAVE");
        Ok(())
    }

    fn clear(&self, slot: Slot) -> Result<()> {
        self.with_partition(|keyspace, partition| {
            partition.remove(slot.as_str())?;
            keyspace.persist(PersistMode::SyncAll)?;
            Ok(())
        })?;
        debug!(%slot, "Disk store CLEAR");
        Ok(())
    }

    fn update(
        &self,
        slot: Slot,
        apply: &mut dyn FnMut(Option<Vec<u8>>) -> Result<Vec<u8>>,
    ) -> Result<()> {
        self.with_partition(|keyspace, partition| {
            let current = partition.get(slot.as_str())?.map(|v| v.to_vec());
            let next = apply(current)?;
            partition.insert(slot.as_str(), next)?;
            keyspace.persist(PersistMode::SyncAll)?;
            Ok(())
        })?;
        debug!(%slot, "Disk store UPDATE");
        Ok(())
    }
}

//! A notification sink that keeps scheduled notifications in the slot store.
//!
//! Notifications are delivered by whoever polls [`ScheduleBook::take_due`],
//! which is the `watch` command for the terminal front-end.

use crate::core::notify::NotificationSink;
use crate::core::scheduler::next_fire_after;
use crate::core::store::{Slot, SlotStore, load_or_default, modify_snapshot};
use anyhow::{Result, anyhow};
use async_trait::async_trait;
use chrono::{Local, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Trigger {
    Once {
        due_at: NaiveDateTime,
    },
    Daily {
        hour: u32,
        minute: u32,
        next_fire: NaiveDateTime,
    },
}

impl Trigger {
    pub fn next_fire(&self) -> NaiveDateTime {
        match self {
            Trigger::Once { due_at } => *due_at,
            Trigger::Daily { next_fire, .. } => *next_fire,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduledNotification {
    pub id: String,
    pub title: String,
    pub body: String,
    pub trigger: Trigger,
}

pub struct ScheduleBook {
    store: Arc<dyn SlotStore>,
    entries: Mutex<Vec<ScheduledNotification>>,
}

impl ScheduleBook {
    pub fn load(store: Arc<dyn SlotStore>) -> Self {
        let entries: Vec<ScheduledNotification> =
            load_or_default(store.as_ref(), Slot::ScheduledNotifications);
        Self {
            store,
            entries: Mutex::new(entries),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Vec<ScheduledNotification>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Applies `change` to the stored book and caches the result. Entries
    /// other processes wrote since the last read are kept.
    fn modify(&self, change: impl FnOnce(&mut Vec<ScheduledNotification>)) {
        let mut entries = self.lock();
        let cached = entries.clone();
        *entries = modify_snapshot(
            self.store.as_ref(),
            Slot::ScheduledNotifications,
            cached,
            change,
        );
    }

    /// Adds an entry, replacing any entry with the same id.
    fn register(&self, entry: ScheduledNotification) {
        debug!(id = %entry.id, next_fire = %entry.trigger.next_fire(), "Notification registered");
        self.modify(|entries| {
            entries.retain(|e| e.id != entry.id);
            entries.push(entry);
        });
    }

    pub fn pending(&self) -> Vec<ScheduledNotification> {
        self.lock().clone()
    }

    pub fn active(&self, id: &str) -> Option<ScheduledNotification> {
        self.lock().iter().find(|e| e.id == id).cloned()
    }

    /// Picks up entries written by other processes.
    pub fn reload(&self) {
        let entries: Vec<ScheduledNotification> =
            load_or_default(self.store.as_ref(), Slot::ScheduledNotifications);
        *self.lock() = entries;
    }

    /// Returns everything due at `now`, including entries other processes
    /// registered. One-shots are removed, daily triggers move on to their
    /// next occurrence.
    pub fn take_due(&self, now: NaiveDateTime) -> Vec<ScheduledNotification> {
        self.reload();
        if !self.lock().iter().any(|e| e.trigger.next_fire() <= now) {
            return Vec::new();
        }

        let mut due = Vec::new();
        self.modify(|entries| {
            entries.retain_mut(|entry| {
                if entry.trigger.next_fire() > now {
                    return true;
                }
                due.push(entry.clone());
                match &mut entry.trigger {
                    Trigger::Once { .. } => false,
                    Trigger::Daily {
                        hour,
                        minute,
                        next_fire,
                    } => match next_fire_after(now, *hour, *minute) {
                        Some(next) => {
                            *next_fire = next;
                            true
                        }
                        None => false,
                    },
                }
            });
        });
        due
    }
}

#[async_trait]
impl NotificationSink for ScheduleBook {
    async fn schedule_once(
        &self,
        id: &str,
        title: &str,
        body: &str,
        delay: Duration,
    ) -> Result<()> {
        let delay = chrono::Duration::from_std(delay)?;
        self.register(ScheduledNotification {
            id: id.to_string(),
            title: title.to_string(),
            body: body.to_string(),
            trigger: Trigger::Once {
                due_at: Local::now().naive_local() + delay,
            },
        });
        Ok(())
    }

    async fn schedule_recurring(
        &self,
        id: &str,
        title: &str,
        body: &str,
        hour: u32,
        minute: u32,
    ) -> Result<()> {
        let next_fire = next_fire_after(Local::now().naive_local(), hour, minute)
            .ok_or_else(|| anyhow!("Invalid time {hour:02}:{minute:02}"))?;
        self.register(ScheduledNotification {
            id: id.to_string(),
            title: title.to_string(),
            body: body.to_string(),
            trigger: Trigger::Daily {
                hour,
                minute,
                next_fire,
            },
        });
        Ok(())
    }

    async fn cancel(&self, id: &str) -> Result<()> {
        let mut removed = false;
        self.modify(|entries| {
            let before = entries.len();
            entries.retain(|e| e.id != id);
            removed = entries.len() != before;
        });
        if removed {
            debug!(%id, "Notification cancelled");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::disk::DiskStore;
    use crate::store::memory::MemoryStore;
    use chrono::{Duration as ChronoDuration, NaiveDate};
    use tempfile::tempdir;

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, 0)
            .unwrap()
    }

    #[tokio::test]
    async fn test_same_id_replaces_entry() {
        let book = ScheduleBook::load(Arc::new(MemoryStore::new()));
        book.schedule_recurring("daily", "Daily", "first", 8, 0)
            .await
            .unwrap();
        book.schedule_recurring("daily", "Daily", "second", 9, 30)
            .await
            .unwrap();

        assert_eq!(book.pending().len(), 1);
        let entry = book.active("daily").unwrap();
        assert_eq!(entry.body, "second");
        assert!(matches!(
            entry.trigger,
            Trigger::Daily {
                hour: 9,
                minute: 30,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_cancel_and_persist() {
        let store = Arc::new(MemoryStore::new());
        let book = ScheduleBook::load(store.clone());
        book.schedule_once("a", "t", "b", Duration::from_secs(5))
            .await
            .unwrap();
        book.schedule_once("b", "t", "b", Duration::from_secs(5))
            .await
            .unwrap();
        book.cancel("a").await.unwrap();
        book.cancel("missing").await.unwrap();

        let reloaded = ScheduleBook::load(store);
        let ids: Vec<_> = reloaded.pending().into_iter().map(|e| e.id).collect();
        assert_eq!(ids, vec!["b"]);
    }

    #[test]
    fn test_take_due_removes_one_shots_and_advances_daily() {
        let book = ScheduleBook::load(Arc::new(MemoryStore::new()));
        book.register(ScheduledNotification {
            id: "once".to_string(),
            title: "t".to_string(),
            body: "b".to_string(),
            trigger: Trigger::Once {
                due_at: at(2024, 5, 10, 7, 0),
            },
        });
        book.register(ScheduledNotification {
            id: "daily".to_string(),
            title: "t".to_string(),
            body: "b".to_string(),
            trigger: Trigger::Daily {
                hour: 8,
                minute: 0,
                next_fire: at(2024, 5, 10, 8, 0),
            },
        });

        assert!(book.take_due(at(2024, 5, 10, 6, 59)).is_empty());

        let due = book.take_due(at(2024, 5, 10, 7, 30));
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].id, "once");
        assert!(book.active("once").is_none());

        let due = book.take_due(at(2024, 5, 10, 8, 1));
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].id, "daily");
        assert_eq!(
            book.active("daily").unwrap().trigger.next_fire(),
            at(2024, 5, 11, 8, 0)
        );

        // Nothing more until tomorrow
        assert!(book.take_due(at(2024, 5, 10, 23, 0)).is_empty());
    }

    #[tokio::test]
    async fn test_take_due_sees_other_writers() {
        let store = Arc::new(MemoryStore::new());
        let watcher = ScheduleBook::load(store.clone());
        let writer = ScheduleBook::load(store);

        writer
            .schedule_once("x", "t", "b", Duration::from_secs(0))
            .await
            .unwrap();
        assert!(watcher.pending().is_empty());

        let due = watcher.take_due(Local::now().naive_local() + ChronoDuration::seconds(1));
        assert_eq!(due.len(), 1);
    }

    #[tokio::test]
    async fn test_entries_from_another_disk_handle_are_delivered_once() {
        let dir = tempdir().unwrap();
        let watcher = ScheduleBook::load(Arc::new(DiskStore::open(dir.path()).unwrap()));
        let writer = ScheduleBook::load(Arc::new(DiskStore::open(dir.path()).unwrap()));

        let now = Local::now().naive_local();
        writer
            .schedule_once("alert", "t", "b", Duration::from_secs(0))
            .await
            .unwrap();
        writer.register(ScheduledNotification {
            id: "daily".to_string(),
            title: "t".to_string(),
            body: "b".to_string(),
            trigger: Trigger::Daily {
                hour: 8,
                minute: 0,
                next_fire: now + ChronoDuration::days(1),
            },
        });

        let due = watcher.take_due(now + ChronoDuration::seconds(1));
        let ids: Vec<_> = due.into_iter().map(|e| e.id).collect();
        assert_eq!(ids, vec!["alert"]);
        assert!(watcher.take_due(now + ChronoDuration::seconds(1)).is_empty());

        // The writer's stale copy must not bring the delivered one-shot back.
        writer
            .schedule_once("later", "t", "b", Duration::from_secs(3600))
            .await
            .unwrap();

        let reopened = ScheduleBook::load(Arc::new(DiskStore::open(dir.path()).unwrap()));
        let mut ids: Vec<_> = reopened.pending().into_iter().map(|e| e.id).collect();
        ids.sort();
        assert_eq!(ids, vec!["daily", "later"]);
    }
}

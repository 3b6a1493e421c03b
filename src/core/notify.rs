//! Notification scheduling abstractions

use anyhow::Result;
use async_trait::async_trait;
use std::time::Duration;

#[async_trait]
pub trait NotificationSink: Send + Sync {
    /// Schedules a single notification `delay` from now.
    async fn schedule_once(&self, id: &str, title: &str, body: &str, delay: Duration)
    -> Result<()>;

    /// Schedules a notification repeating every day at `hour:minute` local time.
    async fn schedule_recurring(
        &self,
        id: &str,
        title: &str,
        body: &str,
        hour: u32,
        minute: u32,
    ) -> Result<()>;

    /// Cancels a pending notification. Unknown ids are ignored.
    async fn cancel(&self, id: &str) -> Result<()>;
}

//! Startup rehydration of persisted reminders
//!
//! A restart must not lose schedules: once the store is reachable, every
//! persisted reminder gets its trigger re-established through the same
//! service path a fresh create uses. A record whose cron expression no
//! longer parses is skipped with a warning; partial recovery beats total
//! failure.
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.4.0

use log::{info, warn};
use std::sync::Arc;

use crate::database::{ReminderStore, StoreError};

use super::service::ReminderService;

pub struct RecoveryLoader {
    store: Arc<dyn ReminderStore>,
    service: Arc<ReminderService>,
}

impl RecoveryLoader {
    pub fn new(store: Arc<dyn ReminderStore>, service: Arc<ReminderService>) -> Self {
        RecoveryLoader { store, service }
    }

    /// Re-establish triggers for all persisted reminders.
    ///
    /// Returns the number successfully scheduled.
    pub async fn load(&self) -> Result<usize, StoreError> {
        let reminders = self.store.list_all().await?;
        let total = reminders.len();
        let mut scheduled = 0;

        for reminder in &reminders {
            match self.service.resume(reminder) {
                Ok(()) => scheduled += 1,
                Err(e) => {
                    warn!(
                        "skipping reminder {} ({:?}) during recovery: {e}",
                        reminder.id, reminder.name
                    );
                }
            }
        }

        info!("restored {scheduled} of {total} persisted reminders");
        Ok(scheduled)
    }
}

//! In-memory store and sender doubles shared by the engine's tests

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::database::{Guild, GuildStore, Reminder, ReminderStore, StoreError};

use super::sender::{ChannelSender, DeliveryError};

#[derive(Default)]
pub(crate) struct MemoryReminderStore {
    rows: Mutex<HashMap<String, Reminder>>,
    fail_writes: AtomicBool,
}

impl MemoryReminderStore {
    /// Make every subsequent write fail with a persistence error.
    pub(crate) fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub(crate) fn seed(&self, reminder: Reminder) {
        self.rows.lock().unwrap().insert(reminder.id.clone(), reminder);
    }

    fn write_error(&self) -> Option<StoreError> {
        self.fail_writes
            .load(Ordering::SeqCst)
            .then(|| StoreError::Invalid("simulated write failure".to_string()))
    }
}

#[async_trait]
impl ReminderStore for MemoryReminderStore {
    async fn get(&self, id: &str) -> Result<Reminder, StoreError> {
        self.rows
            .lock()
            .unwrap()
            .get(id)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn upsert(&self, reminder: &Reminder) -> Result<(), StoreError> {
        if let Some(e) = self.write_error() {
            return Err(e);
        }
        reminder.validate()?;
        self.rows
            .lock()
            .unwrap()
            .insert(reminder.id.clone(), reminder.clone());
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        if let Some(e) = self.write_error() {
            return Err(e);
        }
        self.rows.lock().unwrap().remove(id);
        Ok(())
    }

    async fn list_all(&self) -> Result<Vec<Reminder>, StoreError> {
        let mut all: Vec<Reminder> = self.rows.lock().unwrap().values().cloned().collect();
        all.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(all)
    }

    async fn list_by_guild(&self, guild_id: &str) -> Result<Vec<Reminder>, StoreError> {
        let mut matching: Vec<Reminder> = self
            .rows
            .lock()
            .unwrap()
            .values()
            .filter(|r| r.guild == guild_id)
            .cloned()
            .collect();
        matching.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(matching)
    }
}

#[derive(Default)]
pub(crate) struct MemoryGuildStore {
    rows: Mutex<HashMap<String, Guild>>,
}

impl MemoryGuildStore {
    pub(crate) fn membership(&self, guild_id: &str) -> Vec<String> {
        self.rows
            .lock()
            .unwrap()
            .get(guild_id)
            .map(|g| g.reminders.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl GuildStore for MemoryGuildStore {
    async fn get(&self, guild_id: &str) -> Result<Guild, StoreError> {
        self.rows
            .lock()
            .unwrap()
            .get(guild_id)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn upsert(&self, guild: &Guild) -> Result<(), StoreError> {
        self.rows
            .lock()
            .unwrap()
            .insert(guild.id.clone(), guild.clone());
        Ok(())
    }

    async fn add_reminder(&self, guild_id: &str, reminder_id: &str) -> Result<(), StoreError> {
        let mut rows = self.rows.lock().unwrap();
        let guild = rows
            .entry(guild_id.to_string())
            .or_insert_with(|| Guild::new(guild_id.to_string()));
        if !guild.reminders.iter().any(|id| id == reminder_id) {
            guild.reminders.push(reminder_id.to_string());
        }
        Ok(())
    }

    async fn remove_reminder(&self, guild_id: &str, reminder_id: &str) -> Result<(), StoreError> {
        if let Some(guild) = self.rows.lock().unwrap().get_mut(guild_id) {
            guild.reminders.retain(|id| id != reminder_id);
        }
        Ok(())
    }
}

/// Records every send; can be told to fail the next N sends.
#[derive(Default)]
pub(crate) struct RecordingSender {
    sent: Mutex<Vec<(String, String)>>,
    failures_left: AtomicUsize,
}

impl RecordingSender {
    pub(crate) fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().unwrap().clone()
    }

    pub(crate) fn fail_next(&self, count: usize) {
        self.failures_left.store(count, Ordering::SeqCst);
    }
}

#[async_trait]
impl ChannelSender for RecordingSender {
    async fn send(&self, channel_id: &str, text: &str) -> Result<(), DeliveryError> {
        if self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(DeliveryError::Other("simulated delivery failure".to_string()));
        }
        self.sent
            .lock()
            .unwrap()
            .push((channel_id.to_string(), text.to_string()));
        Ok(())
    }
}

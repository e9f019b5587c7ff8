//! Reminder mutation authority
//!
//! All reminder lifecycle changes flow through [`ReminderService`]: it
//! validates, persists, and only then touches the trigger registry, so the
//! registry always reflects the last durably-committed state. Trigger
//! callbacks load the *current* persisted record on every firing, which is
//! how edits land without tearing down in-flight executions.
//!
//! - **Version**: 1.2.0
//! - **Since**: 0.3.0
//!
//! ## Changelog
//! - 1.2.0: Unconditional reschedule on every edit
//! - 1.1.0: Guild membership detach ordered before row deletion
//! - 1.0.0: Initial create/edit/delete/list/execute

use chrono::Utc;
use log::{info, warn};
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

use crate::core::response::chunk_message;
use crate::database::{Reminder, ReminderStore, StoreError};
use crate::database::GuildStore;

use super::cron::{CronJob, CronScheduler};
use super::registry::ScheduleRegistry;
use super::sender::ChannelSender;

#[derive(Debug, Error)]
pub enum ReminderError {
    #[error("invalid cron expression {0:?}")]
    InvalidCron(String),
    #[error("reminder name is empty")]
    EmptyName,
    #[error("reminder message is empty")]
    EmptyMessage,
    #[error("reminder {0} not found")]
    NotFound(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Fields collected for a new reminder
#[derive(Debug, Clone)]
pub struct NewReminder {
    pub name: String,
    pub message: String,
    pub cron_time: String,
    pub channel: String,
    pub guild: String,
    pub created_by: String,
}

/// Partial update; unset fields keep their persisted value
#[derive(Debug, Clone, Default)]
pub struct ReminderEdit {
    pub name: Option<String>,
    pub message: Option<String>,
    pub cron_time: Option<String>,
    pub channel: Option<String>,
}

/// Orchestrates store, registry, scheduler and chunker
pub struct ReminderService {
    reminders: Arc<dyn ReminderStore>,
    guilds: Arc<dyn GuildStore>,
    registry: Arc<ScheduleRegistry>,
    sender: Arc<dyn ChannelSender>,
}

impl ReminderService {
    pub fn new(
        reminders: Arc<dyn ReminderStore>,
        guilds: Arc<dyn GuildStore>,
        registry: Arc<ScheduleRegistry>,
        sender: Arc<dyn ChannelSender>,
    ) -> Self {
        ReminderService {
            reminders,
            guilds,
            registry,
            sender,
        }
    }

    pub fn registry(&self) -> &Arc<ScheduleRegistry> {
        &self.registry
    }

    /// Create a reminder: validate, persist, attach to the guild, then
    /// bring one trigger live.
    pub async fn create(&self, def: NewReminder) -> Result<Reminder, ReminderError> {
        if def.name.trim().is_empty() {
            return Err(ReminderError::EmptyName);
        }
        if !CronScheduler::validate(&def.cron_time) {
            return Err(ReminderError::InvalidCron(def.cron_time));
        }
        let messages = chunk_message(&def.message);
        if messages.iter().all(|m| m.trim().is_empty()) {
            return Err(ReminderError::EmptyMessage);
        }

        let reminder = Reminder::new(
            Uuid::new_v4().to_string(),
            def.name,
            messages,
            def.cron_time,
            def.channel,
            def.guild,
            def.created_by,
        );

        self.reminders.upsert(&reminder).await?;
        self.guilds.add_reminder(&reminder.guild, &reminder.id).await?;
        self.resume(&reminder)?;

        info!(
            "created reminder {} ({:?}) in guild {} on {:?}",
            reminder.id, reminder.name, reminder.guild, reminder.cron_time
        );
        Ok(reminder)
    }

    /// Apply a partial edit and unconditionally replace the live trigger,
    /// so the schedule always reflects the latest persisted values.
    pub async fn edit(&self, id: &str, fields: ReminderEdit) -> Result<Reminder, ReminderError> {
        let mut reminder = self.load(id).await?;

        if let Some(name) = fields.name {
            if name.trim().is_empty() {
                return Err(ReminderError::EmptyName);
            }
            reminder.name = name;
        }
        if let Some(message) = fields.message {
            let messages = chunk_message(&message);
            if messages.iter().all(|m| m.trim().is_empty()) {
                return Err(ReminderError::EmptyMessage);
            }
            reminder.messages = messages;
        }
        if let Some(cron_time) = fields.cron_time {
            if !CronScheduler::validate(&cron_time) {
                return Err(ReminderError::InvalidCron(cron_time));
            }
            reminder.cron_time = cron_time;
        }
        if let Some(channel) = fields.channel {
            reminder.channel = channel;
        }

        self.reminders.upsert(&reminder).await?;
        self.resume(&reminder)?;

        info!("edited reminder {} ({:?})", reminder.id, reminder.name);
        Ok(reminder)
    }

    /// Delete a reminder. Ordering matters: stop the trigger first, then
    /// detach guild membership, then drop the row - a crash mid-sequence
    /// leaves at worst an orphaned row, never a dangling live trigger.
    pub async fn delete(&self, id: &str) -> Result<(), ReminderError> {
        self.registry.remove(id);
        let reminder = self.load(id).await?;
        self.guilds.remove_reminder(&reminder.guild, id).await?;
        self.reminders.delete(id).await?;

        info!("deleted reminder {} ({:?})", id, reminder.name);
        Ok(())
    }

    /// Reminders of a guild, in membership order.
    pub async fn list(&self, guild_id: &str) -> Result<Vec<Reminder>, ReminderError> {
        Ok(self.reminders.list_by_guild(guild_id).await?)
    }

    /// Deliver a reminder now. Used by trigger callbacks and never raises:
    /// a vanished record or channel simply skips this firing.
    pub async fn execute(&self, id: &str) {
        execute(Arc::clone(&self.reminders), Arc::clone(&self.sender), id.to_string()).await;
    }

    /// Bring a trigger live for an already-persisted reminder, replacing
    /// any prior handle. Shared by create, edit and startup recovery.
    pub(crate) fn resume(&self, reminder: &Reminder) -> Result<(), ReminderError> {
        let store = Arc::clone(&self.reminders);
        let sender = Arc::clone(&self.sender);
        let id = reminder.id.clone();

        let job: CronJob = CronScheduler::schedule(&reminder.cron_time, move || {
            execute(Arc::clone(&store), Arc::clone(&sender), id.clone())
        })
        .map_err(|_| ReminderError::InvalidCron(reminder.cron_time.clone()))?;

        self.registry.set(&reminder.id, job);
        Ok(())
    }

    async fn load(&self, id: &str) -> Result<Reminder, ReminderError> {
        self.reminders.get(id).await.map_err(|e| match e {
            StoreError::NotFound => ReminderError::NotFound(id.to_string()),
            other => ReminderError::Store(other),
        })
    }
}

/// One firing: load the current record, deliver each segment in order,
/// then best-effort record the run.
///
/// Free function so trigger closures don't need a handle on the service.
async fn execute(store: Arc<dyn ReminderStore>, sender: Arc<dyn ChannelSender>, id: String) {
    let mut reminder = match store.get(&id).await {
        Ok(reminder) => reminder,
        Err(e) => {
            warn!("skipping firing of reminder {id}: {e}");
            return;
        }
    };

    let total = reminder.messages.len();
    for (index, segment) in reminder.messages.iter().enumerate() {
        if let Err(e) = sender.send(&reminder.channel, segment).await {
            // One segment failing must not stop the rest, and a transient
            // outage must not disable the recurring trigger.
            warn!(
                "failed to deliver segment {}/{total} of reminder {id} ({:?}): {e}",
                index + 1,
                reminder.name
            );
        }
    }

    reminder.last_run = Some(Utc::now());
    if let Err(e) = store.upsert(&reminder).await {
        warn!("could not record last run of reminder {id}: {e}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::reminders::testing::{MemoryGuildStore, MemoryReminderStore, RecordingSender};

    fn fixture() -> (
        ReminderService,
        Arc<MemoryReminderStore>,
        Arc<MemoryGuildStore>,
        Arc<ScheduleRegistry>,
        Arc<RecordingSender>,
    ) {
        let reminders = Arc::new(MemoryReminderStore::default());
        let guilds = Arc::new(MemoryGuildStore::default());
        let registry = Arc::new(ScheduleRegistry::new());
        let sender = Arc::new(RecordingSender::default());
        let service = ReminderService::new(
            Arc::clone(&reminders) as Arc<dyn ReminderStore>,
            Arc::clone(&guilds) as Arc<dyn GuildStore>,
            Arc::clone(&registry),
            Arc::clone(&sender) as Arc<dyn ChannelSender>,
        );
        (service, reminders, guilds, registry, sender)
    }

    fn definition(guild: &str) -> NewReminder {
        NewReminder {
            name: "standup".to_string(),
            message: "time for standup".to_string(),
            cron_time: "0 9 * * 1-5".to_string(),
            channel: "chan-1".to_string(),
            guild: guild.to_string(),
            created_by: "user-1".to_string(),
        }
    }

    #[tokio::test]
    async fn test_create_registers_exactly_one_trigger() {
        let (service, reminders, guilds, registry, _) = fixture();
        let created = service.create(definition("g1")).await.unwrap();

        assert!(registry.has(&created.id));
        assert_eq!(registry.len(), 1);
        assert!(reminders.get(&created.id).await.is_ok());
        assert_eq!(guilds.membership("g1"), vec![created.id.clone()]);
    }

    #[tokio::test]
    async fn test_create_rejects_invalid_cron() {
        let (service, reminders, _, registry, _) = fixture();
        let mut def = definition("g1");
        def.cron_time = "not a cron".to_string();

        let result = service.create(def).await;
        assert!(matches!(result, Err(ReminderError::InvalidCron(_))));
        assert!(registry.is_empty());
        assert!(reminders.list_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_create_rejects_empty_message_and_name() {
        let (service, _, _, registry, _) = fixture();

        let mut def = definition("g1");
        def.message = "  \n ".to_string();
        assert!(matches!(
            service.create(def).await,
            Err(ReminderError::EmptyMessage)
        ));

        let mut def = definition("g1");
        def.name = "".to_string();
        assert!(matches!(
            service.create(def).await,
            Err(ReminderError::EmptyName)
        ));
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_create_chunks_long_message() {
        let (service, reminders, _, _, _) = fixture();
        let mut def = definition("g1");
        def.message = format!("{}\n{}", "a".repeat(1500), "b".repeat(1500));

        let created = service.create(def).await.unwrap();
        let stored = reminders.get(&created.id).await.unwrap();
        assert_eq!(stored.messages.len(), 2);
        assert!(stored.messages.iter().all(|m| m.len() <= 2000));
    }

    #[tokio::test]
    async fn test_edit_name_only_still_replaces_handle() {
        let (service, reminders, _, registry, _) = fixture();
        let created = service.create(definition("g1")).await.unwrap();
        let before = registry.get(&created.id).unwrap();

        let edited = service
            .edit(
                &created.id,
                ReminderEdit {
                    name: Some("renamed".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert!(before.is_stopped(), "pre-edit handle must never fire again");
        let after = registry.get(&created.id).unwrap();
        assert!(!after.is_stopped());

        assert_eq!(edited.name, "renamed");
        let stored = reminders.get(&created.id).await.unwrap();
        assert_eq!(stored.cron_time, created.cron_time);
        assert_eq!(stored.messages, created.messages);
    }

    #[tokio::test]
    async fn test_edit_rechunks_message_and_revalidates_cron() {
        let (service, reminders, _, _, _) = fixture();
        let created = service.create(definition("g1")).await.unwrap();

        assert!(matches!(
            service
                .edit(
                    &created.id,
                    ReminderEdit {
                        cron_time: Some("99 * * * *".to_string()),
                        ..Default::default()
                    },
                )
                .await,
            Err(ReminderError::InvalidCron(_))
        ));

        service
            .edit(
                &created.id,
                ReminderEdit {
                    message: Some("x".repeat(4500)),
                    cron_time: Some("30 8 * * *".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let stored = reminders.get(&created.id).await.unwrap();
        assert_eq!(stored.messages.len(), 3);
        assert_eq!(stored.cron_time, "30 8 * * *");
    }

    #[tokio::test]
    async fn test_edit_unknown_id_is_not_found() {
        let (service, _, _, _, _) = fixture();
        assert!(matches!(
            service.edit("ghost", ReminderEdit::default()).await,
            Err(ReminderError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_failed_persist_leaves_registry_untouched() {
        let (service, reminders, _, registry, _) = fixture();
        let created = service.create(definition("g1")).await.unwrap();
        let live = registry.get(&created.id).unwrap();

        reminders.fail_writes(true);
        let result = service
            .edit(
                &created.id,
                ReminderEdit {
                    name: Some("renamed".to_string()),
                    ..Default::default()
                },
            )
            .await;

        assert!(matches!(result, Err(ReminderError::Store(_))));
        assert!(!live.is_stopped(), "registry must reflect committed state");
    }

    #[tokio::test]
    async fn test_delete_stops_trigger_and_detaches_guild() {
        let (service, reminders, guilds, registry, _) = fixture();
        let created = service.create(definition("g1")).await.unwrap();
        let live = registry.get(&created.id).unwrap();

        service.delete(&created.id).await.unwrap();

        assert!(live.is_stopped());
        assert!(!registry.has(&created.id));
        assert!(matches!(
            reminders.get(&created.id).await,
            Err(StoreError::NotFound)
        ));
        assert!(guilds.membership("g1").is_empty());
    }

    #[tokio::test]
    async fn test_delete_unknown_id_is_not_found() {
        let (service, _, _, _, _) = fixture();
        assert!(matches!(
            service.delete("ghost").await,
            Err(ReminderError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_execute_sends_segments_in_order_and_records_run() {
        let (service, reminders, _, _, sender) = fixture();
        let mut def = definition("g1");
        def.message = format!("{}\n{}", "a".repeat(1500), "b".repeat(1500));
        let created = service.create(def).await.unwrap();

        service.execute(&created.id).await;

        let sent = sender.sent();
        assert_eq!(sent.len(), 2);
        assert!(sent.iter().all(|(channel, _)| channel == "chan-1"));
        assert!(sent[0].1.starts_with('a'));
        assert!(sent[1].1.starts_with('b'));

        let stored = reminders.get(&created.id).await.unwrap();
        assert!(stored.last_run.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_live_trigger_delivers_daily_and_records_last_run() {
        let (service, reminders, _, _, sender) = fixture();
        let mut def = definition("g1");
        def.cron_time = "0 9 * * *".to_string();
        let created = service.create(def).await.unwrap();

        tokio::time::advance(std::time::Duration::from_secs(86_400)).await;
        for _ in 0..20 {
            tokio::task::yield_now().await;
        }

        let sent = sender.sent();
        assert_eq!(sent.len(), 1, "one elapsed day means one delivery");
        assert_eq!(sent[0].0, "chan-1");

        let stored = reminders.get(&created.id).await.unwrap();
        assert!(stored.last_run.is_some());
    }

    #[tokio::test]
    async fn test_execute_missing_reminder_is_silent() {
        let (service, _, _, _, sender) = fixture();
        service.execute("ghost").await;
        assert!(sender.sent().is_empty());
    }

    #[tokio::test]
    async fn test_execute_continues_past_failed_segment() {
        let (service, reminders, _, _, sender) = fixture();
        let mut def = definition("g1");
        def.message = format!("{}\n{}", "a".repeat(1500), "b".repeat(1500));
        let created = service.create(def).await.unwrap();

        sender.fail_next(1);
        service.execute(&created.id).await;

        // First segment failed but the second was still attempted
        let sent = sender.sent();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].1.starts_with('b'));

        let stored = reminders.get(&created.id).await.unwrap();
        assert!(stored.last_run.is_some());
    }

    #[tokio::test]
    async fn test_concurrent_create_and_delete_of_distinct_ids() {
        let (service, _, _, registry, _) = fixture();
        let service = Arc::new(service);

        let b = service.create(definition("g1")).await.unwrap();

        let create_side = Arc::clone(&service);
        let delete_side = Arc::clone(&service);
        let b_id = b.id.clone();
        let (created, deleted) = tokio::join!(
            tokio::spawn(async move { create_side.create(definition("g1")).await }),
            tokio::spawn(async move { delete_side.delete(&b_id).await }),
        );
        let a = created.unwrap().unwrap();
        deleted.unwrap().unwrap();

        assert!(registry.has(&a.id));
        assert!(!registry.has(&b.id));
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test]
    async fn test_list_returns_guild_reminders() {
        let (service, _, _, _, _) = fixture();
        let first = service.create(definition("g1")).await.unwrap();
        let second = service.create(definition("g1")).await.unwrap();
        service.create(definition("g2")).await.unwrap();

        let listed = service.list("g1").await.unwrap();
        let ids: Vec<&str> = listed.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec![first.id.as_str(), second.id.as_str()]);
    }
}

//! Persisted record types for reminders and guilds
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.1.0

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::MESSAGE_LIMIT;
use crate::database::StoreError;

/// A recurring reminder owned by a guild.
///
/// `messages` holds the pre-chunked delivery segments; every segment fits a
/// single Discord message. `last_run` is updated best-effort by the
/// execution path only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reminder {
    pub id: String,
    pub name: String,
    pub messages: Vec<String>,
    pub cron_time: String,
    pub channel: String,
    pub guild: String,
    pub created_by: String,
    pub last_run: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Reminder {
    pub fn new(
        id: String,
        name: String,
        messages: Vec<String>,
        cron_time: String,
        channel: String,
        guild: String,
        created_by: String,
    ) -> Self {
        let now = Utc::now();
        Reminder {
            id,
            name,
            messages,
            cron_time,
            channel,
            guild,
            created_by,
            last_run: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Shape validation enforced at the store boundary.
    ///
    /// Cron validity is the scheduler's concern and is checked by the
    /// service before every write.
    pub fn validate(&self) -> Result<(), StoreError> {
        if self.id.is_empty() {
            return Err(StoreError::Invalid("reminder id is empty".to_string()));
        }
        if self.name.trim().is_empty() {
            return Err(StoreError::Invalid("reminder name is empty".to_string()));
        }
        if self.messages.is_empty() {
            return Err(StoreError::Invalid(
                "reminder has no message segments".to_string(),
            ));
        }
        if let Some(oversized) = self.messages.iter().find(|m| m.len() > MESSAGE_LIMIT) {
            return Err(StoreError::Invalid(format!(
                "message segment of {} bytes exceeds the {} byte limit",
                oversized.len(),
                MESSAGE_LIMIT
            )));
        }
        if self.cron_time.trim().is_empty() {
            return Err(StoreError::Invalid("cron expression is empty".to_string()));
        }
        Ok(())
    }
}

/// A guild record: discoverability root for its reminders.
///
/// `reminders` is the ordered membership list of reminder ids; listing
/// follows this order. Created lazily the first time a guild id is seen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Guild {
    pub id: String,
    pub prefix: String,
    pub reminders: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Guild {
    pub fn new(id: String) -> Self {
        let now = Utc::now();
        Guild {
            id,
            prefix: "?".to_string(),
            reminders: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }
}

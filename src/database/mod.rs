//! # Database Module
//!
//! SQLite persistence for reminders and guild records. The store traits are
//! the seam the scheduling engine depends on; `Database` is the production
//! implementation. Record shape is validated here, at the store boundary,
//! never left to callers.
//!
//! - **Version**: 1.2.0
//! - **Since**: 0.1.0
//! - **Toggleable**: false
//!
//! ## Changelog
//! - 1.2.0: Guild membership list drives per-guild listing order
//! - 1.1.0: Lazy guild creation on first membership write
//! - 1.0.0: Initial schema with reminders and guilds tables

pub mod models;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::warn;
use sqlite::{Connection, ConnectionThreadSafe, State};
use std::sync::Arc;
use thiserror::Error;

pub use models::{Guild, Reminder};

/// Errors surfaced by the persistence layer
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("record not found")]
    NotFound,
    #[error("invalid record: {0}")]
    Invalid(String),
    #[error("database error: {0}")]
    Sqlite(#[from] sqlite::Error),
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Durable CRUD for reminder records
#[async_trait]
pub trait ReminderStore: Send + Sync {
    async fn get(&self, id: &str) -> Result<Reminder, StoreError>;
    async fn upsert(&self, reminder: &Reminder) -> Result<(), StoreError>;
    async fn delete(&self, id: &str) -> Result<(), StoreError>;
    async fn list_all(&self) -> Result<Vec<Reminder>, StoreError>;
    async fn list_by_guild(&self, guild_id: &str) -> Result<Vec<Reminder>, StoreError>;
}

/// Durable CRUD for guild records and their reminder membership
#[async_trait]
pub trait GuildStore: Send + Sync {
    async fn get(&self, guild_id: &str) -> Result<Guild, StoreError>;
    async fn upsert(&self, guild: &Guild) -> Result<(), StoreError>;
    /// Append a reminder id to the guild's membership list, creating the
    /// guild record lazily if this is the first time the id is seen.
    async fn add_reminder(&self, guild_id: &str, reminder_id: &str) -> Result<(), StoreError>;
    /// Remove a reminder id from the guild's membership list; no-op when
    /// the guild or the id is absent.
    async fn remove_reminder(&self, guild_id: &str, reminder_id: &str) -> Result<(), StoreError>;
}

/// SQLite-backed store, cheap to clone
#[derive(Clone)]
pub struct Database {
    connection: Arc<ConnectionThreadSafe>,
}

impl Database {
    /// Open (or create) the database file and run schema setup.
    pub async fn new(path: &str) -> Result<Self, StoreError> {
        let connection = Connection::open_thread_safe(path)?;
        connection.execute(
            "CREATE TABLE IF NOT EXISTS reminders (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                messages TEXT NOT NULL,
                cron_time TEXT NOT NULL,
                channel TEXT NOT NULL,
                guild TEXT NOT NULL,
                created_by TEXT NOT NULL,
                last_run TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_reminders_guild ON reminders(guild);
            CREATE TABLE IF NOT EXISTS guilds (
                id TEXT PRIMARY KEY,
                prefix TEXT NOT NULL DEFAULT '?',
                reminders TEXT NOT NULL DEFAULT '[]',
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );",
        )?;
        Ok(Database {
            connection: Arc::new(connection),
        })
    }

    fn read_reminder(statement: &sqlite::Statement<'_>) -> Result<Reminder, StoreError> {
        let messages: Vec<String> =
            serde_json::from_str(&statement.read::<String, _>("messages")?)?;
        let last_run = statement
            .read::<Option<String>, _>("last_run")?
            .map(|v| parse_timestamp(&v))
            .transpose()?;
        Ok(Reminder {
            id: statement.read::<String, _>("id")?,
            name: statement.read::<String, _>("name")?,
            messages,
            cron_time: statement.read::<String, _>("cron_time")?,
            channel: statement.read::<String, _>("channel")?,
            guild: statement.read::<String, _>("guild")?,
            created_by: statement.read::<String, _>("created_by")?,
            last_run,
            created_at: parse_timestamp(&statement.read::<String, _>("created_at")?)?,
            updated_at: parse_timestamp(&statement.read::<String, _>("updated_at")?)?,
        })
    }

    fn fetch_reminder(&self, id: &str) -> Result<Reminder, StoreError> {
        let mut statement = self
            .connection
            .prepare("SELECT * FROM reminders WHERE id = ?")?;
        statement.bind((1, id))?;
        match statement.next()? {
            State::Row => Self::read_reminder(&statement),
            State::Done => Err(StoreError::NotFound),
        }
    }

    fn fetch_guild(&self, guild_id: &str) -> Result<Guild, StoreError> {
        let mut statement = self.connection.prepare("SELECT * FROM guilds WHERE id = ?")?;
        statement.bind((1, guild_id))?;
        match statement.next()? {
            State::Row => Ok(Guild {
                id: statement.read::<String, _>("id")?,
                prefix: statement.read::<String, _>("prefix")?,
                reminders: serde_json::from_str(&statement.read::<String, _>("reminders")?)?,
                created_at: parse_timestamp(&statement.read::<String, _>("created_at")?)?,
                updated_at: parse_timestamp(&statement.read::<String, _>("updated_at")?)?,
            }),
            State::Done => Err(StoreError::NotFound),
        }
    }

    fn write_guild(&self, guild: &Guild) -> Result<(), StoreError> {
        let mut statement = self.connection.prepare(
            "INSERT INTO guilds (id, prefix, reminders, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                 prefix = excluded.prefix,
                 reminders = excluded.reminders,
                 updated_at = excluded.updated_at",
        )?;
        statement.bind((1, guild.id.as_str()))?;
        statement.bind((2, guild.prefix.as_str()))?;
        statement.bind((3, serde_json::to_string(&guild.reminders)?.as_str()))?;
        statement.bind((4, guild.created_at.to_rfc3339().as_str()))?;
        statement.bind((5, Utc::now().to_rfc3339().as_str()))?;
        statement.next()?;
        Ok(())
    }
}

#[async_trait]
impl ReminderStore for Database {
    async fn get(&self, id: &str) -> Result<Reminder, StoreError> {
        self.fetch_reminder(id)
    }

    async fn upsert(&self, reminder: &Reminder) -> Result<(), StoreError> {
        reminder.validate()?;
        let mut statement = self.connection.prepare(
            "INSERT INTO reminders
                 (id, name, messages, cron_time, channel, guild, created_by,
                  last_run, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                 name = excluded.name,
                 messages = excluded.messages,
                 cron_time = excluded.cron_time,
                 channel = excluded.channel,
                 last_run = excluded.last_run,
                 updated_at = excluded.updated_at",
        )?;
        statement.bind((1, reminder.id.as_str()))?;
        statement.bind((2, reminder.name.as_str()))?;
        statement.bind((3, serde_json::to_string(&reminder.messages)?.as_str()))?;
        statement.bind((4, reminder.cron_time.as_str()))?;
        statement.bind((5, reminder.channel.as_str()))?;
        statement.bind((6, reminder.guild.as_str()))?;
        statement.bind((7, reminder.created_by.as_str()))?;
        statement.bind((8, reminder.last_run.map(|t| t.to_rfc3339()).as_deref()))?;
        statement.bind((9, reminder.created_at.to_rfc3339().as_str()))?;
        statement.bind((10, Utc::now().to_rfc3339().as_str()))?;
        statement.next()?;
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        let mut statement = self.connection.prepare("DELETE FROM reminders WHERE id = ?")?;
        statement.bind((1, id))?;
        statement.next()?;
        Ok(())
    }

    async fn list_all(&self) -> Result<Vec<Reminder>, StoreError> {
        let mut statement = self
            .connection
            .prepare("SELECT * FROM reminders ORDER BY created_at, id")?;
        let mut reminders = Vec::new();
        while let State::Row = statement.next()? {
            reminders.push(Self::read_reminder(&statement)?);
        }
        Ok(reminders)
    }

    async fn list_by_guild(&self, guild_id: &str) -> Result<Vec<Reminder>, StoreError> {
        // Membership order is the listing order
        let guild = match self.fetch_guild(guild_id) {
            Ok(guild) => guild,
            Err(StoreError::NotFound) => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };
        let mut reminders = Vec::with_capacity(guild.reminders.len());
        for id in &guild.reminders {
            match self.fetch_reminder(id) {
                Ok(reminder) => reminders.push(reminder),
                Err(StoreError::NotFound) => {
                    warn!("guild {guild_id} references missing reminder {id}");
                }
                Err(e) => return Err(e),
            }
        }
        Ok(reminders)
    }
}

#[async_trait]
impl GuildStore for Database {
    async fn get(&self, guild_id: &str) -> Result<Guild, StoreError> {
        self.fetch_guild(guild_id)
    }

    async fn upsert(&self, guild: &Guild) -> Result<(), StoreError> {
        self.write_guild(guild)
    }

    async fn add_reminder(&self, guild_id: &str, reminder_id: &str) -> Result<(), StoreError> {
        let mut guild = match self.fetch_guild(guild_id) {
            Ok(guild) => guild,
            Err(StoreError::NotFound) => Guild::new(guild_id.to_string()),
            Err(e) => return Err(e),
        };
        if !guild.reminders.iter().any(|id| id == reminder_id) {
            guild.reminders.push(reminder_id.to_string());
        }
        self.write_guild(&guild)
    }

    async fn remove_reminder(&self, guild_id: &str, reminder_id: &str) -> Result<(), StoreError> {
        let mut guild = match self.fetch_guild(guild_id) {
            Ok(guild) => guild,
            Err(StoreError::NotFound) => return Ok(()),
            Err(e) => return Err(e),
        };
        guild.reminders.retain(|id| id != reminder_id);
        self.write_guild(&guild)
    }
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| StoreError::Invalid(format!("bad timestamp {value:?}: {e}")))
}

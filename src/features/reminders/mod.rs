//! # Reminders Feature
//!
//! The reminder scheduling engine: cron-driven recurring messages with
//! exactly one live trigger per reminder, restart recovery from storage,
//! and mutation-safe rescheduling.
//!
//! - **Version**: 1.2.0
//! - **Since**: 0.1.0
//! - **Toggleable**: true

pub mod cron;
pub mod recovery;
pub mod registry;
pub mod sender;
pub mod service;

#[cfg(test)]
pub(crate) mod testing;

pub use cron::{CronJob, CronScheduler, ScheduleError};
pub use recovery::RecoveryLoader;
pub use registry::{RegistryError, ScheduleRegistry};
pub use sender::{ChannelSender, DeliveryError, DiscordSender};
pub use service::{NewReminder, ReminderEdit, ReminderError, ReminderService};

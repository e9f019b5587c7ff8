//! # Features Layer
//!
//! Feature modules of the chime bot. Each feature carries its own version
//! and changelog in its module docs.

pub mod reminders;

pub use reminders::{
    CronJob, CronScheduler, RecoveryLoader, ReminderService, ScheduleRegistry,
};

/// Bot version from the crate manifest
pub fn get_bot_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

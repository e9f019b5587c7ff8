// Core layer - shared types, configuration and message chunking
pub mod core;

// Features layer - the reminder scheduling engine
pub mod features;

// Infrastructure - SQLite persistence for reminders and guilds
pub mod database;

// Application layer - slash command surface
pub mod commands;

// Re-export core config for convenience
pub use core::Config;

// Re-export the scheduling engine types
pub use features::reminders::{
    CronJob, CronScheduler, RecoveryLoader, ReminderService, ScheduleRegistry,
};

pub use database::Database;

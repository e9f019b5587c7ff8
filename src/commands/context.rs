//! Shared context for command handlers
//!
//! - **Version**: 1.1.0
//! - **Since**: 1.0.0
//!
//! ## Changelog
//! - 1.1.0: Pare the context down to the reminder service
//! - 1.0.0: Initial implementation with the reminder service

use std::sync::Arc;

use crate::features::reminders::ReminderService;

/// Shared context for all command handlers.
///
/// Cheap to clone; the service is behind an Arc.
#[derive(Clone)]
pub struct CommandContext {
    pub service: Arc<ReminderService>,
}

impl CommandContext {
    /// Create a new CommandContext with the given service
    pub fn new(service: Arc<ReminderService>) -> Self {
        Self { service }
    }
}

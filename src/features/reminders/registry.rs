//! Live trigger registry, one handle per reminder id
//!
//! The registry is the only shared mutable state of the scheduling engine:
//! the mutation path (create/edit/delete) and the trigger-fired path both go
//! through it. The invariant that at most one live handle exists per id is
//! enforced here, not left to callers: `set` always stops the handle it
//! replaces, so rescheduling the same id from two racing code paths cannot
//! leak a timer.
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.2.0

use dashmap::DashMap;
use thiserror::Error;

use super::cron::CronJob;

#[derive(Debug, Error, PartialEq)]
pub enum RegistryError {
    #[error("no scheduled trigger for reminder {0}")]
    NotFound(String),
}

/// Concurrency-safe map from reminder id to its active trigger handle.
///
/// Constructed at startup, populated by recovery, mutated only through
/// `set`/`remove`, torn down with `stop_all` at shutdown.
#[derive(Default)]
pub struct ScheduleRegistry {
    jobs: DashMap<String, CronJob>,
}

impl ScheduleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install `job` for `id`, stopping and discarding any prior handle.
    pub fn set(&self, id: &str, job: CronJob) {
        if let Some(previous) = self.jobs.insert(id.to_string(), job) {
            previous.stop();
        }
    }

    /// Stop and remove the handle for `id`; no-op when absent.
    pub fn remove(&self, id: &str) {
        if let Some((_, job)) = self.jobs.remove(id) {
            job.stop();
        }
    }

    pub fn has(&self, id: &str) -> bool {
        self.jobs.contains_key(id)
    }

    /// Fetch a clone of the live handle for `id`.
    pub fn get(&self, id: &str) -> Result<CronJob, RegistryError> {
        self.jobs
            .get(id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| RegistryError::NotFound(id.to_string()))
    }

    /// Number of reminders currently believed to have an active trigger.
    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// Shutdown teardown: stop every registered handle and clear the map.
    pub fn stop_all(&self) {
        for entry in self.jobs.iter() {
            entry.value().stop();
        }
        self.jobs.clear();
    }
}

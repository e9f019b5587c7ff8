//! Cron expression validation and cancelable recurring triggers
//!
//! Wraps the `cron` crate behind the 5-field crontab grammar users actually
//! write (`minute hour day-of-month month day-of-week`); the seconds column
//! the crate wants is filled in internally. Each scheduled trigger runs its
//! own timer loop on the tokio runtime and fires the callback as a spawned
//! task, so a slow delivery never stalls the timer. The loop anchors the
//! wall clock to the runtime clock once at scheduling time and derives the
//! current instant from elapsed runtime time.
//!
//! - **Version**: 1.1.0
//! - **Since**: 0.2.0
//!
//! ## Changelog
//! - 1.1.0: Timer loop follows the runtime clock; stop leaves a wake permit
//! - 1.0.0: Initial validation and trigger loop

use chrono::{DateTime, Utc};
use cron::Schedule;
use std::future::Future;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Notify;
use tokio::time::{sleep, Instant};

#[derive(Debug, Error)]
pub enum ScheduleError {
    #[error("invalid cron expression {expr:?}: {source}")]
    InvalidExpression {
        expr: String,
        #[source]
        source: cron::error::Error,
    },
}

/// Handle to a live recurring trigger.
///
/// Cloning shares the same underlying trigger. `stop` is idempotent and
/// guarantees no callback invocation is dispatched after it returns; an
/// invocation already in flight may still run to completion.
#[derive(Debug, Clone)]
pub struct CronJob {
    stopped: Arc<AtomicBool>,
    notify: Arc<Notify>,
}

impl PartialEq for CronJob {
    /// Handles are equal when they share the same underlying trigger.
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.stopped, &other.stopped)
    }
}

impl CronJob {
    fn new() -> Self {
        CronJob {
            stopped: Arc::new(AtomicBool::new(false)),
            notify: Arc::new(Notify::new()),
        }
    }

    pub fn stop(&self) {
        if !self.stopped.swap(true, Ordering::SeqCst) {
            // notify_one stores a permit, so the timer loop observes the
            // stop even when it is between awaits at this instant.
            self.notify.notify_one();
        }
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }
}

/// Validates cron expressions and creates triggers bound to callbacks
pub struct CronScheduler;

impl CronScheduler {
    /// Whether `expr` parses under the supported cron grammar.
    pub fn validate(expr: &str) -> bool {
        Self::parse(expr).is_ok()
    }

    /// Schedule `callback` to run on every occurrence of `expr`.
    ///
    /// Fails with [`ScheduleError::InvalidExpression`] when the expression
    /// does not parse. The returned handle stops the trigger; dropping the
    /// handle does not.
    pub fn schedule<F, Fut>(expr: &str, callback: F) -> Result<CronJob, ScheduleError>
    where
        F: Fn() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let schedule = Self::parse(expr)?;
        let job = CronJob::new();
        let handle = job.clone();

        // Wall-clock anchor taken once; occurrences are measured against
        // runtime-clock elapsed time from here on.
        let started = Utc::now();
        let origin = Instant::now();

        tokio::spawn(async move {
            let now = move || -> DateTime<Utc> {
                started
                    + chrono::Duration::from_std(origin.elapsed())
                        .unwrap_or_else(|_| chrono::Duration::zero())
            };
            let mut cursor = started;
            loop {
                let Some(next) = schedule.after(&cursor).next() else {
                    // Expression has no future occurrence
                    break;
                };
                let wait = (next - now()).to_std().unwrap_or(Duration::ZERO);
                tokio::select! {
                    _ = sleep(wait) => {}
                    _ = handle.notify.notified() => break,
                }
                if handle.is_stopped() {
                    break;
                }
                tokio::spawn(callback());
                // Advance past this occurrence; skip any missed while lagging
                cursor = next.max(now());
            }
        });

        Ok(job)
    }

    fn parse(expr: &str) -> Result<Schedule, ScheduleError> {
        // The cron crate expects a leading seconds column; prepend one for
        // the standard 5-field form.
        let fields = expr.split_whitespace().count();
        let normalized = if fields == 5 {
            format!("0 {expr}")
        } else {
            expr.to_string()
        };
        Schedule::from_str(&normalized).map_err(|source| ScheduleError::InvalidExpression {
            expr: expr.to_string(),
            source,
        })
    }
}

//! # Delivery Scheduler
//!
//! Periodic sweep that delivers due reminders. Each due reminder is claimed
//! through the store before anything is sent, then one-shot reminders are
//! deleted and recurring ones move to their next occurrence.
//!
//! - **Version**: 1.0.0
//! - **Since**: 1.0.0

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use log::{debug, error, info, warn};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{timeout, Instant};

use super::delivery::{format_delivery, Messenger};
use super::error::{ReminderError, StoreError};
use super::model::Reminder;
use super::store::{ReminderQuery, ReminderStore};

/// Timing knobs for the scheduler
#[derive(Debug, Clone, Copy)]
pub struct SchedulerSettings {
    /// Time between sweeps
    pub sweep_interval: Duration,
    /// Grace period a claim lasts beyond the worst-case delivery time
    pub claim_lease: Duration,
    pub store_timeout: Duration,
    pub delivery_timeout: Duration,
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            sweep_interval: Duration::from_secs(30),
            claim_lease: Duration::from_secs(120),
            store_timeout: Duration::from_secs(10),
            delivery_timeout: Duration::from_secs(10),
        }
    }
}

/// Counters for one sweep
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Reminders selected as due
    pub due: usize,
    /// Messages sent successfully
    pub delivered: usize,
    /// Messages that failed to send
    pub failed_deliveries: usize,
    /// One-shot reminders removed after delivery
    pub completed: usize,
    /// Recurring reminders moved to their next occurrence
    pub rescheduled: usize,
    /// Reminders claimed by another sweep first
    pub skipped: usize,
    /// Reminders deleted or re-claimed while this sweep was delivering them
    pub superseded: usize,
    pub storage_errors: usize,
}

/// How a delivered reminder was settled in the store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Settled {
    Completed,
    Rescheduled,
    Superseded,
}

impl SweepReport {
    pub fn is_idle(&self) -> bool {
        self.due == 0
    }
}

pub struct ReminderScheduler {
    store: Arc<dyn ReminderStore>,
    messenger: Arc<dyn Messenger>,
    tz: Tz,
    settings: SchedulerSettings,
}

impl ReminderScheduler {
    pub fn new(
        store: Arc<dyn ReminderStore>,
        messenger: Arc<dyn Messenger>,
        tz: Tz,
        settings: SchedulerSettings,
    ) -> Self {
        Self {
            store,
            messenger,
            tz,
            settings,
        }
    }

    /// Sweep forever on the configured interval
    pub async fn run(self) {
        info!(
            "⏰ Reminder scheduler started (sweep every {}s, timezone {})",
            self.settings.sweep_interval.as_secs(),
            self.tz.name()
        );
        let mut interval = tokio::time::interval(self.settings.sweep_interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            interval.tick().await;
            match self.tick(Utc::now()).await {
                Ok(report) if report.is_idle() => debug!("Reminder sweep: nothing due"),
                Ok(report) => info!(
                    "⏰ Reminder sweep: {} due, {} delivered, {} failed, {} completed, {} rescheduled, {} skipped, {} superseded, {} storage errors",
                    report.due,
                    report.delivered,
                    report.failed_deliveries,
                    report.completed,
                    report.rescheduled,
                    report.skipped,
                    report.superseded,
                    report.storage_errors
                ),
                Err(e) => error!("Reminder sweep failed, retrying next tick: {e}"),
            }
        }
    }

    /// Deliver everything due at `now`
    ///
    /// `now` is the sweep's start; each claim is stamped with `now` plus the
    /// time the sweep has spent so far.
    pub async fn tick(&self, now: DateTime<Utc>) -> Result<SweepReport, ReminderError> {
        let started = Instant::now();
        let due = self
            .with_timeout(self.store.list(&ReminderQuery::due(now)))
            .await?;

        let mut report = SweepReport {
            due: due.len(),
            ..Default::default()
        };

        for reminder in due {
            let due_at = reminder.due_at();
            let claimed_at = now + elapsed_since(started);
            let lease_until = offset(claimed_at, self.lease_for(&reminder));
            match self
                .with_timeout(self.store.claim(reminder.id, due_at, claimed_at, lease_until))
                .await
            {
                Ok(true) => {}
                Ok(false) => {
                    debug!("Reminder #{} already claimed, skipping", reminder.id);
                    report.skipped += 1;
                    continue;
                }
                Err(e) => {
                    error!("Failed to claim reminder #{}: {e}", reminder.id);
                    report.storage_errors += 1;
                    continue;
                }
            }

            let (sent, failed) = self.deliver(&reminder).await;
            report.delivered += sent;
            report.failed_deliveries += failed;

            let settled_at = now + elapsed_since(started);
            match self.settle(&reminder, due_at, settled_at, lease_until).await {
                Ok(Settled::Completed) => report.completed += 1,
                Ok(Settled::Rescheduled) => report.rescheduled += 1,
                Ok(Settled::Superseded) => report.superseded += 1,
                Err(e) => {
                    // The lease runs out and a later sweep retries
                    error!("Failed to finalize reminder #{}: {e}", reminder.id);
                    report.storage_errors += 1;
                }
            }
        }

        Ok(report)
    }

    /// Claim length covering every send plus the final store write
    fn lease_for(&self, reminder: &Reminder) -> chrono::Duration {
        let targets = u32::try_from(reminder.target_ids.len()).unwrap_or(u32::MAX);
        let worst_case = self
            .settings
            .delivery_timeout
            .saturating_mul(targets)
            .saturating_add(self.settings.store_timeout)
            .saturating_add(self.settings.claim_lease);
        chrono::Duration::from_std(worst_case).unwrap_or(chrono::Duration::MAX)
    }

    /// Send to every target; returns (sent, failed)
    async fn deliver(&self, reminder: &Reminder) -> (usize, usize) {
        let mut sent = 0;
        let mut failed = 0;

        for target in &reminder.target_ids {
            let text = format_delivery(reminder, target);
            let result = match timeout(
                self.settings.delivery_timeout,
                self.messenger.send_message(&reminder.channel_id, &text),
            )
            .await
            {
                Ok(Ok(())) => Ok(()),
                Ok(Err(e)) => Err(e.to_string()),
                Err(_) => Err("timed out".to_string()),
            };

            match result {
                Ok(()) => {
                    debug!("Delivered reminder #{} to {target}", reminder.id);
                    sent += 1;
                }
                Err(reason) => {
                    let err = ReminderError::Delivery {
                        target: target.clone(),
                        reason,
                    };
                    warn!("Reminder #{}: {err}", reminder.id);
                    failed += 1;
                }
            }
        }

        (sent, failed)
    }

    /// Delete a one-shot reminder or advance a recurring one
    ///
    /// Both writes only apply while this sweep's claim is still in place.
    async fn settle(
        &self,
        reminder: &Reminder,
        due_at: DateTime<Utc>,
        now: DateTime<Utc>,
        lease_until: DateTime<Utc>,
    ) -> Result<Settled, StoreError> {
        let (applied, settled) = match &reminder.recurrence {
            Some(rule) => {
                let next = rule.next_after(due_at, now, self.tz);
                let applied = self
                    .with_timeout(self.store.reschedule(reminder.id, next, lease_until))
                    .await?;
                if applied {
                    debug!("Reminder #{} next due {next}", reminder.id);
                }
                (applied, Settled::Rescheduled)
            }
            None => {
                let applied = self
                    .with_timeout(self.store.complete(reminder.id, lease_until))
                    .await?;
                (applied, Settled::Completed)
            }
        };

        if applied {
            Ok(settled)
        } else {
            warn!(
                "Reminder #{} was deleted or re-claimed during delivery",
                reminder.id
            );
            Ok(Settled::Superseded)
        }
    }

    async fn with_timeout<T>(
        &self,
        op: impl std::future::Future<Output = Result<T, StoreError>>,
    ) -> Result<T, StoreError> {
        timeout(self.settings.store_timeout, op)
            .await
            .map_err(|_| StoreError::Timeout)?
    }
}

fn elapsed_since(started: Instant) -> chrono::Duration {
    chrono::Duration::from_std(started.elapsed()).unwrap_or(chrono::Duration::zero())
}

fn offset(at: DateTime<Utc>, by: chrono::Duration) -> DateTime<Utc> {
    at.checked_add_signed(by).unwrap_or(DateTime::<Utc>::MAX_UTC)
}

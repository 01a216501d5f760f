//! Reminder record store
//!
//! The store is the single shared mutable resource of the reminder engine.
//! Every mutation is atomic per record; the scheduler's claim is a
//! conditional update so overlapping sweeps (in one process or several)
//! never deliver the same due instant twice.
//!
//! - **Version**: 1.0.0
//! - **Since**: 1.0.0

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::sync::atomic::{AtomicI64, Ordering};

use super::error::StoreError;
use super::model::{NewReminder, Reminder};

/// Filter for [`ReminderStore::list`]
///
/// Results are always ordered by ascending id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReminderQuery {
    /// Only reminders created by this user
    pub owner_id: Option<String>,
    /// Only reminders due at or before this instant
    pub due_by: Option<DateTime<Utc>>,
    /// Only reminders without a claim that is still live at this instant
    pub unclaimed_at: Option<DateTime<Utc>>,
    pub limit: Option<usize>,
    pub offset: usize,
}

impl ReminderQuery {
    pub fn owned_by(owner_id: &str) -> Self {
        Self {
            owner_id: Some(owner_id.to_string()),
            ..Default::default()
        }
    }

    /// Reminders a sweep at `now` should pick up
    pub fn due(now: DateTime<Utc>) -> Self {
        Self {
            due_by: Some(now),
            unclaimed_at: Some(now),
            ..Default::default()
        }
    }

    fn matches(&self, reminder: &Reminder, claimed_until: Option<DateTime<Utc>>) -> bool {
        if let Some(owner) = &self.owner_id {
            if &reminder.owner_id != owner {
                return false;
            }
        }
        if let Some(due_by) = self.due_by {
            if reminder.due_at() > due_by {
                return false;
            }
        }
        if let Some(at) = self.unclaimed_at {
            if claimed_until.is_some_and(|until| until > at) {
                return false;
            }
        }
        true
    }
}

/// Persistence seam for reminders
#[async_trait]
pub trait ReminderStore: Send + Sync {
    /// Persist a new reminder, assigning its id
    async fn create(&self, reminder: NewReminder) -> Result<Reminder, StoreError>;

    /// Load one reminder; [`StoreError::NotFound`] if absent
    async fn get(&self, id: i64) -> Result<Reminder, StoreError>;

    async fn list(&self, query: &ReminderQuery) -> Result<Vec<Reminder>, StoreError>;

    /// Remove a reminder, returning whether it existed
    async fn delete(&self, id: i64) -> Result<bool, StoreError>;

    /// Mark a due reminder as being delivered until `lease_until`
    ///
    /// Succeeds only if the reminder still exists, is still due at `due_at`
    /// and has no live claim at `now`. Returns `false` when another sweep
    /// got there first.
    async fn claim(
        &self,
        id: i64,
        due_at: DateTime<Utc>,
        now: DateTime<Utc>,
        lease_until: DateTime<Utc>,
    ) -> Result<bool, StoreError>;

    /// Delete a delivered one-shot reminder
    ///
    /// Only applies while the claim ending at `lease_until` is still held.
    /// Returns `false` if the reminder is gone or was claimed again.
    async fn complete(&self, id: i64, lease_until: DateTime<Utc>) -> Result<bool, StoreError>;

    /// Move a recurring reminder to its next occurrence and release its claim
    ///
    /// Fenced on `lease_until` like [`ReminderStore::complete`].
    async fn reschedule(
        &self,
        id: i64,
        next_trigger_at: DateTime<Utc>,
        lease_until: DateTime<Utc>,
    ) -> Result<bool, StoreError>;
}

#[derive(Debug, Clone)]
struct StoredReminder {
    reminder: Reminder,
    claimed_until: Option<DateTime<Utc>>,
}

/// In-process store backed by DashMap
///
/// Used for tests and for running without a database file.
#[derive(Default)]
pub struct MemoryStore {
    records: DashMap<i64, StoredReminder>,
    next_id: AtomicI64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
impl ReminderStore for MemoryStore {
    async fn create(&self, reminder: NewReminder) -> Result<Reminder, StoreError> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let reminder = reminder.into_reminder(id);
        self.records.insert(
            id,
            StoredReminder {
                reminder: reminder.clone(),
                claimed_until: None,
            },
        );
        Ok(reminder)
    }

    async fn get(&self, id: i64) -> Result<Reminder, StoreError> {
        self.records
            .get(&id)
            .map(|entry| entry.reminder.clone())
            .ok_or(StoreError::NotFound(id))
    }

    async fn list(&self, query: &ReminderQuery) -> Result<Vec<Reminder>, StoreError> {
        let mut matching: Vec<Reminder> = self
            .records
            .iter()
            .filter(|entry| query.matches(&entry.reminder, entry.claimed_until))
            .map(|entry| entry.reminder.clone())
            .collect();
        matching.sort_by_key(|r| r.id);

        Ok(matching
            .into_iter()
            .skip(query.offset)
            .take(query.limit.unwrap_or(usize::MAX))
            .collect())
    }

    async fn delete(&self, id: i64) -> Result<bool, StoreError> {
        Ok(self.records.remove(&id).is_some())
    }

    async fn claim(
        &self,
        id: i64,
        due_at: DateTime<Utc>,
        now: DateTime<Utc>,
        lease_until: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        // get_mut holds the shard write lock for the whole check-and-set
        let Some(mut entry) = self.records.get_mut(&id) else {
            return Ok(false);
        };
        let live_claim = entry.claimed_until.is_some_and(|until| until > now);
        if entry.reminder.due_at() != due_at || live_claim {
            return Ok(false);
        }
        entry.claimed_until = Some(lease_until);
        Ok(true)
    }

    async fn complete(&self, id: i64, lease_until: DateTime<Utc>) -> Result<bool, StoreError> {
        Ok(self
            .records
            .remove_if(&id, |_, entry| entry.claimed_until == Some(lease_until))
            .is_some())
    }

    async fn reschedule(
        &self,
        id: i64,
        next_trigger_at: DateTime<Utc>,
        lease_until: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let Some(mut entry) = self.records.get_mut(&id) else {
            return Ok(false);
        };
        if entry.claimed_until != Some(lease_until) {
            return Ok(false);
        }
        entry.reminder.next_trigger_at = Some(next_trigger_at);
        entry.claimed_until = None;
        Ok(true)
    }
}

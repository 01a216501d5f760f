//! # Reminder Lifecycle
//!
//! Creation, listing, lookup and owner-checked deletion of reminders.
//! Creation runs the target resolver, then the time parser, and persists
//! nothing unless both succeed.
//!
//! - **Version**: 1.0.0
//! - **Since**: 1.0.0

use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

use super::error::{ReminderError, StoreError};
use super::model::{NewReminder, Reminder};
use super::store::{ReminderQuery, ReminderStore};
use super::targets::resolve_targets;
use super::time_parser::TimeParser;

/// Longest accepted reminder text in characters
///
/// Leaves room for the mention prefix and footer inside Discord's 2000
/// character message limit.
pub const MAX_MESSAGE_CHARS: usize = 1800;

/// Input for [`ReminderManager::create`]
#[derive(Debug, Clone, Default)]
pub struct CreateReminder {
    pub owner_id: String,
    pub who: String,
    pub when: String,
    pub message: String,
    pub channel_id: String,
    pub context_id: Option<String>,
}

/// Owns reminder entities end-to-end
#[derive(Clone)]
pub struct ReminderManager {
    store: Arc<dyn ReminderStore>,
    parser: TimeParser,
    store_timeout: Duration,
}

impl ReminderManager {
    pub fn new(store: Arc<dyn ReminderStore>, parser: TimeParser, store_timeout: Duration) -> Self {
        Self {
            store,
            parser,
            store_timeout,
        }
    }

    pub fn parser(&self) -> &TimeParser {
        &self.parser
    }

    pub fn store(&self) -> Arc<dyn ReminderStore> {
        Arc::clone(&self.store)
    }

    /// Create a reminder relative to the current time
    pub async fn create(&self, request: CreateReminder) -> Result<Reminder, ReminderError> {
        self.create_at(request, Utc::now()).await
    }

    /// Create a reminder relative to `now`
    pub async fn create_at(
        &self,
        request: CreateReminder,
        now: DateTime<Utc>,
    ) -> Result<Reminder, ReminderError> {
        let message = request.message.trim();
        if message.is_empty() {
            return Err(ReminderError::EmptyMessage);
        }
        let len = message.chars().count();
        if len > MAX_MESSAGE_CHARS {
            return Err(ReminderError::MessageTooLong {
                len,
                max: MAX_MESSAGE_CHARS,
            });
        }

        let target_ids = resolve_targets(&request.who, &request.owner_id)?;
        let schedule = self.parser.parse(&request.when, now)?;

        let trigger_at = schedule.trigger_at();
        let recurrence = schedule.rule().cloned();
        let next_trigger_at = recurrence.as_ref().map(|_| trigger_at);

        let new_reminder = NewReminder {
            owner_id: request.owner_id,
            target_ids,
            message: message.to_string(),
            channel_id: request.channel_id,
            context_id: request.context_id,
            trigger_at,
            recurrence,
            next_trigger_at,
            created_at: now,
        };

        let reminder = self.bounded(self.store.create(new_reminder)).await?;
        info!(
            "⏰ Created reminder #{} for user {} ({} target(s), due {}{})",
            reminder.id,
            reminder.owner_id,
            reminder.target_ids.len(),
            reminder.trigger_at.format("%Y-%m-%d %H:%M:%S UTC"),
            reminder
                .recurrence
                .as_ref()
                .map(|rule| format!(", {rule}"))
                .unwrap_or_default()
        );
        Ok(reminder)
    }

    /// All reminders owned by `owner_id`, in store order
    pub async fn list_by_owner(&self, owner_id: &str) -> Result<Vec<Reminder>, ReminderError> {
        let reminders = self
            .bounded(self.store.list(&ReminderQuery::owned_by(owner_id)))
            .await?;
        debug!("Listed {} reminder(s) for user {owner_id}", reminders.len());
        Ok(reminders)
    }

    /// Delete a reminder on behalf of its owner
    pub async fn delete_by_id(
        &self,
        id: i64,
        requesting_user_id: &str,
    ) -> Result<Reminder, ReminderError> {
        let reminder = self.fetch(id).await?;
        if reminder.owner_id != requesting_user_id {
            warn!(
                "User {requesting_user_id} tried to delete reminder #{id} owned by {}",
                reminder.owner_id
            );
            return Err(ReminderError::Forbidden { id });
        }

        if !self.bounded(self.store.delete(id)).await? {
            // Fired and removed between the lookup and the delete
            return Err(ReminderError::NotFound(id));
        }
        info!("🗑️ Deleted reminder #{id} for user {requesting_user_id}");
        Ok(reminder)
    }

    /// Read-through lookup by id
    pub async fn fetch(&self, id: i64) -> Result<Reminder, ReminderError> {
        Ok(self.bounded(self.store.get(id)).await?)
    }

    async fn bounded<T>(
        &self,
        op: impl Future<Output = Result<T, StoreError>>,
    ) -> Result<T, StoreError> {
        timeout(self.store_timeout, op)
            .await
            .map_err(|_| StoreError::Timeout)?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::reminders::error::ParseError;
    use crate::features::reminders::store::MemoryStore;
    use async_trait::async_trait;
    use chrono::Duration as ChronoDuration;

    fn manager_with(store: Arc<dyn ReminderStore>) -> ReminderManager {
        ReminderManager::new(
            store,
            TimeParser::new(chrono_tz::America::New_York),
            Duration::from_secs(5),
        )
    }

    fn request(who: &str, when: &str, message: &str) -> CreateReminder {
        CreateReminder {
            owner_id: "42".to_string(),
            who: who.to_string(),
            when: when.to_string(),
            message: message.to_string(),
            channel_id: "100".to_string(),
            context_id: Some("900".to_string()),
        }
    }

    #[tokio::test]
    async fn test_create_one_shot() {
        let store = Arc::new(MemoryStore::new());
        let manager = manager_with(store.clone());
        let now = Utc::now();

        let reminder = manager
            .create_at(request("@me, 7", "in 10m", "  standup  "), now)
            .await
            .unwrap();

        assert_eq!(reminder.owner_id, "42");
        assert_eq!(reminder.target_ids, vec!["42", "7"]);
        assert_eq!(reminder.message, "standup");
        assert!(!reminder.is_recurring());
        assert!(reminder.next_trigger_at.is_none());
        let expected = now + ChronoDuration::minutes(10);
        assert!((reminder.trigger_at - expected).num_seconds().abs() <= 1);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_create_recurring_sets_next_trigger() {
        let manager = manager_with(Arc::new(MemoryStore::new()));
        let reminder = manager
            .create_at(request("@me", "every 1h", "drink water"), Utc::now())
            .await
            .unwrap();
        assert!(reminder.is_recurring());
        assert_eq!(reminder.next_trigger_at, Some(reminder.trigger_at));
        assert_eq!(reminder.recurrence.unwrap().to_string(), "every 1 hour");
    }

    #[tokio::test]
    async fn test_create_fails_fast_without_persisting() {
        let store = Arc::new(MemoryStore::new());
        let manager = manager_with(store.clone());
        let now = Utc::now();

        let err = manager
            .create_at(request("bob", "25:00", "x"), now)
            .await
            .unwrap_err();
        // targets are resolved before the time is parsed
        assert!(matches!(err, ReminderError::InvalidWho(_)));

        let err = manager
            .create_at(request("@me", "8:99am", "x"), now)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ReminderError::InvalidWhen(ParseError::MinuteOutOfRange { .. })
        ));

        let err = manager
            .create_at(request("@me", "in 5m", "   "), now)
            .await
            .unwrap_err();
        assert!(matches!(err, ReminderError::EmptyMessage));
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_create_rejects_undeliverable_message() {
        let store = Arc::new(MemoryStore::new());
        let manager = manager_with(store.clone());
        let now = Utc::now();

        let err = manager
            .create_at(request("@me", "in 5m", &"x".repeat(2500)), now)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ReminderError::MessageTooLong { len: 2500, max: MAX_MESSAGE_CHARS }
        ));
        assert!(err.is_validation());
        assert!(store.is_empty());

        // The longest accepted text still fits a delivery with every footer
        let mut request = request("@me, 12345678901234567890", "every monday at 12:30pm", "");
        request.message = "x".repeat(MAX_MESSAGE_CHARS);
        let reminder = manager.create_at(request, now).await.unwrap();
        for target in &reminder.target_ids {
            let text = crate::features::reminders::delivery::format_delivery(&reminder, target);
            assert!(text.chars().count() <= crate::features::reminders::format::MESSAGE_LIMIT);
        }
    }

    #[tokio::test]
    async fn test_list_by_owner() {
        let manager = manager_with(Arc::new(MemoryStore::new()));
        let now = Utc::now();
        manager.create_at(request("@me", "in 5m", "a"), now).await.unwrap();
        manager.create_at(request("@me", "in 1h", "b"), now).await.unwrap();
        let mut other = request("@me", "in 1h", "c");
        other.owner_id = "99".to_string();
        manager.create_at(other, now).await.unwrap();

        let mine = manager.list_by_owner("42").await.unwrap();
        assert_eq!(mine.len(), 2);
        assert!(manager.list_by_owner("nobody").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_requires_owner() {
        let manager = manager_with(Arc::new(MemoryStore::new()));
        let reminder = manager
            .create_at(request("@me", "in 5m", "standup"), Utc::now())
            .await
            .unwrap();

        let err = manager.delete_by_id(reminder.id, "99").await.unwrap_err();
        assert!(matches!(err, ReminderError::Forbidden { .. }));
        assert_eq!(manager.fetch(reminder.id).await.unwrap(), reminder);
        assert_eq!(manager.list_by_owner("42").await.unwrap().len(), 1);

        let deleted = manager.delete_by_id(reminder.id, "42").await.unwrap();
        assert_eq!(deleted.id, reminder.id);
        assert!(matches!(
            manager.fetch(reminder.id).await,
            Err(ReminderError::NotFound(_))
        ));
        assert!(matches!(
            manager.delete_by_id(reminder.id, "42").await,
            Err(ReminderError::NotFound(_))
        ));
    }

    struct StalledStore;

    #[async_trait]
    impl ReminderStore for StalledStore {
        async fn create(&self, _reminder: NewReminder) -> Result<Reminder, StoreError> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Err(StoreError::Backend("unreachable".to_string()))
        }
        async fn get(&self, id: i64) -> Result<Reminder, StoreError> {
            Err(StoreError::NotFound(id))
        }
        async fn list(&self, _query: &ReminderQuery) -> Result<Vec<Reminder>, StoreError> {
            Err(StoreError::Backend("disk on fire".to_string()))
        }
        async fn delete(&self, _id: i64) -> Result<bool, StoreError> {
            Ok(false)
        }
        async fn claim(
            &self,
            _id: i64,
            _due_at: DateTime<Utc>,
            _now: DateTime<Utc>,
            _lease_until: DateTime<Utc>,
        ) -> Result<bool, StoreError> {
            Ok(false)
        }
        async fn complete(
            &self,
            _id: i64,
            _lease_until: DateTime<Utc>,
        ) -> Result<bool, StoreError> {
            Ok(false)
        }
        async fn reschedule(
            &self,
            _id: i64,
            _next_trigger_at: DateTime<Utc>,
            _lease_until: DateTime<Utc>,
        ) -> Result<bool, StoreError> {
            Ok(false)
        }
    }

    #[tokio::test]
    async fn test_store_failures_surface_as_storage_errors() {
        let manager = ReminderManager::new(
            Arc::new(StalledStore),
            TimeParser::new(chrono_tz::UTC),
            Duration::from_millis(50),
        );

        let err = manager
            .create_at(request("@me", "in 5m", "x"), Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, ReminderError::Storage(_)));

        let err = manager.list_by_owner("42").await.unwrap_err();
        assert!(matches!(err, ReminderError::Storage(_)));

        let err = manager.fetch(3).await.unwrap_err();
        assert!(matches!(err, ReminderError::NotFound(3)));
    }
}

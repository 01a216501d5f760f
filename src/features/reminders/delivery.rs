//! Outbound reminder delivery
//!
//! - **Version**: 1.0.0
//! - **Since**: 1.0.0

use anyhow::{Context as _, Result};
use async_trait::async_trait;
use serenity::http::Http;
use serenity::model::id::ChannelId;
use std::sync::Arc;

use super::model::Reminder;

/// Messaging platform seam used by the scheduler
#[async_trait]
pub trait Messenger: Send + Sync {
    async fn send_message(&self, channel_id: &str, text: &str) -> Result<()>;
}

/// Sends reminders through the Discord HTTP API
#[derive(Clone)]
pub struct DiscordMessenger {
    http: Arc<Http>,
}

impl DiscordMessenger {
    pub fn new(http: Arc<Http>) -> Self {
        Self { http }
    }
}

#[async_trait]
impl Messenger for DiscordMessenger {
    async fn send_message(&self, channel_id: &str, text: &str) -> Result<()> {
        let id: u64 = channel_id
            .parse()
            .with_context(|| format!("invalid channel id `{channel_id}`"))?;
        ChannelId(id).say(&self.http, text).await?;
        Ok(())
    }
}

/// Message text delivered to one target
pub fn format_delivery(reminder: &Reminder, target_id: &str) -> String {
    let mut text = format!("⏰ <@{target_id}> Reminder: {}", reminder.message);
    if reminder.owner_id != target_id {
        text.push_str(&format!("\n*Set by <@{}>*", reminder.owner_id));
    }
    if let Some(rule) = &reminder.recurrence {
        text.push_str(&format!("\n*Repeats {rule} · #{}*", reminder.id));
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::reminders::model::{IntervalUnit, NewReminder, RecurrenceRule};
    use chrono::Utc;

    fn reminder(recurrence: Option<RecurrenceRule>) -> Reminder {
        NewReminder {
            owner_id: "1".to_string(),
            target_ids: vec!["1".to_string(), "2".to_string()],
            message: "standup".to_string(),
            channel_id: "10".to_string(),
            context_id: None,
            trigger_at: Utc::now(),
            next_trigger_at: recurrence.as_ref().map(|_| Utc::now()),
            recurrence,
            created_at: Utc::now(),
        }
        .into_reminder(5)
    }

    #[test]
    fn test_format_delivery_for_owner() {
        let text = format_delivery(&reminder(None), "1");
        assert_eq!(text, "⏰ <@1> Reminder: standup");
    }

    #[test]
    fn test_format_delivery_for_other_target_names_owner() {
        let text = format_delivery(&reminder(None), "2");
        assert!(text.starts_with("⏰ <@2> Reminder: standup"));
        assert!(text.contains("Set by <@1>"));
    }

    #[test]
    fn test_format_delivery_recurring() {
        let rule = RecurrenceRule::Interval {
            every: 2,
            unit: IntervalUnit::Hours,
        };
        let text = format_delivery(&reminder(Some(rule)), "1");
        assert!(text.contains("Repeats every 2 hours · #5"));
    }
}

//! User-facing reminder text shared by the slash command and the LLM tools
//!
//! - **Version**: 1.0.0
//! - **Since**: 1.0.0

use chrono_tz::Tz;
use log::error;

use super::error::{ReminderError, WHEN_FORMATS, WHO_FORMATS};
use super::model::Reminder;

/// Discord message content limit
pub const MESSAGE_LIMIT: usize = 2000;

/// Translate an engine error into guidance for the user
pub fn describe_error(err: &ReminderError) -> String {
    match err {
        ReminderError::InvalidWhen(e) => format!("❌ {e}"),
        ReminderError::InvalidWho(e) => format!("❌ {e}"),
        ReminderError::EmptyMessage | ReminderError::MessageTooLong { .. } => format!("❌ {err}"),
        ReminderError::NotFound(id) => format!("❌ Could not find reminder #{id}."),
        ReminderError::Forbidden { .. } => "❌ You can only delete your own reminders.".to_string(),
        ReminderError::Storage(_) | ReminderError::Delivery { .. } => {
            error!("Reminder operation failed: {err}");
            "❌ Something went wrong. Please try again later.".to_string()
        }
    }
}

/// Short usage text listing both grammars
pub fn usage() -> String {
    format!("**who:** {WHO_FORMATS}\n**when:** {WHEN_FORMATS}")
}

/// Local wall-clock rendering of an instant, e.g. `Mon Mar 9, 9:30 AM EDT`
pub fn format_local(reminder: &Reminder, tz: Tz) -> String {
    reminder
        .due_at()
        .with_timezone(&tz)
        .format("%a %b %-d, %-I:%M %p %Z")
        .to_string()
}

fn format_targets(reminder: &Reminder) -> String {
    reminder
        .target_ids
        .iter()
        .map(|id| format!("<@{id}>"))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Cut `text` to at most `max` characters, marking the cut with `…`
fn clip(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let mut clipped: String = text.chars().take(max.saturating_sub(1)).collect();
    clipped.push('…');
    clipped
}

/// Confirmation after a reminder is created
///
/// The quoted message is shortened when the whole reply would not fit in
/// one Discord message.
pub fn format_created(reminder: &Reminder, tz: Tz) -> String {
    let schedule = match &reminder.recurrence {
        Some(rule) => format!("**{rule}**, starting **{}**", format_local(reminder, tz)),
        None => format!("on **{}**", format_local(reminder, tz)),
    };
    let head = format!("⏰ Got it! I'll remind {} {schedule} about:\n> ", format_targets(reminder));
    let tail = format!("\n\n*Reminder ID: #{}*", reminder.id);
    let room = MESSAGE_LIMIT.saturating_sub(head.chars().count() + tail.chars().count());
    format!("{head}{}{tail}", clip(&reminder.message, room))
}

/// One list entry
pub fn format_line(reminder: &Reminder, tz: Tz) -> String {
    let repeat = reminder
        .recurrence
        .as_ref()
        .map(|rule| format!(" 🔁 {rule}"))
        .unwrap_or_default();
    format!(
        "**#{}** - {}{repeat} → {}\n> {}",
        reminder.id,
        format_local(reminder, tz),
        format_targets(reminder),
        reminder.message
    )
}

/// Listing sorted by due time, clipped to the message limit
pub fn format_list(reminders: &[Reminder], tz: Tz) -> String {
    if reminders.is_empty() {
        return "📋 You don't have any pending reminders.\n\nUse `/remind add` to create one!"
            .to_string();
    }

    let mut sorted: Vec<&Reminder> = reminders.iter().collect();
    sorted.sort_by_key(|r| (r.due_at(), r.id));

    let footer = "*Use `/remind delete <id>` to cancel a reminder.*";
    let mut out = String::from("📋 **Your Pending Reminders:**\n\n");
    for (shown, reminder) in sorted.iter().enumerate() {
        let entry = format!("{}\n\n", format_line(reminder, tz));
        let remaining = sorted.len() - shown;
        let more = format!("*…and {remaining} more*\n");
        if out.len() + entry.len() + more.len() + footer.len() > MESSAGE_LIMIT {
            out.push_str(&more);
            break;
        }
        out.push_str(&entry);
    }
    out.push_str(footer);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::reminders::error::{ParseError, TargetError};
    use crate::features::reminders::model::{NewReminder, RecurrenceRule};
    use chrono::{DateTime, Utc};

    fn reminder(id: i64, due: &str, message: &str) -> Reminder {
        let due = DateTime::parse_from_rfc3339(due).unwrap().with_timezone(&Utc);
        NewReminder {
            owner_id: "42".to_string(),
            target_ids: vec!["42".to_string()],
            message: message.to_string(),
            channel_id: "100".to_string(),
            context_id: None,
            trigger_at: due,
            recurrence: None,
            next_trigger_at: None,
            created_at: due,
        }
        .into_reminder(id)
    }

    #[test]
    fn test_describe_error_texts() {
        assert_eq!(
            describe_error(&ReminderError::NotFound(4)),
            "❌ Could not find reminder #4."
        );
        assert_eq!(
            describe_error(&ReminderError::Forbidden { id: 4 }),
            "❌ You can only delete your own reminders."
        );
        assert!(describe_error(&ReminderError::Storage("boom".into())).contains("try again later"));

        let text = describe_error(&ParseError::Empty.into());
        assert!(text.contains("Supported formats"));
        let text = describe_error(&TargetError::NoTargets.into());
        assert!(text.contains("@me"));
    }

    #[test]
    fn test_format_local_uses_reference_zone() {
        let r = reminder(1, "2026-03-09T13:30:00Z", "standup");
        let text = format_local(&r, chrono_tz::America::New_York);
        assert_eq!(text, "Mon Mar 9, 9:30 AM EDT");
    }

    #[test]
    fn test_format_list_sorts_by_due_time() {
        let reminders = vec![
            reminder(1, "2026-03-10T13:30:00Z", "later"),
            reminder(2, "2026-03-09T13:30:00Z", "sooner"),
        ];
        let text = format_list(&reminders, chrono_tz::UTC);
        let sooner = text.find("sooner").unwrap();
        let later = text.find("later").unwrap();
        assert!(sooner < later);
        assert!(text.ends_with("cancel a reminder.*"));
    }

    #[test]
    fn test_format_list_clips_to_message_limit() {
        let long = "x".repeat(300);
        let reminders: Vec<Reminder> = (1..=20)
            .map(|i| reminder(i, "2026-03-10T13:30:00Z", &long))
            .collect();
        let text = format_list(&reminders, chrono_tz::UTC);
        assert!(text.len() <= MESSAGE_LIMIT);
        assert!(text.contains("more*"));
    }

    #[test]
    fn test_format_created_mentions_rule() {
        let mut r = reminder(3, "2026-03-09T13:30:00Z", "stretch");
        r.recurrence = Some(RecurrenceRule::Daily { hour: 9, minute: 30 });
        r.next_trigger_at = Some(r.trigger_at);
        let text = format_created(&r, chrono_tz::America::New_York);
        assert!(text.contains("every day at 9:30 AM"));
        assert!(text.contains("#3"));
        assert!(text.contains("<@42>"));
    }

    #[test]
    fn test_format_created_fits_one_message() {
        let mut r = reminder(8, "2026-03-09T13:30:00Z", &"y".repeat(1800));
        r.target_ids = (0..40).map(|i| format!("{}", 10_000_000_000_000_000u64 + i)).collect();
        let text = format_created(&r, chrono_tz::UTC);
        assert!(text.chars().count() <= MESSAGE_LIMIT);
        assert!(text.contains('…'));
        assert!(text.ends_with("*Reminder ID: #8*"));

        let short = format_created(&reminder(9, "2026-03-09T13:30:00Z", "tea"), chrono_tz::UTC);
        assert!(short.contains("> tea\n"));
    }

    #[test]
    fn test_storage_error_text_is_neutral() {
        assert_eq!(
            describe_error(&ReminderError::Storage("timeout".into())),
            "❌ Something went wrong. Please try again later."
        );
        let text = describe_error(&ReminderError::MessageTooLong { len: 2500, max: 1800 });
        assert!(text.starts_with("❌"));
        assert!(text.contains("1800"));
    }

    #[test]
    fn test_empty_list() {
        assert!(format_list(&[], chrono_tz::UTC).contains("don't have any"));
    }
}

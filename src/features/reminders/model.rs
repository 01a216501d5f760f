//! Reminder entity and recurrence rules
//!
//! - **Version**: 1.0.0
//! - **Since**: 1.0.0

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc, Weekday};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A scheduled message delivery, one-shot or recurring
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reminder {
    /// Store-assigned identifier
    pub id: i64,

    /// User who created the reminder
    pub owner_id: String,

    /// Recipients, de-duplicated in order of first mention
    pub target_ids: Vec<String>,

    pub message: String,

    /// Channel the reminder is delivered to
    pub channel_id: String,

    /// Guild the reminder was created in (None for DMs)
    pub context_id: Option<String>,

    /// First delivery instant
    pub trigger_at: DateTime<Utc>,

    /// Present iff the reminder repeats
    pub recurrence: Option<RecurrenceRule>,

    /// Next delivery instant for recurring reminders
    pub next_trigger_at: Option<DateTime<Utc>>,

    pub created_at: DateTime<Utc>,
}

impl Reminder {
    pub fn is_recurring(&self) -> bool {
        self.recurrence.is_some()
    }

    /// The instant the scheduler compares against
    pub fn due_at(&self) -> DateTime<Utc> {
        self.next_trigger_at.unwrap_or(self.trigger_at)
    }
}

/// A reminder that has not been persisted yet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewReminder {
    pub owner_id: String,
    pub target_ids: Vec<String>,
    pub message: String,
    pub channel_id: String,
    pub context_id: Option<String>,
    pub trigger_at: DateTime<Utc>,
    pub recurrence: Option<RecurrenceRule>,
    pub next_trigger_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl NewReminder {
    pub fn into_reminder(self, id: i64) -> Reminder {
        Reminder {
            id,
            owner_id: self.owner_id,
            target_ids: self.target_ids,
            message: self.message,
            channel_id: self.channel_id,
            context_id: self.context_id,
            trigger_at: self.trigger_at,
            recurrence: self.recurrence,
            next_trigger_at: self.next_trigger_at,
            created_at: self.created_at,
        }
    }
}

/// Unit of a fixed-period recurrence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IntervalUnit {
    Minutes,
    Hours,
    Days,
}

impl IntervalUnit {
    pub fn duration(self, count: u32) -> Duration {
        let count = i64::from(count);
        match self {
            IntervalUnit::Minutes => Duration::minutes(count),
            IntervalUnit::Hours => Duration::hours(count),
            IntervalUnit::Days => Duration::days(count),
        }
    }

    fn label(self, count: u32) -> &'static str {
        match (self, count == 1) {
            (IntervalUnit::Minutes, true) => "minute",
            (IntervalUnit::Minutes, false) => "minutes",
            (IntervalUnit::Hours, true) => "hour",
            (IntervalUnit::Hours, false) => "hours",
            (IntervalUnit::Days, true) => "day",
            (IntervalUnit::Days, false) => "days",
        }
    }
}

/// Normalized description of how a reminder repeats
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RecurrenceRule {
    /// Fixed period, e.g. every 5 minutes
    Interval { every: u32, unit: IntervalUnit },
    /// Every day at a wall-clock time
    Daily { hour: u32, minute: u32 },
    /// Every week on a weekday at a wall-clock time
    Weekly {
        weekday: Weekday,
        hour: u32,
        minute: u32,
    },
}

impl RecurrenceRule {
    /// First occurrence strictly after `now` on the grid anchored at `due`
    pub fn next_after(&self, due: DateTime<Utc>, now: DateTime<Utc>, tz: Tz) -> DateTime<Utc> {
        match *self {
            RecurrenceRule::Interval { every, unit } => {
                let step = unit.duration(every).num_seconds().max(60);
                let steps = if now > due {
                    (now - due).num_seconds() / step + 1
                } else {
                    1
                };
                due.checked_add_signed(Duration::seconds(step.saturating_mul(steps)))
                    .unwrap_or(DateTime::<Utc>::MAX_UTC)
            }
            RecurrenceRule::Daily { hour, minute } => step_local(due, now, tz, 1, hour, minute),
            RecurrenceRule::Weekly { hour, minute, .. } => {
                step_local(due, now, tz, 7, hour, minute)
            }
        }
    }
}

impl fmt::Display for RecurrenceRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            RecurrenceRule::Interval { every, unit } => {
                write!(f, "every {every} {}", unit.label(every))
            }
            RecurrenceRule::Daily { hour, minute } => {
                write!(f, "every day at {}", format_clock(hour, minute))
            }
            RecurrenceRule::Weekly {
                weekday,
                hour,
                minute,
            } => write!(
                f,
                "every {} at {}",
                weekday_name(weekday),
                format_clock(hour, minute)
            ),
        }
    }
}

/// Step the local date of `due` by `days` until the wall-clock time lands after `now`
fn step_local(
    due: DateTime<Utc>,
    now: DateTime<Utc>,
    tz: Tz,
    days: i64,
    hour: u32,
    minute: u32,
) -> DateTime<Utc> {
    let time = NaiveTime::from_hms_opt(hour, minute, 0).unwrap_or_default();
    let mut date: NaiveDate = due.with_timezone(&tz).date_naive();

    // Skip whole missed periods before walking
    let missed = (now - due).num_days();
    if missed > days {
        date += Duration::days((missed / days - 1) * days);
    }

    loop {
        date += Duration::days(days);
        let next = localize(tz, date.and_time(time));
        if next > now {
            return next;
        }
    }
}

/// Convert a wall-clock time in `tz` to UTC
///
/// Times inside a DST gap move forward one hour; ambiguous times take the earlier instant.
pub(crate) fn localize(tz: Tz, naive: NaiveDateTime) -> DateTime<Utc> {
    if let Some(dt) = tz.from_local_datetime(&naive).earliest() {
        return dt.with_timezone(&Utc);
    }
    let shifted = naive + Duration::hours(1);
    tz.from_local_datetime(&shifted)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|| Utc.from_utc_datetime(&naive))
}

/// Format a 24-hour time as `8:05 PM`
pub fn format_clock(hour: u32, minute: u32) -> String {
    let meridiem = if hour < 12 { "AM" } else { "PM" };
    let h12 = match hour % 12 {
        0 => 12,
        h => h,
    };
    format!("{h12}:{minute:02} {meridiem}")
}

pub fn weekday_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

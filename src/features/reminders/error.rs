//! Reminder error types
//!
//! - **Version**: 1.0.0
//! - **Since**: 1.0.0

use thiserror::Error;

/// Accepted "when" phrasings, appended to every parse failure
pub const WHEN_FORMATS: &str = "Supported formats: `in 10m`, `in 2h`, `in 1d`, `every 30m`, \
`8pm`, `3:30pm`, `20:00`, `at 8pm`, `today at 8pm`, `tomorrow at 9am`, `monday`, \
`next friday at 5:30pm`, `every day at 8am`, `every monday at 9:30am`";

/// Accepted "who" phrasings
pub const WHO_FORMATS: &str =
    "Use `@me`, a user mention, or a numeric user ID, separated by commas (e.g. `@me, <@123>`)";

/// Failure to understand a "when" expression
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("No time given. {}", WHEN_FORMATS)]
    Empty,

    #[error("Unknown time unit `{unit}` in `{input}`. Use m, h or d. {}", WHEN_FORMATS)]
    UnknownUnit { unit: String, input: String },

    #[error("`{quantity}` is not a positive whole number. {}", WHEN_FORMATS)]
    InvalidQuantity { quantity: String },

    #[error("Malformed time `{time}`, expected H:MM. {}", WHEN_FORMATS)]
    MalformedTime { time: String },

    #[error("Hour `{hour}` is out of range in `{time}`. {}", WHEN_FORMATS)]
    HourOutOfRange { hour: String, time: String },

    #[error("Minute `{minute}` is out of range in `{time}`. {}", WHEN_FORMATS)]
    MinuteOutOfRange { minute: String, time: String },

    #[error("Unrecognized day `{day}`. Use today, tomorrow or a weekday name. {}", WHEN_FORMATS)]
    UnknownWeekday { day: String },

    #[error("`{input}` has already passed today. Try `tomorrow at ...` instead.")]
    AlreadyPassed { input: String },

    #[error("Could not understand `{input}`. {}", WHEN_FORMATS)]
    Unrecognized { input: String },
}

/// Failure to resolve a "who" expression
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TargetError {
    #[error("Invalid recipient `{token}`. {}", WHO_FORMATS)]
    InvalidTarget { token: String },

    #[error("No recipients given. {}", WHO_FORMATS)]
    NoTargets,
}

/// Errors raised by a [`ReminderStore`](super::store::ReminderStore)
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("reminder #{0} not found")]
    NotFound(i64),

    #[error("store operation timed out")]
    Timeout,

    #[error("store backend error: {0}")]
    Backend(String),
}

impl From<sqlite::Error> for StoreError {
    fn from(e: sqlite::Error) -> Self {
        StoreError::Backend(e.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Backend(format!("corrupt record: {e}"))
    }
}

/// Top-level reminder engine error
#[derive(Debug, Error)]
pub enum ReminderError {
    #[error(transparent)]
    InvalidWhen(#[from] ParseError),

    #[error(transparent)]
    InvalidWho(#[from] TargetError),

    #[error("The reminder message can't be empty.")]
    EmptyMessage,

    #[error("The reminder message is {len} characters long; the limit is {max}.")]
    MessageTooLong { len: usize, max: usize },

    #[error("reminder #{0} not found")]
    NotFound(i64),

    #[error("reminder #{id} belongs to another user")]
    Forbidden { id: i64 },

    #[error("storage error: {0}")]
    Storage(String),

    #[error("delivery to {target} failed: {reason}")]
    Delivery { target: String, reason: String },
}

impl ReminderError {
    /// User-correctable input problem, never retried
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            ReminderError::InvalidWhen(_)
                | ReminderError::InvalidWho(_)
                | ReminderError::EmptyMessage
                | ReminderError::MessageTooLong { .. }
        )
    }
}

impl From<StoreError> for ReminderError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(id) => ReminderError::NotFound(id),
            other => ReminderError::Storage(other.to_string()),
        }
    }
}

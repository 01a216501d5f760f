//! # Reminders Feature
//!
//! Natural-language reminders: free-text "who" and "when" are resolved into
//! recipients and trigger times, persisted through a [`ReminderStore`], and
//! delivered by a periodic [`ReminderScheduler`] sweep.
//!
//! - **Version**: 2.0.0
//! - **Since**: 0.1.0
//! - **Toggleable**: false
//!
//! ## Changelog
//! - 2.0.0: Natural-language "when" grammar, recurring reminders, multi-target
//!   delivery, store-backed claims and LLM tool bridge
//! - 1.0.0: Initial release with duration-only reminders

pub mod delivery;
pub mod error;
pub mod format;
pub mod manager;
pub mod model;
pub mod scheduler;
pub mod store;
pub mod targets;
pub mod time_parser;
pub mod tools;

pub use delivery::{DiscordMessenger, Messenger};
pub use error::{ParseError, ReminderError, StoreError, TargetError};
pub use manager::{CreateReminder, ReminderManager, MAX_MESSAGE_CHARS};
pub use model::{IntervalUnit, NewReminder, RecurrenceRule, Reminder};
pub use scheduler::{ReminderScheduler, SchedulerSettings, SweepReport};
pub use store::{MemoryStore, ReminderQuery, ReminderStore};
pub use targets::resolve_targets;
pub use time_parser::{ParsedSchedule, TimeParser};
pub use tools::{ReminderTools, ToolCaller, ToolOutcome};

//! # Features
//!
//! Self-contained bot features. Each feature exposes its public surface
//! through re-exports here.

pub mod reminders;

pub use reminders::{
    CreateReminder, DiscordMessenger, MemoryStore, Messenger, Reminder, ReminderError,
    ReminderManager, ReminderScheduler, ReminderStore, ReminderTools, SchedulerSettings,
    TimeParser,
};

// Core layer - shared configuration
pub mod core;

// Features layer - reminder engine
pub mod features;

// Infrastructure - SQLite reminder store
pub mod database;

// Application layer - slash command handling
pub mod commands;

pub use core::Config;

pub use features::reminders::{
    CreateReminder, DiscordMessenger, MemoryStore, Messenger, ReminderManager, ReminderScheduler,
    ReminderStore, ReminderTools, TimeParser,
};

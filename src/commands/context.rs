//! Shared context for command handlers
//!
//! - **Version**: 2.0.0
//! - **Since**: 3.38.0
//!
//! ## Changelog
//! - 2.0.0: Reminder manager replaces persona, database and usage services;
//!   uptime tracking removed
//! - 1.0.0: Initial implementation with core shared state

use crate::features::reminders::ReminderManager;

/// Shared context for all command handlers
///
/// Holds the ReminderManager that drives the reminder lifecycle.
#[derive(Clone)]
pub struct CommandContext {
    pub reminders: ReminderManager,
}

impl CommandContext {
    /// Create a new CommandContext with the given services
    pub fn new(reminders: ReminderManager) -> Self {
        Self { reminders }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::reminders::{MemoryStore, TimeParser};
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn test_command_context_clone() {
        // CommandContext should be Clone for sharing across handlers
        fn assert_clone<T: Clone>() {}
        assert_clone::<CommandContext>();
    }

    #[test]
    fn test_command_context_shares_store() {
        let store = Arc::new(MemoryStore::new());
        let manager = ReminderManager::new(
            store,
            TimeParser::new(chrono_tz::UTC),
            Duration::from_secs(1),
        );
        let ctx = CommandContext::new(manager);
        let copy = ctx.clone();
        assert!(Arc::ptr_eq(&ctx.reminders.store(), &copy.reminders.store()));
    }
}

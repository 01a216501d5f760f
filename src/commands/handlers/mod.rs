//! Per-command handler implementations
//!
//! - **Version**: 3.0.0
//! - **Since**: 3.38.0
//!
//! ## Changelog
//! - 3.0.0: RemindHandler drives the reminder engine through /remind subcommands
//! - 1.0.0: Initial extraction from monolithic command_handler.rs

pub mod remind;

use std::sync::Arc;

use super::handler::SlashCommandHandler;

pub use remind::{RemindAction, RemindHandler, ReminderCommand};

/// Create all registered command handlers
///
/// Returns a vector of handlers ready to be registered with CommandRegistry.
pub fn create_all_handlers() -> Vec<Arc<dyn SlashCommandHandler>> {
    vec![Arc::new(remind::RemindHandler)]
}

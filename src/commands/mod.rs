//! # Command System
//!
//! Slash command (/) handling for Discord interactions.
//!
//! - **Version**: 3.0.0
//! - **Since**: 0.2.0
//! - **Toggleable**: false
//!
//! ## Changelog
//! - 3.0.0: /remind is the only command; monolithic CommandHandler removed
//! - 2.1.0: Add modular handler infrastructure (handler trait, context, registry)
//! - 2.0.0: Remove bang commands, slash-only command system
//! - 1.0.0: Initial reorganization with modular command structure

pub mod context;
pub mod handler;
pub mod handlers;
pub mod registry;
pub mod slash;

// Re-export handler infrastructure
pub use context::CommandContext;
pub use handler::SlashCommandHandler;
pub use handlers::{create_all_handlers, RemindAction, RemindHandler, ReminderCommand};
pub use registry::CommandRegistry;

// Re-export commonly used items from submodules
pub use slash::{
    create_slash_commands, get_integer_option, get_string_option, get_subcommand,
    register_global_commands, register_guild_commands,
};

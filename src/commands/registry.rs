//! Command handler registry
//!
//! - **Version**: 1.1.0
//! - **Since**: 3.38.0
//!
//! ## Changelog
//! - 1.1.0: Build from the handler set with `with_handlers`; lookup is `get` only
//! - 1.0.0: Initial implementation for handler dispatch

use std::collections::HashMap;
use std::sync::Arc;

use super::handler::SlashCommandHandler;

/// Registry mapping command names to handlers
///
/// The registry allows handlers to be registered and looked up by command name.
/// Multiple command names can map to the same handler if they share logic.
///
/// # Example
///
/// ```ignore
/// let registry = CommandRegistry::with_handlers(create_all_handlers());
///
/// if let Some(handler) = registry.get("remind") {
///     handler.handle(ctx, serenity_ctx, command).await?;
/// }
/// ```
#[derive(Clone)]
pub struct CommandRegistry {
    handlers: HashMap<&'static str, Arc<dyn SlashCommandHandler>>,
}

impl CommandRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Create a registry holding every handler in `handlers`
    pub fn with_handlers(handlers: Vec<Arc<dyn SlashCommandHandler>>) -> Self {
        let mut registry = Self::new();
        for handler in handlers {
            registry.register(handler);
        }
        registry
    }

    /// Register a handler for its declared command names
    ///
    /// The handler is registered for all names returned by `command_names()`.
    pub fn register(&mut self, handler: Arc<dyn SlashCommandHandler>) {
        for name in handler.command_names() {
            self.handlers.insert(name, Arc::clone(&handler));
        }
    }

    /// Get handler for a command name
    ///
    /// Returns None if no handler is registered for the given name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn SlashCommandHandler>> {
        self.handlers.get(name).cloned()
    }
}

impl Default for CommandRegistry {
    fn default() -> Self {
        Self::new()
    }
}

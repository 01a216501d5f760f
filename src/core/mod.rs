//! # Core Module
//!
//! Configuration shared by the bot binary and the reminder engine.
//!
//! - **Version**: 2.0.0
//! - **Since**: 0.7.0
//! - **Toggleable**: false
//!
//! ## Changelog
//! - 2.0.0: Reminder store, timezone and sweep settings
//! - 1.0.0: Initial creation with config module

pub mod config;

pub use config::{Config, StoreBackend};

//! Bot configuration
//!
//! Reads the Discord credentials, store backend, reminder timezone and
//! scheduler timings from the environment (`.env` via dotenvy).
//!
//! - **Version**: 2.0.0
//! - **Since**: 0.1.0
//!
//! ## Changelog
//! - 2.0.0: Reminder store backend, timezone and scheduler settings
//! - 1.0.0: Discord token, guild ID, database path and log level

use anyhow::{Context as _, Result};
use chrono_tz::Tz;
use std::env;
use std::time::Duration;

use crate::features::reminders::SchedulerSettings;

/// Which reminder store backs the bot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Sqlite,
    Memory,
}

impl std::str::FromStr for StoreBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sqlite" => Ok(StoreBackend::Sqlite),
            "memory" => Ok(StoreBackend::Memory),
            other => anyhow::bail!("unknown REMINDER_STORE `{other}` (expected sqlite or memory)"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub discord_token: String,
    pub discord_guild_id: Option<String>,
    pub database_path: String,
    pub store_backend: StoreBackend,
    pub timezone: Tz,
    pub sweep_interval: Duration,
    pub claim_lease: Duration,
    pub store_timeout: Duration,
    pub delivery_timeout: Duration,
    pub log_level: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let discord_token = lookup("DISCORD_TOKEN")
            .filter(|t| !t.trim().is_empty())
            .context("DISCORD_TOKEN environment variable not set")?;

        let discord_guild_id = lookup("DISCORD_GUILD_ID").filter(|id| !id.trim().is_empty());

        let database_path =
            lookup("DATABASE_PATH").unwrap_or_else(|| "reminders.db".to_string());

        let store_backend = match lookup("REMINDER_STORE") {
            Some(value) => value.parse()?,
            None => StoreBackend::Sqlite,
        };

        let timezone_name =
            lookup("REMINDER_TIMEZONE").unwrap_or_else(|| "America/New_York".to_string());
        let timezone: Tz = timezone_name
            .parse()
            .map_err(|e| anyhow::anyhow!("invalid REMINDER_TIMEZONE `{timezone_name}`: {e}"))?;

        let seconds = |key: &str, default: u64| -> Result<Duration> {
            match lookup(key) {
                Some(value) => {
                    let secs: u64 = value
                        .trim()
                        .parse()
                        .with_context(|| format!("{key} must be a whole number of seconds"))?;
                    anyhow::ensure!(secs > 0, "{key} must be greater than zero");
                    Ok(Duration::from_secs(secs))
                }
                None => Ok(Duration::from_secs(default)),
            }
        };

        Ok(Config {
            discord_token,
            discord_guild_id,
            database_path,
            store_backend,
            timezone,
            sweep_interval: seconds("REMINDER_SWEEP_SECONDS", 30)?,
            claim_lease: seconds("REMINDER_CLAIM_LEASE_SECONDS", 120)?,
            store_timeout: seconds("STORE_TIMEOUT_SECONDS", 10)?,
            delivery_timeout: seconds("DELIVERY_TIMEOUT_SECONDS", 10)?,
            log_level: lookup("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
        })
    }

    pub fn scheduler_settings(&self) -> SchedulerSettings {
        SchedulerSettings {
            sweep_interval: self.sweep_interval,
            claim_lease: self.claim_lease,
            store_timeout: self.store_timeout,
            delivery_timeout: self.delivery_timeout,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup(&[("DISCORD_TOKEN", "abc")])).unwrap();
        assert_eq!(config.database_path, "reminders.db");
        assert_eq!(config.store_backend, StoreBackend::Sqlite);
        assert_eq!(config.timezone, chrono_tz::America::New_York);
        assert_eq!(config.sweep_interval, Duration::from_secs(30));
        assert_eq!(config.claim_lease, Duration::from_secs(120));
        assert_eq!(config.log_level, "info");
        assert!(config.discord_guild_id.is_none());
    }

    #[test]
    fn test_missing_token() {
        assert!(Config::from_lookup(lookup(&[])).is_err());
        assert!(Config::from_lookup(lookup(&[("DISCORD_TOKEN", "  ")])).is_err());
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_lookup(lookup(&[
            ("DISCORD_TOKEN", "abc"),
            ("DISCORD_GUILD_ID", "123"),
            ("REMINDER_STORE", "Memory"),
            ("REMINDER_TIMEZONE", "Europe/Berlin"),
            ("REMINDER_SWEEP_SECONDS", "5"),
        ]))
        .unwrap();
        assert_eq!(config.discord_guild_id.as_deref(), Some("123"));
        assert_eq!(config.store_backend, StoreBackend::Memory);
        assert_eq!(config.timezone, chrono_tz::Europe::Berlin);
        assert_eq!(config.scheduler_settings().sweep_interval, Duration::from_secs(5));
    }

    #[test]
    fn test_invalid_values() {
        let bad_zone = lookup(&[("DISCORD_TOKEN", "abc"), ("REMINDER_TIMEZONE", "Mars/Olympus")]);
        assert!(Config::from_lookup(bad_zone).is_err());

        let zero = lookup(&[("DISCORD_TOKEN", "abc"), ("REMINDER_SWEEP_SECONDS", "0")]);
        assert!(Config::from_lookup(zero).is_err());

        let backend = lookup(&[("DISCORD_TOKEN", "abc"), ("REMINDER_STORE", "redis")]);
        assert!(Config::from_lookup(backend).is_err());
    }
}

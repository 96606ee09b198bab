//! Configuration for the query facade.
//!
//! Loads from `READMODEL_*` environment variables (after an optional `.env`
//! file) with defaults for everything:
//!
//! | variable                              | default | meaning |
//! |---------------------------------------|---------|---------|
//! | `READMODEL_FETCH_TIMEOUT_MS`          | `5000`  | deadline for requests that bring none |
//! | `READMODEL_CONSISTENCY_WINDOW_MS`     | unset   | consistency window handed to every fetch |
//! | `READMODEL_AWAIT_OPEN_TRANSACTIONS`   | `true`  | quota reads wait for in-flight writes |
//! | `READMODEL_SYSTEM_USERS`              | empty   | `instance=user,user;instance=user` |
//! | `READMODEL_LOG_FILTER`                | `RUST_LOG`, else `info` | tracing filter |

use readmodel_milestones::SystemUsers;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::env;
use std::time::Duration;
use thiserror::Error;

/// Default deadline for requests that bring none.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(5);

/// Configuration errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A variable is set but cannot be parsed.
    #[error("Invalid value for {key}: {value:?}")]
    Invalid {
        /// Variable name
        key: String,
        /// Offending value
        value: String,
    },
}

/// Query facade configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryConfig {
    /// Deadline applied to requests whose context has none.
    pub fetch_timeout: Duration,
    /// Consistency window applied to requests whose context has none.
    pub consistency_window: Option<Duration>,
    /// Whether quota notification reads wait for open write transactions.
    pub await_open_transactions: bool,
    /// Known system and machine users per instance id.
    pub system_users: BTreeMap<String, Vec<String>>,
    /// Tracing filter directive.
    pub log_filter: String,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
            consistency_window: None,
            await_open_transactions: true,
            system_users: BTreeMap::new(),
            log_filter: "info".to_string(),
        }
    }
}

impl QueryConfig {
    /// Load from the process environment, reading `.env` first if present.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if a variable is set to an unparsable value.
    pub fn from_env() -> Result<Self, ConfigError> {
        // A missing .env file is normal.
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load through `lookup`, which maps a variable name to its value.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if a variable is set to an unparsable value.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Ok(Self {
            fetch_timeout: parse_millis(&lookup, "READMODEL_FETCH_TIMEOUT_MS")?
                .unwrap_or(defaults.fetch_timeout),
            consistency_window: parse_millis(&lookup, "READMODEL_CONSISTENCY_WINDOW_MS")?,
            await_open_transactions: parse_bool(&lookup, "READMODEL_AWAIT_OPEN_TRANSACTIONS")?
                .unwrap_or(defaults.await_open_transactions),
            system_users: lookup("READMODEL_SYSTEM_USERS")
                .map(|value| parse_system_users("READMODEL_SYSTEM_USERS", &value))
                .transpose()?
                .unwrap_or_default(),
            log_filter: lookup("READMODEL_LOG_FILTER")
                .or_else(|| lookup("RUST_LOG"))
                .unwrap_or(defaults.log_filter),
        })
    }

    /// Set the fetch timeout.
    #[must_use]
    pub const fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    /// Set the consistency window.
    #[must_use]
    pub const fn with_consistency_window(mut self, window: Duration) -> Self {
        self.consistency_window = Some(window);
        self
    }

    /// Enable or disable waiting for open transactions on quota reads.
    #[must_use]
    pub const fn with_await_open_transactions(mut self, enabled: bool) -> Self {
        self.await_open_transactions = enabled;
        self
    }

    /// Register a system user for an instance.
    #[must_use]
    pub fn with_system_user(mut self, instance_id: impl Into<String>, user_id: impl Into<String>) -> Self {
        self.system_users
            .entry(instance_id.into())
            .or_default()
            .push(user_id.into());
        self
    }

    /// System users of `instance_id`, sentinels included.
    #[must_use]
    pub fn system_users_for(&self, instance_id: &str) -> SystemUsers {
        self.system_users
            .get(instance_id)
            .map(|ids| ids.iter().map(String::as_str).collect())
            .unwrap_or_default()
    }
}

fn invalid(key: &str, value: &str) -> ConfigError {
    ConfigError::Invalid {
        key: key.to_string(),
        value: value.to_string(),
    }
}

fn parse_millis<F>(lookup: &F, key: &str) -> Result<Option<Duration>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|value| {
            value
                .trim()
                .parse::<u64>()
                .map(Duration::from_millis)
                .map_err(|_| invalid(key, &value))
        })
        .transpose()
}

fn parse_bool<F>(lookup: &F, key: &str) -> Result<Option<bool>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|value| match value.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" => Ok(true),
            "false" | "0" | "no" => Ok(false),
            _ => Err(invalid(key, &value)),
        })
        .transpose()
}

fn parse_system_users(key: &str, value: &str) -> Result<BTreeMap<String, Vec<String>>, ConfigError> {
    let mut users = BTreeMap::new();
    for entry in value.split(';').map(str::trim).filter(|entry| !entry.is_empty()) {
        let Some((instance_id, ids)) = entry.split_once('=') else {
            return Err(invalid(key, value));
        };
        let instance_id = instance_id.trim();
        if instance_id.is_empty() {
            return Err(invalid(key, value));
        }
        let ids: Vec<String> = ids
            .split(',')
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(str::to_string)
            .collect();
        users.insert(instance_id.to_string(), ids);
    }
    Ok(users)
}

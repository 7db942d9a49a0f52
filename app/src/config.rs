//! Configuration management for EventHub.
//!
//! Loads configuration from environment variables with sensible defaults.
//! The bootstrap binary loads `.env` first via `dotenvy`.

use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::telemetry::DEFAULT_FILTER;

/// Default number of items on public listings.
pub const DEFAULT_ITEMS_PER_PAGE: u32 = 10;

/// Default number of items on admin listings.
pub const DEFAULT_ADMIN_ITEMS_PER_PAGE: u32 = 20;

/// Errors raised while reading configuration.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A required variable is not set.
    #[error("missing required environment variable {0}")]
    Missing(&'static str),

    /// A variable is set but cannot be parsed.
    #[error("invalid value for {var}: {value:?}")]
    Invalid {
        /// Variable name
        var: &'static str,
        /// Raw value that failed to parse
        value: String,
    },

    /// Only some of the bootstrap admin variables are set.
    #[error("ADMIN_USERNAME, ADMIN_EMAIL and ADMIN_PASSWORD must be set together")]
    IncompleteAdmin,
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// `PostgreSQL` configuration
    pub database: DatabaseConfig,
    /// Listing and logging settings
    pub app: AppConfig,
    /// Account created by `eventhub-bootstrap` when absent
    pub admin: Option<AdminSeed>,
}

/// `PostgreSQL` configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// `PostgreSQL` connection URL
    pub url: String,
    /// Maximum number of connections in the pool
    pub max_connections: u32,
    /// Minimum number of idle connections in the pool
    pub min_connections: u32,
    /// Connection timeout in seconds
    pub connect_timeout: u64,
}

/// Application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Page size for public event listings
    pub items_per_page: u32,
    /// Page size for admin listings
    pub admin_items_per_page: u32,
    /// `tracing` filter directives, from `RUST_LOG`
    pub log_level: String,
}

/// Credentials for the first admin account.
#[derive(Clone, Serialize, Deserialize)]
pub struct AdminSeed {
    /// Admin username
    pub username: String,
    /// Admin email
    pub email: String,
    /// Plaintext password, hashed on creation
    #[serde(skip_serializing)]
    pub password: String,
}

impl fmt::Debug for AdminSeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdminSeed")
            .field("username", &self.username)
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl Config {
    /// Load configuration from the process environment.
    ///
    /// # Errors
    ///
    /// See [`Config::from_lookup`].
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through `lookup`, which maps a variable name to
    /// its value.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::Missing`] if `DATABASE_URL` is unset
    /// - [`ConfigError::Invalid`] if a numeric variable does not parse or a
    ///   page size is zero
    /// - [`ConfigError::IncompleteAdmin`] if the admin variables are only
    ///   partly set
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let database = DatabaseConfig {
            url: lookup("DATABASE_URL")
                .filter(|url| !url.trim().is_empty())
                .ok_or(ConfigError::Missing("DATABASE_URL"))?,
            max_connections: parse_or(&lookup, "DATABASE_MAX_CONNECTIONS", 10)?,
            min_connections: parse_or(&lookup, "DATABASE_MIN_CONNECTIONS", 2)?,
            connect_timeout: parse_or(&lookup, "DATABASE_CONNECT_TIMEOUT", 30)?,
        };

        let app = AppConfig {
            items_per_page: page_size(&lookup, "ITEMS_PER_PAGE", DEFAULT_ITEMS_PER_PAGE)?,
            admin_items_per_page: page_size(
                &lookup,
                "ADMIN_ITEMS_PER_PAGE",
                DEFAULT_ADMIN_ITEMS_PER_PAGE,
            )?,
            log_level: lookup("RUST_LOG").unwrap_or_else(|| DEFAULT_FILTER.to_string()),
        };

        let admin = match (
            lookup("ADMIN_USERNAME"),
            lookup("ADMIN_EMAIL"),
            lookup("ADMIN_PASSWORD"),
        ) {
            (Some(username), Some(email), Some(password)) => Some(AdminSeed {
                username,
                email,
                password,
            }),
            (None, None, None) => None,
            _ => return Err(ConfigError::IncompleteAdmin),
        };

        Ok(Self {
            database,
            app,
            admin,
        })
    }
}

fn parse_or<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match lookup(var) {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { var, value }),
    }
}

fn page_size(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
    default: u32,
) -> Result<u32, ConfigError> {
    match parse_or(lookup, var, default)? {
        0 => Err(ConfigError::Invalid {
            var,
            value: "0".to_string(),
        }),
        size => Ok(size),
    }
}

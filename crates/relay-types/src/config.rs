//! Configuration types for the relay.
//!
//! `RelayConfig` represents the top-level `config.toml`. Every field has a
//! default except the PostgreSQL connection parameters, which must all be
//! present when that backend is selected.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Top-level relay configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RelayConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub hub: HubConfig,

    #[serde(default)]
    pub database: DatabaseConfig,
}

impl RelayConfig {
    /// Reject configurations that would start a broken relay.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.hub.delivery_capacity == 0 {
            return Err(ConfigError::Invalid(
                "hub.delivery_capacity must be greater than zero".to_string(),
            ));
        }
        if self.hub.outbound_capacity == 0 {
            return Err(ConfigError::Invalid(
                "hub.outbound_capacity must be greater than zero".to_string(),
            ));
        }
        if let DatabaseConfig::Postgres(pg) = &self.database {
            pg.validate()?;
        }
        Ok(())
    }
}

/// Listener address.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Queue sizes and store timeout for the hub.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HubConfig {
    /// Capacity of the single delivery queue feeding the broadcast loop.
    /// When full, `Hub::receive` waits for space.
    #[serde(default = "default_delivery_capacity")]
    pub delivery_capacity: usize,

    /// Capacity of each connection's outbound queue. A connection whose
    /// queue is full when a broadcast arrives is dropped.
    #[serde(default = "default_outbound_capacity")]
    pub outbound_capacity: usize,

    /// Upper bound on a single `save` call, in milliseconds.
    #[serde(default = "default_save_timeout_ms")]
    pub save_timeout_ms: u64,
}

fn default_delivery_capacity() -> usize {
    1024
}

fn default_outbound_capacity() -> usize {
    256
}

fn default_save_timeout_ms() -> u64 {
    5_000
}

impl HubConfig {
    pub fn save_timeout(&self) -> Duration {
        Duration::from_millis(self.save_timeout_ms)
    }
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            delivery_capacity: default_delivery_capacity(),
            outbound_capacity: default_outbound_capacity(),
            save_timeout_ms: default_save_timeout_ms(),
        }
    }
}

/// Storage backend selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "snake_case")]
pub enum DatabaseConfig {
    /// Embedded SQLite file. `path` defaults to `<data_dir>/relay.db`.
    Sqlite {
        #[serde(default)]
        path: Option<PathBuf>,
    },
    /// External PostgreSQL server.
    Postgres(PostgresSettings),
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        DatabaseConfig::Sqlite { path: None }
    }
}

/// PostgreSQL connection parameters. All five are required.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct PostgresSettings {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub name: String,
}

impl PostgresSettings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.host.is_empty() {
            return Err(ConfigError::MissingParameter("database.host"));
        }
        if self.user.is_empty() {
            return Err(ConfigError::MissingParameter("database.user"));
        }
        if self.name.is_empty() {
            return Err(ConfigError::MissingParameter("database.name"));
        }
        if self.port == 0 {
            return Err(ConfigError::Invalid("database.port must be non-zero".to_string()));
        }
        Ok(())
    }
}

impl fmt::Debug for PostgresSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PostgresSettings")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("name", &self.name)
            .finish()
    }
}

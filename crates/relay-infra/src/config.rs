//! Configuration loader for the relay.
//!
//! Reads `config.toml`, overlays the `DB_*` environment variables, and
//! validates the result. Every failure here is fatal: the relay refuses to
//! start with a partial configuration.

use std::path::{Path, PathBuf};

use relay_types::config::{DatabaseConfig, PostgresSettings, RelayConfig};
use relay_types::error::ConfigError;

/// Environment variables that select and configure the PostgreSQL backend.
pub const DB_HOST: &str = "DB_HOST";
pub const DB_PORT: &str = "DB_PORT";
pub const DB_USER: &str = "DB_USER";
pub const DB_PASSWORD: &str = "DB_PASSWORD";
pub const DB_NAME: &str = "DB_NAME";

const DB_VARS: [&str; 5] = [DB_HOST, DB_PORT, DB_USER, DB_PASSWORD, DB_NAME];

/// Resolve the data directory.
///
/// Uses `RELAY_DATA_DIR` when set, otherwise `~/.relay`.
pub fn resolve_data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("RELAY_DATA_DIR") {
        return PathBuf::from(dir);
    }

    if let Some(home) = dirs::home_dir() {
        return home.join(".relay");
    }

    PathBuf::from(".relay")
}

/// Load, overlay, and validate the relay configuration.
///
/// See [`read_config_file`] for file handling and [`apply_env_overrides`]
/// for the environment overlay.
pub async fn load_config(explicit: Option<&Path>, data_dir: &Path) -> Result<RelayConfig, ConfigError> {
    let config = read_config_file(explicit, data_dir).await?;
    let config = apply_env_overrides(config, |key| std::env::var(key).ok())?;
    config.validate()?;
    Ok(config)
}

/// Read the TOML configuration file.
///
/// - An `explicit` path must exist and parse.
/// - Otherwise `{data_dir}/config.toml` is used if present; when it is
///   absent the defaults apply. A present but malformed file is an error.
pub async fn read_config_file(explicit: Option<&Path>, data_dir: &Path) -> Result<RelayConfig, ConfigError> {
    let (config_path, required) = match explicit {
        Some(path) => (path.to_path_buf(), true),
        None => (data_dir.join("config.toml"), false),
    };

    let content = match tokio::fs::read_to_string(&config_path).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound && !required => {
            tracing::debug!("No config.toml found at {}, using defaults", config_path.display());
            return Ok(RelayConfig::default());
        }
        Err(err) => {
            return Err(ConfigError::Read {
                path: config_path.display().to_string(),
                reason: err.to_string(),
            });
        }
    };

    toml::from_str::<RelayConfig>(&content).map_err(|err| ConfigError::Parse {
        path: config_path.display().to_string(),
        reason: err.to_string(),
    })
}

/// Overlay the `DB_*` variables onto `config`.
///
/// When none is set the configuration is returned unchanged. When any is
/// set the backend becomes PostgreSQL and all five parameters are required;
/// each one falls back to the file's PostgreSQL settings if it had any.
/// Empty values count as unset, except `DB_PASSWORD`, where an empty value
/// is an empty password (e.g. `trust` authentication).
pub fn apply_env_overrides<F>(mut config: RelayConfig, lookup: F) -> Result<RelayConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let var = |key: &str| lookup(key).filter(|value| !value.is_empty());

    if DB_VARS.into_iter().all(|key| var(key).is_none()) {
        return Ok(config);
    }

    let base = match &config.database {
        DatabaseConfig::Postgres(settings) => Some(settings.clone()),
        DatabaseConfig::Sqlite { .. } => None,
    };

    let pick = |key: &'static str, current: Option<String>| {
        var(key).or(current).ok_or(ConfigError::MissingParameter(key))
    };

    let port = match var(DB_PORT) {
        Some(raw) => raw
            .parse::<u16>()
            .map_err(|_| ConfigError::Invalid(format!("{DB_PORT} must be a port number, got '{raw}'")))?,
        None => base
            .as_ref()
            .map(|b| b.port)
            .ok_or(ConfigError::MissingParameter(DB_PORT))?,
    };

    let settings = PostgresSettings {
        host: pick(DB_HOST, base.as_ref().map(|b| b.host.clone()))?,
        port,
        user: pick(DB_USER, base.as_ref().map(|b| b.user.clone()))?,
        password: lookup(DB_PASSWORD)
            .or(base.as_ref().map(|b| b.password.clone()))
            .ok_or(ConfigError::MissingParameter(DB_PASSWORD))?,
        name: pick(DB_NAME, base.as_ref().map(|b| b.name.clone()))?,
    };

    config.database = DatabaseConfig::Postgres(settings);
    Ok(config)
}

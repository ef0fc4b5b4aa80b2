//! Runtime-selected message store.
//!
//! The backend is chosen by configuration at startup, so the application
//! state is pinned to this enum rather than to one concrete store.

use std::path::{Path, PathBuf};

use relay_core::store::MessageStore;
use relay_types::config::DatabaseConfig;
use relay_types::error::RepositoryError;
use relay_types::message::{Message, MessageId};

use crate::postgres::PgMessageStore;
use crate::sqlite::message::SqliteMessageStore;
use crate::sqlite::pool::DatabasePool;

/// Default SQLite file name inside the data directory.
pub const DEFAULT_DATABASE_FILE: &str = "relay.db";

/// The configured message store.
pub enum DatabaseStore {
    Sqlite(SqliteMessageStore),
    Postgres(PgMessageStore),
}

impl DatabaseStore {
    /// Connect to the configured backend, running migrations.
    ///
    /// A relative or missing SQLite path is resolved against `data_dir`,
    /// which is created if needed.
    pub async fn open(config: &DatabaseConfig, data_dir: &Path) -> Result<Self, RepositoryError> {
        match config {
            DatabaseConfig::Sqlite { path } => {
                let path = sqlite_path(path.as_deref(), data_dir);
                if let Some(parent) = path.parent() {
                    tokio::fs::create_dir_all(parent)
                        .await
                        .map_err(|e| RepositoryError::Connection(e.to_string()))?;
                }
                let pool = DatabasePool::open(&path)
                    .await
                    .map_err(|e| RepositoryError::Connection(e.to_string()))?;
                tracing::info!(path = %path.display(), "opened SQLite message store");
                Ok(DatabaseStore::Sqlite(SqliteMessageStore::new(pool)))
            }
            DatabaseConfig::Postgres(settings) => {
                let store = PgMessageStore::connect(settings)
                    .await
                    .map_err(|e| RepositoryError::Connection(e.to_string()))?;
                Ok(DatabaseStore::Postgres(store))
            }
        }
    }

    /// Short backend name for logs and health output.
    pub fn backend(&self) -> &'static str {
        match self {
            DatabaseStore::Sqlite(_) => "sqlite",
            DatabaseStore::Postgres(_) => "postgres",
        }
    }
}

fn sqlite_path(configured: Option<&Path>, data_dir: &Path) -> PathBuf {
    match configured {
        Some(path) if path.is_absolute() => path.to_path_buf(),
        Some(path) => data_dir.join(path),
        None => data_dir.join(DEFAULT_DATABASE_FILE),
    }
}

impl MessageStore for DatabaseStore {
    async fn save(&self, msg: &Message) -> Result<MessageId, RepositoryError> {
        match self {
            DatabaseStore::Sqlite(store) => store.save(msg).await,
            DatabaseStore::Postgres(store) => store.save(msg).await,
        }
    }

    async fn list_all(&self) -> Result<Vec<Message>, RepositoryError> {
        match self {
            DatabaseStore::Sqlite(store) => store.list_all().await,
            DatabaseStore::Postgres(store) => store.list_all().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sqlite_path_resolution() {
        let data_dir = Path::new("/var/lib/relay");
        assert_eq!(sqlite_path(None, data_dir), data_dir.join("relay.db"));
        assert_eq!(
            sqlite_path(Some(Path::new("chat.db")), data_dir),
            data_dir.join("chat.db")
        );
        assert_eq!(
            sqlite_path(Some(Path::new("/srv/chat.db")), data_dir),
            PathBuf::from("/srv/chat.db")
        );
    }

    #[tokio::test]
    async fn test_open_default_sqlite_creates_data_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let data_dir = tmp.path().join("nested").join("relay");

        let store = DatabaseStore::open(&DatabaseConfig::default(), &data_dir)
            .await
            .unwrap();

        assert_eq!(store.backend(), "sqlite");
        assert!(data_dir.join(DEFAULT_DATABASE_FILE).exists());

        let id = store.save(&Message::new("text", "hi", "u1")).await.unwrap();
        let all = store.list_all().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].id, Some(id));
    }
}

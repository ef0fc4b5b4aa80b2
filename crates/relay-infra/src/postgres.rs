//! PostgreSQL message store implementation.
//!
//! Used when the relay is pointed at a shared database server. Connection
//! parameters come from [`PostgresSettings`]; TLS is disabled to match a
//! private-network deployment.
//!
//! The table keeps the column layout of existing deployments: `type` and
//! `id_user` rather than the SQLite store's names, all nullable.

use std::time::Duration;

use relay_core::store::MessageStore;
use relay_types::config::PostgresSettings;
use relay_types::error::RepositoryError;
use relay_types::message::{Message, MessageId};
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions, PgSslMode};
use sqlx::Row;

/// PostgreSQL-backed implementation of `MessageStore`.
pub struct PgMessageStore {
    pool: PgPool,
}

impl PgMessageStore {
    /// Connect to the server and run migrations.
    pub async fn connect(settings: &PostgresSettings) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .acquire_timeout(Duration::from_secs(5))
            .connect_with(connect_options(settings))
            .await?;

        sqlx::migrate!("../../migrations/postgres").run(&pool).await?;

        tracing::info!(
            host = %settings.host,
            port = settings.port,
            database = %settings.name,
            "connected to PostgreSQL"
        );

        Ok(Self { pool })
    }
}

fn connect_options(settings: &PostgresSettings) -> PgConnectOptions {
    PgConnectOptions::new()
        .host(&settings.host)
        .port(settings.port)
        .username(&settings.user)
        .password(&settings.password)
        .database(&settings.name)
        .ssl_mode(PgSslMode::Disable)
}

const INSERT_MESSAGE: &str = r#"INSERT INTO messages ("type", content, "timestamp", id_user)
   VALUES ($1, $2, $3, $4)
   RETURNING id"#;

const SELECT_MESSAGES: &str = r#"SELECT id,
       COALESCE("type", '') AS message_type,
       COALESCE(content, '') AS content,
       COALESCE("timestamp", '') AS timestamp,
       COALESCE(id_user, '') AS sender_id
  FROM messages
 ORDER BY id"#;

fn row_to_message(row: &sqlx::postgres::PgRow) -> Result<Message, sqlx::Error> {
    Ok(Message {
        id: Some(MessageId(row.try_get("id")?)),
        message_type: row.try_get("message_type")?,
        content: row.try_get("content")?,
        timestamp: row.try_get("timestamp")?,
        sender_id: row.try_get("sender_id")?,
    })
}

impl MessageStore for PgMessageStore {
    async fn save(&self, msg: &Message) -> Result<MessageId, RepositoryError> {
        let row = sqlx::query(INSERT_MESSAGE)
            .bind(&msg.message_type)
            .bind(&msg.content)
            .bind(&msg.timestamp)
            .bind(&msg.sender_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        let id: i64 = row
            .try_get("id")
            .map_err(|e| RepositoryError::Query(e.to_string()))?;
        Ok(MessageId(id))
    }

    async fn list_all(&self) -> Result<Vec<Message>, RepositoryError> {
        let rows = sqlx::query(SELECT_MESSAGES)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        rows.iter()
            .map(|row| row_to_message(row).map_err(|e| RepositoryError::Query(e.to_string())))
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

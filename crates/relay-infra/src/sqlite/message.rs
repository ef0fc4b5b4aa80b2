//! SQLite message store implementation.
//!
//! Implements `MessageStore` from `relay-core` using sqlx with split
//! read/write pools. Inserts go through the single writer connection, so
//! concurrent saves from many read loops are serialized by the pool.

use relay_core::store::MessageStore;
use relay_types::error::RepositoryError;
use relay_types::message::{Message, MessageId};
use sqlx::Row;

use super::pool::DatabasePool;

/// SQLite-backed implementation of `MessageStore`.
pub struct SqliteMessageStore {
    pool: DatabasePool,
}

impl SqliteMessageStore {
    /// Create a new store backed by the given database pool.
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

fn row_to_message(row: &sqlx::sqlite::SqliteRow) -> Result<Message, sqlx::Error> {
    Ok(Message {
        id: Some(MessageId(row.try_get("id")?)),
        message_type: row.try_get("message_type")?,
        content: row.try_get("content")?,
        timestamp: row.try_get("timestamp")?,
        sender_id: row.try_get("sender_id")?,
    })
}

impl MessageStore for SqliteMessageStore {
    async fn save(&self, msg: &Message) -> Result<MessageId, RepositoryError> {
        let result = sqlx::query(
            r#"INSERT INTO messages (message_type, content, timestamp, sender_id)
               VALUES (?, ?, ?, ?)"#,
        )
        .bind(&msg.message_type)
        .bind(&msg.content)
        .bind(&msg.timestamp)
        .bind(&msg.sender_id)
        .execute(&self.pool.writer)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        Ok(MessageId(result.last_insert_rowid()))
    }

    async fn list_all(&self) -> Result<Vec<Message>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT id, message_type, content, timestamp, sender_id FROM messages ORDER BY id",
        )
        .fetch_all(&self.pool.reader)
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

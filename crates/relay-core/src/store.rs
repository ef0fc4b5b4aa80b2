//! Message store trait definition.
//!
//! Defines the persistence interface the hub writes through and the history
//! endpoint reads through. The infrastructure layer (relay-infra) implements
//! this trait with SQLite and PostgreSQL.

use relay_types::error::RepositoryError;
use relay_types::message::{Message, MessageId};

/// Append-only message persistence.
///
/// Implementations serialize their own writes; the hub may call `save`
/// concurrently from several connection read loops.
///
/// Uses native async fn in traits (Rust 2024 edition, no async_trait macro).
pub trait MessageStore: Send + Sync + 'static {
    /// Persist one message and return the id the store assigned to it.
    ///
    /// Any `id` already set on `msg` is ignored.
    fn save(
        &self,
        msg: &Message,
    ) -> impl std::future::Future<Output = Result<MessageId, RepositoryError>> + Send;

    /// Every persisted message, in insertion order.
    fn list_all(
        &self,
    ) -> impl std::future::Future<Output = Result<Vec<Message>, RepositoryError>> + Send;
}

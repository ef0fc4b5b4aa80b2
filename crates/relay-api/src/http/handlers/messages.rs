//! Query endpoint handler for message history.

use axum::extract::State;
use axum::Json;

use relay_core::store::MessageStore;
use relay_types::message::Message;

use crate::http::error::AppError;
use crate::state::AppState;

/// GET /getMessages (and /api/v1/messages) - Every stored message in
/// store order.
///
/// Reads the store directly; live connections and the broadcast loop are
/// not involved.
pub async fn list_messages(State(state): State<AppState>) -> Result<Json<Vec<Message>>, AppError> {
    let messages = state.store.list_all().await?;
    tracing::debug!(count = messages.len(), "served message history");
    Ok(Json(messages))
}

//! HTTP surface for the relay.
//!
//! Axum router with the WebSocket ingress endpoint, the history query
//! endpoint, a health check, and permissive CORS.

pub mod error;
pub mod handlers;
pub mod router;

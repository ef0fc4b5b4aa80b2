//! HTTP and WebSocket request handlers.

pub mod messages;
pub mod ws;

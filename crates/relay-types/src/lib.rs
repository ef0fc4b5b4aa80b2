//! Shared domain types for the message relay.
//!
//! This crate contains the types exchanged between the relay's layers:
//! the `Message` record, connection identifiers, configuration structs,
//! and the error enums used by the store, hub, and transport adapters.
//!
//! Zero infrastructure dependencies: serde, uuid, chrono and thiserror only.

pub mod config;
pub mod connection;
pub mod error;
pub mod message;

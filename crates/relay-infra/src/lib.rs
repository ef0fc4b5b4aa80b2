//! Infrastructure layer for the message relay.
//!
//! Contains the implementations of the `MessageStore` port defined in
//! `relay-core` (SQLite and PostgreSQL via sqlx), the runtime-selected
//! `DatabaseStore`, and configuration loading.

pub mod config;
pub mod postgres;
pub mod sqlite;
pub mod store;

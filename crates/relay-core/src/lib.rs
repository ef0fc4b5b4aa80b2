//! Business logic and the store port for the message relay.
//!
//! This crate owns the connection registry, the single broadcast path, and
//! the per-connection read/write loops. It defines the `MessageStore` port
//! that relay-infra implements and never depends on a database or HTTP crate.

pub mod connection;
pub mod hub;
pub mod store;

#[cfg(test)]
pub(crate) mod testing;

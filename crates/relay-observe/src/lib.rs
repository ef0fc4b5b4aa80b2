//! Observability setup for the message relay.
//!
//! Structured logging through `tracing`, with optional OpenTelemetry span
//! export for local debugging.

pub mod tracing_setup;

//! # huddle-server
//!
//! Horizontally scalable presence and messaging server.
//!
//! The server wires the session core to an axum WebSocket gateway, a
//! cross-process fan-out, a REST facade, and Prometheus metrics. Each
//! process delivers to its own locally connected peers; the fan-out
//! replicates every emission so remote processes do the same.

pub mod api;
pub mod config;
pub mod gateway;
pub mod handlers;
pub mod metrics;

//! bi-dash - Sales dashboards from a BI tool's query API.
//!
//! This library exposes the core modules for use in integration tests.

pub mod analytics;
pub mod api;
pub mod cache;
pub mod cli;
pub mod clock;
pub mod commands;
pub mod config;
pub mod error;
pub mod export;
pub mod logging;
pub mod query;
pub mod secrets;
pub mod session;
pub mod state;
pub mod table;

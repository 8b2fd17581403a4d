//! Integration tests for bi-dash against a scripted BI API.

pub mod common;
pub mod config_test;
pub mod dashboard_test;
pub mod executor_test;

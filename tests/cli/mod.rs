//! Tests that run the `bidash` binary.

pub mod binary_test;
pub mod common;

//! Integration tests for dbconn.

pub mod connection_test;
pub mod ownership_test;
pub mod postgres_test;

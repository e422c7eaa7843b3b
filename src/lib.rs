//! dbconn - a database connection handle with execution state,
//! elapsed-time tracking and result-set ownership.
//!
//! This library exposes the core modules for the binary and for
//! integration tests.

pub mod cli;
pub mod config;
pub mod connection;
pub mod db;
pub mod error;
pub mod logging;
pub mod output;
pub mod progress;

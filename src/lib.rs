//! trino-eda - bootstrap an exploratory session against a Trino cluster.
//!
//! This library exposes the core modules for use by the binary and
//! integration tests.

pub mod cli;
pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod output;
pub mod session;

//! Snowscope engine - SQL script execution
//!
//! Runs multi-statement scripts against a warehouse session:
//! - Dialect-aware statement splitting
//! - Sequential execution with per-statement fault isolation
//! - Scripts from local files or stages

pub mod runner;

pub use runner::ScriptRunner;

//! SQL script handling
//!
//! This crate splits multi-statement scripts into individual statements
//! using the dialect-aware tokenizer from datafusion-sqlparser-rs, so that
//! semicolons inside string literals, dollar-quoted bodies, comments and
//! quoted identifiers never end a statement.

pub mod splitter;

pub use splitter::{SplitError, StatementSplitter};

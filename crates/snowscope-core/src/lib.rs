//! Snowscope Core
//!
//! Domain model shared by every Snowscope crate: catalog trees, column
//! descriptors, per-statement execution results and the `snowscope.toml`
//! configuration schema.

pub mod catalog;
pub mod statement;
pub mod config;

pub use catalog::{
    CatalogTree, ColumnDescriptor, InvalidObjectType, InvalidStageName, ObjectCategory,
    ObjectCollection, ObjectType, StageFile, StageRef,
};
pub use statement::{ScriptSummary, StatementResult, MAX_RECORDED_STATEMENT_CHARS};
pub use config::{Config, ConfigError, ConnectionConfig, LineageConfig, LlmConfig};

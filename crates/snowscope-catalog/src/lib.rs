//! Snowflake catalog browsing and stage file access
//!
//! Every operation takes an open [`Warehouse`] session and issues plain SQL
//! through it: `SHOW` statements for the catalog, `LIST` and URL functions
//! for stages. Staged file content is downloaded over HTTP from presigned
//! URLs.
//!
//! ## Features
//!
//! - `snowflake` - compile in the Snowflake driver
//!
//! ## Example
//!
//! ```rust,ignore
//! use snowscope_catalog::{CatalogWalker, SnowflakeConnection};
//!
//! let conn = SnowflakeConnection::builder("xy12345", "ANALYST", token).connect().await?;
//! let tree = CatalogWalker::new(&conn).list_data_objects().await?;
//! ```

pub mod adapter;
pub mod error;
pub mod mock;
pub mod quote;
pub mod snowflake;
pub mod stage;
pub mod walker;

pub use adapter::{QueryOutput, Row, Warehouse, WarehouseError};
pub use error::{Result, SnowscopeError};
pub use mock::{MockFetcher, MockWarehouse, MockWarehouseBuilder};
pub use snowflake::{infer_rows_affected, ConnectionParams, SnowflakeConnection, SnowflakeConnectionBuilder};
pub use stage::{ContentFetcher, HttpFetcher, StageAccess, YamlFile};
pub use walker::CatalogWalker;

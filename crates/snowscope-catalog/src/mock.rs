//! Mock warehouse and content fetcher for testing
//!
//! The mock warehouse answers statements from a table of canned results and
//! records every statement it receives, in order. It is useful for:
//! - Unit testing catalog walks and script runs
//! - Simulating failures of individual statements
//! - Demos without real credentials
//!
//! ## Usage
//!
//! ```rust,ignore
//! use snowscope_catalog::{CatalogWalker, MockWarehouseBuilder};
//!
//! let warehouse = MockWarehouseBuilder::new()
//!     .with_rows("SHOW DATABASES", &[&["2024-01-01", "ANALYTICS"]])
//!     .with_rows("SHOW SCHEMAS IN DATABASE ANALYTICS", &[&["2024-01-01", "PUBLIC"]])
//!     .build();
//!
//! let tree = CatalogWalker::new(&warehouse).list_data_objects().await?;
//! ```
//!
//! Statements with no registered response succeed with an empty result,
//! unless the mock was built with `with_unknown_query_failure`.

use crate::adapter::{QueryOutput, Row, Warehouse, WarehouseError};
use crate::error::SnowscopeError;
use crate::stage::ContentFetcher;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

type Responses = HashMap<String, Result<QueryOutput, WarehouseError>>;

fn key(sql: &str) -> String {
    sql.trim().to_string()
}

/// Build a result whose rows hold the given values at their positions
///
/// Column names are synthesized (`c0`, `c1`, ...) since catalog reads are
/// positional.
pub fn positional_output(rows: &[&[&str]]) -> QueryOutput {
    let width = rows.iter().map(|r| r.len()).max().unwrap_or(0);
    let columns = (0..width).map(|i| format!("c{}", i)).collect();
    QueryOutput::new(columns, rows.iter().map(|r| Row::from_strs(*r)).collect())
}

/// Mock warehouse for testing
pub struct MockWarehouse {
    /// Canned results by statement text
    responses: Arc<RwLock<Responses>>,

    /// Statements received, in order
    executed: Arc<RwLock<Vec<String>>>,

    /// Fail statements with no registered response
    fail_unknown: bool,
}

impl MockWarehouse {
    /// Create a mock warehouse with no canned results
    pub fn new() -> Self {
        Self {
            responses: Arc::new(RwLock::new(HashMap::new())),
            executed: Arc::new(RwLock::new(Vec::new())),
            fail_unknown: false,
        }
    }

    /// Register the result for a statement
    pub async fn add_output(&self, sql: &str, output: QueryOutput) {
        self.responses.write().await.insert(key(sql), Ok(output));
    }

    /// Register positional rows for a statement
    pub async fn add_rows(&self, sql: &str, rows: &[&[&str]]) {
        self.add_output(sql, positional_output(rows)).await;
    }

    /// Make a statement fail
    pub async fn add_error(&self, sql: &str, error: WarehouseError) {
        self.responses.write().await.insert(key(sql), Err(error));
    }

    /// Statements received so far, in order
    pub async fn executed(&self) -> Vec<String> {
        self.executed.read().await.clone()
    }

    /// Number of statements received so far
    pub async fn query_count(&self) -> usize {
        self.executed.read().await.len()
    }
}

impl Default for MockWarehouse {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for MockWarehouse {
    fn clone(&self) -> Self {
        Self {
            responses: Arc::clone(&self.responses),
            executed: Arc::clone(&self.executed),
            fail_unknown: self.fail_unknown,
        }
    }
}

#[async_trait::async_trait]
impl Warehouse for MockWarehouse {
    fn name(&self) -> &'static str {
        "Mock"
    }

    async fn query(&self, sql: &str) -> Result<QueryOutput, WarehouseError> {
        self.executed.write().await.push(sql.to_string());

        match self.responses.read().await.get(&key(sql)) {
            Some(response) => response.clone(),
            None if self.fail_unknown => Err(WarehouseError::QueryError(format!(
                "SQL compilation error: no mock response for '{}'",
                sql.trim()
            ))),
            None => Ok(QueryOutput::empty()),
        }
    }
}

/// Builder for creating MockWarehouse with canned results
///
/// ```rust,ignore
/// let warehouse = MockWarehouseBuilder::new()
///     .with_rows("SHOW STAGES IN DATABASE RAW", &[&["t", "YAML_STAGE", "RAW", "LANDING"]])
///     .with_error("SHOW PIPES IN RAW.LANDING", WarehouseError::QueryError("denied".into()))
///     .build();
/// ```
pub struct MockWarehouseBuilder {
    responses: Responses,
    fail_unknown: bool,
}

impl MockWarehouseBuilder {
    pub fn new() -> Self {
        Self {
            responses: HashMap::new(),
            fail_unknown: false,
        }
    }

    /// Register the result for a statement
    pub fn with_output(mut self, sql: &str, output: QueryOutput) -> Self {
        self.responses.insert(key(sql), Ok(output));
        self
    }

    /// Register positional rows for a statement
    pub fn with_rows(self, sql: &str, rows: &[&[&str]]) -> Self {
        self.with_output(sql, positional_output(rows))
    }

    /// Register a scalar result for a statement
    pub fn with_scalar(self, sql: &str, value: &str) -> Self {
        self.with_output(sql, positional_output(&[&[value]]))
    }

    /// Make a statement fail
    pub fn with_error(mut self, sql: &str, error: WarehouseError) -> Self {
        self.responses.insert(key(sql), Err(error));
        self
    }

    /// Fail every statement with no registered response
    pub fn with_unknown_query_failure(mut self) -> Self {
        self.fail_unknown = true;
        self
    }

    pub fn build(self) -> MockWarehouse {
        MockWarehouse {
            responses: Arc::new(RwLock::new(self.responses)),
            executed: Arc::new(RwLock::new(Vec::new())),
            fail_unknown: self.fail_unknown,
        }
    }
}

impl Default for MockWarehouseBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Content fetcher serving canned pages by URL
#[derive(Clone, Default)]
pub struct MockFetcher {
    pages: Arc<RwLock<HashMap<String, Result<String, String>>>>,
    fetched: Arc<RwLock<Vec<String>>>,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `body` for `url`
    pub async fn add_page(&self, url: &str, body: &str) {
        self.pages
            .write()
            .await
            .insert(url.to_string(), Ok(body.to_string()));
    }

    /// Fail requests for `url` with `message`
    pub async fn add_failure(&self, url: &str, message: &str) {
        self.pages
            .write()
            .await
            .insert(url.to_string(), Err(message.to_string()));
    }

    /// URLs requested so far, in order
    pub async fn fetched(&self) -> Vec<String> {
        self.fetched.read().await.clone()
    }
}

#[async_trait::async_trait]
impl ContentFetcher for MockFetcher {
    async fn fetch(&self, url: &str) -> Result<String, SnowscopeError> {
        self.fetched.write().await.push(url.to_string());

        match self.pages.read().await.get(url) {
            Some(Ok(body)) => Ok(body.clone()),
            Some(Err(message)) => Err(SnowscopeError::fetch(
                "Error fetching file from presigned URL",
                message,
            )),
            None => Err(SnowscopeError::fetch(
                "Error fetching file from presigned URL",
                format!("404 Not Found for url ({})", url),
            )),
        }
    }
}

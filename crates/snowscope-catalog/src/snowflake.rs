//! Snowflake connection
//!
//! Opens a session with a personal access token supplied in place of a
//! password and forwards role, warehouse, database and schema as session
//! context when they are set.
//!
//! ## Usage
//!
//! ```rust,ignore
//! let conn = SnowflakeConnection::builder("xy12345.us-east-1", "ANALYST", token)
//!     .with_warehouse("COMPUTE_WH")
//!     .with_role("ANALYST")
//!     .connect()
//!     .await?;
//! ```
//!
//! The driver is compiled in with the `snowflake` feature.

use crate::adapter::{QueryOutput, Row, Warehouse, WarehouseError};
use crate::error::SnowscopeError;
use std::fmt;

#[cfg(feature = "snowflake")]
use snowflake_api::{QueryResult, SnowflakeApi};

#[cfg(feature = "snowflake")]
use arrow_array::{Array, RecordBatch};

/// Connection parameters
#[derive(Clone)]
pub struct ConnectionParams {
    pub account: String,
    pub user: String,
    token: String,
    pub role: Option<String>,
    pub warehouse: Option<String>,
    pub database: Option<String>,
    pub schema: Option<String>,
}

impl fmt::Debug for ConnectionParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionParams")
            .field("account", &self.account)
            .field("user", &self.user)
            .field("token", &"<redacted>")
            .field("role", &self.role)
            .field("warehouse", &self.warehouse)
            .field("database", &self.database)
            .field("schema", &self.schema)
            .finish()
    }
}

impl ConnectionParams {
    /// Reject parameters that cannot possibly authenticate
    pub fn validate(&self) -> Result<(), SnowscopeError> {
        if self.account.trim().is_empty() {
            return Err(SnowscopeError::ConnectionError(
                "account identifier is required".to_string(),
            ));
        }
        if self.user.trim().is_empty() {
            return Err(SnowscopeError::ConnectionError("user is required".to_string()));
        }
        Ok(())
    }
}

/// Builder for SnowflakeConnection
pub struct SnowflakeConnectionBuilder {
    params: ConnectionParams,
}

impl SnowflakeConnectionBuilder {
    /// Create new builder; `token` is the personal access token used as password
    pub fn new(
        account: impl Into<String>,
        user: impl Into<String>,
        token: impl Into<String>,
    ) -> Self {
        Self {
            params: ConnectionParams {
                account: account.into(),
                user: user.into(),
                token: token.into(),
                role: None,
                warehouse: None,
                database: None,
                schema: None,
            },
        }
    }

    /// Set the role to use
    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.params.role = non_empty(role.into());
        self
    }

    /// Set the warehouse to use
    pub fn with_warehouse(mut self, warehouse: impl Into<String>) -> Self {
        self.params.warehouse = non_empty(warehouse.into());
        self
    }

    /// Set the default database
    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.params.database = non_empty(database.into());
        self
    }

    /// Set the default schema
    pub fn with_schema(mut self, schema: impl Into<String>) -> Self {
        self.params.schema = non_empty(schema.into());
        self
    }

    pub fn params(&self) -> &ConnectionParams {
        &self.params
    }

    /// Open the session and run a validation query; no retry
    #[cfg(feature = "snowflake")]
    pub async fn connect(self) -> Result<SnowflakeConnection, SnowscopeError> {
        let params = self.params;
        params.validate()?;

        let api = SnowflakeApi::with_password_auth(
            &params.account,
            params.warehouse.as_deref(),
            params.database.as_deref(),
            params.schema.as_deref(),
            &params.user,
            params.role.as_deref(),
            &params.token,
        )
        .map_err(|e| SnowscopeError::ConnectionError(e.to_string()))?;

        api.exec("SELECT 1")
            .await
            .map_err(|e| SnowscopeError::ConnectionError(e.to_string()))?;

        tracing::info!(account = %params.account, user = %params.user, "Connected to Snowflake");

        Ok(SnowflakeConnection {
            api,
            account: params.account,
            user: params.user,
        })
    }

    /// Connect without snowflake feature
    #[cfg(not(feature = "snowflake"))]
    pub async fn connect(self) -> Result<SnowflakeConnection, SnowscopeError> {
        self.params.validate()?;
        Err(SnowscopeError::ConnectionError(
            "Snowflake support not compiled. Rebuild with: cargo build --features snowflake".to_string(),
        ))
    }
}

fn non_empty(value: String) -> Option<String> {
    if value.trim().is_empty() {
        None
    } else {
        Some(value)
    }
}

/// An open Snowflake session
pub struct SnowflakeConnection {
    #[cfg(feature = "snowflake")]
    api: SnowflakeApi,

    account: String,
    user: String,
}

impl SnowflakeConnection {
    /// Builder pattern entry point
    pub fn builder(
        account: impl Into<String>,
        user: impl Into<String>,
        token: impl Into<String>,
    ) -> SnowflakeConnectionBuilder {
        SnowflakeConnectionBuilder::new(account, user, token)
    }

    pub fn account(&self) -> &str {
        &self.account
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    #[cfg(feature = "snowflake")]
    fn classify_error(message: String) -> WarehouseError {
        let lower = message.to_lowercase();
        if lower.contains("incorrect username or password") || lower.contains("authentication") {
            WarehouseError::AuthenticationError(message)
        } else if lower.contains("error sending request") || lower.contains("connection refused") {
            WarehouseError::NetworkError(message)
        } else {
            WarehouseError::QueryError(message)
        }
    }

    #[cfg(feature = "snowflake")]
    fn from_json(value: &serde_json::Value) -> Result<Vec<Row>, WarehouseError> {
        let rows = value.as_array().ok_or_else(|| {
            WarehouseError::InvalidResponse("expected an array of rows".to_string())
        })?;

        rows.iter()
            .map(|row| {
                let cells = row.as_array().ok_or_else(|| {
                    WarehouseError::InvalidResponse("expected a row array".to_string())
                })?;
                Ok(Row::new(cells.iter().map(json_cell).collect()))
            })
            .collect()
    }

    #[cfg(feature = "snowflake")]
    fn from_arrow(batches: &[RecordBatch]) -> Result<(Vec<String>, Vec<Row>), WarehouseError> {
        use arrow_cast::display::array_value_to_string;

        let columns = batches
            .first()
            .map(|batch| column_names(&batch.schema()))
            .unwrap_or_default();

        let mut rows = Vec::new();
        for batch in batches {
            for row_idx in 0..batch.num_rows() {
                let mut values = Vec::with_capacity(batch.num_columns());
                for array in batch.columns() {
                    if array.is_null(row_idx) {
                        values.push(None);
                    } else {
                        let value = array_value_to_string(array, row_idx)
                            .map_err(|e| WarehouseError::InvalidResponse(e.to_string()))?;
                        values.push(Some(value));
                    }
                }
                rows.push(Row::new(values));
            }
        }

        Ok((columns, rows))
    }
}

#[cfg(feature = "snowflake")]
fn column_names(schema: &arrow_schema::SchemaRef) -> Vec<String> {
    schema.fields().iter().map(|f| f.name().clone()).collect()
}

#[cfg(feature = "snowflake")]
fn json_cell(cell: &serde_json::Value) -> Option<String> {
    match cell {
        serde_json::Value::Null => None,
        serde_json::Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// Rows-affected as the Python-style `rowcount` would report it
///
/// DML results carry `number of rows inserted/updated/deleted/unloaded`
/// columns whose first-row values are summed; DDL returns a single `status`
/// column and has no count; any other result set counts its rows.
pub fn infer_rows_affected(columns: &[String], rows: &[Row]) -> Option<i64> {
    let count_columns: Vec<usize> = columns
        .iter()
        .enumerate()
        .filter(|(_, name)| name.to_lowercase().starts_with("number of rows"))
        .map(|(idx, _)| idx)
        .collect();

    if !count_columns.is_empty() {
        let first = rows.first()?;
        let total = count_columns
            .iter()
            .filter_map(|idx| first.get(*idx))
            .filter_map(|v| v.trim().parse::<i64>().ok())
            .sum();
        return Some(total);
    }

    match columns {
        [] => None,
        [only] if only.eq_ignore_ascii_case("status") => None,
        _ => Some(rows.len() as i64),
    }
}

#[async_trait::async_trait]
impl Warehouse for SnowflakeConnection {
    fn name(&self) -> &'static str {
        "Snowflake"
    }

    #[cfg(feature = "snowflake")]
    async fn query(&self, sql: &str) -> Result<QueryOutput, WarehouseError> {
        tracing::debug!(%sql, "Executing statement");

        let result = self
            .api
            .exec(sql)
            .await
            .map_err(|e| Self::classify_error(e.to_string()))?;

        let (columns, rows) = match result {
            QueryResult::Arrow(batches) => Self::from_arrow(&batches)?,
            QueryResult::Json(json) => {
                let columns: Vec<String> = json.schema.iter().map(|f| f.name.clone()).collect();
                let rows = Self::from_json(&json.value)?;
                (columns, rows)
            }
            QueryResult::Empty => return Ok(QueryOutput::empty()),
        };

        let rows_affected = infer_rows_affected(&columns, &rows);
        Ok(QueryOutput {
            columns,
            rows,
            rows_affected,
        })
    }

    #[cfg(not(feature = "snowflake"))]
    async fn query(&self, _sql: &str) -> Result<QueryOutput, WarehouseError> {
        Err(WarehouseError::ConfigError(
            "Snowflake support not compiled. Rebuild with: cargo build --features snowflake".to_string(),
        ))
    }
}

//! Warehouse trait: the query interface every catalog operation runs on

/// One result row, values rendered as text (`None` for SQL NULL)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Row {
    values: Vec<Option<String>>,
}

impl Row {
    pub fn new(values: Vec<Option<String>>) -> Self {
        Self { values }
    }

    /// Build a row of non-null values
    pub fn from_strs<S: AsRef<str>>(values: &[S]) -> Self {
        Self {
            values: values.iter().map(|v| Some(v.as_ref().to_string())).collect(),
        }
    }

    /// Value at a column position; `None` for NULL or a short row
    pub fn get(&self, idx: usize) -> Option<&str> {
        self.values.get(idx).and_then(|v| v.as_deref())
    }

    /// Value at a column position, NULL read as empty
    ///
    /// Fails when the row has fewer columns than the positional contract of
    /// the statement requires.
    pub fn text(&self, idx: usize) -> Result<String, WarehouseError> {
        match self.values.get(idx) {
            Some(value) => Ok(value.clone().unwrap_or_default()),
            None => Err(WarehouseError::InvalidResponse(format!(
                "expected at least {} columns, row has {}",
                idx + 1,
                self.values.len()
            ))),
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Result of one statement
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryOutput {
    /// Column names in result order
    pub columns: Vec<String>,

    pub rows: Vec<Row>,

    /// Count reported by the driver, if any (may be negative)
    pub rows_affected: Option<i64>,
}

impl QueryOutput {
    /// Statement with no result set and no count (typical DDL)
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn new(columns: Vec<String>, rows: Vec<Row>) -> Self {
        Self {
            columns,
            rows,
            rows_affected: None,
        }
    }

    pub fn with_rows_affected(mut self, rows_affected: i64) -> Self {
        self.rows_affected = Some(rows_affected);
        self
    }

    /// Values of one column position across all rows
    pub fn column_text(&self, idx: usize) -> Result<Vec<String>, WarehouseError> {
        self.rows.iter().map(|row| row.text(idx)).collect()
    }

    /// First column of the first row, for scalar `SELECT`s
    pub fn scalar(&self) -> Result<String, WarehouseError> {
        self.rows
            .first()
            .and_then(|row| row.get(0))
            .map(str::to_string)
            .ok_or_else(|| WarehouseError::InvalidResponse("query returned no value".to_string()))
    }
}

/// Errors raised by a warehouse driver
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WarehouseError {
    #[error("Authentication failed: {0}")]
    AuthenticationError(String),

    #[error("Query failed: {0}")]
    QueryError(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// An open warehouse session
///
/// Statements run one at a time, in the order they are awaited. Session
/// state such as the current database persists between calls, so one value
/// should not be shared by concurrent callers.
#[async_trait::async_trait]
pub trait Warehouse: Send + Sync {
    /// Get the warehouse name (e.g., "Snowflake")
    fn name(&self) -> &'static str;

    /// Execute one statement and return its full result
    async fn query(&self, sql: &str) -> Result<QueryOutput, WarehouseError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_positional_access() {
        let row = Row::new(vec![Some("2024-01-01".to_string()), Some("ORDERS".to_string()), None]);
        assert_eq!(row.get(1), Some("ORDERS"));
        assert_eq!(row.get(2), None);
        assert_eq!(row.text(2).unwrap(), "");
        assert!(matches!(row.text(5), Err(WarehouseError::InvalidResponse(_))));
    }

    #[test]
    fn column_text_collects_positions() {
        let output = QueryOutput::new(
            vec!["created_on".to_string(), "name".to_string()],
            vec![Row::from_strs(&["t1", "A"]), Row::from_strs(&["t2", "B"])],
        );
        assert_eq!(output.column_text(1).unwrap(), vec!["A", "B"]);
        assert!(output.column_text(3).is_err());
    }

    #[test]
    fn scalar_requires_a_value() {
        let output = QueryOutput::new(vec!["url".to_string()], vec![Row::from_strs(&["https://x"])]);
        assert_eq!(output.scalar().unwrap(), "https://x");
        assert!(QueryOutput::empty().scalar().is_err());
    }
}

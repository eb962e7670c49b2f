//! Per-statement results of a script run

use serde::{Deserialize, Serialize};

/// Longest statement echo kept in a result
pub const MAX_RECORDED_STATEMENT_CHARS: usize = 2000;

/// Outcome of one executed statement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatementResult {
    /// Statement text, truncated to [`MAX_RECORDED_STATEMENT_CHARS`] characters
    pub statement: String,

    pub success: bool,

    /// Rows affected; 0 when the driver reports no meaningful count
    pub rows_affected: u64,

    /// Error message, empty on success
    pub error: String,
}

impl StatementResult {
    /// Successful execution. Negative or missing counts are recorded as 0.
    pub fn succeeded(statement: &str, rows_affected: Option<i64>) -> Self {
        Self {
            statement: truncate_statement(statement),
            success: true,
            rows_affected: normalize_rows_affected(rows_affected),
            error: String::new(),
        }
    }

    /// Failed execution
    pub fn failed(statement: &str, error: impl Into<String>) -> Self {
        Self {
            statement: truncate_statement(statement),
            success: false,
            rows_affected: 0,
            error: error.into(),
        }
    }
}

/// Clamp a driver-reported count to a non-negative value
pub fn normalize_rows_affected(rows: Option<i64>) -> u64 {
    match rows {
        Some(n) if n > 0 => n as u64,
        _ => 0,
    }
}

/// First [`MAX_RECORDED_STATEMENT_CHARS`] characters of a statement
pub fn truncate_statement(statement: &str) -> String {
    match statement.char_indices().nth(MAX_RECORDED_STATEMENT_CHARS) {
        Some((idx, _)) => statement[..idx].to_string(),
        None => statement.to_string(),
    }
}

/// Totals over a script run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptSummary {
    pub statements: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub rows_affected: u64,
}

impl ScriptSummary {
    pub fn from_results(results: &[StatementResult]) -> Self {
        results.iter().fold(Self::default(), |mut summary, result| {
            summary.statements += 1;
            if result.success {
                summary.succeeded += 1;
            } else {
                summary.failed += 1;
            }
            summary.rows_affected += result.rows_affected;
            summary
        })
    }

    pub fn all_succeeded(&self) -> bool {
        self.failed == 0
    }
}

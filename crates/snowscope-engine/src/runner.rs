//! Script runner: split a script and execute its statements in order
//!
//! Unlike catalog walks, a run never stops early. Each statement's failure
//! is recorded in its [`StatementResult`] and the next statement still
//! executes.

use snowscope_catalog::{SnowscopeError, StageAccess, Warehouse};
use snowscope_core::{StageRef, StatementResult};
use snowscope_sql::StatementSplitter;
use std::path::Path;

/// Executes scripts on one warehouse session
pub struct ScriptRunner<'a> {
    warehouse: &'a dyn Warehouse,
    splitter: StatementSplitter,
}

impl<'a> ScriptRunner<'a> {
    /// Runner splitting with the Snowflake dialect
    pub fn new(warehouse: &'a dyn Warehouse) -> Self {
        Self::with_splitter(warehouse, StatementSplitter::snowflake())
    }

    pub fn with_splitter(warehouse: &'a dyn Warehouse, splitter: StatementSplitter) -> Self {
        Self { warehouse, splitter }
    }

    /// Execute every statement of `script`, one result per statement
    ///
    /// Results are in source order. Empty and comment-only fragments are not
    /// statements and produce no result.
    pub async fn execute(&self, script: &str) -> Vec<StatementResult> {
        let statements = self.splitter.split(script);
        let mut results = Vec::with_capacity(statements.len());

        for (idx, statement) in statements.iter().enumerate() {
            let result = match self.warehouse.query(statement).await {
                Ok(output) => StatementResult::succeeded(statement, output.rows_affected),
                Err(e) => {
                    tracing::warn!(statement = idx + 1, error = %e, "Statement failed");
                    StatementResult::failed(statement, e.to_string())
                }
            };
            results.push(result);
        }

        tracing::info!(
            statements = results.len(),
            failed = results.iter().filter(|r| !r.success).count(),
            "Script finished"
        );

        results
    }

    /// Execute a script read from a local file
    ///
    /// A file that cannot be read fails the call; nothing is executed.
    pub async fn execute_file(&self, path: impl AsRef<Path>) -> Result<Vec<StatementResult>, SnowscopeError> {
        let path = path.as_ref();
        let script = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| SnowscopeError::IoError(format!("{}: {}", path.display(), e)))?;

        Ok(self.execute(&script).await)
    }

    /// Execute a SQL file held in a stage
    pub async fn execute_from_stage(
        &self,
        stage_access: &StageAccess<'_>,
        stage: &StageRef,
        file: &str,
    ) -> Result<Vec<StatementResult>, SnowscopeError> {
        let script = stage_access.read_file(stage, file).await?;
        Ok(self.execute(&script).await)
    }
}

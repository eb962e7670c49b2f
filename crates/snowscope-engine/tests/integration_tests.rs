//! End-to-end script runs against the mock warehouse

use pretty_assertions::assert_eq;
use snowscope_catalog::{MockFetcher, MockWarehouseBuilder, QueryOutput, StageAccess, WarehouseError};
use snowscope_core::{ScriptSummary, StageRef};
use snowscope_engine::ScriptRunner;
use std::io::Write;
use std::sync::Arc;

const DEPLOY_SCRIPT: &str = r#"
-- Deploy the orders mart
CREATE OR REPLACE TABLE ANALYTICS.MARTS.FCT_ORDERS (
    ORDER_ID NUMBER,
    NOTE VARCHAR DEFAULT 'n/a; pending'
);

CREATE OR REPLACE PROCEDURE ANALYTICS.MARTS.REFRESH()
RETURNS VARCHAR
LANGUAGE SQL
AS
$$
BEGIN
    DELETE FROM ANALYTICS.MARTS.FCT_ORDERS;
    RETURN 'done';
END;
$$;

INSERT INTO ANALYTICS.MARTS.FCT_ORDERS (ORDER_ID) VALUES (1), (2), (3);

/* bad grant */
GRANT SELECT ON ANALYTICS.MARTS.FCT_ORDERS TO ROLE MISSING_ROLE;
"#;

fn deploy_warehouse() -> snowscope_catalog::MockWarehouse {
    MockWarehouseBuilder::new()
        .with_output(
            "INSERT INTO ANALYTICS.MARTS.FCT_ORDERS (ORDER_ID) VALUES (1), (2), (3);",
            QueryOutput::empty().with_rows_affected(3),
        )
        .with_error(
            "/* bad grant */\nGRANT SELECT ON ANALYTICS.MARTS.FCT_ORDERS TO ROLE MISSING_ROLE;",
            WarehouseError::QueryError("Role 'MISSING_ROLE' does not exist or not authorized.".to_string()),
        )
        .build()
}

#[tokio::test]
async fn test_deploy_script_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(DEPLOY_SCRIPT.as_bytes()).unwrap();

    let warehouse = deploy_warehouse();
    let results = ScriptRunner::new(&warehouse)
        .execute_file(file.path())
        .await
        .unwrap();

    assert_eq!(results.len(), 4);
    assert!(results[0].statement.starts_with("-- Deploy the orders mart\nCREATE OR REPLACE TABLE"));
    assert!(results[1].statement.contains("RETURN 'done';"));
    assert!(results[1].statement.ends_with("$$;"));
    assert_eq!(results[2].rows_affected, 3);
    assert!(!results[3].success);

    let summary = ScriptSummary::from_results(&results);
    assert_eq!(summary.statements, 4);
    assert_eq!(summary.succeeded, 3);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.rows_affected, 3);
    assert!(!summary.all_succeeded());
}

#[tokio::test]
async fn test_script_from_stage() {
    let warehouse = MockWarehouseBuilder::new()
        .with_scalar(
            "SELECT GET_PRESIGNED_URL('@RAW.LANDING.SQL_STAGE', 'setup.sql')",
            "https://s3/setup",
        )
        .build();

    let fetcher = MockFetcher::new();
    fetcher
        .add_page("https://s3/setup", "USE SCHEMA RAW.LANDING; CREATE TABLE EVENTS (ID INT);")
        .await;

    let access = StageAccess::with_fetcher(&warehouse, Arc::new(fetcher));
    let stage = StageRef::new("RAW", "LANDING", "SQL_STAGE");

    let results = ScriptRunner::new(&warehouse)
        .execute_from_stage(&access, &stage, "sql_stage/setup.sql")
        .await
        .unwrap();

    assert_eq!(results.len(), 2);
    assert!(results.iter().all(|r| r.success));
    assert_eq!(
        warehouse.executed().await[1..],
        [
            "USE SCHEMA RAW.LANDING;".to_string(),
            "CREATE TABLE EVENTS (ID INT);".to_string(),
        ]
    );
}

#[tokio::test]
async fn test_unreadable_stage_file_runs_nothing() {
    let warehouse = MockWarehouseBuilder::new()
        .with_scalar(
            "SELECT GET_PRESIGNED_URL('@RAW.LANDING.SQL_STAGE', 'setup.sql')",
            "https://s3/setup",
        )
        .build();

    let access = StageAccess::with_fetcher(&warehouse, Arc::new(MockFetcher::new()));
    let stage = StageRef::new("RAW", "LANDING", "SQL_STAGE");

    let result = ScriptRunner::new(&warehouse)
        .execute_from_stage(&access, &stage, "setup.sql")
        .await;

    assert!(result.is_err());
    assert_eq!(warehouse.query_count().await, 1);
}

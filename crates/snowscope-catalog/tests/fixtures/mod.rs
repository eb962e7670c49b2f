//! Canned warehouse sessions shared by the integration tests
//!
//! Rows follow Snowflake's positional layouts: `SHOW` results carry the
//! object name at position 1, `SHOW COLUMNS` carries name and type at 2
//! and 3.

#![allow(dead_code)]

use snowscope_catalog::{MockWarehouse, MockWarehouseBuilder};

const CREATED_ON: &str = "2024-01-01 00:00:00.000 -0800";

/// Two databases, one schema each, one table and no views per schema
pub fn two_database_warehouse() -> MockWarehouse {
    MockWarehouseBuilder::new()
        .with_rows("SHOW DATABASES", &[&[CREATED_ON, "ANALYTICS"], &[CREATED_ON, "RAW"]])
        .with_rows("SHOW SCHEMAS IN DATABASE ANALYTICS", &[&[CREATED_ON, "MARTS"]])
        .with_rows("SHOW SCHEMAS IN DATABASE RAW", &[&[CREATED_ON, "LANDING"]])
        .with_rows("SHOW TABLES IN ANALYTICS.MARTS", &[&[CREATED_ON, "FCT_ORDERS"]])
        .with_rows("SHOW VIEWS IN ANALYTICS.MARTS", &[])
        .with_rows("SHOW TABLES IN RAW.LANDING", &[&[CREATED_ON, "ORDERS_RAW"]])
        .with_rows("SHOW VIEWS IN RAW.LANDING", &[])
        .build()
}

/// `SHOW COLUMNS` row for a column of `table`
pub fn column_row(table: &str, name: &str, data_type: &str, nullable: bool) -> Vec<String> {
    vec![
        table.to_string(),
        "MARTS".to_string(),
        name.to_string(),
        format!(r#"{{"type":"{}","nullable":{}}}"#, data_type, nullable),
        "".to_string(),
        "".to_string(),
        nullable.to_string(),
        "".to_string(),
        "COLUMN".to_string(),
    ]
}

pub const SEMANTIC_MODEL_YAML: &str = r#"
name: revenue
tables:
  - name: fct_orders
    base_table:
      database: ANALYTICS
      schema: MARTS
      table: FCT_ORDERS
    dimensions:
      - name: region
        expr: REGION
        data_type: TEXT
    measures:
      - name: order_total
        expr: AMOUNT
        data_type: NUMBER
        default_aggregation: sum
"#;

pub const MALFORMED_YAML: &str = "tables: [unclosed\n  - name: x";

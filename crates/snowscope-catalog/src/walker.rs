//! Catalog walker: databases, schemas, schema objects, columns and stages
//!
//! Every read maps onto Snowflake's native `SHOW` statements and reads the
//! result positionally:
//!
//! | Statement | Field | Column |
//! |---|---|---|
//! | `SHOW DATABASES`, `SHOW SCHEMAS`, `SHOW <objects>` | name | 1 |
//! | `SHOW STAGES IN DATABASE` | stage name, schema name | 1, 3 |
//! | `SHOW COLUMNS` | name, type, null?, default, kind | 2, 3, 6, 7, 8 |
//!
//! Nothing is cached: the warehouse may change between calls. Walks are
//! fail-fast; the first failing statement abandons the whole walk.

use crate::adapter::{Warehouse, WarehouseError};
use crate::error::{Result, SnowscopeError};
use crate::quote::qualified;
use snowscope_core::{CatalogTree, ColumnDescriptor, ObjectCategory, ObjectCollection, ObjectType};

/// Position of the object name in `SHOW <objects>` results
const NAME_COLUMN: usize = 1;

/// Position of the schema name in `SHOW STAGES` results
const STAGE_SCHEMA_COLUMN: usize = 3;

/// Read-only catalog queries over one connection
pub struct CatalogWalker<'a> {
    warehouse: &'a dyn Warehouse,
}

impl<'a> CatalogWalker<'a> {
    pub fn new(warehouse: &'a dyn Warehouse) -> Self {
        Self { warehouse }
    }

    /// Every database, its schemas and their tables and views
    ///
    /// Issues one query per database plus two per schema, level by level.
    pub async fn list_data_objects(&self) -> Result<CatalogTree> {
        self.walk_databases()
            .await
            .map_err(|e| SnowscopeError::catalog("Error fetching data objects", e))
    }

    async fn walk_databases(&self) -> std::result::Result<CatalogTree, WarehouseError> {
        let mut tree = CatalogTree::new();

        for database in self.names("SHOW DATABASES").await? {
            tree.add_database(database.clone());

            let schemas = self
                .names(&format!("SHOW SCHEMAS IN DATABASE {}", qualified(&[&database])))
                .await?;
            tracing::debug!(%database, schemas = schemas.len(), "Walking database");

            for schema in schemas {
                let objects = self
                    .collect_categories(&database, &schema, &ObjectCategory::LIGHTWEIGHT)
                    .await?;
                tree.insert_schema(database.clone(), schema, objects);
            }
        }

        Ok(tree)
    }

    /// Every object category of one schema, queried in fixed order
    pub async fn schema_objects(&self, database: &str, schema: &str) -> Result<ObjectCollection> {
        self.collect_categories(database, schema, &ObjectCategory::ALL)
            .await
            .map_err(|e| SnowscopeError::catalog("Error fetching schema objects", e))
    }

    async fn collect_categories(
        &self,
        database: &str,
        schema: &str,
        categories: &[ObjectCategory],
    ) -> std::result::Result<ObjectCollection, WarehouseError> {
        let scope = qualified(&[database, schema]);
        let mut objects = ObjectCollection::new();

        for category in categories {
            let names = self
                .names(&format!("SHOW {} IN {}", category.show_keyword(), scope))
                .await?;
            objects.insert(*category, names);
        }

        Ok(objects)
    }

    /// Columns of a table or view, in warehouse order
    ///
    /// `object_type` must be `table` or `view`; anything else is rejected
    /// before a query is issued.
    pub async fn columns(
        &self,
        database: &str,
        schema: &str,
        object_name: &str,
        object_type: &str,
    ) -> Result<Vec<ColumnDescriptor>> {
        let kind: ObjectType = object_type
            .parse()
            .map_err(|e: snowscope_core::InvalidObjectType| SnowscopeError::InvalidArgument(e.to_string()))?;

        let sql = format!(
            "SHOW COLUMNS IN {} {}",
            kind.keyword(),
            qualified(&[database, schema, object_name])
        );

        let output = self.warehouse.query(&sql).await.map_err(|e| {
            SnowscopeError::catalog(format!("Error fetching columns for {} {}", kind, object_name), e)
        })?;

        output
            .rows
            .iter()
            .map(|row| {
                Ok(ColumnDescriptor {
                    name: row.text(2)?,
                    data_type: row.text(3)?,
                    nullable: row.text(6)?,
                    default: row.text(7)?,
                    kind: row.text(8)?,
                })
            })
            .collect::<std::result::Result<Vec<_>, WarehouseError>>()
            .map_err(|e| {
                SnowscopeError::catalog(format!("Error fetching columns for {} {}", kind, object_name), e)
            })
    }

    /// `(schema, stage)` pairs for every stage in a database, one query
    pub async fn list_stages(&self, database: &str) -> Result<Vec<(String, String)>> {
        let sql = format!("SHOW STAGES IN DATABASE {}", qualified(&[database]));

        let output = self
            .warehouse
            .query(&sql)
            .await
            .map_err(|e| SnowscopeError::catalog("Error fetching stages", e))?;

        output
            .rows
            .iter()
            .map(|row| Ok((row.text(STAGE_SCHEMA_COLUMN)?, row.text(NAME_COLUMN)?)))
            .collect::<std::result::Result<Vec<_>, WarehouseError>>()
            .map_err(|e| SnowscopeError::catalog("Error fetching stages", e))
    }

    async fn names(&self, sql: &str) -> std::result::Result<Vec<String>, WarehouseError> {
        tracing::debug!(%sql, "Enumerating");
        self.warehouse.query(sql).await?.column_text(NAME_COLUMN)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockWarehouseBuilder;

    #[tokio::test]
    async fn schema_objects_queries_every_category_in_order() {
        let warehouse = MockWarehouseBuilder::new()
            .with_rows("SHOW TABLES IN DB.S", &[&["t", "ORDERS"], &["t", "CUSTOMERS"]])
            .with_rows("SHOW FILE FORMATS IN DB.S", &[&["t", "CSV_FMT"]])
            .build();

        let objects = CatalogWalker::new(&warehouse)
            .schema_objects("DB", "S")
            .await
            .unwrap();

        assert_eq!(objects.tables(), &["ORDERS".to_string(), "CUSTOMERS".to_string()]);
        assert_eq!(objects.get(ObjectCategory::FileFormats), &["CSV_FMT".to_string()]);
        assert!(objects.contains(ObjectCategory::Pipes));
        assert!(objects.get(ObjectCategory::Pipes).is_empty());

        let executed = warehouse.executed().await;
        assert_eq!(executed.len(), 11);
        assert_eq!(executed[0], "SHOW TABLES IN DB.S");
        assert_eq!(executed[5], "SHOW USER FUNCTIONS IN DB.S");
        assert_eq!(executed[10], "SHOW PIPES IN DB.S");
    }

    #[tokio::test]
    async fn schema_objects_fails_fast() {
        let warehouse = MockWarehouseBuilder::new()
            .with_error(
                "SHOW STAGES IN DB.S",
                WarehouseError::QueryError("Insufficient privileges".to_string()),
            )
            .build();

        let result = CatalogWalker::new(&warehouse).schema_objects("DB", "S").await;

        match result {
            Err(SnowscopeError::CatalogError { context, message }) => {
                assert_eq!(context, "Error fetching schema objects");
                assert!(message.contains("Insufficient privileges"));
            }
            other => panic!("Expected CatalogError, got {:?}", other),
        }

        // tables, views, stages; nothing after the failure
        assert_eq!(warehouse.query_count().await, 3);
    }

    #[tokio::test]
    async fn columns_keep_warehouse_order() {
        let warehouse = MockWarehouseBuilder::new()
            .with_rows(
                "SHOW COLUMNS IN VIEW DB.S.V_ORDERS",
                &[
                    &["V_ORDERS", "S", "ZETA", r#"{"type":"TEXT"}"#, "", "", "true", "", "COLUMN"],
                    &["V_ORDERS", "S", "ALPHA", r#"{"type":"FIXED"}"#, "", "", "false", "0", "COLUMN"],
                ],
            )
            .build();

        let columns = CatalogWalker::new(&warehouse)
            .columns("DB", "S", "V_ORDERS", "view")
            .await
            .unwrap();

        assert_eq!(columns.len(), 2);
        assert_eq!(columns[0].name, "ZETA");
        assert_eq!(columns[1].name, "ALPHA");
        assert_eq!(columns[1].default, "0");
        assert_eq!(columns[1].kind, "COLUMN");
        assert!(columns[0].is_nullable());
    }

    #[tokio::test]
    async fn short_column_rows_are_catalog_errors() {
        let warehouse = MockWarehouseBuilder::new()
            .with_rows("SHOW COLUMNS IN TABLE DB.S.T", &[&["T", "S", "ID"]])
            .build();

        let result = CatalogWalker::new(&warehouse).columns("DB", "S", "T", "table").await;
        match result {
            Err(SnowscopeError::CatalogError { context, .. }) => {
                assert_eq!(context, "Error fetching columns for table T")
            }
            other => panic!("Expected CatalogError, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn stages_read_schema_and_name_positions() {
        let warehouse = MockWarehouseBuilder::new()
            .with_rows(
                "SHOW STAGES IN DATABASE RAW",
                &[
                    &["t", "YAML_STAGE", "RAW", "LANDING"],
                    &["t", "SQL_STAGE", "RAW", "SCRIPTS"],
                ],
            )
            .build();

        let stages = CatalogWalker::new(&warehouse).list_stages("RAW").await.unwrap();
        assert_eq!(
            stages,
            vec![
                ("LANDING".to_string(), "YAML_STAGE".to_string()),
                ("SCRIPTS".to_string(), "SQL_STAGE".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn special_names_are_quoted() {
        let warehouse = MockWarehouseBuilder::new()
            .with_rows("SHOW DATABASES", &[&["t", "my-db"]])
            .with_rows("SHOW SCHEMAS IN DATABASE \"my-db\"", &[&["t", "PUBLIC"]])
            .build();

        let tree = CatalogWalker::new(&warehouse).list_data_objects().await.unwrap();
        assert!(tree.schema("my-db", "PUBLIC").is_some());
        assert!(warehouse
            .executed()
            .await
            .contains(&"SHOW TABLES IN \"my-db\".PUBLIC".to_string()));
    }

    #[tokio::test]
    async fn case_sensitive_and_digit_leading_names_round_trip() {
        let warehouse = MockWarehouseBuilder::new()
            .with_rows("SHOW DATABASES", &[&["t", "lower_db"], &["t", "1DB"]])
            .with_rows("SHOW SCHEMAS IN DATABASE \"lower_db\"", &[&["t", "PUBLIC"]])
            .with_rows("SHOW SCHEMAS IN DATABASE \"1DB\"", &[&["t", "core"]])
            .with_rows("SHOW TABLES IN \"lower_db\".PUBLIC", &[&["t", "events"]])
            .build();

        let tree = CatalogWalker::new(&warehouse).list_data_objects().await.unwrap();
        assert_eq!(tree.schema("lower_db", "PUBLIC").unwrap().tables(), &["events".to_string()]);
        assert!(tree.schema("1DB", "core").is_some());

        let executed = warehouse.executed().await;
        assert_eq!(executed[1], "SHOW SCHEMAS IN DATABASE \"lower_db\"");
        assert!(executed.contains(&"SHOW SCHEMAS IN DATABASE \"1DB\"".to_string()));
        assert!(executed.contains(&"SHOW VIEWS IN \"1DB\".\"core\"".to_string()));
    }
}

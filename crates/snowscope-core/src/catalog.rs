//! Catalog model: databases, schemas, object collections and columns

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Category of schema object enumerated with `SHOW <CATEGORY> IN <scope>`
///
/// Declaration order is the order in which a full schema walk queries the
/// warehouse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectCategory {
    Tables,
    Views,
    Stages,
    FileFormats,
    Sequences,
    UserFunctions,
    Functions,
    Procedures,
    Tasks,
    Streams,
    Pipes,
}

impl ObjectCategory {
    /// Every category, in walk order
    pub const ALL: [ObjectCategory; 11] = [
        ObjectCategory::Tables,
        ObjectCategory::Views,
        ObjectCategory::Stages,
        ObjectCategory::FileFormats,
        ObjectCategory::Sequences,
        ObjectCategory::UserFunctions,
        ObjectCategory::Functions,
        ObjectCategory::Procedures,
        ObjectCategory::Tasks,
        ObjectCategory::Streams,
        ObjectCategory::Pipes,
    ];

    /// Categories enumerated by the lightweight database walk
    pub const LIGHTWEIGHT: [ObjectCategory; 2] = [ObjectCategory::Tables, ObjectCategory::Views];

    /// Keyword used in the `SHOW` statement
    pub fn show_keyword(&self) -> &'static str {
        match self {
            Self::Tables => "TABLES",
            Self::Views => "VIEWS",
            Self::Stages => "STAGES",
            Self::FileFormats => "FILE FORMATS",
            Self::Sequences => "SEQUENCES",
            Self::UserFunctions => "USER FUNCTIONS",
            Self::Functions => "FUNCTIONS",
            Self::Procedures => "PROCEDURES",
            Self::Tasks => "TASKS",
            Self::Streams => "STREAMS",
            Self::Pipes => "PIPES",
        }
    }

    /// Stable key used in serialized output
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Tables => "tables",
            Self::Views => "views",
            Self::Stages => "stages",
            Self::FileFormats => "file_formats",
            Self::Sequences => "sequences",
            Self::UserFunctions => "user_functions",
            Self::Functions => "functions",
            Self::Procedures => "procedures",
            Self::Tasks => "tasks",
            Self::Streams => "streams",
            Self::Pipes => "pipes",
        }
    }
}

impl fmt::Display for ObjectCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Object names of one schema, grouped by category
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectCollection {
    objects: BTreeMap<ObjectCategory, Vec<String>>,
}

impl ObjectCollection {
    /// Create an empty collection
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the names of one category, replacing any earlier entry
    pub fn insert(&mut self, category: ObjectCategory, names: Vec<String>) {
        self.objects.insert(category, names);
    }

    /// Names in a category, in warehouse order (empty when not enumerated)
    pub fn get(&self, category: ObjectCategory) -> &[String] {
        self.objects
            .get(&category)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Whether the category was enumerated at all
    pub fn contains(&self, category: ObjectCategory) -> bool {
        self.objects.contains_key(&category)
    }

    pub fn tables(&self) -> &[String] {
        self.get(ObjectCategory::Tables)
    }

    pub fn views(&self) -> &[String] {
        self.get(ObjectCategory::Views)
    }

    /// Enumerated categories with their names
    pub fn iter(&self) -> impl Iterator<Item = (ObjectCategory, &[String])> {
        self.objects.iter().map(|(c, names)| (*c, names.as_slice()))
    }

    /// Total number of objects across all categories
    pub fn total(&self) -> usize {
        self.objects.values().map(Vec::len).sum()
    }
}

/// Nested enumeration: database -> schema -> object collection
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CatalogTree {
    databases: BTreeMap<String, BTreeMap<String, ObjectCollection>>,
}

impl CatalogTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a database with no schemas yet
    pub fn add_database(&mut self, database: impl Into<String>) {
        self.databases.entry(database.into()).or_default();
    }

    /// Record the objects of one schema
    pub fn insert_schema(
        &mut self,
        database: impl Into<String>,
        schema: impl Into<String>,
        objects: ObjectCollection,
    ) {
        self.databases
            .entry(database.into())
            .or_default()
            .insert(schema.into(), objects);
    }

    /// Database names
    pub fn databases(&self) -> impl Iterator<Item = &str> {
        self.databases.keys().map(String::as_str)
    }

    /// Schemas of one database
    pub fn schemas(&self, database: &str) -> Option<&BTreeMap<String, ObjectCollection>> {
        self.databases.get(database)
    }

    /// Objects of one schema
    pub fn schema(&self, database: &str, schema: &str) -> Option<&ObjectCollection> {
        self.databases.get(database).and_then(|s| s.get(schema))
    }

    pub fn len(&self) -> usize {
        self.databases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.databases.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &BTreeMap<String, ObjectCollection>)> {
        self.databases.iter().map(|(db, schemas)| (db.as_str(), schemas))
    }
}

/// Kind of relation whose columns can be described
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectType {
    Table,
    View,
}

impl ObjectType {
    /// Keyword used in `SHOW COLUMNS IN <kind>`
    pub fn keyword(&self) -> &'static str {
        match self {
            Self::Table => "TABLE",
            Self::View => "VIEW",
        }
    }
}

impl fmt::Display for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Table => write!(f, "table"),
            Self::View => write!(f, "view"),
        }
    }
}

/// Rejected object type string
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("object_type must be 'table' or 'view', got '{0}'")]
pub struct InvalidObjectType(pub String);

impl FromStr for ObjectType {
    type Err = InvalidObjectType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "table" => Ok(Self::Table),
            "view" => Ok(Self::View),
            other => Err(InvalidObjectType(other.to_string())),
        }
    }
}

/// One column of a table or view, as reported by `SHOW COLUMNS`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDescriptor {
    /// Column name
    pub name: String,

    /// Declared type as returned by the warehouse (Snowflake returns a JSON
    /// descriptor such as `{"type":"FIXED","precision":38,"scale":0}`)
    #[serde(rename = "type")]
    pub data_type: String,

    /// Raw nullability flag (`true`/`false`, `Y`/`N`, ...)
    pub nullable: String,

    /// Default expression, empty when none
    pub default: String,

    /// Column kind/role tag (e.g. `COLUMN`)
    pub kind: String,
}

impl ColumnDescriptor {
    /// Interpret the raw nullability flag
    pub fn is_nullable(&self) -> bool {
        matches!(
            self.nullable.trim().to_ascii_uppercase().as_str(),
            "TRUE" | "Y" | "YES" | "1"
        )
    }

    /// Base type name, unwrapping Snowflake's JSON type descriptor when present
    pub fn type_name(&self) -> String {
        serde_json::from_str::<serde_json::Value>(&self.data_type)
            .ok()
            .and_then(|v| v.get("type").and_then(|t| t.as_str()).map(str::to_string))
            .unwrap_or_else(|| self.data_type.clone())
    }
}

/// Fully qualified stage name (`database.schema.stage`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StageRef {
    pub database: String,
    pub schema: String,
    pub name: String,
}

impl StageRef {
    pub fn new(
        database: impl Into<String>,
        schema: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            database: database.into(),
            schema: schema.into(),
            name: name.into(),
        }
    }

    /// Fully qualified name
    pub fn fqn(&self) -> String {
        format!("{}.{}.{}", self.database, self.schema, self.name)
    }
}

impl fmt::Display for StageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.fqn())
    }
}

/// Rejected stage name
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("stage must be written as <database>.<schema>.<stage>, got '{0}'")]
pub struct InvalidStageName(pub String);

impl FromStr for StageRef {
    type Err = InvalidStageName;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().trim_start_matches('@');
        let parts: Vec<&str> = s.split('.').collect();
        match parts.as_slice() {
            [db, schema, name] if !db.is_empty() && !schema.is_empty() && !name.is_empty() => {
                Ok(Self::new(*db, *schema, *name))
            }
            _ => Err(InvalidStageName(s.to_string())),
        }
    }
}

/// One entry of a `LIST @stage` result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageFile {
    /// Path as listed (internal stages prefix it with the stage name)
    pub name: String,

    /// Size in bytes
    pub size: u64,

    pub md5: Option<String>,

    pub last_modified: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn category_keywords() {
        assert_eq!(ObjectCategory::FileFormats.show_keyword(), "FILE FORMATS");
        assert_eq!(ObjectCategory::UserFunctions.show_keyword(), "USER FUNCTIONS");
        assert_eq!(ObjectCategory::UserFunctions.as_str(), "user_functions");
        assert_eq!(ObjectCategory::ALL.len(), 11);
    }

    #[test]
    fn collection_defaults_to_empty() {
        let mut objects = ObjectCollection::new();
        objects.insert(ObjectCategory::Tables, vec!["ORDERS".to_string()]);

        assert_eq!(objects.tables(), &["ORDERS".to_string()]);
        assert!(objects.views().is_empty());
        assert!(!objects.contains(ObjectCategory::Views));
        assert_eq!(objects.total(), 1);
    }

    #[test]
    fn collection_serializes_with_category_keys() {
        let mut objects = ObjectCollection::new();
        objects.insert(ObjectCategory::Tables, vec!["A".to_string()]);
        objects.insert(ObjectCategory::FileFormats, vec![]);

        let json = serde_json::to_value(&objects).unwrap();
        assert_eq!(json, serde_json::json!({"tables": ["A"], "file_formats": []}));
    }

    #[test]
    fn catalog_tree_nesting() {
        let mut tree = CatalogTree::new();
        tree.add_database("EMPTY_DB");
        tree.insert_schema("SALES", "PUBLIC", ObjectCollection::new());

        assert_eq!(tree.len(), 2);
        assert_eq!(tree.databases().collect::<Vec<_>>(), vec!["EMPTY_DB", "SALES"]);
        assert!(tree.schemas("EMPTY_DB").unwrap().is_empty());
        assert!(tree.schema("SALES", "PUBLIC").is_some());
        assert!(tree.schema("SALES", "MISSING").is_none());
    }

    #[test]
    fn object_type_parsing() {
        assert_eq!("table".parse::<ObjectType>(), Ok(ObjectType::Table));
        assert_eq!("view".parse::<ObjectType>(), Ok(ObjectType::View));
        assert_eq!(
            "index".parse::<ObjectType>(),
            Err(InvalidObjectType("index".to_string()))
        );
        assert_eq!(ObjectType::View.keyword(), "VIEW");
    }

    #[test]
    fn column_type_name_unwraps_json() {
        let column = ColumnDescriptor {
            name: "ID".to_string(),
            data_type: r#"{"type":"FIXED","precision":38,"scale":0,"nullable":false}"#.to_string(),
            nullable: "false".to_string(),
            default: String::new(),
            kind: "COLUMN".to_string(),
        };
        assert_eq!(column.type_name(), "FIXED");
        assert!(!column.is_nullable());

        let plain = ColumnDescriptor {
            data_type: "VARCHAR".to_string(),
            nullable: "Y".to_string(),
            ..column
        };
        assert_eq!(plain.type_name(), "VARCHAR");
        assert!(plain.is_nullable());
    }

    #[test]
    fn stage_ref_parsing() {
        let stage: StageRef = "@RAW.LANDING.YAML_STAGE".parse().unwrap();
        assert_eq!(stage, StageRef::new("RAW", "LANDING", "YAML_STAGE"));
        assert_eq!(stage.to_string(), "RAW.LANDING.YAML_STAGE");

        assert!("RAW.YAML_STAGE".parse::<StageRef>().is_err());
        assert!("RAW..STAGE".parse::<StageRef>().is_err());
    }
}

//! Stage file access: listing, presigned URLs and content retrieval
//!
//! File content never flows through the warehouse connection. A presigned
//! URL is generated with `GET_PRESIGNED_URL` and the body is downloaded over
//! plain HTTP by a [`ContentFetcher`].

use crate::adapter::{Warehouse, WarehouseError};
use crate::error::{Result, SnowscopeError};
use crate::quote::{ident, literal};
use serde::Serialize;
use snowscope_core::{StageFile, StageRef};
use std::collections::BTreeMap;
use std::sync::Arc;

const FETCH_CONTEXT: &str = "Error fetching file from presigned URL";

/// Downloads the body behind a URL
#[async_trait::async_trait]
pub trait ContentFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<String>;
}

/// Plain HTTP GET with the client's default redirects and timeouts; no retry
#[derive(Debug, Clone, Default)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait::async_trait]
impl ContentFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<String> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| SnowscopeError::fetch(FETCH_CONTEXT, e))?
            .error_for_status()
            .map_err(|e| SnowscopeError::fetch(FETCH_CONTEXT, e))?;

        response
            .text()
            .await
            .map_err(|e| SnowscopeError::fetch(FETCH_CONTEXT, e))
    }
}

/// Outcome of reading one YAML file from a stage
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum YamlFile {
    Parsed(serde_yaml::Value),
    Error(String),
}

impl YamlFile {
    pub fn is_parsed(&self) -> bool {
        matches!(self, YamlFile::Parsed(_))
    }
}

/// Stage operations over one warehouse session
pub struct StageAccess<'a> {
    warehouse: &'a dyn Warehouse,
    fetcher: Arc<dyn ContentFetcher>,
}

impl<'a> StageAccess<'a> {
    /// Stage access downloading over HTTP
    pub fn new(warehouse: &'a dyn Warehouse) -> Self {
        Self::with_fetcher(warehouse, Arc::new(HttpFetcher::new()))
    }

    pub fn with_fetcher(warehouse: &'a dyn Warehouse, fetcher: Arc<dyn ContentFetcher>) -> Self {
        Self { warehouse, fetcher }
    }

    /// File names in a stage, as listed
    ///
    /// When `database` is given, `USE DATABASE` is issued first. That
    /// changes the current database for every later statement on the
    /// session.
    pub async fn list_files(&self, stage: &StageRef, database: Option<&str>) -> Result<Vec<String>> {
        let output = self.list(stage, database).await?;
        output
            .column_text(0)
            .map_err(|e| list_error(stage, e))
    }

    /// Full `LIST` entries of a stage
    pub async fn list_file_entries(
        &self,
        stage: &StageRef,
        database: Option<&str>,
    ) -> Result<Vec<StageFile>> {
        let output = self.list(stage, database).await?;

        output
            .rows
            .iter()
            .map(|row| {
                let name = row.text(0)?;
                let size = row.get(1).and_then(|s| s.trim().parse().ok()).unwrap_or(0);
                Ok(StageFile {
                    name,
                    size,
                    md5: row.get(2).map(str::to_string),
                    last_modified: row.get(3).map(str::to_string),
                })
            })
            .collect::<std::result::Result<Vec<_>, WarehouseError>>()
            .map_err(|e| list_error(stage, e))
    }

    async fn list(
        &self,
        stage: &StageRef,
        database: Option<&str>,
    ) -> Result<crate::adapter::QueryOutput> {
        if let Some(database) = database {
            self.warehouse
                .query(&format!("USE DATABASE {}", ident(database)))
                .await
                .map_err(|e| list_error(stage, e))?;
        }

        self.warehouse
            .query(&format!("LIST @{}", stage_path(stage)))
            .await
            .map_err(|e| list_error(stage, e))
    }

    /// Time-limited download URL for a staged file
    pub async fn presigned_url(&self, stage: &StageRef, file: &str) -> Result<String> {
        self.url_function("GET_PRESIGNED_URL", stage, file)
            .await
            .map_err(|e| {
                SnowscopeError::fetch(
                    format!("Error generating presigned URL for {} in stage {}", file, stage),
                    e,
                )
            })
    }

    /// Permanent, access-controlled URL for a staged file
    pub async fn stage_file_url(&self, stage: &StageRef, file: &str) -> Result<String> {
        self.url_function("BUILD_STAGE_FILE_URL", stage, file)
            .await
            .map_err(|e| {
                SnowscopeError::fetch(
                    format!("Error building file URL for {} in stage {}", file, stage),
                    e,
                )
            })
    }

    async fn url_function(
        &self,
        function: &str,
        stage: &StageRef,
        file: &str,
    ) -> std::result::Result<String, WarehouseError> {
        let sql = format!(
            "SELECT {}({}, {})",
            function,
            literal(&format!("@{}", stage_path(stage))),
            literal(relative_path(stage, file))
        );
        self.warehouse.query(&sql).await?.scalar()
    }

    /// Body behind a URL
    pub async fn fetch_content(&self, url: &str) -> Result<String> {
        self.fetcher.fetch(url).await
    }

    /// Content of one staged file
    pub async fn read_file(&self, stage: &StageRef, file: &str) -> Result<String> {
        let url = self.presigned_url(stage, file).await?;
        self.fetch_content(&url).await.map_err(|e| {
            SnowscopeError::fetch(format!("Error reading file {} from stage {}", file, stage), e)
        })
    }

    /// Every `.yaml`/`.yml` file in a stage, parsed
    ///
    /// Files are read independently: a file that cannot be read or parsed is
    /// recorded as [`YamlFile::Error`] and the rest are still read. Only the
    /// listing itself fails the call.
    pub async fn read_yaml_files(
        &self,
        stage: &StageRef,
        database: Option<&str>,
    ) -> Result<BTreeMap<String, YamlFile>> {
        let files = self.list_files(stage, database).await?;
        let mut parsed = BTreeMap::new();

        for file in files.into_iter().filter(|f| is_yaml(f)) {
            let entry = match self.read_file(stage, &file).await {
                Ok(content) => match serde_yaml::from_str::<serde_yaml::Value>(&content) {
                    Ok(value) => YamlFile::Parsed(value),
                    Err(e) => YamlFile::Error(format!("Error reading/parsing: {}", e)),
                },
                Err(e) => YamlFile::Error(format!("Error reading/parsing: {}", e)),
            };

            if let YamlFile::Error(message) = &entry {
                tracing::warn!(%stage, %file, %message, "Skipping unreadable YAML file");
            }
            parsed.insert(file, entry);
        }

        Ok(parsed)
    }
}

fn list_error(stage: &StageRef, cause: impl ToString) -> SnowscopeError {
    SnowscopeError::catalog(format!("Error listing files in stage {}", stage), cause)
}

fn stage_path(stage: &StageRef) -> String {
    format!(
        "{}.{}.{}",
        ident(&stage.database),
        ident(&stage.schema),
        ident(&stage.name)
    )
}

fn is_yaml(name: &str) -> bool {
    let lower = name.to_lowercase();
    lower.ends_with(".yaml") || lower.ends_with(".yml")
}

/// Path relative to the stage root
///
/// `LIST` on an internal stage prefixes names with the lowercased stage
/// name (`mystage/dir/a.yaml`); URL functions expect the path without it.
fn relative_path<'f>(stage: &StageRef, file: &'f str) -> &'f str {
    match file.split_once('/') {
        Some((head, rest)) if head.eq_ignore_ascii_case(&stage.name) => rest,
        _ => file,
    }
}

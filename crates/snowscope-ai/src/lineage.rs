//! Lineage diagram generation
//!
//! The prompt combines a preview of a lineage CSV, the full text of pipeline
//! source files and styling rules derived from [`LineageOptions`]. The model
//! is asked for raw Graphviz DOT; replies that are not DOT are kept as text.

use crate::client::{strip_code_fence, ChatModel, ChatRequest};
use crate::error::{AiError, Result};
use snowscope_core::{LineageConfig, LlmConfig};
use std::fmt;
use std::str::FromStr;

/// Rows of the lineage CSV included in the prompt
pub const CSV_PREVIEW_ROWS: usize = 200;

const SYSTEM_PROMPT: &str = "You are an expert data engineer. Given lineage CSV and pipeline code, \
produce a styled Graphviz DOT diagram describing end-to-end lineage. Use rankdir=LR, \
distinct nodes for sources, transformations, tables, views; edges show data flow. \
Output ONLY valid DOT text (no markdown fences, no commentary).";

const CONSTRAINTS: &str = "Constraints:
- Return ONLY raw DOT starting with 'digraph' and ending with '}'.
- Use rankdir=LR; cluster by system or schema if clear.
- Use readable labels; keep graph under 200 nodes if necessary.
";

/// Colour scheme requested for the diagram
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineageTheme {
    #[default]
    Vibrant,
    Muted,
    Monochrome,
}

/// Fill and stroke colours for each node role
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    pub graph_bg: &'static str,
    pub edge: &'static str,
    pub node_border: &'static str,
    pub source_fill: &'static str,
    pub transform_fill: &'static str,
    pub table_fill: &'static str,
    pub view_fill: &'static str,
    pub stage_fill: &'static str,
    pub target_border: &'static str,
    pub target_fill: &'static str,
}

impl LineageTheme {
    /// Theme by name, case-insensitive; unknown names fall back to vibrant
    pub fn from_name(name: &str) -> Self {
        name.parse().unwrap_or_default()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LineageTheme::Vibrant => "vibrant",
            LineageTheme::Muted => "muted",
            LineageTheme::Monochrome => "monochrome",
        }
    }

    pub fn palette(&self) -> Palette {
        match self {
            LineageTheme::Vibrant => Palette {
                graph_bg: "white",
                edge: "#7A7A7A",
                node_border: "#333333",
                source_fill: "#A7E3FF",
                transform_fill: "#FFD59E",
                table_fill: "#BBDEFB",
                view_fill: "#D1C4E9",
                stage_fill: "#ECEFF1",
                target_border: "#E53935",
                target_fill: "#FFCDD2",
            },
            LineageTheme::Muted => Palette {
                graph_bg: "white",
                edge: "#8E8E8E",
                node_border: "#6D6D6D",
                source_fill: "#CFE8FF",
                transform_fill: "#FFE9C6",
                table_fill: "#E6F0FA",
                view_fill: "#E8DDF0",
                stage_fill: "#F2F4F7",
                target_border: "#C62828",
                target_fill: "#FFEBEE",
            },
            LineageTheme::Monochrome => Palette {
                graph_bg: "white",
                edge: "#555555",
                node_border: "#333333",
                source_fill: "#DDDDDD",
                transform_fill: "#BBBBBB",
                table_fill: "#EEEEEE",
                view_fill: "#CCCCCC",
                stage_fill: "#F5F5F5",
                target_border: "#111111",
                target_fill: "#FFFFFF",
            },
        }
    }
}

impl fmt::Display for LineageTheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LineageTheme {
    type Err = AiError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "vibrant" => Ok(LineageTheme::Vibrant),
            "muted" => Ok(LineageTheme::Muted),
            "monochrome" => Ok(LineageTheme::Monochrome),
            other => Err(AiError::InvalidInput(format!(
                "unknown theme '{}', expected vibrant, muted or monochrome",
                other
            ))),
        }
    }
}

/// What the diagram should show and how
#[derive(Debug, Clone, PartialEq)]
pub struct LineageOptions {
    /// Node to focus on; the diagram is limited to `max_hops` around it
    pub target: Option<String>,
    pub max_hops: u32,
    pub theme: LineageTheme,
    pub detail_level: String,
    pub include_sql_snippets: bool,
    pub snippet_max_chars: usize,
    pub show_edge_labels: bool,
    pub show_node_tooltips: bool,
    pub include_ctes: bool,
    pub include_column_lineage: bool,
    pub include_file_and_stage_sources: bool,
    pub additional_instructions: String,
}

impl Default for LineageOptions {
    fn default() -> Self {
        Self {
            target: None,
            max_hops: 2,
            theme: LineageTheme::Vibrant,
            detail_level: "high".to_string(),
            include_sql_snippets: false,
            snippet_max_chars: 180,
            show_edge_labels: true,
            show_node_tooltips: true,
            include_ctes: true,
            include_column_lineage: true,
            include_file_and_stage_sources: true,
            additional_instructions: String::new(),
        }
    }
}

impl LineageOptions {
    /// Defaults with theme, hops and detail level taken from configuration
    pub fn from_config(config: &LineageConfig) -> Self {
        Self {
            max_hops: config.max_hops,
            theme: LineageTheme::from_name(&config.theme),
            detail_level: config.detail_level.clone(),
            ..Self::default()
        }
    }
}

/// A pipeline source file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeBlob {
    pub name: String,
    pub content: String,
}

impl CodeBlob {
    pub fn new(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
        }
    }

    pub fn language(&self) -> &'static str {
        language_tag(&self.name)
    }
}

/// Language of a source file by extension, empty when unknown
pub fn language_tag(file_name: &str) -> &'static str {
    let lower = file_name.to_lowercase();
    if lower.ends_with(".sql") {
        "SQL"
    } else if lower.ends_with(".py") {
        "Python"
    } else if lower.ends_with(".java") {
        "Java"
    } else if lower.ends_with(".scala") {
        "Scala"
    } else {
        ""
    }
}

/// Parsed lineage CSV: header row plus records
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LineageCsv {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl LineageCsv {
    pub fn parse(text: &str) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_reader(text.as_bytes());

        let headers = reader
            .headers()
            .map_err(|e| AiError::InvalidInput(format!("lineage CSV: {}", e)))?
            .iter()
            .map(str::to_string)
            .collect();

        let rows = reader
            .records()
            .map(|record| {
                record
                    .map(|r| r.iter().map(str::to_string).collect())
                    .map_err(|e| AiError::InvalidInput(format!("lineage CSV: {}", e)))
            })
            .collect::<Result<Vec<Vec<String>>>>()?;

        Ok(Self { headers, rows })
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Prompt section with the headers and the first rows as JSON objects
    fn prompt_section(&self) -> String {
        let headers = self
            .headers
            .iter()
            .map(|h| json_string(h))
            .collect::<Vec<_>>()
            .join(", ");

        let rows = self
            .rows
            .iter()
            .take(CSV_PREVIEW_ROWS)
            .map(|row| {
                let fields = self
                    .headers
                    .iter()
                    .zip(row.iter())
                    .map(|(h, v)| format!("{}: {}", json_string(h), json_string(v)))
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("{{{}}}", fields)
            })
            .collect::<Vec<_>>()
            .join(",\n");

        format!(
            "CSV headers: [{}]\nSample rows (up to {}):\n{}\n",
            headers, CSV_PREVIEW_ROWS, rows
        )
    }
}

fn json_string(value: &str) -> String {
    serde_json::Value::String(value.to_string()).to_string()
}

/// A lineage diagram as returned by the model
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineageDiagram {
    /// Graphviz source, fences removed
    Dot(String),

    /// Anything that does not look like a digraph
    Raw(String),
}

impl LineageDiagram {
    pub fn text(&self) -> &str {
        match self {
            LineageDiagram::Dot(text) | LineageDiagram::Raw(text) => text,
        }
    }

    pub fn is_dot(&self) -> bool {
        matches!(self, LineageDiagram::Dot(_))
    }
}

fn focus_clause(options: &LineageOptions, palette: &Palette) -> String {
    match &options.target {
        Some(target) if !target.trim().is_empty() => format!(
            "Focus on the target node named '{target}'. Include only nodes within {hops} hops \
upstream and {hops} hops downstream of the target. Highlight the target with penwidth=3, \
color=\"{border}\", fillcolor=\"{fill}\".\n",
            target = target,
            hops = options.max_hops,
            border = palette.target_border,
            fill = palette.target_fill,
        ),
        _ => String::new(),
    }
}

fn style_clause(options: &LineageOptions, palette: &Palette) -> String {
    let mut parts = vec![
        "Style requirements (mandatory):".to_string(),
        format!(
            "- graph [bgcolor=\"{}\", rankdir=LR]; edge [color=\"{}\", arrowsize=0.7, penwidth=1];",
            palette.graph_bg, palette.edge
        ),
        format!(
            "- node [style=filled, color=\"{}\", fontname=\"Helvetica\", fontsize=10];",
            palette.node_border
        ),
        format!("- sources/external nodes: shape=cylinder, fillcolor=\"{}\";", palette.source_fill),
        format!(
            "- transformation nodes (SQL/Python jobs): shape=box3d, fillcolor=\"{}\";",
            palette.transform_fill
        ),
        format!(
            "- tables: shape=box, fillcolor=\"{}\"; views: shape=component, fillcolor=\"{}\";",
            palette.table_fill, palette.view_fill
        ),
        format!("- staging/temp artifacts: shape=folder, fillcolor=\"{}\";", palette.stage_fill),
        "- cluster by system/schema using subgraph cluster_* with readable labels;".to_string(),
    ];
    if options.show_edge_labels {
        parts.push("- include edge labels describing operation (e.g., JOIN on id, GROUP BY, FILTER).".to_string());
    }
    if options.show_node_tooltips {
        parts.push("- include node tooltips summarizing key transformations/aggregations.".to_string());
    }
    parts.push("- keep result under 200 nodes; prune minor nodes if needed.\n".to_string());
    parts.join("\n") + "\n"
}

fn detail_clause(options: &LineageOptions) -> String {
    let mut parts = vec![
        "Details to extract from code and CSV (prioritize accuracy):".to_string(),
        "- Joins: type (INNER/LEFT/RIGHT/FULL), keys/conditions.".to_string(),
        "- Aggregations: functions (SUM, COUNT, AVG, MIN, MAX), group-by columns.".to_string(),
        "- Projections/renames: key selected columns and aliases.".to_string(),
        "- Filters: WHERE predicates.".to_string(),
        "- Windows: partition/order and functions.".to_string(),
        "- Materializations: table/view names; note temp/stage objects.".to_string(),
    ];
    if options.include_ctes {
        parts.push("- Common Table Expressions (CTEs): treat named CTEs as transformation nodes; show edges from their inputs.".to_string());
    }
    if options.include_file_and_stage_sources {
        parts.push("- External sources: S3/GCS/Azure stages and COPY INTO; add source nodes for stages and files if referenced.".to_string());
    }
    if options.include_column_lineage {
        parts.push("- Column-level lineage: when clear, add edge labels like colA->colB for key columns.".to_string());
    }
    if options.include_sql_snippets {
        parts.push("- Include concise SQL snippet excerpts per transformation (truncated).".to_string());
        parts.push(format!(
            "- Truncate any SQL snippet to <= {} chars.",
            options.snippet_max_chars
        ));
    }
    if options.show_edge_labels {
        parts.push("- Prefer edge labels for operation types; keep them short.".to_string());
    }
    if options.show_node_tooltips {
        parts.push("- Use node 'tooltip' to hold multi-line summaries; keep UI-friendly.".to_string());
    }
    parts.push(format!("- Level of detail: {}.", options.detail_level));
    parts.join("\n") + "\n"
}

fn code_section(blobs: &[CodeBlob]) -> String {
    blobs
        .iter()
        .map(|blob| {
            format!(
                "FILE: {} (language: {})\n{}",
                blob.name,
                blob.language(),
                blob.content
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Prompt for a lineage diagram
///
/// Source files are included in full. Either input may be empty.
pub fn build_lineage_request(
    config: &LlmConfig,
    csv: Option<&LineageCsv>,
    blobs: &[CodeBlob],
    options: &LineageOptions,
) -> ChatRequest {
    let palette = options.theme.palette();

    let mut user = String::from("Create a lineage diagram in Graphviz DOT format.\n\n");
    user.push_str(&focus_clause(options, &palette));
    user.push_str(&style_clause(options, &palette));
    user.push_str(&detail_clause(options));

    if let Some(csv) = csv.filter(|c| !c.is_empty()) {
        user.push_str("LINEAGE CSV:\n");
        user.push_str(&csv.prompt_section());
        user.push_str("\n\n");
    }

    if !blobs.is_empty() {
        user.push_str("PIPELINE CODE SNIPPETS:\n");
        user.push_str(&code_section(blobs));
        user.push_str("\n\n");
    }

    if !options.additional_instructions.trim().is_empty() {
        user.push_str("ADDITIONAL INSTRUCTIONS:\n");
        user.push_str(&options.additional_instructions);
        user.push('\n');
    }

    user.push_str(CONSTRAINTS);

    ChatRequest {
        system: SYSTEM_PROMPT.to_string(),
        user,
        model: config.model.clone(),
        temperature: config.lineage_temperature,
    }
}

/// Interpret a lineage reply; never fails
pub fn parse_lineage_response(text: &str) -> LineageDiagram {
    let body = strip_code_fence(text);
    if body.starts_with("digraph") && body.ends_with('}') {
        LineageDiagram::Dot(body.to_string())
    } else {
        LineageDiagram::Raw(body.to_string())
    }
}

/// Generate a lineage diagram from a lineage CSV and pipeline sources
pub async fn generate_lineage(
    model: &dyn ChatModel,
    config: &LlmConfig,
    csv: Option<&LineageCsv>,
    blobs: &[CodeBlob],
    options: &LineageOptions,
) -> Result<LineageDiagram> {
    if csv.map_or(true, LineageCsv::is_empty) && blobs.is_empty() {
        return Err(AiError::InvalidInput(
            "a lineage CSV or at least one source file is required".to_string(),
        ));
    }

    let request = build_lineage_request(config, csv, blobs, options);
    let reply = model.complete(&request).await?;

    let diagram = parse_lineage_response(&reply);
    if !diagram.is_dot() {
        tracing::warn!("Lineage reply is not a DOT digraph; returning raw text");
    }
    Ok(diagram)
}

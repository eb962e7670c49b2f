//! Business glossary generation from semantic YAML

use crate::client::{strip_code_fence, ChatModel, ChatRequest};
use crate::error::{AiError, Result};
use serde_json::{Map, Value};
use snowscope_core::LlmConfig;

const SYSTEM_PROMPT: &str = "You write precise, unambiguous business glossaries.";

const INSTRUCTIONS: &str = "You are a data governance expert. Given the following semantic YAML, produce a business glossary.
Requirements:
- Return JSON only (no prose).
- Include a per-column glossary with definitions and synonyms.
- JSON keys: columns (array of {table, column, definition, synonyms}), terms (optional array of {term, definition, related_columns, tables, dq_notes}).
- In columns.synonyms, include up to 5 concise, business-friendly synonyms; omit duplicates.

";

/// A glossary as returned by the model
#[derive(Debug, Clone, PartialEq)]
pub enum GlossaryResult {
    /// The reply was a JSON object; usually holds `columns` and `terms`
    Structured(Map<String, Value>),

    /// Anything else, kept verbatim for display
    Raw(String),
}

impl GlossaryResult {
    /// Entries of the `columns` array, if present
    ///
    /// Replies that nest the glossary as `business_glossary.columns` are
    /// read from there when no top-level `columns` key exists.
    pub fn columns(&self) -> &[Value] {
        match self {
            GlossaryResult::Structured(map) if !map.contains_key("columns") => map
                .get("business_glossary")
                .and_then(|nested| nested.get("columns"))
                .and_then(Value::as_array)
                .map(Vec::as_slice)
                .unwrap_or(&[]),
            _ => self.array("columns"),
        }
    }

    /// Entries of the `terms` array, if present
    pub fn terms(&self) -> &[Value] {
        self.array("terms")
    }

    fn array(&self, key: &str) -> &[Value] {
        match self {
            GlossaryResult::Structured(map) => map
                .get(key)
                .and_then(Value::as_array)
                .map(Vec::as_slice)
                .unwrap_or(&[]),
            GlossaryResult::Raw(_) => &[],
        }
    }

    /// JSON view; raw replies become `{"text": ...}`
    pub fn to_json(&self) -> Value {
        match self {
            GlossaryResult::Structured(map) => Value::Object(map.clone()),
            GlossaryResult::Raw(text) => {
                let mut map = Map::new();
                map.insert("text".to_string(), Value::String(text.clone()));
                Value::Object(map)
            }
        }
    }
}

/// Prompt for a glossary of `yaml_content`
///
/// The YAML is parsed and re-emitted so the model sees a normalized
/// document; YAML that does not parse is rejected.
pub fn build_glossary_request(config: &LlmConfig, yaml_content: &str) -> Result<ChatRequest> {
    let parsed: serde_yaml::Value = serde_yaml::from_str(yaml_content)
        .map_err(|e| AiError::InvalidInput(format!("semantic YAML does not parse: {}", e)))?;

    let normalized = serde_yaml::to_string(&parsed)
        .map_err(|e| AiError::InvalidInput(format!("semantic YAML cannot be re-emitted: {}", e)))?;

    Ok(ChatRequest {
        system: SYSTEM_PROMPT.to_string(),
        user: format!("{}{}", INSTRUCTIONS, normalized),
        model: config.model.clone(),
        temperature: config.glossary_temperature,
    })
}

/// Interpret a glossary reply
///
/// A surrounding code fence is ignored. Only a JSON object is structured;
/// other JSON values and non-JSON text are raw.
pub fn parse_glossary_response(text: &str) -> GlossaryResult {
    match serde_json::from_str::<Value>(strip_code_fence(text)) {
        Ok(Value::Object(map)) => GlossaryResult::Structured(map),
        _ => GlossaryResult::Raw(text.to_string()),
    }
}

/// Generate a business glossary for a semantic YAML document
pub async fn generate_glossary(
    model: &dyn ChatModel,
    config: &LlmConfig,
    yaml_content: &str,
) -> Result<GlossaryResult> {
    let request = build_glossary_request(config, yaml_content)?;
    let reply = model.complete(&request).await?;

    let result = parse_glossary_response(&reply);
    if let GlossaryResult::Raw(_) = result {
        tracing::warn!("Glossary reply is not a JSON object; returning raw text");
    }
    Ok(result)
}

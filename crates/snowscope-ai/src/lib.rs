//! LLM-backed metadata generation
//!
//! - Business glossaries from semantic YAML
//! - Graphviz lineage diagrams from a lineage CSV and pipeline code
//! - Semantic model generation through an external API
//!
//! Prompt text is assembled here; the completion itself is delegated to a
//! [`ChatModel`]. Responses are never trusted to follow the requested shape:
//! glossaries and diagrams that do not parse are returned as raw text.

pub mod client;
pub mod error;
pub mod glossary;
pub mod lineage;
pub mod semantic;

pub use client::{strip_code_fence, ChatModel, ChatRequest, MockChatModel, OpenAiClient};
pub use error::AiError;
pub use glossary::{build_glossary_request, generate_glossary, parse_glossary_response, GlossaryResult};
pub use lineage::{
    build_lineage_request, generate_lineage, language_tag, parse_lineage_response, CodeBlob,
    LineageCsv, LineageDiagram, LineageOptions, LineageTheme, Palette,
};
pub use semantic::{SemanticModelClient, SemanticModelInputs};

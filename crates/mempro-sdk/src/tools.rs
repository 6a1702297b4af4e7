//! Agent tool surface.
//!
//! Provides framework-neutral tools that forward to the memory service:
//! - memory_memorize: Store a fact through the full hierarchy
//! - memory_retrieve: Search facts with their themes and episodes
//! - memory_stats: Record counts per level

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::debug;

use mempro_core::MemoryType;

use crate::service::{DEFAULT_CONFIDENCE, MemorizeOptions, MemoryService};
use crate::{SDKError, SDKResult};

/// Tool descriptor with a JSON Schema for its arguments
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDefinition {
    /// Tool name (unique)
    pub name: String,
    /// Display name
    pub display_name: String,
    /// Description
    pub description: String,
    /// Input schema (JSON Schema)
    pub input_schema: Value,
    /// Whether tool has side effects
    pub has_side_effects: bool,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct MemorizeArgs {
    content: String,
    #[serde(default, rename = "type")]
    memory_type: MemoryType,
    #[serde(default)]
    entities: Vec<String>,
    #[serde(default)]
    confidence: Option<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RetrieveArgs {
    query: String,
    #[serde(default)]
    top_k: Option<usize>,
}

/// Memory tools bound to one service
pub struct MemoryTools {
    service: Arc<MemoryService>,
}

impl MemoryTools {
    pub const MEMORIZE: &'static str = "memory_memorize";
    pub const RETRIEVE: &'static str = "memory_retrieve";
    pub const STATS: &'static str = "memory_stats";

    pub fn new(service: Arc<MemoryService>) -> Self {
        Self { service }
    }

    /// Descriptors for every tool
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        let types: Vec<&str> = MemoryType::ALL.iter().map(MemoryType::as_str).collect();
        let default_top_k = self.service.config().retrieval.default_top_k;

        vec![
            ToolDefinition {
                name: Self::MEMORIZE.into(),
                display_name: "Memorize".into(),
                description: "Store a memory with automatic hierarchy classification. The content becomes an original utterance, an episode, and a fact; the fact joins a theme named after its first matching entity.".into(),
                input_schema: json!({
                    "type": "object",
                    "properties": {
                        "content": {
                            "type": "string",
                            "description": "Content to remember"
                        },
                        "type": {
                            "type": "string",
                            "enum": types,
                            "default": "fact",
                            "description": "Kind of knowledge"
                        },
                        "entities": {
                            "type": "array",
                            "items": { "type": "string" },
                            "description": "Labels used to cluster the fact into themes"
                        },
                        "confidence": {
                            "type": "number",
                            "minimum": 0,
                            "maximum": 1,
                            "default": DEFAULT_CONFIDENCE,
                            "description": "Confidence score (0-1)"
                        }
                    },
                    "required": ["content"]
                }),
                has_side_effects: true,
            },
            ToolDefinition {
                name: Self::RETRIEVE.into(),
                display_name: "Retrieve".into(),
                description: "Retrieve facts matching a query, with their themes and source episodes.".into(),
                input_schema: json!({
                    "type": "object",
                    "properties": {
                        "query": {
                            "type": "string",
                            "description": "Search query"
                        },
                        "top_k": {
                            "type": "integer",
                            "minimum": 1,
                            "default": default_top_k,
                            "description": "Maximum number of facts"
                        }
                    },
                    "required": ["query"]
                }),
                has_side_effects: false,
            },
            ToolDefinition {
                name: Self::STATS.into(),
                display_name: "Memory Stats".into(),
                description: "Get memory system statistics.".into(),
                input_schema: json!({
                    "type": "object",
                    "properties": {}
                }),
                has_side_effects: false,
            },
        ]
    }

    /// Run a tool by name with JSON arguments
    pub async fn execute(&self, name: &str, args: Value) -> SDKResult<Value> {
        debug!(tool = name, "executing memory tool");

        match name {
            Self::MEMORIZE => {
                let args: MemorizeArgs = parse_args(name, args)?;
                let options = MemorizeOptions {
                    memory_type: args.memory_type,
                    entities: args.entities,
                    confidence: args.confidence.unwrap_or(DEFAULT_CONFIDENCE),
                    ..Default::default()
                };
                let result = self.service.memorize(&args.content, options).await?;
                Ok(serde_json::to_value(result)?)
            }
            Self::RETRIEVE => {
                let args: RetrieveArgs = parse_args(name, args)?;
                if args.top_k == Some(0) {
                    return Err(SDKError::invalid_operation(format!(
                        "invalid arguments for {name}: top_k must be at least 1"
                    )));
                }
                let result = self.service.retrieve(&args.query, args.top_k).await?;
                Ok(serde_json::to_value(result)?)
            }
            Self::STATS => {
                let stats = self.service.stats().await?;
                Ok(serde_json::to_value(stats)?)
            }
            other => Err(SDKError::invalid_operation(format!("unknown tool: {other}"))),
        }
    }
}

fn parse_args<T: serde::de::DeserializeOwned>(tool: &str, args: Value) -> SDKResult<T> {
    // Tools without arguments may be called with null
    let args = if args.is_null() { json!({}) } else { args };
    serde_json::from_value(args)
        .map_err(|e| SDKError::invalid_operation(format!("invalid arguments for {tool}: {e}")))
}

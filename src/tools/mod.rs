//! Caller-facing tool surface.
//!
//! Lists the built-in tools plus every dynamic capability as
//! `{name, description, inputSchema}` objects, and dispatches tool calls.
//! A call to a name nobody registered asks the capability registry to
//! generate one from the name.  Every failure is returned as a tagged
//! [`ToolOutcome::Failure`]; nothing propagates to the caller.

pub mod builtins;

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use crate::engine::QueryEngine;
use crate::error::EngineError;
use crate::text::naive_stem;

// ── Tool metadata ───────────────────────────────────────────

/// Metadata describing one callable tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolMeta {
    /// Short machine-friendly name (e.g. `"translate_query"`).
    pub name: String,
    /// Human-readable one-liner describing what the tool does.
    pub description: String,
    /// JSON Schema object describing the expected arguments.
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

/// Result of a tool call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ToolOutcome {
    Success { content: Value },
    Failure { kind: String, message: String },
}

impl ToolOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ToolOutcome::Success { .. })
    }

    /// Failure tag, if this is a failure.
    pub fn kind(&self) -> Option<&str> {
        match self {
            ToolOutcome::Success { .. } => None,
            ToolOutcome::Failure { kind, .. } => Some(kind),
        }
    }
}

/// Argument problems raised by built-in tools.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("invalid arguments: {0}")]
    InvalidArguments(String),
    #[error("not found: {0}")]
    NotFound(String),
}

impl ToolError {
    pub fn kind(&self) -> &'static str {
        match self {
            ToolError::InvalidArguments(_) => "invalid_arguments",
            ToolError::NotFound(_) => "not_found",
        }
    }
}

fn failure_from(err: anyhow::Error) -> ToolOutcome {
    let kind = if let Some(e) = err.downcast_ref::<EngineError>() {
        e.kind()
    } else if let Some(e) = err.downcast_ref::<ToolError>() {
        e.kind()
    } else {
        "internal"
    };
    ToolOutcome::Failure {
        kind: kind.to_string(),
        message: err.to_string(),
    }
}

// ── Surface ─────────────────────────────────────────────────

/// Built-in tools plus the engine's dynamic capabilities.
pub struct ToolSurface {
    engine: Arc<QueryEngine>,
    builtins: Vec<ToolMeta>,
}

impl ToolSurface {
    pub fn new(engine: Arc<QueryEngine>) -> Self {
        let mut builtins = Vec::new();
        builtins::query::register(&mut builtins);
        builtins::sources::register(&mut builtins);
        builtins::capabilities::register(&mut builtins);
        builtins::search_tools::register(&mut builtins);
        debug!(builtins = builtins.len(), "tool surface ready");
        Self { engine, builtins }
    }

    pub fn engine(&self) -> &QueryEngine {
        &self.engine
    }

    pub fn is_builtin(&self, name: &str) -> bool {
        self.builtins.iter().any(|m| m.name == name)
    }

    /// Built-ins first, then dynamic capabilities sorted by name.
    pub fn list_tools(&self) -> Vec<ToolMeta> {
        let mut out = self.builtins.clone();
        out.extend(
            self.engine
                .registry()
                .list()
                .into_iter()
                .filter(|c| !self.is_builtin(&c.name))
                .map(|c| ToolMeta {
                    name: c.name,
                    description: c.description,
                    input_schema: c.input_schema,
                }),
        );
        out
    }

    /// Call a tool by name.  Never fails; errors come back tagged.
    pub async fn call_tool(&self, name: &str, args: Value) -> ToolOutcome {
        debug!(tool = name, "tool call");
        let outcome = if self.is_builtin(name) {
            builtins::dispatch(self, name, args).await
        } else {
            self.call_capability(name, &args).await
        };
        match outcome {
            Ok(content) => ToolOutcome::Success { content },
            Err(e) => {
                warn!(tool = name, error = %e, "tool call failed");
                failure_from(e)
            }
        }
    }

    async fn call_capability(&self, name: &str, args: &Value) -> anyhow::Result<Value> {
        let registry = self.engine.registry();
        if !registry.contains(name) {
            registry.generate_from_unknown_name(name, args).await?;
        }
        let result = registry.invoke(name, args).await?;
        Ok(serde_json::to_value(result)?)
    }

    /// Search tool names and descriptions by keyword.
    ///
    /// Normalization: case-insensitive, names split on `_`/`-`, naive
    /// suffix stemming, and a small synonym table.
    pub fn search_tools(&self, query: &str, limit: usize) -> Vec<ToolMeta> {
        let tools = self.list_tools();
        let lower_query = query.trim().to_lowercase();
        if lower_query.is_empty() {
            return Vec::new();
        }

        let expanded: Vec<String> = lower_query
            .split_whitespace()
            .flat_map(|t| {
                let stemmed = naive_stem(t);
                let mut set = vec![t.to_string()];
                if stemmed != t {
                    set.push(stemmed.clone());
                }
                for syn in synonyms(t).iter().chain(synonyms(&stemmed)) {
                    if !set.iter().any(|s| s.as_str() == *syn) {
                        set.push(syn.to_string());
                    }
                }
                set
            })
            .collect();

        let mut scored: Vec<(usize, ToolMeta)> = tools
            .into_iter()
            .filter_map(|meta| {
                let name_lower = meta.name.to_lowercase();
                let desc_lower = meta.description.to_lowercase();
                let name_tokens: Vec<&str> = name_lower.split(['_', '-']).collect();
                let mut score = 0usize;
                if name_lower == lower_query {
                    score += 100;
                }
                if name_lower.contains(&lower_query) {
                    score += 50;
                }
                for term in &expanded {
                    if name_tokens.iter().any(|tok| tok.contains(term.as_str())) {
                        score += 25;
                    } else if name_lower.contains(term.as_str()) {
                        score += 20;
                    }
                    if desc_lower.contains(term.as_str()) {
                        score += 10;
                    }
                }
                (score > 0).then_some((score, meta))
            })
            .collect();

        scored.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.name.cmp(&b.1.name)));
        scored.into_iter().take(limit).map(|(_, m)| m).collect()
    }
}

fn synonyms(term: &str) -> &'static [&'static str] {
    match term {
        "vuln" | "vulns" | "cve" | "cves" | "exploit" => &["vulnerab"],
        "table" | "tables" | "dataset" | "datasets" | "schema" => &["data_source", "source"],
        "field" | "fields" | "column" | "columns" => &["describe", "field"],
        "translate" | "convert" | "nl" | "natural" | "english" => &["translate", "query"],
        "run" | "execute" | "ask" => &["query", "natural_language"],
        "stats" | "statistics" | "metrics" | "count" => &["usage"],
        "cleanup" | "clean" | "remove" | "delete" | "expire" => &["prune"],
        "backup" | "save" | "dump" => &["export"],
        "restore" | "load" => &["import"],
        "tool" | "tools" | "capability" | "capabilities" => &["capabilit", "tool"],
        _ => &[],
    }
}

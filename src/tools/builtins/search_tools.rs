//! search_tools: keyword discovery over built-in and generated tools.

use serde_json::{json, Value};

use super::required_str;
use crate::tools::{ToolMeta, ToolSurface};

/// Args:
///   - query (string, required): keyword/phrase describing the capability needed
///   - limit (integer, optional): max results to return (default 5, max 20)
pub async fn search_tools(surface: &ToolSurface, args: Value) -> anyhow::Result<Value> {
    let query = required_str(&args, "query")?;
    let limit = args
        .get("limit")
        .and_then(Value::as_u64)
        .unwrap_or(5)
        .min(20) as usize;

    let results = surface.search_tools(query, limit);
    if results.is_empty() {
        return Ok(json!({
            "matches": [],
            "hint": "No tools matched. Try broader keywords, or call natural_language_query directly."
        }));
    }

    Ok(json!({
        "matches": results,
        "hint": "Any of these tools can be called by name."
    }))
}

pub fn register(tools: &mut Vec<ToolMeta>) {
    tools.push(ToolMeta {
        name: "search_tools".into(),
        description: "Search built-in and generated tools by keyword, e.g. 'vulnerabilities', 'data source', 'usage'.".into(),
        input_schema: json!({
            "type": "object",
            "properties": {
                "query": { "type": "string" },
                "limit": { "type": "integer", "description": "Max number of results (default: 5, max: 20)" }
            },
            "required": ["query"]
        }),
    });
}

//! natural_language_query / translate_query: free text in, query out.

use serde_json::{json, Value};

use super::{required_str, string_list};
use crate::tools::{ToolMeta, ToolSurface};
use crate::translator::TranslateOptions;

/// Translate, execute, and auto-register on results.
///
/// Args:
///   - query (string, required): the question in plain English
///   - fields (string[], optional): fields to return
pub async fn natural_language_query(surface: &ToolSurface, args: Value) -> anyhow::Result<Value> {
    let text = required_str(&args, "query")?;
    let opts = TranslateOptions {
        fields: string_list(&args, "fields"),
        now: None,
    };
    let outcome = surface.engine().ask(text, &opts).await?;
    let t = &outcome.translation;

    Ok(json!({
        "query": t.query,
        "category": t.category,
        "data_source": t.data_source,
        "confidence": t.confidence,
        "time_range": t.time_range,
        "row_count": outcome.result.row_count,
        "execution_time_ms": outcome.result.execution_time_ms,
        "rows": outcome.result.rows,
        "registered_tool": outcome.registered,
    }))
}

/// Translate without executing.
pub async fn translate_query(surface: &ToolSurface, args: Value) -> anyhow::Result<Value> {
    let text = required_str(&args, "query")?;
    let opts = TranslateOptions {
        fields: string_list(&args, "fields"),
        now: None,
    };
    let translation = surface.engine().translate(text, &opts).await;
    Ok(serde_json::to_value(translation)?)
}

pub fn register(tools: &mut Vec<ToolMeta>) {
    let args_schema = json!({
        "type": "object",
        "properties": {
            "query": {
                "type": "string",
                "description": "Security question in plain English, e.g. 'show me AWS EC2 instances with high risk scores'"
            },
            "fields": {
                "type": "array",
                "items": { "type": "string" },
                "description": "Fields to return (loose names are resolved against the data source)"
            }
        },
        "required": ["query"]
    });
    tools.push(ToolMeta {
        name: "natural_language_query".into(),
        description: "Answer a security question: translate it into a structured query, run it, and register a reusable tool when it returns results.".into(),
        input_schema: args_schema.clone(),
    });
    tools.push(ToolMeta {
        name: "translate_query".into(),
        description: "Translate a security question into a structured query without running it. Returns the query, data source, filters, time window and confidence.".into(),
        input_schema: args_schema,
    });
}

//! Data source catalog tools.

use serde_json::{json, Value};

use super::required_str;
use crate::catalog::{DiscoveryFilter, SourceCategory};
use crate::tools::{ToolError, ToolMeta, ToolSurface};

pub async fn list_data_sources(surface: &ToolSurface, args: Value) -> anyhow::Result<Value> {
    let category = match args.get("category").and_then(Value::as_str) {
        Some(raw) => Some(
            SourceCategory::parse(raw)
                .ok_or_else(|| ToolError::InvalidArguments(format!("unknown category `{raw}`")))?,
        ),
        None => None,
    };
    let filter = DiscoveryFilter {
        name_pattern: args
            .get("name_pattern")
            .and_then(Value::as_str)
            .map(str::to_string),
        category,
        provider: args.get("provider").and_then(Value::as_str).map(str::to_string),
        limit: args.get("limit").and_then(Value::as_u64).map(|n| n as usize),
    };

    let sources = surface.engine().catalog().discover(&filter).await;
    let summaries: Vec<Value> = sources
        .iter()
        .map(|s| {
            json!({
                "name": s.name,
                "category": s.category,
                "description": s.description,
            })
        })
        .collect();
    Ok(json!({ "count": summaries.len(), "data_sources": summaries }))
}

pub async fn describe_data_source(surface: &ToolSurface, args: Value) -> anyhow::Result<Value> {
    let name = required_str(&args, "name")?;
    let descriptor = surface
        .engine()
        .catalog()
        .describe(name)
        .await
        .ok_or_else(|| ToolError::NotFound(format!("data source `{name}`")))?;
    Ok(serde_json::to_value(descriptor)?)
}

pub async fn search_data_sources(surface: &ToolSurface, args: Value) -> anyhow::Result<Value> {
    let text = required_str(&args, "text")?;
    let hits = surface.engine().catalog().search(text);
    let names: Vec<&str> = hits.iter().map(|s| s.name.as_str()).collect();
    Ok(json!({ "count": names.len(), "matches": names }))
}

/// Refresh the whole catalog, or one source's fields when `name` is given.
pub async fn refresh_data_sources(surface: &ToolSurface, args: Value) -> anyhow::Result<Value> {
    let catalog = surface.engine().catalog();
    match args.get("name").and_then(Value::as_str) {
        Some(name) => {
            let fields = catalog.refresh_fields(name).await;
            Ok(json!({ "name": name, "fields": fields.len() }))
        }
        None => {
            let sources = catalog.refresh().await;
            Ok(json!({ "data_sources": sources.len() }))
        }
    }
}

pub fn register(tools: &mut Vec<ToolMeta>) {
    tools.push(ToolMeta {
        name: "list_data_sources".into(),
        description: "List queryable data sources, optionally filtered by name pattern (substring or * glob), category or cloud provider.".into(),
        input_schema: json!({
            "type": "object",
            "properties": {
                "name_pattern": { "type": "string", "description": "Substring or glob, e.g. 'LW_CFG_AWS_*'" },
                "category": {
                    "type": "string",
                    "enum": ["aws", "azure", "gcp", "kubernetes", "host", "network",
                             "vulnerability", "configuration", "activity", "compliance", "general"]
                },
                "provider": { "type": "string", "description": "aws, azure or gcp" },
                "limit": { "type": "integer", "minimum": 1 }
            },
            "required": []
        }),
    });
    tools.push(ToolMeta {
        name: "describe_data_source".into(),
        description: "Describe a data source with its fields, types and sample values.".into(),
        input_schema: json!({
            "type": "object",
            "properties": {
                "name": { "type": "string", "description": "Exact data source name" }
            },
            "required": ["name"]
        }),
    });
    tools.push(ToolMeta {
        name: "search_data_sources".into(),
        description: "Find data sources whose name, category or description matches the given words.".into(),
        input_schema: json!({
            "type": "object",
            "properties": {
                "text": { "type": "string" }
            },
            "required": ["text"]
        }),
    });
    tools.push(ToolMeta {
        name: "refresh_data_sources".into(),
        description: "Re-discover data sources, or re-sample one source's fields when a name is given.".into(),
        input_schema: json!({
            "type": "object",
            "properties": {
                "name": { "type": "string" }
            },
            "required": []
        }),
    });
}

//! Dynamic capability housekeeping tools.

use serde_json::{json, Value};

use crate::registry::DynamicCapability;
use crate::tools::{ToolError, ToolMeta, ToolSurface};

pub async fn capability_usage(surface: &ToolSurface, _args: Value) -> anyhow::Result<Value> {
    let report = surface.engine().registry().usage_report();
    Ok(json!({ "count": report.len(), "capabilities": report }))
}

/// Args:
///   - max_age_hours (integer, optional): defaults to `registry.prune_max_age_hours`
pub async fn prune_capabilities(surface: &ToolSurface, args: Value) -> anyhow::Result<Value> {
    let engine = surface.engine();
    let hours = match args.get("max_age_hours") {
        None | Some(Value::Null) => engine.config().registry.prune_max_age_hours,
        Some(v) => v.as_u64().ok_or_else(|| {
            ToolError::InvalidArguments("`max_age_hours` must be a non-negative integer".into())
        })?,
    };
    let max_age = i64::try_from(hours)
        .ok()
        .and_then(chrono::Duration::try_hours)
        .ok_or_else(|| {
            ToolError::InvalidArguments(format!("`max_age_hours` out of range: {hours}"))
        })?;
    let removed = engine.registry().prune(max_age);
    Ok(json!({ "removed": removed }))
}

pub async fn export_capabilities(surface: &ToolSurface, _args: Value) -> anyhow::Result<Value> {
    let all = surface.engine().registry().export_all();
    Ok(json!({ "capabilities": all }))
}

pub async fn import_capabilities(surface: &ToolSurface, args: Value) -> anyhow::Result<Value> {
    let raw = args
        .get("capabilities")
        .cloned()
        .ok_or_else(|| ToolError::InvalidArguments("`capabilities` is required".into()))?;
    let capabilities: Vec<DynamicCapability> = serde_json::from_value(raw)
        .map_err(|e| ToolError::InvalidArguments(format!("malformed capabilities: {e}")))?;
    let imported = surface.engine().registry().import_all(capabilities);
    Ok(json!({ "imported": imported }))
}

pub fn register(tools: &mut Vec<ToolMeta>) {
    tools.push(ToolMeta {
        name: "capability_usage".into(),
        description: "Report how often each generated tool has been used.".into(),
        input_schema: json!({ "type": "object", "properties": {}, "required": [] }),
    });
    tools.push(ToolMeta {
        name: "prune_capabilities".into(),
        description: "Remove generated tools that were never used and have been idle longer than the given age.".into(),
        input_schema: json!({
            "type": "object",
            "properties": {
                "max_age_hours": { "type": "integer", "minimum": 0 }
            },
            "required": []
        }),
    });
    tools.push(ToolMeta {
        name: "export_capabilities".into(),
        description: "Export every generated tool as JSON.".into(),
        input_schema: json!({ "type": "object", "properties": {}, "required": [] }),
    });
    tools.push(ToolMeta {
        name: "import_capabilities".into(),
        description: "Import generated tools previously exported; same-name tools are overwritten.".into(),
        input_schema: json!({
            "type": "object",
            "properties": {
                "capabilities": { "type": "array", "items": { "type": "object" } }
            },
            "required": ["capabilities"]
        }),
    });
}

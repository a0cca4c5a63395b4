//! Built-in tool implementations.
//!
//! Each sub-module implements a small family of tools.  Every module
//! exposes `register` to publish its metadata; [`dispatch`] routes a call
//! to the matching handler.

pub mod capabilities;
pub mod query;
pub mod search_tools;
pub mod sources;

use serde_json::Value;

use super::{ToolError, ToolSurface};

/// Route a built-in tool call.
pub async fn dispatch(surface: &ToolSurface, name: &str, args: Value) -> anyhow::Result<Value> {
    match name {
        "natural_language_query" => query::natural_language_query(surface, args).await,
        "translate_query" => query::translate_query(surface, args).await,
        "list_data_sources" => sources::list_data_sources(surface, args).await,
        "describe_data_source" => sources::describe_data_source(surface, args).await,
        "search_data_sources" => sources::search_data_sources(surface, args).await,
        "refresh_data_sources" => sources::refresh_data_sources(surface, args).await,
        "capability_usage" => capabilities::capability_usage(surface, args).await,
        "prune_capabilities" => capabilities::prune_capabilities(surface, args).await,
        "export_capabilities" => capabilities::export_capabilities(surface, args).await,
        "import_capabilities" => capabilities::import_capabilities(surface, args).await,
        "search_tools" => search_tools::search_tools(surface, args).await,
        other => Err(ToolError::NotFound(format!("no built-in tool `{other}`")).into()),
    }
}

/// Required non-empty string argument.
pub(crate) fn required_str<'a>(args: &'a Value, key: &str) -> Result<&'a str, ToolError> {
    args.get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ToolError::InvalidArguments(format!("`{key}` is required")))
}

/// Optional string-array argument.
pub(crate) fn string_list(args: &Value, key: &str) -> Vec<String> {
    args.get(key)
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

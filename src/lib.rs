//! query_forge: natural-language security questions to structured queries.
//!
//! This library crate re-exports modules so integration tests
//! (under `tests/`) can access them.

pub mod catalog;
pub mod config;
pub mod engine;
pub mod error;
pub mod executor;
pub mod registry;
pub mod text;
pub mod tools;
pub mod translator;

/// Return the query_forge home directory.
///
/// Resolution order:
/// 1. `QUERY_FORGE_HOME` environment variable
/// 2. `$HOME/.query_forge`
pub fn forge_home() -> std::path::PathBuf {
    if let Ok(p) = std::env::var("QUERY_FORGE_HOME") {
        std::path::PathBuf::from(p)
    } else {
        dirs::home_dir()
            .unwrap_or_else(|| std::path::PathBuf::from("."))
            .join(".query_forge")
    }
}

//! Collaborator contracts consumed by the engine.
//!
//! The engine never talks to the telemetry platform directly.  Query
//! execution, data source listing and template storage are provided by
//! implementations of [`QueryExecutor`], [`SourceLister`] and
//! [`TemplateSink`].  Offline implementations live here too so the CLI and
//! the tests can run without a backend.

use std::sync::Mutex;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::ExecutionError;

/// A single result row as returned by the platform.
pub type Row = Map<String, Value>;

/// Absolute query window.  `start` is never after `end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeRange {
    /// Window of length `span` ending at `end`.
    pub fn trailing(end: DateTime<Utc>, span: chrono::Duration) -> Self {
        Self {
            start: end - span,
            end,
        }
    }

    pub fn span(&self) -> chrono::Duration {
        self.end - self.start
    }
}

/// Rows plus execution metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResult {
    pub rows: Vec<Row>,
    pub execution_time_ms: u64,
    pub row_count: usize,
    pub query: String,
}

/// Runs a structured query against the telemetry platform.
#[async_trait]
pub trait QueryExecutor: Send + Sync {
    async fn execute(
        &self,
        query: &str,
        range: Option<TimeRange>,
    ) -> Result<QueryResult, ExecutionError>;
}

/// Lists the data source names the platform exposes.  Best-effort.
#[async_trait]
pub trait SourceLister: Send + Sync {
    async fn list_data_source_names(&self) -> anyhow::Result<Vec<String>>;
}

/// Capability-worthy query handed to durable template storage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateDescriptor {
    pub name: String,
    pub description: String,
    pub query: String,
    pub category: String,
    pub parameters: Value,
}

/// Durable template storage.  The engine calls it opportunistically.
#[async_trait]
pub trait TemplateSink: Send + Sync {
    async fn save(&self, template: TemplateDescriptor) -> anyhow::Result<()>;
}

/// Run `query` on `executor`, failing with [`ExecutionError::Timeout`]
/// when it does not complete within `timeout`.
pub async fn execute_bounded(
    executor: &dyn QueryExecutor,
    query: &str,
    range: Option<TimeRange>,
    timeout: Duration,
) -> Result<QueryResult, ExecutionError> {
    match tokio::time::timeout(timeout, executor.execute(query, range)).await {
        Ok(result) => result,
        Err(_) => Err(ExecutionError::Timeout(timeout)),
    }
}

// ── Offline implementations ─────────────────────────────────

/// Executor that answers from fixture rows.
///
/// Rows registered for a data source are returned when the query text
/// mentions that source; when several registered names occur, the longest
/// wins, then the earliest registered.  Everything else gets the default
/// rows.  Every executed query and its window is recorded for inspection.
#[derive(Default)]
pub struct StaticExecutor {
    default_rows: Vec<Row>,
    source_rows: Vec<(String, Vec<Row>)>,
    failure: Option<ExecutionError>,
    executed: Mutex<Vec<(String, Option<TimeRange>)>>,
}

impl StaticExecutor {
    /// Executor returning no rows for every query.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Executor returning `rows` for every query.
    pub fn with_rows(rows: Vec<Row>) -> Self {
        Self {
            default_rows: rows,
            ..Self::default()
        }
    }

    /// Executor that fails every query with `error`.
    pub fn failing(error: ExecutionError) -> Self {
        Self {
            failure: Some(error),
            ..Self::default()
        }
    }

    /// Parse a JSON array of objects into default rows.
    pub fn from_json(json: &str) -> anyhow::Result<Self> {
        let rows: Vec<Row> = serde_json::from_str(json)?;
        Ok(Self::with_rows(rows))
    }

    /// Return `rows` for queries against `source`.  Registering the same
    /// source again replaces its rows.
    pub fn source_rows(mut self, source: &str, rows: Vec<Row>) -> Self {
        match self.source_rows.iter_mut().find(|(s, _)| s == source) {
            Some(entry) => entry.1 = rows,
            None => self.source_rows.push((source.to_string(), rows)),
        }
        self
    }

    /// Queries executed so far, oldest first.
    pub fn executed_queries(&self) -> Vec<String> {
        self.executed
            .lock()
            .expect("executor log poisoned")
            .iter()
            .map(|(query, _)| query.clone())
            .collect()
    }

    /// Windows of the queries executed so far, oldest first.
    pub fn executed_ranges(&self) -> Vec<Option<TimeRange>> {
        self.executed
            .lock()
            .expect("executor log poisoned")
            .iter()
            .map(|(_, range)| *range)
            .collect()
    }

    fn rows_for(&self, query: &str) -> Vec<Row> {
        let mut best: Option<&(String, Vec<Row>)> = None;
        for entry in &self.source_rows {
            if !query.contains(entry.0.as_str()) {
                continue;
            }
            if best.map_or(true, |b| entry.0.len() > b.0.len()) {
                best = Some(entry);
            }
        }
        best.map(|(_, rows)| rows.clone())
            .unwrap_or_else(|| self.default_rows.clone())
    }
}

#[async_trait]
impl QueryExecutor for StaticExecutor {
    async fn execute(
        &self,
        query: &str,
        range: Option<TimeRange>,
    ) -> Result<QueryResult, ExecutionError> {
        let started = Instant::now();
        self.executed
            .lock()
            .expect("executor log poisoned")
            .push((query.to_string(), range));

        if let Some(err) = &self.failure {
            return Err(err.clone());
        }

        let rows = self.rows_for(query);

        debug!(rows = rows.len(), "static executor answered");
        Ok(QueryResult {
            row_count: rows.len(),
            rows,
            execution_time_ms: started.elapsed().as_millis() as u64,
            query: query.to_string(),
        })
    }
}

/// Lister with a fixed answer, or a failure when built with [`NullLister::unreachable`].
#[derive(Debug, Default, Clone)]
pub struct NullLister {
    names: Vec<String>,
    fail: bool,
}

impl NullLister {
    pub fn with_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
            fail: false,
        }
    }

    pub fn unreachable() -> Self {
        Self {
            names: Vec::new(),
            fail: true,
        }
    }
}

#[async_trait]
impl SourceLister for NullLister {
    async fn list_data_source_names(&self) -> anyhow::Result<Vec<String>> {
        if self.fail {
            anyhow::bail!("data source listing unavailable");
        }
        Ok(self.names.clone())
    }
}

/// Template sink that drops everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopTemplateSink;

#[async_trait]
impl TemplateSink for NoopTemplateSink {
    async fn save(&self, template: TemplateDescriptor) -> anyhow::Result<()> {
        debug!(name = %template.name, "template discarded (no sink configured)");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn tagged(tag: &str) -> Vec<Row> {
        let mut row = Row::new();
        row.insert("TAG".into(), json!(tag));
        vec![row]
    }

    #[tokio::test]
    async fn longest_registered_source_wins() {
        let executor = StaticExecutor::with_rows(tagged("default"))
            .source_rows("LW_HE_USERS", tagged("users"))
            .source_rows("LW_HE_USERS_EXTENDED", tagged("extended"))
            .source_rows("LW_HE_MACHINES", tagged("machines"));

        for _ in 0..8 {
            let out = executor
                .execute("{ source { LW_HE_USERS_EXTENDED } }", None)
                .await
                .unwrap();
            assert_eq!(out.rows[0]["TAG"], "extended");
        }
        let out = executor.execute("{ source { LW_HE_USERS } }", None).await.unwrap();
        assert_eq!(out.rows[0]["TAG"], "users");
        let out = executor.execute("{ source { OTHER } }", None).await.unwrap();
        assert_eq!(out.rows[0]["TAG"], "default");
    }

    #[tokio::test]
    async fn re_registering_a_source_replaces_rows() {
        let executor = StaticExecutor::empty()
            .source_rows("LW_HE_USERS", tagged("old"))
            .source_rows("LW_HE_USERS", tagged("new"));
        let range = TimeRange::trailing(Utc::now(), chrono::Duration::hours(2));
        let out = executor.execute("LW_HE_USERS", Some(range)).await.unwrap();
        assert_eq!(out.rows.len(), 1);
        assert_eq!(out.rows[0]["TAG"], "new");
        assert_eq!(executor.executed_ranges(), vec![Some(range)]);
    }
}

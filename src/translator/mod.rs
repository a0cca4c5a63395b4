//! Natural-language → structured query translation.
//!
//! Translation is a single rule-driven pass: identify the data source,
//! classify the request, extract filters, build the query and pick a time
//! window.  It never fails; a request nothing recognises still produces a
//! query against the default source, with low confidence.

pub mod filters;
pub mod query;
pub mod rules;

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::catalog::{infer, seed, DataSourceCatalog, FieldResolver};
use crate::config::{TranslatorConfig, MAX_WINDOW_HOURS};
use crate::executor::TimeRange;
use crate::text::{significant_words, slugify};

pub use query::QueryPlan;

/// Ordered filter key → value map.
pub type Parameters = BTreeMap<String, Value>;

/// How the data source of a translation was chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SourceOrigin {
    /// Keyword table hit.
    Keyword,
    /// Top hit of a catalog search.
    CatalogSearch,
    /// Coarse topic ladder.
    Inferred,
    /// Global fallback.
    Default,
}

impl SourceOrigin {
    /// Whether the source was identified from the request at all.
    pub fn identified(&self) -> bool {
        !matches!(self, SourceOrigin::Default)
    }
}

/// Output of a translation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranslationResult {
    pub query: String,
    pub category: String,
    pub suggested_name: String,
    pub parameters: Parameters,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_range: Option<TimeRange>,
    pub confidence: f64,
    pub data_source: String,
    pub source_origin: SourceOrigin,
    #[serde(default)]
    pub pattern_matched: bool,
    pub plan: QueryPlan,
}

/// Per-call translation knobs.
#[derive(Debug, Clone, Default)]
pub struct TranslateOptions {
    /// Fields to project, as loose names.
    pub fields: Vec<String>,
    /// Anchor of the time window.  Defaults to the call time.
    pub now: Option<DateTime<Utc>>,
}

/// Rule-based translator backed by the data source catalog.
pub struct IntentTranslator {
    catalog: Arc<DataSourceCatalog>,
    resolver: FieldResolver,
    max_projected_fields: usize,
    default_window_hours: i64,
}

impl IntentTranslator {
    pub fn new(catalog: Arc<DataSourceCatalog>, cfg: &TranslatorConfig) -> Self {
        Self {
            resolver: FieldResolver::new(Arc::clone(&catalog)),
            catalog,
            max_projected_fields: cfg.max_projected_fields,
            default_window_hours: cfg.default_window_hours.min(MAX_WINDOW_HOURS) as i64,
        }
    }

    pub fn resolver(&self) -> &FieldResolver {
        &self.resolver
    }

    pub async fn translate(&self, text: &str) -> TranslationResult {
        self.translate_with(text, &TranslateOptions::default()).await
    }

    pub async fn translate_with(&self, text: &str, opts: &TranslateOptions) -> TranslationResult {
        let lower = text.to_lowercase();

        let (source, origin) = self.identify_source(&lower, text);

        let rule = rules::classify(&lower);
        let mut parameters = Parameters::new();
        if let Some(rule) = rule {
            for (key, value) in rule.params {
                parameters.insert((*key).to_string(), value.to_value());
            }
        }
        let extracted = filters::extract(&lower);
        let filters_found = !extracted.is_empty();
        parameters.extend(extracted);

        let (category, suggested_name) = match rule {
            Some(rule) => (rule.category.to_string(), rule.suggested_name.to_string()),
            None => ("general".to_string(), general_name(text)),
        };

        // Memoizes the field set the resolver reads from.
        let descriptor = self.catalog.describe(&source).await;
        let source_category = descriptor
            .as_ref()
            .map(|d| d.category)
            .unwrap_or_else(|| infer::categorize(&source));
        let fields = descriptor
            .and_then(|d| d.fields)
            .unwrap_or_else(|| seed::known_fields(&source));

        let mut conditions: Vec<String> = Vec::new();
        for (key, value) in &parameters {
            let field = self.resolver.resolve(key, &source);
            if let Some(condition) = query::render_condition(&field, value) {
                if !conditions.contains(&condition) {
                    conditions.push(condition);
                }
            }
        }
        for condition in query::heuristic_conditions(&source, &lower) {
            if !conditions.contains(&condition) {
                conditions.push(condition);
            }
        }

        let requested: Vec<String> = opts
            .fields
            .iter()
            .map(|f| self.resolver.resolve(f, &source))
            .collect();
        let projection = query::projection(
            &requested,
            &fields,
            source_category,
            self.max_projected_fields,
        );

        let plan = QueryPlan {
            source: source.clone(),
            conditions,
            projection,
        };

        let hours = rules::window_hours(&lower).unwrap_or(self.default_window_hours);
        let now = opts.now.unwrap_or_else(Utc::now);
        let time_range = TimeRange::trailing(now, chrono::Duration::hours(hours));

        let confidence = confidence(origin.identified(), rule.is_some(), filters_found);

        debug!(
            source = %source,
            origin = ?origin,
            category = %category,
            confidence,
            "request translated"
        );

        TranslationResult {
            query: plan.render(),
            category,
            suggested_name,
            parameters,
            time_range: Some(time_range),
            confidence,
            data_source: source,
            source_origin: origin,
            pattern_matched: rule.is_some(),
            plan,
        }
    }

    fn identify_source(&self, lower: &str, text: &str) -> (String, SourceOrigin) {
        if let Some(rule) = rules::SOURCE_RULES.iter().find(|r| r.predicate.matches(lower)) {
            return (rule.source.to_string(), SourceOrigin::Keyword);
        }
        if let Some(hit) = self.catalog.search(text).into_iter().next() {
            return (hit.name, SourceOrigin::CatalogSearch);
        }
        if let Some(rule) = rules::DEFAULT_LADDER.iter().find(|r| r.predicate.matches(lower)) {
            return (rule.source.to_string(), SourceOrigin::Inferred);
        }
        (rules::GLOBAL_DEFAULT_SOURCE.to_string(), SourceOrigin::Default)
    }
}

/// 0.5 base, +0.2 source, +0.2 pattern, +0.1 filters, capped at 1.0.
fn confidence(source_identified: bool, pattern_matched: bool, filters_found: bool) -> f64 {
    let tenths = 5
        + if source_identified { 2 } else { 0 }
        + if pattern_matched { 2 } else { 0 }
        + if filters_found { 1 } else { 0 };
    f64::from(tenths.min(10)) / 10.0
}

fn general_name(text: &str) -> String {
    let words = significant_words(text);
    let head: Vec<&String> = words.iter().take(4).collect();
    let slug = slugify(&head);
    if slug.is_empty() {
        "query-general".to_string()
    } else {
        format!("query-{slug}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn confidence_is_coarse_and_capped() {
        assert_eq!(confidence(false, false, false), 0.5);
        assert_eq!(confidence(true, false, false), 0.7);
        assert_eq!(confidence(true, true, true), 1.0);
    }

    #[test]
    fn general_names_use_significant_words() {
        assert_eq!(
            general_name("show me the weird gadget stuff now extra"),
            "query-weird-gadget-stuff-now"
        );
        assert_eq!(general_name("show me"), "query-general");
    }
}

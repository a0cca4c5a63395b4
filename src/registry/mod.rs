//! Dynamic capability registry.
//!
//! Successful translations are promoted into named capabilities that can
//! be invoked directly, bypassing translation.  A capability binds the
//! translation's query plan plus a list of [`ArgumentRule`]s; the
//! executor is shared by the registry.

pub mod reverse;
pub mod schema;

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::config::{ExecutionConfig, RegistryConfig, TranslatorConfig, MAX_WINDOW_HOURS};
use crate::error::EngineError;
use crate::executor::{execute_bounded, QueryExecutor, QueryResult, TemplateDescriptor, TemplateSink};
use crate::text::{significant_words, slugify, truncate_chars};
use crate::translator::{IntentTranslator, TranslationResult};

pub use schema::ArgumentRule;

/// A translation promoted to an invokable tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DynamicCapability {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
    #[serde(default)]
    pub arguments: Vec<ArgumentRule>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query_pattern: Option<TranslationResult>,
    pub created: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_used: Option<DateTime<Utc>>,
    #[serde(default)]
    pub usage_count: u64,
}

/// What callers see in a listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapabilitySummary {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

/// One line of [`CapabilityRegistry::usage_report`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageEntry {
    pub name: String,
    pub usage_count: u64,
    pub created: DateTime<Utc>,
    pub last_used: Option<DateTime<Utc>>,
}

/// Result of [`CapabilityRegistry::register_from_translation`].
#[derive(Debug, Clone)]
pub struct Registration {
    pub capability: DynamicCapability,
    /// False when an existing capability was reused.
    pub created: bool,
}

/// Canonical capability name for a translation category and request.
///
/// Deterministic: the category plus the first three significant words.
pub fn canonical_name(category: &str, text: &str) -> String {
    let words = significant_words(text);
    let head: Vec<&String> = words.iter().take(3).collect();
    let slug = slugify(&head);
    if slug.is_empty() {
        category.to_string()
    } else {
        format!("{category}-{slug}")
    }
}

fn describe(text: &str, result: &TranslationResult) -> String {
    format!(
        "{} ({} query on {})",
        truncate_chars(text.trim(), 120),
        result.category,
        result.data_source
    )
}

/// Thread-safe map of dynamic capabilities.
pub struct CapabilityRegistry {
    translator: Arc<IntentTranslator>,
    executor: Arc<dyn QueryExecutor>,
    templates: Arc<dyn TemplateSink>,
    min_generation_confidence: f64,
    default_window: chrono::Duration,
    timeout: Duration,
    max_rows: usize,
    capabilities: RwLock<HashMap<String, DynamicCapability>>,
}

impl CapabilityRegistry {
    pub fn new(
        translator: Arc<IntentTranslator>,
        executor: Arc<dyn QueryExecutor>,
        templates: Arc<dyn TemplateSink>,
        registry: &RegistryConfig,
        translator_cfg: &TranslatorConfig,
        execution: &ExecutionConfig,
    ) -> Self {
        Self {
            translator,
            executor,
            templates,
            min_generation_confidence: registry.min_generation_confidence,
            default_window: chrono::Duration::hours(
                translator_cfg.default_window_hours.min(MAX_WINDOW_HOURS) as i64,
            ),
            timeout: Duration::from_secs(execution.timeout_secs),
            max_rows: execution.max_rows,
            capabilities: RwLock::new(HashMap::new()),
        }
    }

    /// Summaries of every capability, sorted by name.
    pub fn list(&self) -> Vec<CapabilitySummary> {
        let map = self.capabilities.read().expect("registry lock poisoned");
        let mut out: Vec<CapabilitySummary> = map
            .values()
            .map(|c| CapabilitySummary {
                name: c.name.clone(),
                description: c.description.clone(),
                input_schema: c.input_schema.clone(),
            })
            .collect();
        out.sort_by(|a, b| a.name.cmp(&b.name));
        out
    }

    pub fn get(&self, name: &str) -> Option<DynamicCapability> {
        self.capabilities
            .read()
            .expect("registry lock poisoned")
            .get(name)
            .cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.capabilities
            .read()
            .expect("registry lock poisoned")
            .contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.capabilities.read().expect("registry lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Promote `result` into a capability, or reuse the one already
    /// registered under the same canonical name.
    ///
    /// Creation counts as the first use.
    pub async fn register_from_translation(
        &self,
        result: &TranslationResult,
        original_text: &str,
    ) -> Registration {
        let name = canonical_name(&result.category, original_text);
        let now = Utc::now();

        let registration = {
            let mut map = self.capabilities.write().expect("registry lock poisoned");
            if let Some(existing) = map.get_mut(&name) {
                existing.usage_count += 1;
                existing.last_used = Some(now);
                Registration {
                    capability: existing.clone(),
                    created: false,
                }
            } else {
                let mut capability = build_capability(&name, original_text, result, now);
                capability.usage_count = 1;
                capability.last_used = Some(now);
                map.insert(name.clone(), capability.clone());
                Registration {
                    capability,
                    created: true,
                }
            }
        };

        if registration.created {
            info!(name = %name, source = %result.data_source, "capability registered");
            self.hand_off_template(&registration.capability, result).await;
        } else {
            debug!(
                name = %name,
                usage = registration.capability.usage_count,
                "capability reused"
            );
        }
        registration
    }

    /// Create a capability for a tool name nobody registered.
    ///
    /// The request is inferred from the name when it follows a naming
    /// convention, else taken from `args.query`, else derived from the
    /// name itself.  The capability is registered under `name` only when
    /// the translation reaches the configured confidence floor.
    pub async fn generate_from_unknown_name(
        &self,
        name: &str,
        args: &Value,
    ) -> Result<DynamicCapability, EngineError> {
        let phrase = reverse::infer_phrase(name)
            .or_else(|| {
                args.get("query")
                    .and_then(Value::as_str)
                    .map(str::trim)
                    .filter(|q| !q.is_empty())
                    .map(str::to_string)
            })
            .unwrap_or_else(|| reverse::readable(name));

        if phrase.is_empty() {
            return Err(EngineError::GenerationFailed {
                name: name.to_string(),
                reason: "no request could be inferred from the name".into(),
            });
        }

        let result = self.translator.translate(&phrase).await;
        if result.confidence < self.min_generation_confidence {
            debug!(
                name = %name,
                phrase = %phrase,
                confidence = result.confidence,
                "generated translation below confidence floor"
            );
            return Err(EngineError::GenerationFailed {
                name: name.to_string(),
                reason: format!(
                    "confidence {:.2} for \"{phrase}\" is below {:.2}",
                    result.confidence, self.min_generation_confidence
                ),
            });
        }

        let capability = build_capability(name, &phrase, &result, Utc::now());
        {
            let mut map = self.capabilities.write().expect("registry lock poisoned");
            map.insert(name.to_string(), capability.clone());
        }
        info!(name = %name, phrase = %phrase, "capability generated from tool name");
        self.hand_off_template(&capability, &result).await;
        Ok(capability)
    }

    /// Run a registered capability with runtime `args`.
    ///
    /// Usage is recorded whether or not execution succeeds.
    pub async fn invoke(&self, name: &str, args: &Value) -> Result<QueryResult, EngineError> {
        let capability = self
            .get(name)
            .ok_or_else(|| EngineError::UnknownCapability(name.to_string()))?;
        let pattern = capability
            .query_pattern
            .as_ref()
            .ok_or_else(|| EngineError::NotInvokable(name.to_string()))?;

        let resolver = self.translator.resolver();
        let source = pattern.data_source.as_str();
        let extra = schema::extra_conditions(
            &capability.arguments,
            args,
            &pattern.parameters,
            |key| resolver.resolve(key, source),
        );
        let window = schema::invocation_window(
            &capability.arguments,
            args,
            pattern.time_range,
            self.default_window,
            Utc::now(),
        );
        let query = pattern.plan.with_conditions(extra).render();

        let outcome =
            execute_bounded(self.executor.as_ref(), &query, Some(window), self.timeout).await;
        self.touch(name);

        let mut result = outcome?;
        if result.rows.len() > self.max_rows {
            result.rows.truncate(self.max_rows);
            result.row_count = result.rows.len();
        }
        debug!(name = %name, rows = result.row_count, "capability invoked");
        Ok(result)
    }

    /// Usage per capability, most used first.
    pub fn usage_report(&self) -> Vec<UsageEntry> {
        let map = self.capabilities.read().expect("registry lock poisoned");
        let mut out: Vec<UsageEntry> = map
            .values()
            .map(|c| UsageEntry {
                name: c.name.clone(),
                usage_count: c.usage_count,
                created: c.created,
                last_used: c.last_used,
            })
            .collect();
        out.sort_by(|a, b| {
            b.usage_count
                .cmp(&a.usage_count)
                .then_with(|| a.name.cmp(&b.name))
        });
        out
    }

    /// Remove never-used capabilities idle for longer than `max_age`.
    /// Returns the removed names, sorted.
    pub fn prune(&self, max_age: chrono::Duration) -> Vec<String> {
        self.prune_at(max_age, Utc::now())
    }

    fn prune_at(&self, max_age: chrono::Duration, now: DateTime<Utc>) -> Vec<String> {
        let mut map = self.capabilities.write().expect("registry lock poisoned");
        let mut removed: Vec<String> = map
            .values()
            .filter(|c| c.usage_count == 0 && now - c.last_used.unwrap_or(c.created) > max_age)
            .map(|c| c.name.clone())
            .collect();
        for name in &removed {
            map.remove(name);
        }
        drop(map);
        removed.sort();
        if !removed.is_empty() {
            info!(count = removed.len(), "pruned idle capabilities");
        }
        removed
    }

    /// Every capability, sorted by name.
    pub fn export_all(&self) -> Vec<DynamicCapability> {
        let map = self.capabilities.read().expect("registry lock poisoned");
        let mut out: Vec<DynamicCapability> = map.values().cloned().collect();
        out.sort_by(|a, b| a.name.cmp(&b.name));
        out
    }

    /// Insert `capabilities`, overwriting same-name entries.  Returns the
    /// number imported.
    pub fn import_all(&self, capabilities: Vec<DynamicCapability>) -> usize {
        let mut map = self.capabilities.write().expect("registry lock poisoned");
        let count = capabilities.len();
        for capability in capabilities {
            map.insert(capability.name.clone(), capability);
        }
        debug!(count, "capabilities imported");
        count
    }

    fn touch(&self, name: &str) {
        let mut map = self.capabilities.write().expect("registry lock poisoned");
        if let Some(c) = map.get_mut(name) {
            c.usage_count += 1;
            c.last_used = Some(Utc::now());
        }
    }

    async fn hand_off_template(&self, capability: &DynamicCapability, result: &TranslationResult) {
        let template = TemplateDescriptor {
            name: capability.name.clone(),
            description: capability.description.clone(),
            query: result.query.clone(),
            category: result.category.clone(),
            parameters: serde_json::to_value(&result.parameters).unwrap_or(Value::Null),
        };
        if let Err(e) = self.templates.save(template).await {
            warn!(name = %capability.name, error = %e, "template hand-off failed");
        }
    }
}

fn build_capability(
    name: &str,
    text: &str,
    result: &TranslationResult,
    now: DateTime<Utc>,
) -> DynamicCapability {
    DynamicCapability {
        name: name.to_string(),
        description: describe(text, result),
        input_schema: schema::input_schema(&result.parameters),
        arguments: schema::argument_rules(&result.parameters),
        query_pattern: Some(result.clone()),
        created: now,
        last_used: None,
        usage_count: 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_names_are_deterministic() {
        let a = canonical_name("risk-assessment", "Show me AWS EC2 instances with high risk");
        let b = canonical_name("risk-assessment", "Show me AWS EC2 instances with high risk");
        assert_eq!(a, b);
        assert_eq!(a, "risk-assessment-aws-ec2-instances");
        assert_eq!(canonical_name("general", "show me"), "general");
    }
}

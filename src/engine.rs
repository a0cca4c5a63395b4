//! Query engine: wires the catalog, translator and registry to the
//! collaborators and implements the ask flow.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info};

use crate::catalog::DataSourceCatalog;
use crate::config::Config;
use crate::error::EngineError;
use crate::executor::{
    execute_bounded, NoopTemplateSink, NullLister, QueryExecutor, QueryResult, SourceLister,
    StaticExecutor, TemplateSink,
};
use crate::registry::CapabilityRegistry;
use crate::translator::{IntentTranslator, TranslateOptions, TranslationResult};

/// External collaborators the engine delegates to.
#[derive(Clone)]
pub struct Collaborators {
    pub executor: Arc<dyn QueryExecutor>,
    pub lister: Arc<dyn SourceLister>,
    pub templates: Arc<dyn TemplateSink>,
}

impl Collaborators {
    /// Offline collaborators: fixed rows, no listing, no templates.
    pub fn offline(executor: StaticExecutor) -> Self {
        Self {
            executor: Arc::new(executor),
            lister: Arc::new(NullLister::default()),
            templates: Arc::new(NoopTemplateSink),
        }
    }
}

/// Result of [`QueryEngine::ask`].
#[derive(Debug, Clone, Serialize)]
pub struct AskOutcome {
    pub translation: TranslationResult,
    pub result: QueryResult,
    /// Name of the capability registered or reused for this request.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub registered: Option<String>,
}

pub struct QueryEngine {
    config: Config,
    catalog: Arc<DataSourceCatalog>,
    translator: Arc<IntentTranslator>,
    registry: Arc<CapabilityRegistry>,
    executor: Arc<dyn QueryExecutor>,
}

impl QueryEngine {
    pub fn new(config: Config, collaborators: Collaborators) -> Self {
        let catalog = Arc::new(DataSourceCatalog::new(
            Arc::clone(&collaborators.lister),
            Arc::clone(&collaborators.executor),
            &config.catalog,
        ));
        let translator = Arc::new(IntentTranslator::new(
            Arc::clone(&catalog),
            &config.translator,
        ));
        let registry = Arc::new(CapabilityRegistry::new(
            Arc::clone(&translator),
            Arc::clone(&collaborators.executor),
            Arc::clone(&collaborators.templates),
            &config.registry,
            &config.translator,
            &config.execution,
        ));
        Self {
            config,
            catalog,
            translator,
            registry,
            executor: collaborators.executor,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn catalog(&self) -> &Arc<DataSourceCatalog> {
        &self.catalog
    }

    pub fn translator(&self) -> &Arc<IntentTranslator> {
        &self.translator
    }

    pub fn registry(&self) -> &Arc<CapabilityRegistry> {
        &self.registry
    }

    /// Warm the catalog.
    pub async fn init(&self) {
        self.catalog.init().await;
        info!("query engine ready");
    }

    pub fn teardown(&self) {
        self.catalog.teardown();
    }

    pub async fn translate(&self, text: &str, opts: &TranslateOptions) -> TranslationResult {
        self.translator.translate_with(text, opts).await
    }

    /// Translate `text`, execute it, and promote it to a capability when
    /// it returns rows.
    pub async fn ask(&self, text: &str, opts: &TranslateOptions) -> Result<AskOutcome, EngineError> {
        let translation = self.translator.translate_with(text, opts).await;
        let result = self.execute(&translation).await?;

        let registered = if self.config.registry.auto_register && !result.rows.is_empty() {
            let registration = self
                .registry
                .register_from_translation(&translation, text)
                .await;
            Some(registration.capability.name)
        } else {
            None
        };

        Ok(AskOutcome {
            translation,
            result,
            registered,
        })
    }

    /// Execute a translation under the configured timeout and row ceiling.
    pub async fn execute(&self, translation: &TranslationResult) -> Result<QueryResult, EngineError> {
        let timeout = Duration::from_secs(self.config.execution.timeout_secs);
        let mut result = execute_bounded(
            self.executor.as_ref(),
            &translation.query,
            translation.time_range,
            timeout,
        )
        .await?;

        let max_rows = self.config.execution.max_rows;
        if result.rows.len() > max_rows {
            debug!(rows = result.rows.len(), max_rows, "result truncated");
            result.rows.truncate(max_rows);
            result.row_count = result.rows.len();
        }
        Ok(result)
    }
}

//! The router context object.
//!
//! [`ToolRouter`] owns the catalog, cache, analyzer, pipeline, and progress
//! bus for one service process. Build it once at startup, wrap it in an
//! `Arc`, and hand it to request handlers.

use std::sync::Arc;

use tracing::{info, warn};

use crate::OpenRouterClient;
use crate::analysis::{QueryAnalysis, QueryAnalyzer, StrategyReport};
use crate::completion::{CompletionModel, OpenRouterCompletion, Unconfigured};
use crate::config::RouterConfig;
use crate::error::PipelineError;
use crate::pipeline::{PipelineOrchestrator, PipelineOutput};
use crate::progress::ProgressBus;
use crate::tools::{CacheStats, ExecutionEngine, ToolCatalog, ToolDescriptor, ToolResultCache};

/// Process-wide routing context.
pub struct ToolRouter {
    engine: ExecutionEngine,
    analyzer: QueryAnalyzer,
    pipeline: PipelineOrchestrator,
    progress: Arc<ProgressBus>,
}

impl std::fmt::Debug for ToolRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRouter")
            .field("catalog", self.engine.catalog())
            .field("cache", &self.engine.cache_stats())
            .finish_non_exhaustive()
    }
}

impl ToolRouter {
    /// Assemble a router from a catalog and a completion model.
    pub fn new(catalog: ToolCatalog, model: Arc<dyn CompletionModel>, config: &RouterConfig) -> Self {
        let mut cache = ToolResultCache::new(config.cache_ttl);
        if let Some(capacity) = config.cache_capacity {
            cache = cache.with_capacity(capacity);
        }
        let engine = ExecutionEngine::new(Arc::new(catalog), Arc::new(cache));
        let progress = Arc::new(ProgressBus::new(config.progress_buffer));
        let pipeline = PipelineOrchestrator::new(engine.clone(), model, Arc::clone(&progress))
            .with_research_max_iterations(config.research_max_iterations);
        Self {
            analyzer: QueryAnalyzer::new(engine.clone()),
            engine,
            pipeline,
            progress,
        }
    }

    /// Default tools plus an OpenRouter completion model.
    ///
    /// Without an OpenRouter key the router still analyzes and runs tools;
    /// only the pipeline's model-backed stages fail.
    pub fn from_config(config: &RouterConfig) -> Result<Self, String> {
        let catalog = ToolCatalog::new().with_default_tools(config.brave_search_key.clone());
        let model: Arc<dyn CompletionModel> = match config.require_openrouter_key() {
            Ok(key) => Arc::new(
                OpenRouterCompletion::new(OpenRouterClient::new(key)?, config.model.clone())
                    .with_temperature(config.temperature)
                    .with_max_tokens(config.max_tokens),
            ),
            Err(e) => {
                warn!("{e}; the content pipeline is unavailable");
                Arc::new(Unconfigured::new(e.to_string()))
            }
        };
        if config.brave_search_key.is_none() {
            warn!("BRAVE_SEARCH_KEY is not set; web-search will fail over to its fallbacks");
        }
        info!("Router ready: model={}, {} tools", config.model, catalog.len());
        Ok(Self::new(catalog, model, config))
    }

    pub fn analyze(&self, query: &str) -> QueryAnalysis {
        self.analyzer.analyze(query)
    }

    pub async fn execute_optimal_strategy(&self, query: &str) -> StrategyReport {
        self.analyzer.execute_optimal_strategy(query).await
    }

    pub async fn run_pipeline(
        &self,
        query: &str,
        session_id: Option<&str>,
        personalization: Option<&str>,
    ) -> Result<PipelineOutput, PipelineError> {
        self.pipeline.run(query, session_id, personalization).await
    }

    pub fn clear_cache(&self) {
        self.engine.clear_cache();
    }

    pub fn list_tools(&self) -> Vec<ToolDescriptor> {
        self.engine.catalog().all()
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.engine.cache_stats()
    }

    pub fn engine(&self) -> &ExecutionEngine {
        &self.engine
    }

    /// The progress bus live clients join.
    pub fn progress(&self) -> &Arc<ProgressBus> {
        &self.progress
    }
}

//! Tool execution with caching, fallback chains, and concurrent fan-out.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::cache::{CacheStats, ToolResultCache};
use super::catalog::ToolCatalog;
use super::core::log_tool_call;
use crate::error::ToolError;

/// One `(tool, input)` pair for [`ExecutionEngine::execute_in_parallel`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolRequest {
    pub tool: String,
    pub input: String,
}

impl ToolRequest {
    pub fn new(tool: impl Into<String>, input: impl Into<String>) -> Self {
        Self {
            tool: tool.into(),
            input: input.into(),
        }
    }
}

/// Per-tool result of a strategy run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "value", rename_all = "snake_case")]
pub enum ToolOutcome {
    Success(String),
    /// The tool succeeded with an empty result.
    NoResult,
    Failure(String),
}

impl ToolOutcome {
    pub fn from_result(result: Result<String, ToolError>) -> Self {
        match result {
            Ok(s) if s.is_empty() => Self::NoResult,
            Ok(s) => Self::Success(s),
            Err(e) => Self::Failure(e.to_string()),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failure(_))
    }
}

impl fmt::Display for ToolOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success(s) => f.write_str(s),
            Self::NoResult => f.write_str("No result"),
            Self::Failure(msg) => write!(f, "Error: {msg}"),
        }
    }
}

/// Results keyed by tool name. A later entry for the same tool replaces an
/// earlier one.
pub type ToolResults = BTreeMap<String, ToolOutcome>;

/// Invokes tools from a shared catalog through a shared result cache.
#[derive(Debug, Clone)]
pub struct ExecutionEngine {
    catalog: Arc<ToolCatalog>,
    cache: Arc<ToolResultCache>,
}

impl ExecutionEngine {
    pub fn new(catalog: Arc<ToolCatalog>, cache: Arc<ToolResultCache>) -> Self {
        Self { catalog, cache }
    }

    pub fn catalog(&self) -> &ToolCatalog {
        &self.catalog
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Drop every cached result.
    pub fn clear_cache(&self) {
        self.cache.clear();
        debug!("Tool result cache cleared");
    }

    /// Call a tool directly, bypassing the cache and the fallback chain.
    pub async fn invoke(&self, tool_name: &str, input: &str) -> Result<String, ToolError> {
        let tool = self
            .catalog
            .tool(tool_name)
            .ok_or_else(|| ToolError::NotFound(tool_name.to_string()))?;
        log_tool_call(tool_name, input);
        let start = Instant::now();
        let result = tool
            .invoke(input)
            .await
            .map_err(|message| ToolError::invocation(tool_name, message));
        debug!(
            "[tool] {tool_name} finished in {:.1}ms (ok={})",
            start.elapsed().as_secs_f64() * 1000.0,
            result.is_ok()
        );
        result
    }

    /// Run a tool through the cache, falling back along its chain on failure.
    ///
    /// Only the primary tool's successful result is cached. Fallbacks are
    /// invoked directly and their results are returned uncached. If every
    /// fallback fails, or the chain is empty, the primary tool's error is
    /// returned as [`ToolError::FallbacksExhausted`].
    pub async fn execute_with_cache(&self, tool_name: &str, input: &str) -> Result<String, ToolError> {
        let descriptor = self
            .catalog
            .get(tool_name)
            .ok_or_else(|| ToolError::NotFound(tool_name.to_string()))?;

        if let Some(hit) = self.cache.get(tool_name, input) {
            debug!("[cache] hit for {tool_name}");
            return Ok(hit);
        }

        let err = match self.invoke(tool_name, input).await {
            Ok(result) => {
                self.cache.put(tool_name, input, result.clone());
                return Ok(result);
            }
            Err(e) => e,
        };

        if descriptor.fallback_chain.is_empty() {
            warn!("Tool {tool_name} failed ({err}) and has no fallbacks");
        } else {
            warn!("Tool {tool_name} failed ({err}), trying fallbacks");
        }
        let mut attempted = Vec::new();
        for fallback in &descriptor.fallback_chain {
            if !self.catalog.contains(fallback) {
                debug!("Fallback {fallback} for {tool_name} is not registered, skipping");
                continue;
            }
            attempted.push(fallback.clone());
            match self.invoke(fallback, input).await {
                Ok(result) => {
                    debug!("Fallback {fallback} succeeded for {tool_name}");
                    return Ok(result);
                }
                Err(e) => warn!("Fallback {fallback} for {tool_name} failed: {e}"),
            }
        }

        Err(ToolError::FallbacksExhausted {
            tool: tool_name.to_string(),
            message: err.to_string(),
            attempted,
        })
    }

    /// Run every request concurrently and wait for all of them to settle.
    ///
    /// Never fails as a whole: each request's error is captured in its
    /// [`ToolOutcome`].
    pub async fn execute_in_parallel(&self, requests: Vec<ToolRequest>) -> ToolResults {
        let start = Instant::now();
        let count = requests.len();
        let settled = join_all(requests.into_iter().map(|req| async move {
            let outcome = ToolOutcome::from_result(self.execute_with_cache(&req.tool, &req.input).await);
            (req.tool, outcome)
        }))
        .await;
        debug!(
            "Parallel execution of {count} request(s) settled in {:.1}ms",
            start.elapsed().as_secs_f64() * 1000.0
        );
        settled.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::core::{FnTool, ToolCategory, ToolDescriptor};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn counting_tool(
        name: &str,
        fallbacks: &[&str],
        reply: Result<&str, &str>,
    ) -> (FnTool, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let reply = reply.map(str::to_string).map_err(str::to_string);
        let tool = FnTool::new(
            ToolDescriptor::new(name, "test", ToolCategory::Search).fallbacks(fallbacks),
            move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
                let reply = reply.clone();
                async move { reply }
            },
        );
        (tool, calls)
    }

    fn engine(catalog: ToolCatalog) -> ExecutionEngine {
        ExecutionEngine::new(Arc::new(catalog), Arc::new(ToolResultCache::default()))
    }

    #[tokio::test]
    async fn unknown_tool_is_not_found() {
        let engine = engine(ToolCatalog::new());
        let err = engine.execute_with_cache("missing", "x").await.unwrap_err();
        assert_eq!(err, ToolError::NotFound("missing".into()));
    }

    #[tokio::test(start_paused = true)]
    async fn cache_suppresses_repeat_calls_until_ttl() {
        let (t, calls) = counting_tool("t", &[], Ok("fresh"));
        let engine = engine(ToolCatalog::new().with(t));

        assert_eq!(engine.execute_with_cache("t", "x").await.unwrap(), "fresh");
        assert_eq!(engine.execute_with_cache("t", "x").await.unwrap(), "fresh");
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        tokio::time::advance(Duration::from_secs(301)).await;
        engine.execute_with_cache("t", "x").await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn different_inputs_are_cached_separately() {
        let (t, calls) = counting_tool("t", &[], Ok("r"));
        let engine = engine(ToolCatalog::new().with(t));
        engine.execute_with_cache("t", "a").await.unwrap();
        engine.execute_with_cache("t", "b").await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(engine.cache_stats().size, 2);
    }

    #[tokio::test]
    async fn second_fallback_rescues_failure() {
        let (t, _) = counting_tool("t", &["f1", "f2"], Err("primary down"));
        let (f1, f1_calls) = counting_tool("f1", &[], Err("f1 down"));
        let (f2, _) = counting_tool("f2", &[], Ok("from f2"));
        let engine = engine(ToolCatalog::new().with(t).with(f1).with(f2));

        assert_eq!(engine.execute_with_cache("t", "q").await.unwrap(), "from f2");
        assert_eq!(f1_calls.load(Ordering::SeqCst), 1);
        // fallback results are not cached under the primary key
        assert_eq!(engine.cache_stats().size, 0);
    }

    #[tokio::test]
    async fn exhausted_fallbacks_report_original_error() {
        let (t, _) = counting_tool("t", &["f1", "ghost", "f2"], Err("primary down"));
        let (f1, _) = counting_tool("f1", &[], Err("f1 down"));
        let (f2, _) = counting_tool("f2", &[], Err("f2 down"));
        let engine = engine(ToolCatalog::new().with(t).with(f1).with(f2));

        let err = engine.execute_with_cache("t", "q").await.unwrap_err();
        assert_eq!(err.to_string(), "primary down");
        match err {
            ToolError::FallbacksExhausted { tool, attempted, .. } => {
                assert_eq!(tool, "t");
                assert_eq!(attempted, vec!["f1", "f2"]);
            }
            other => panic!("expected FallbacksExhausted, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn empty_chain_reports_exhausted_with_nothing_attempted() {
        let (t, _) = counting_tool("t", &[], Err("bad input"));
        let engine = engine(ToolCatalog::new().with(t));
        let err = engine.execute_with_cache("t", "q").await.unwrap_err();
        assert_eq!(
            err,
            ToolError::FallbacksExhausted {
                tool: "t".into(),
                message: "bad input".into(),
                attempted: vec![],
            }
        );
        assert_eq!(err.to_string(), "bad input");
    }

    #[tokio::test]
    async fn fallbacks_bypass_the_cache() {
        let (t, _) = counting_tool("t", &["f"], Err("down"));
        let (f, f_calls) = counting_tool("f", &[], Ok("backup"));
        let engine = engine(ToolCatalog::new().with(t).with(f));
        engine.execute_with_cache("t", "q").await.unwrap();
        engine.execute_with_cache("t", "q").await.unwrap();
        assert_eq!(f_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn parallel_captures_each_outcome() {
        let (a, _) = counting_tool("A", &[], Err("kaput"));
        let (b, _) = counting_tool("B", &[], Ok("ok"));
        let (c, _) = counting_tool("C", &[], Ok(""));
        let engine = engine(ToolCatalog::new().with(a).with(b).with(c));

        let results = engine
            .execute_in_parallel(vec![
                ToolRequest::new("A", "x"),
                ToolRequest::new("B", "y"),
                ToolRequest::new("C", "z"),
                ToolRequest::new("D", "w"),
            ])
            .await;

        assert_eq!(results["A"], ToolOutcome::Failure("kaput".into()));
        assert_eq!(results["A"].to_string(), "Error: kaput");
        assert_eq!(results["B"], ToolOutcome::Success("ok".into()));
        assert_eq!(results["C"], ToolOutcome::NoResult);
        assert_eq!(results["C"].to_string(), "No result");
        assert_eq!(results["D"].to_string(), "Error: Tool D not found");
    }

    #[tokio::test(start_paused = true)]
    async fn parallel_waits_for_slowest_member() {
        let slow = FnTool::new(
            ToolDescriptor::new("slow", "", ToolCategory::Search),
            |_| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok("late".to_string())
            },
        );
        let (fast, _) = counting_tool("fast", &[], Err("early failure"));
        let engine = engine(ToolCatalog::new().with(slow).with(fast));

        let results = engine
            .execute_in_parallel(vec![ToolRequest::new("fast", "a"), ToolRequest::new("slow", "b")])
            .await;
        assert_eq!(results.len(), 2);
        assert_eq!(results["slow"], ToolOutcome::Success("late".into()));
    }

    #[tokio::test]
    async fn duplicate_tool_names_keep_last_result() {
        let echo = FnTool::new(ToolDescriptor::new("echo", "", ToolCategory::Search), |input| async move {
            Ok(input)
        });
        let engine = engine(ToolCatalog::new().with(echo));
        let results = engine
            .execute_in_parallel(vec![ToolRequest::new("echo", "one"), ToolRequest::new("echo", "two")])
            .await;
        assert_eq!(results.len(), 1);
        assert_eq!(results["echo"], ToolOutcome::Success("two".into()));
    }

    #[test]
    fn outcome_serializes_tagged() {
        let json = serde_json::to_value(ToolOutcome::Failure("x".into())).unwrap();
        assert_eq!(json, serde_json::json!({"status": "failure", "value": "x"}));
        let json = serde_json::to_value(ToolOutcome::NoResult).unwrap();
        assert_eq!(json, serde_json::json!({"status": "no_result"}));
    }
}

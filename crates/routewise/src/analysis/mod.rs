//! Query analysis and execution strategy.
//!
//! [`QueryAnalyzer::analyze`] classifies a query, decides whether it can be
//! split into independently answerable sub-queries, and suggests tools.
//! [`QueryAnalyzer::choose_strategy`] turns the analysis into an explicit
//! [`ExecutionStrategy`], and [`QueryAnalyzer::execute_strategy`] runs it on
//! the [`ExecutionEngine`].

pub mod intent;

use std::sync::LazyLock;
use std::time::Instant;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::tools::names::{CALCULATOR, ENCYCLOPEDIA, STATISTICS, WEB_SEARCH};
use crate::tools::{ExecutionEngine, ToolOutcome, ToolRequest, ToolResults};

pub use intent::Intent;

/// Below this confidence the serial strategy also runs the second suggestion.
pub const SECONDARY_CONFIDENCE_THRESHOLD: f64 = 0.7;

const CONNECTIVES: [&str; 3] = [" and ", " also ", " plus "];

static CONNECTIVE_SPLIT: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?i) and | also | plus ").ok());

/// Result of [`QueryAnalyzer::analyze`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryAnalysis {
    pub intent: Intent,
    /// In `[0, 1]`.
    pub confidence: f64,
    /// Tool names, best first.
    pub suggested_tools: Vec<String>,
    pub parallelizable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_queries: Option<Vec<String>>,
}

/// How to run the tools for one query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExecutionStrategy {
    /// One request per sub-query, run concurrently.
    Parallel { requests: Vec<ToolRequest> },
    /// The top suggested tool on the whole query.
    Serial { primary: String },
    /// The top tool, then (if it succeeded) the runner-up, one after the other.
    SerialWithSecondary { primary: String, secondary: String },
    /// No tool was suggested.
    Skip,
}

/// Output of [`QueryAnalyzer::execute_optimal_strategy`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StrategyReport {
    pub results: ToolResults,
    pub analysis: QueryAnalysis,
    pub strategy: ExecutionStrategy,
    pub execution_time_ms: u64,
}

/// Classifies queries and runs the matching tools.
#[derive(Debug, Clone)]
pub struct QueryAnalyzer {
    engine: ExecutionEngine,
}

impl QueryAnalyzer {
    pub fn new(engine: ExecutionEngine) -> Self {
        Self { engine }
    }

    pub fn engine(&self) -> &ExecutionEngine {
        &self.engine
    }

    /// Classify `query`, detect sub-queries, and suggest tools.
    pub fn analyze(&self, query: &str) -> QueryAnalysis {
        let (intent, confidence) = intent::classify(query);
        let mut parallelizable = intent == Intent::Mixed;

        let mut sub_queries = None;
        if has_connective(query) {
            parallelizable = true;
            sub_queries = split_sub_queries(query);
        }

        let suggested_tools = self.suggest_tools(intent, query);
        debug!(
            "Analyzed query: intent={intent} confidence={confidence:.2} tools={suggested_tools:?} \
             parallel={parallelizable} sub_queries={}",
            sub_queries.as_ref().map_or(0, Vec::len)
        );

        QueryAnalysis {
            intent,
            confidence,
            suggested_tools,
            parallelizable,
            sub_queries,
        }
    }

    /// Fixed intent -> tools table; mixed queries are scored by the catalog.
    fn suggest_tools(&self, intent: Intent, query: &str) -> Vec<String> {
        let names: &[&str] = match intent {
            Intent::Search => &[WEB_SEARCH, ENCYCLOPEDIA],
            Intent::Knowledge => &[ENCYCLOPEDIA, WEB_SEARCH],
            Intent::Computation => {
                let lower = query.to_lowercase();
                if lower.contains("statistics") || lower.contains("data") {
                    &[STATISTICS, CALCULATOR]
                } else {
                    &[CALCULATOR, STATISTICS]
                }
            }
            Intent::Analysis => &[WEB_SEARCH, ENCYCLOPEDIA, STATISTICS],
            Intent::Mixed => return self.engine.catalog().select_for_query(query),
        };
        names.iter().map(|s| (*s).to_string()).collect()
    }

    /// Pick the strategy for an analysis.
    pub fn choose_strategy(&self, analysis: &QueryAnalysis) -> ExecutionStrategy {
        let tools = &analysis.suggested_tools;
        let Some(primary) = tools.first() else {
            return ExecutionStrategy::Skip;
        };

        if analysis.parallelizable
            && let Some(subs) = &analysis.sub_queries
        {
            // Round-robin over the suggestions.
            let requests = subs
                .iter()
                .enumerate()
                .map(|(i, sub)| ToolRequest::new(tools[i % tools.len()].clone(), sub.clone()))
                .collect();
            return ExecutionStrategy::Parallel { requests };
        }

        match tools.get(1) {
            Some(secondary) if analysis.confidence < SECONDARY_CONFIDENCE_THRESHOLD => {
                ExecutionStrategy::SerialWithSecondary {
                    primary: primary.clone(),
                    secondary: secondary.clone(),
                }
            }
            _ => ExecutionStrategy::Serial {
                primary: primary.clone(),
            },
        }
    }

    /// Run a strategy. Serial strategies run the tools on the whole `query`.
    pub async fn execute_strategy(&self, strategy: &ExecutionStrategy, query: &str) -> ToolResults {
        match strategy {
            ExecutionStrategy::Parallel { requests } => {
                self.engine.execute_in_parallel(requests.clone()).await
            }
            ExecutionStrategy::Serial { primary } => {
                let mut results = ToolResults::new();
                let outcome =
                    ToolOutcome::from_result(self.engine.execute_with_cache(primary, query).await);
                results.insert(primary.clone(), outcome);
                results
            }
            ExecutionStrategy::SerialWithSecondary { primary, secondary } => {
                let mut results = ToolResults::new();
                let first =
                    ToolOutcome::from_result(self.engine.execute_with_cache(primary, query).await);
                let run_secondary = !first.is_failure();
                results.insert(primary.clone(), first);
                if run_secondary {
                    let second = ToolOutcome::from_result(
                        self.engine.execute_with_cache(secondary, query).await,
                    );
                    results.insert(secondary.clone(), second);
                }
                results
            }
            ExecutionStrategy::Skip => ToolResults::new(),
        }
    }

    /// Analyze `query`, choose a strategy, run it, and time the whole thing.
    pub async fn execute_optimal_strategy(&self, query: &str) -> StrategyReport {
        let start = Instant::now();
        let analysis = self.analyze(query);
        let strategy = self.choose_strategy(&analysis);
        info!(
            "Executing {} strategy for {} query",
            strategy_label(&strategy),
            analysis.intent
        );
        let results = self.execute_strategy(&strategy, query).await;
        let execution_time_ms = start.elapsed().as_millis() as u64;
        debug!("Strategy finished in {execution_time_ms}ms with {} result(s)", results.len());
        StrategyReport {
            results,
            analysis,
            strategy,
            execution_time_ms,
        }
    }
}

fn strategy_label(strategy: &ExecutionStrategy) -> &'static str {
    match strategy {
        ExecutionStrategy::Parallel { .. } => "parallel",
        ExecutionStrategy::Serial { .. } => "serial",
        ExecutionStrategy::SerialWithSecondary { .. } => "serial+secondary",
        ExecutionStrategy::Skip => "no-op",
    }
}

fn has_connective(query: &str) -> bool {
    let lower = query.to_lowercase();
    CONNECTIVES.iter().any(|c| lower.contains(c))
}

/// Split on the connectives, trimming and dropping empty segments.
fn split_sub_queries(query: &str) -> Option<Vec<String>> {
    let re = CONNECTIVE_SPLIT.as_ref()?;
    let parts: Vec<String> = re
        .split(query)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();
    (!parts.is_empty()).then_some(parts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::{FnTool, ToolCatalog, ToolCategory, ToolDescriptor, ToolResultCache};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn echo(name: &str, category: ToolCategory, priority: i32, keywords: &[&str]) -> FnTool {
        let tag = name.to_string();
        FnTool::new(
            ToolDescriptor::new(name, "", category)
                .priority(priority)
                .keywords(keywords),
            move |input| {
                let tag = tag.clone();
                async move { Ok(format!("{tag}<{input}>")) }
            },
        )
    }

    fn analyzer_with(catalog: ToolCatalog) -> QueryAnalyzer {
        QueryAnalyzer::new(ExecutionEngine::new(
            Arc::new(catalog),
            Arc::new(ToolResultCache::default()),
        ))
    }

    fn default_analyzer() -> QueryAnalyzer {
        analyzer_with(
            ToolCatalog::new()
                .with(echo(WEB_SEARCH, ToolCategory::Search, 10, &["search", "news"]))
                .with(echo(ENCYCLOPEDIA, ToolCategory::Knowledge, 8, &["wikipedia", "explain"]))
                .with(echo(CALCULATOR, ToolCategory::Computation, 9, &["calculate", "math"]))
                .with(echo(STATISTICS, ToolCategory::Computation, 7, &["statistics", "mean"])),
        )
    }

    #[test]
    fn knowledge_query_suggests_encyclopedia_first() {
        let a = default_analyzer().analyze("What is the capital of France?");
        assert_eq!(a.intent, Intent::Knowledge);
        assert!((0.6..=0.9).contains(&a.confidence));
        assert_eq!(a.suggested_tools, vec![ENCYCLOPEDIA, WEB_SEARCH]);
        assert!(!a.parallelizable);
        assert_eq!(a.sub_queries, None);
    }

    #[test]
    fn mixed_query_splits_into_sub_queries() {
        let a = default_analyzer().analyze("Calculate 5 + 3 and tell me about gravity");
        assert_eq!(a.intent, Intent::Mixed);
        assert!(a.parallelizable);
        assert_eq!(
            a.sub_queries,
            Some(vec!["Calculate 5 + 3".to_string(), "tell me about gravity".to_string()])
        );
        // Mixed suggestions come from catalog scoring.
        assert_eq!(a.suggested_tools[0], CALCULATOR);
        assert!(a.suggested_tools.len() <= 3);
    }

    #[test]
    fn connectives_are_case_insensitive() {
        let a = default_analyzer().analyze("Rust AND Go ALSO Zig");
        assert!(a.parallelizable);
        assert_eq!(a.sub_queries.unwrap(), vec!["Rust", "Go", "Zig"]);
    }

    #[test]
    fn empty_segments_are_dropped() {
        assert_eq!(
            split_sub_queries("news and  and weather"),
            Some(vec!["news".to_string(), "weather".to_string()])
        );
        assert_eq!(split_sub_queries(" and "), None);
    }

    #[test]
    fn statistics_mentions_reorder_computation_tools() {
        let analyzer = default_analyzer();
        assert_eq!(
            analyzer.analyze("compute the mean of this data").suggested_tools,
            vec![STATISTICS, CALCULATOR]
        );
        assert_eq!(
            analyzer.analyze("calculate 12*4").suggested_tools,
            vec![CALCULATOR, STATISTICS]
        );
    }

    #[test]
    fn analysis_intent_table() {
        let a = default_analyzer().analyze("evaluate the proposal");
        assert_eq!(a.intent, Intent::Analysis);
        assert_eq!(a.suggested_tools, vec![WEB_SEARCH, ENCYCLOPEDIA, STATISTICS]);
    }

    #[test]
    fn low_confidence_adds_secondary() {
        let analyzer = default_analyzer();
        let analysis = analyzer.analyze("capital of France");
        assert_eq!(analysis.confidence, 0.5);
        assert_eq!(
            analyzer.choose_strategy(&analysis),
            ExecutionStrategy::SerialWithSecondary {
                primary: WEB_SEARCH.into(),
                secondary: ENCYCLOPEDIA.into(),
            }
        );
    }

    #[test]
    fn confident_single_intent_is_serial() {
        let analyzer = default_analyzer();
        let analysis = analyzer.analyze("explain and define entropy");
        // connective forces parallel
        assert!(matches!(
            analyzer.choose_strategy(&analysis),
            ExecutionStrategy::Parallel { .. }
        ));

        let analysis = analyzer.analyze("please explain entropy, define it");
        assert_eq!(
            analyzer.choose_strategy(&analysis),
            ExecutionStrategy::Serial {
                primary: ENCYCLOPEDIA.into()
            }
        );
    }

    #[test]
    fn parallel_assigns_tools_round_robin() {
        let analyzer = default_analyzer();
        let analysis = QueryAnalysis {
            intent: Intent::Mixed,
            confidence: 0.8,
            suggested_tools: vec!["a".into(), "b".into()],
            parallelizable: true,
            sub_queries: Some(vec!["q1".into(), "q2".into(), "q3".into()]),
        };
        assert_eq!(
            analyzer.choose_strategy(&analysis),
            ExecutionStrategy::Parallel {
                requests: vec![
                    ToolRequest::new("a", "q1"),
                    ToolRequest::new("b", "q2"),
                    ToolRequest::new("a", "q3"),
                ]
            }
        );
    }

    #[test]
    fn no_suggestions_skip() {
        let analyzer = analyzer_with(ToolCatalog::new());
        let analysis = analyzer.analyze("calculate 1+1 and explain gravity");
        assert!(analysis.suggested_tools.is_empty());
        assert_eq!(analyzer.choose_strategy(&analysis), ExecutionStrategy::Skip);
    }

    #[tokio::test]
    async fn optimal_strategy_runs_sub_queries_in_parallel() {
        let report = default_analyzer()
            .execute_optimal_strategy("Calculate 5 + 3 and tell me about gravity")
            .await;
        assert!(matches!(report.strategy, ExecutionStrategy::Parallel { .. }));
        assert_eq!(report.results.len(), 2);
        assert_eq!(
            report.results[CALCULATOR],
            ToolOutcome::Success("calculator<Calculate 5 + 3>".into())
        );
    }

    #[tokio::test]
    async fn serial_failure_skips_secondary() {
        let secondary_calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&secondary_calls);
        let analyzer = analyzer_with(
            ToolCatalog::new()
                .with(FnTool::new(
                    ToolDescriptor::new(WEB_SEARCH, "", ToolCategory::Search),
                    |_| async { Err("offline".to_string()) },
                ))
                .with(FnTool::new(
                    ToolDescriptor::new(ENCYCLOPEDIA, "", ToolCategory::Knowledge),
                    move |_| {
                        counter.fetch_add(1, Ordering::SeqCst);
                        async { Ok("never".to_string()) }
                    },
                )),
        );

        let report = analyzer.execute_optimal_strategy("capital of France").await;
        assert_eq!(report.results.len(), 1);
        assert_eq!(report.results[WEB_SEARCH].to_string(), "Error: offline");
        assert_eq!(secondary_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn serial_with_secondary_collects_both() {
        let report = default_analyzer().execute_optimal_strategy("capital of France").await;
        assert_eq!(report.results.len(), 2);
        assert!(report.results[WEB_SEARCH].is_success());
        assert!(report.results[ENCYCLOPEDIA].is_success());
    }

    #[test]
    fn strategy_serializes_with_kind_tag() {
        let json = serde_json::to_value(ExecutionStrategy::Serial {
            primary: "calculator".into(),
        })
        .unwrap();
        assert_eq!(json["kind"], "serial");
        assert_eq!(json["primary"], "calculator");
    }
}

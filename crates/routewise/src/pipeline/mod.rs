//! Research → write → review content pipeline.
//!
//! Each run walks a fixed state machine. Every stage consumes the complete
//! output of the previous one; a failure in any stage aborts the run with a
//! [`PipelineError`] and is announced on the session's [`ProgressBus`].
//! There is no retry at this layer.
//!
//! ```text
//! Research ──▶ Write ──▶ Review ──▶ Done
//!    │           │          │
//!    └───────────┴──────────┴──▶ Failed
//! ```

pub mod prompts;

use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::completion::CompletionModel;
use crate::error::{PipelineError, PipelineStage};
use crate::progress::ProgressBus;
use crate::tools::names::{NO_RESULTS, WEB_SEARCH};
use crate::tools::{ExecutionEngine, ToolInput, parse_tool_args};
use crate::{Message, ToolCall, ToolDef};

/// Default bound on model turns in the tool-using research fallback.
pub const DEFAULT_RESEARCH_ITERATIONS: usize = 2;

/// Output of a successful pipeline run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineOutput {
    pub research: String,
    pub draft: String,
    #[serde(rename = "final")]
    pub final_text: String,
}

/// Pipeline position. Each variant carries what the next stage needs.
#[derive(Debug)]
enum PipelineState {
    Research,
    Write { research: String },
    Review { research: String, draft: String },
    Done(PipelineOutput),
    Failed(PipelineError),
}

/// Runs the three pipeline stages against a completion model.
pub struct PipelineOrchestrator {
    engine: ExecutionEngine,
    model: Arc<dyn CompletionModel>,
    bus: Arc<ProgressBus>,
    research_max_iterations: usize,
}

impl PipelineOrchestrator {
    pub fn new(engine: ExecutionEngine, model: Arc<dyn CompletionModel>, bus: Arc<ProgressBus>) -> Self {
        Self {
            engine,
            model,
            bus,
            research_max_iterations: DEFAULT_RESEARCH_ITERATIONS,
        }
    }

    /// Bound the research fallback loop (at least one turn).
    pub fn with_research_max_iterations(mut self, n: usize) -> Self {
        self.research_max_iterations = n.max(1);
        self
    }

    /// Run the pipeline for `query`.
    ///
    /// With a `session_id`, stage transitions are published on the progress
    /// bus: researching, writing, reviewing, then complete or error.
    pub async fn run(
        &self,
        query: &str,
        session_id: Option<&str>,
        personalization: Option<&str>,
    ) -> Result<PipelineOutput, PipelineError> {
        let start = Instant::now();
        info!("Pipeline started ({} chars)", query.len());

        let mut state = PipelineState::Research;
        loop {
            state = match state {
                PipelineState::Research => {
                    if let Some(sid) = session_id {
                        self.bus.emit_researching(sid, None);
                    }
                    match self.research(query).await {
                        Ok(research) => PipelineState::Write { research },
                        Err(message) => failed(PipelineStage::Research, message),
                    }
                }
                PipelineState::Write { research } => {
                    if let Some(sid) = session_id {
                        self.bus.emit_writing(sid, None);
                    }
                    match self.write(&research, personalization).await {
                        Ok(draft) => PipelineState::Review { research, draft },
                        Err(message) => failed(PipelineStage::Write, message),
                    }
                }
                PipelineState::Review { research, draft } => {
                    if let Some(sid) = session_id {
                        self.bus.emit_reviewing(sid, None);
                    }
                    match self.review(&draft).await {
                        Ok(final_text) => PipelineState::Done(PipelineOutput {
                            research,
                            draft,
                            final_text,
                        }),
                        Err(message) => failed(PipelineStage::Review, message),
                    }
                }
                PipelineState::Done(output) => {
                    if let Some(sid) = session_id {
                        self.bus.emit_complete(sid, None);
                    }
                    info!(
                        "Pipeline finished in {:.1}s ({} chars)",
                        start.elapsed().as_secs_f64(),
                        output.final_text.len()
                    );
                    return Ok(output);
                }
                PipelineState::Failed(err) => {
                    warn!("Pipeline aborted: {err}");
                    if let Some(sid) = session_id {
                        self.bus.emit_error(sid, &err.to_string());
                    }
                    return Err(err);
                }
            };
        }
    }

    // ── Stages ─────────────────────────────────────────────────────

    /// Direct web search first; the model-driven loop only if that fails.
    async fn research(&self, query: &str) -> Result<String, String> {
        let text = match self.engine.invoke(WEB_SEARCH, query).await {
            Ok(text) => text,
            Err(e) => {
                warn!("Direct research search failed ({e}), falling back to model");
                self.research_with_model(query).await?
            }
        };
        if text.contains(NO_RESULTS) {
            info!("Research found nothing for the query");
            return Ok(prompts::no_results(query));
        }
        Ok(text)
    }

    /// Bounded tool loop restricted to web search. The last turn offers no
    /// tools, so the model has to answer in text.
    async fn research_with_model(&self, query: &str) -> Result<String, String> {
        let tool_defs: Vec<ToolDef> = self
            .engine
            .catalog()
            .get(WEB_SEARCH)
            .map(|d| vec![d.to_tool_def()])
            .unwrap_or_default();
        let mut messages = vec![Message::system(prompts::RESEARCH_SYSTEM), Message::user(query)];

        for turn_no in 1..=self.research_max_iterations {
            let last = turn_no == self.research_max_iterations;
            let offered: &[ToolDef] = if last { &[] } else { &tool_defs };
            let turn = self.model.complete_with_tools(&messages, offered).await?;

            if last || turn.tool_calls.is_empty() {
                return turn
                    .content
                    .filter(|c| !c.trim().is_empty())
                    .ok_or_else(|| "research model returned no text".to_string());
            }

            debug!("Research turn {turn_no}: {} tool call(s)", turn.tool_calls.len());
            messages.push(Message::assistant_tool_calls(turn.tool_calls.clone()));
            for call in &turn.tool_calls {
                let result = self.run_research_call(call).await;
                messages.push(Message::tool_result(&call.id, result));
            }
        }
        Err("research did not produce an answer".to_string())
    }

    async fn run_research_call(&self, call: &ToolCall) -> String {
        if call.function.name != WEB_SEARCH {
            return format!("Error: tool '{}' is not available here", call.function.name);
        }
        let args: ToolInput = match parse_tool_args(&call.function.arguments) {
            Ok(a) => a,
            Err(e) => return e,
        };
        match self.engine.invoke(WEB_SEARCH, &args.input).await {
            Ok(result) => result,
            Err(e) => format!("Error: {e}"),
        }
    }

    async fn write(&self, research: &str, personalization: Option<&str>) -> Result<String, String> {
        let messages = [
            Message::system(prompts::writer_system(personalization)),
            Message::user(prompts::research_for_writer(research)),
        ];
        self.model.complete(&messages).await
    }

    async fn review(&self, draft: &str) -> Result<String, String> {
        let messages = [
            Message::system(prompts::REVIEWER_SYSTEM),
            Message::user(prompts::draft_for_reviewer(draft)),
        ];
        self.model.complete(&messages).await
    }
}

fn failed(stage: PipelineStage, message: String) -> PipelineState {
    PipelineState::Failed(PipelineError::StageFailed { stage, message })
}

//! Convenience re-exports for common `routewise` types.
//!
//! ```ignore
//! use routewise::prelude::*;
//! ```
//!
//! Covers the router, configuration, tool authoring, and the pipeline
//! surface. Built-in tool implementations and the expression evaluator are
//! left in their modules.

// ── Core types ──────────────────────────────────────────────────────
pub use crate::{Message, OpenRouterClient, ToolDef, json_schema_for};

// ── Router ──────────────────────────────────────────────────────────
pub use crate::config::RouterConfig;
pub use crate::error::{ConfigError, PipelineError, PipelineStage, ToolError};
pub use crate::router::ToolRouter;

// ── Analysis ────────────────────────────────────────────────────────
pub use crate::analysis::{ExecutionStrategy, Intent, QueryAnalysis, QueryAnalyzer, StrategyReport};

// ── Tools ───────────────────────────────────────────────────────────
pub use crate::tools::{
    ExecutionEngine, FnTool, Tool, ToolCatalog, ToolCategory, ToolDescriptor, ToolFuture,
    ToolOutcome, ToolRequest, ToolResultCache, ToolResults, parse_tool_args,
};

// ── Pipeline and progress ───────────────────────────────────────────
pub use crate::completion::{CompletionModel, OpenRouterCompletion};
pub use crate::pipeline::{PipelineOrchestrator, PipelineOutput};
pub use crate::progress::{ProgressBus, ProgressEvent, ProgressStage};

//! Tools and their execution.
//!
//! Every capability the router can reach (web search, encyclopedia lookup,
//! arithmetic, statistics) is a [`Tool`] implementor registered in a
//! [`ToolCatalog`]. The [`ExecutionEngine`] runs tools from the catalog with
//! a shared TTL cache, per-tool fallback chains, and concurrent fan-out.
//!
//! # Submodules
//!
//! - [`core`]: [`Tool`] trait, [`ToolDescriptor`], [`FnTool`].
//! - [`catalog`]: [`ToolCatalog`] registration and keyword/category scoring.
//! - [`cache`]: [`ToolResultCache`] with TTL expiry and optional capacity.
//! - [`engine`]: [`ExecutionEngine`], [`ToolOutcome`], [`ToolRequest`].
//! - [`builtin`]: the four default tools.
//! - [`expr`]: arithmetic evaluator used by the calculator.
//! - [`names`]: canonical tool names.

pub mod builtin;
pub mod cache;
pub mod catalog;
pub mod core;
pub mod engine;
pub mod expr;
pub mod names;

pub use cache::{CacheStats, DEFAULT_TTL, ToolResultCache};
pub use catalog::ToolCatalog;
pub use core::{
    DEFAULT_MAX_RESULT_BYTES, FnTool, Tool, ToolCategory, ToolDescriptor, ToolFuture, ToolInput,
    parse_tool_args, truncate_result,
};
pub use engine::{ExecutionEngine, ToolOutcome, ToolRequest, ToolResults};

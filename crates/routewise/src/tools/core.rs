//! Tool abstraction and static tool metadata.
//!
//! The [`Tool`] trait is the contract every capability unit implements: a
//! [`ToolDescriptor`] describing it, and an async [`Tool::invoke`] that takes
//! a single input string and returns a result string or a failure message.
//! Tools are collected into a [`ToolCatalog`](super::catalog::ToolCatalog)
//! and invoked through the [`ExecutionEngine`](super::engine::ExecutionEngine).

use std::collections::BTreeSet;
use std::fmt;
use std::future::Future;
use std::pin::Pin;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace};

use crate::ToolDef;

/// Boxed future returned by [`Tool::invoke`].
///
/// `Err` carries the tool's failure message.
pub type ToolFuture<'a> = Pin<Box<dyn Future<Output = Result<String, String>> + Send + 'a>>;

// ── Metadata ───────────────────────────────────────────────────────

/// Broad capability family of a tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolCategory {
    Search,
    Knowledge,
    Computation,
    Analysis,
}

impl ToolCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Search => "search",
            Self::Knowledge => "knowledge",
            Self::Computation => "computation",
            Self::Analysis => "analysis",
        }
    }
}

impl fmt::Display for ToolCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Static metadata for a registered tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    /// Unique name. Registering the same name again replaces the tool.
    pub name: String,
    pub description: String,
    pub category: ToolCategory,
    /// Static score bonus used by query-based selection.
    pub priority: i32,
    /// Lowercase cue words matched as substrings of a query.
    pub keywords: BTreeSet<String>,
    /// Tools tried in order when this one fails.
    pub fallback_chain: Vec<String>,
}

impl ToolDescriptor {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        category: ToolCategory,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            category,
            priority: 0,
            keywords: BTreeSet::new(),
            fallback_chain: Vec::new(),
        }
    }

    pub fn priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Add keywords (stored lowercase).
    pub fn keywords(mut self, keywords: &[&str]) -> Self {
        self.keywords
            .extend(keywords.iter().map(|k| k.to_lowercase()));
        self
    }

    /// Set the fallback chain, replacing any previous one.
    pub fn fallbacks(mut self, tools: &[&str]) -> Self {
        self.fallback_chain = tools.iter().map(|s| (*s).to_string()).collect();
        self
    }

    /// Function-calling definition for completion models that can use tools.
    pub fn to_tool_def(&self) -> ToolDef {
        ToolDef::new(
            self.name.clone(),
            self.description.clone(),
            crate::json_schema_for::<ToolInput>(),
        )
    }
}

/// Arguments a completion model passes when it calls a tool.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct ToolInput {
    /// The query or expression to hand to the tool.
    pub input: String,
}

// ── Tool trait ─────────────────────────────────────────────────────

/// A named capability invoked with one input string.
///
/// # Example
///
/// ```ignore
/// struct Echo;
///
/// impl Tool for Echo {
///     fn descriptor(&self) -> ToolDescriptor {
///         ToolDescriptor::new("echo", "Echo the input", ToolCategory::Analysis)
///     }
///
///     fn invoke(&self, input: &str) -> ToolFuture<'_> {
///         let input = input.to_string();
///         Box::pin(async move { Ok(input) })
///     }
/// }
/// ```
pub trait Tool: Send + Sync {
    /// Metadata used for registration, selection, and fallback.
    fn descriptor(&self) -> ToolDescriptor;

    /// Run the tool. Uses a boxed future so the trait stays dyn-compatible.
    fn invoke(&self, input: &str) -> ToolFuture<'_>;

    /// The tool's name, taken from the descriptor.
    fn name(&self) -> String {
        self.descriptor().name
    }
}

// ── FnTool ─────────────────────────────────────────────────────────

/// Type-erased async handler for [`FnTool`].
type ErasedToolHandler =
    Box<dyn Fn(String) -> Pin<Box<dyn Future<Output = Result<String, String>> + Send>> + Send + Sync>;

/// A closure-backed tool.
///
/// Use for stateless tools and test doubles. Tools that hold clients or
/// configuration should implement [`Tool`] on a struct instead.
///
/// ```ignore
/// let upper = FnTool::new(
///     ToolDescriptor::new("upper", "Uppercase the input", ToolCategory::Analysis),
///     |input| async move { Ok(input.to_uppercase()) },
/// );
/// ```
pub struct FnTool {
    descriptor: ToolDescriptor,
    handler: ErasedToolHandler,
}

impl FnTool {
    pub fn new<F, Fut>(descriptor: ToolDescriptor, handler: F) -> Self
    where
        F: Fn(String) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<String, String>> + Send + 'static,
    {
        let erased = move |input: String| -> Pin<Box<dyn Future<Output = Result<String, String>> + Send>> {
            Box::pin(handler(input))
        };
        Self {
            descriptor,
            handler: Box::new(erased),
        }
    }
}

impl Tool for FnTool {
    fn descriptor(&self) -> ToolDescriptor {
        self.descriptor.clone()
    }

    fn invoke(&self, input: &str) -> ToolFuture<'_> {
        (self.handler)(input.to_string())
    }
}

impl fmt::Debug for FnTool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnTool")
            .field("name", &self.descriptor.name)
            .finish()
    }
}

// ── Helpers ────────────────────────────────────────────────────────

/// Log a tool call at INFO level with a truncated preview of the input.
pub fn log_tool_call(name: &str, input: &str) {
    let preview: String = input.chars().take(120).collect();
    info!(
        "[tool] {name}({preview}{})",
        if input.chars().count() > 120 { "..." } else { "" }
    );
    debug!("[tool] {name} full input ({} bytes)", input.len());
    trace!("[tool] {name} input: {input}");
}

/// Truncate a string to at most `max` bytes (on a char boundary), appending
/// a notice if trimmed.
pub fn truncate_result(s: String, max: usize) -> String {
    if s.len() <= max {
        return s;
    }
    let mut cut = max;
    while !s.is_char_boundary(cut) {
        cut -= 1;
    }
    let total = s.len();
    let mut out = s;
    out.truncate(cut);
    format!("{out}...\n[truncated: {total} bytes total]")
}

/// Default maximum tool output size before truncation.
pub const DEFAULT_MAX_RESULT_BYTES: usize = 30_000;

/// Parse raw JSON tool-call arguments into a typed struct.
///
/// The error string is fed back to the model so it can correct itself.
pub fn parse_tool_args<T: serde::de::DeserializeOwned>(arguments: &str) -> Result<T, String> {
    serde_json::from_str(arguments).map_err(|e| {
        format!(
            "Error: invalid tool arguments: {e}. \
             Please provide valid JSON matching the tool's parameter schema."
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn descriptor_builder_lowercases_keywords() {
        let d = ToolDescriptor::new("t", "test", ToolCategory::Search)
            .priority(3)
            .keywords(&["News", "web"])
            .fallbacks(&["encyclopedia"]);
        assert_eq!(d.priority, 3);
        assert!(d.keywords.contains("news"));
        assert!(d.keywords.contains("web"));
        assert_eq!(d.fallback_chain, vec!["encyclopedia"]);
    }

    #[test]
    fn descriptor_serializes_category_lowercase() {
        let d = ToolDescriptor::new("calc", "math", ToolCategory::Computation);
        let json = serde_json::to_value(&d).unwrap();
        assert_eq!(json["category"], "computation");
        assert_eq!(json["fallback_chain"], serde_json::json!([]));
    }

    #[test]
    fn tool_def_has_input_parameter() {
        let def = ToolDescriptor::new("web-search", "search", ToolCategory::Search).to_tool_def();
        assert_eq!(def.function.name, "web-search");
        let required = def.function.parameters["required"].as_array().unwrap();
        assert!(required.contains(&"input".into()));
    }

    #[tokio::test]
    async fn fn_tool_invokes_handler() {
        let tool = FnTool::new(
            ToolDescriptor::new("upper", "upper", ToolCategory::Analysis),
            |input| async move { Ok(input.to_uppercase()) },
        );
        assert_eq!(tool.name(), "upper");
        assert_eq!(tool.invoke("abc").await, Ok("ABC".to_string()));
    }

    #[tokio::test]
    async fn fn_tool_propagates_failure() {
        let tool = FnTool::new(
            ToolDescriptor::new("fail", "fail", ToolCategory::Analysis),
            |_| async { Err("boom".to_string()) },
        );
        assert_eq!(tool.invoke("x").await, Err("boom".to_string()));
    }

    #[test]
    fn parse_tool_input_args() {
        let args: ToolInput = parse_tool_args(r#"{"input":"rust 2024"}"#).unwrap();
        assert_eq!(args.input, "rust 2024");
        let err = parse_tool_args::<ToolInput>("{}").unwrap_err();
        assert!(err.starts_with("Error: invalid tool arguments"));
    }

    #[test]
    fn truncate_short_unchanged() {
        assert_eq!(truncate_result("hello".into(), 100), "hello");
    }

    #[test]
    fn truncate_respects_char_boundary() {
        let s = "é".repeat(10); // 2 bytes each
        let out = truncate_result(s, 5);
        assert!(out.starts_with("éé..."));
        assert!(out.contains("[truncated: 20 bytes total]"));
    }
}

//! Error taxonomy for tool execution and the content pipeline.
//!
//! Leaf collaborators (tool implementations, the completion client) report
//! failures as plain strings. The core wraps those strings into the typed
//! errors below at the point where it decides what to do with them:
//! [`ToolError::Invocation`] triggers the fallback chain,
//! [`ToolError::FallbacksExhausted`] is what the caller finally sees, and
//! [`PipelineError`] aborts a pipeline run.

use std::fmt;

use serde::Serialize;

/// Failure of a tool lookup or invocation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ToolError {
    /// The requested tool name is not registered.
    #[error("Tool {0} not found")]
    NotFound(String),

    /// The tool ran and failed. Carries the tool's own message.
    #[error("{message}")]
    Invocation { tool: String, message: String },

    /// The tool failed and every tool in its fallback chain (possibly
    /// none) failed too.
    ///
    /// Displays the primary tool's original message; the fallbacks' errors
    /// are only logged.
    #[error("{message}")]
    FallbacksExhausted {
        tool: String,
        message: String,
        attempted: Vec<String>,
    },
}

impl ToolError {
    /// Wrap a tool's failure message.
    pub fn invocation(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Invocation {
            tool: tool.into(),
            message: message.into(),
        }
    }
}

/// One of the three content pipeline stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PipelineStage {
    Research,
    Write,
    Review,
}

impl PipelineStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Research => "research",
            Self::Write => "write",
            Self::Review => "review",
        }
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A pipeline stage failed. Fatal for the request; there is no retry.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PipelineError {
    #[error("{stage} stage failed: {message}")]
    StageFailed {
        stage: PipelineStage,
        message: String,
    },
}

impl PipelineError {
    pub fn stage(&self) -> PipelineStage {
        match self {
            Self::StageFailed { stage, .. } => *stage,
        }
    }
}

/// Missing or malformed configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("environment variable {0} is not set")]
    MissingVar(&'static str),

    #[error("invalid value for {var}: {value:?}")]
    InvalidValue { var: &'static str, value: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exhausted_displays_original_message() {
        let err = ToolError::FallbacksExhausted {
            tool: "web-search".into(),
            message: "rate limited".into(),
            attempted: vec!["encyclopedia".into()],
        };
        assert_eq!(err.to_string(), "rate limited");
    }

    #[test]
    fn not_found_message_names_tool() {
        let err = ToolError::NotFound("nope".into());
        assert_eq!(err.to_string(), "Tool nope not found");
    }

    #[test]
    fn stage_failure_message() {
        let err = PipelineError::StageFailed {
            stage: PipelineStage::Write,
            message: "HTTP 500".into(),
        };
        assert_eq!(err.to_string(), "write stage failed: HTTP 500");
        assert_eq!(err.stage(), PipelineStage::Write);
    }
}

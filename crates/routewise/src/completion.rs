//! Completion model abstraction used by the content pipeline.
//!
//! [`CompletionModel`] is the seam between the pipeline and whatever produces
//! text. [`OpenRouterCompletion`] is the production implementation; tests
//! substitute scripted models.

use std::future::Future;
use std::pin::Pin;

use tracing::debug;

use crate::{ChatRequest, Message, OpenRouterClient, ToolCall, ToolDef};

/// Boxed future returned by [`CompletionModel`] methods.
pub type CompletionFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, String>> + Send + 'a>>;

/// One assistant turn: text, tool calls, or both.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelTurn {
    pub content: Option<String>,
    pub tool_calls: Vec<ToolCall>,
}

impl ModelTurn {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            tool_calls: Vec::new(),
        }
    }

    pub fn calls(tool_calls: Vec<ToolCall>) -> Self {
        Self {
            content: None,
            tool_calls,
        }
    }
}

/// Generates text from an ordered list of role-tagged messages.
pub trait CompletionModel: Send + Sync {
    /// Plain text completion.
    fn complete<'a>(&'a self, messages: &'a [Message]) -> CompletionFuture<'a, String>;

    /// Completion that may answer with tool calls.
    ///
    /// The default ignores `tools` and returns a text-only turn.
    fn complete_with_tools<'a>(
        &'a self,
        messages: &'a [Message],
        tools: &'a [ToolDef],
    ) -> CompletionFuture<'a, ModelTurn> {
        let _ = tools;
        Box::pin(async move { Ok(ModelTurn::text(self.complete(messages).await?)) })
    }
}

/// [`CompletionModel`] backed by the OpenRouter chat completions API.
#[derive(Debug)]
pub struct OpenRouterCompletion {
    client: OpenRouterClient,
    model: String,
    temperature: f32,
    max_tokens: u32,
}

impl OpenRouterCompletion {
    pub fn new(client: OpenRouterClient, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
            temperature: 0.7,
            max_tokens: 2048,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn request(&self, messages: &[Message], tools: Option<Vec<ToolDef>>) -> ChatRequest {
        ChatRequest {
            model: Some(self.model.clone()),
            messages: messages.to_vec(),
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            tools,
        }
    }
}

impl CompletionModel for OpenRouterCompletion {
    fn complete<'a>(&'a self, messages: &'a [Message]) -> CompletionFuture<'a, String> {
        Box::pin(async move {
            let completion = self.client.chat(&self.request(messages, None)).await?;
            completion
                .content
                .filter(|c| !c.trim().is_empty())
                .ok_or_else(|| "Empty LLM response".to_string())
        })
    }

    fn complete_with_tools<'a>(
        &'a self,
        messages: &'a [Message],
        tools: &'a [ToolDef],
    ) -> CompletionFuture<'a, ModelTurn> {
        Box::pin(async move {
            let offered = (!tools.is_empty()).then(|| tools.to_vec());
            let completion = self.client.chat(&self.request(messages, offered)).await?;
            debug!(
                "{} returned {} tool call(s)",
                self.model,
                completion.tool_calls.len()
            );
            Ok(ModelTurn {
                content: completion.content,
                tool_calls: completion.tool_calls,
            })
        })
    }
}

/// Stand-in when no completion backend is configured. Every call fails with
/// the stored reason.
#[derive(Debug, Clone)]
pub struct Unconfigured {
    reason: String,
}

impl Unconfigured {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl CompletionModel for Unconfigured {
    fn complete<'a>(&'a self, _messages: &'a [Message]) -> CompletionFuture<'a, String> {
        Box::pin(async move { Err(self.reason.clone()) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unconfigured_always_fails() {
        let model = Unconfigured::new("OPENROUTER_KEY is not set");
        assert_eq!(
            model.complete(&[Message::user("hi")]).await,
            Err("OPENROUTER_KEY is not set".to_string())
        );
    }

    struct Fixed(&'static str);

    impl CompletionModel for Fixed {
        fn complete<'a>(&'a self, _messages: &'a [Message]) -> CompletionFuture<'a, String> {
            Box::pin(async move { Ok(self.0.to_string()) })
        }
    }

    #[tokio::test]
    async fn default_tool_turn_is_text_only() {
        let turn = Fixed("hello")
            .complete_with_tools(&[Message::user("hi")], &[])
            .await
            .unwrap();
        assert_eq!(turn, ModelTurn::text("hello"));
    }

    #[test]
    fn request_omits_tools_when_none_offered() {
        let client = OpenRouterClient::new("test-key").unwrap();
        let model = OpenRouterCompletion::new(client, "m").with_temperature(0.2).with_max_tokens(64);
        let req = model.request(&[Message::system("s")], None);
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["model"], "m");
        assert_eq!(json["max_tokens"], 64);
        assert!(json.get("tools").is_none());
    }
}

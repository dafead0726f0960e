//! Router configuration with sensible defaults.
//!
//! [`RouterConfig`] collects everything needed to build a
//! [`ToolRouter`](crate::router::ToolRouter): completion model settings,
//! cache tuning, and API keys. Values come from [`Default`], the environment
//! ([`RouterConfig::from_env`]), and builder-style overrides, in that order.

use std::time::Duration;

use crate::DEFAULT_MODEL;
use crate::error::ConfigError;
use crate::pipeline::DEFAULT_RESEARCH_ITERATIONS;
use crate::progress::DEFAULT_BUFFER;
use crate::tools::DEFAULT_TTL;

pub const ENV_MODEL: &str = "ROUTEWISE_MODEL";
pub const ENV_CACHE_TTL_SECS: &str = "ROUTEWISE_CACHE_TTL_SECS";
pub const ENV_CACHE_CAPACITY: &str = "ROUTEWISE_CACHE_CAPACITY";
pub const ENV_OPENROUTER_KEY: &str = "OPENROUTER_KEY";
pub const ENV_BRAVE_SEARCH_KEY: &str = "BRAVE_SEARCH_KEY";

/// Configuration for a [`ToolRouter`](crate::router::ToolRouter).
#[derive(Clone)]
pub struct RouterConfig {
    /// Completion model identifier. Default: [`DEFAULT_MODEL`].
    pub model: String,
    /// Sampling temperature. Default: `0.7`.
    pub temperature: f32,
    /// Maximum tokens per completion. Default: `2048`.
    pub max_tokens: u32,
    /// Tool result TTL. Default: 5 minutes.
    pub cache_ttl: Duration,
    /// Cache entry bound. Default: unbounded.
    pub cache_capacity: Option<usize>,
    /// Model turns in the research fallback loop. Default: `2`.
    pub research_max_iterations: usize,
    /// Buffered progress events per session. Default: `64`.
    pub progress_buffer: usize,
    pub openrouter_key: Option<String>,
    pub brave_search_key: Option<String>,
}

// Keys stay out of logs.
impl std::fmt::Debug for RouterConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouterConfig")
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("cache_ttl", &self.cache_ttl)
            .field("cache_capacity", &self.cache_capacity)
            .field("research_max_iterations", &self.research_max_iterations)
            .field("progress_buffer", &self.progress_buffer)
            .field("openrouter_key", &self.openrouter_key.as_ref().map(|_| "<set>"))
            .field("brave_search_key", &self.brave_search_key.as_ref().map(|_| "<set>"))
            .finish()
    }
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            temperature: 0.7,
            max_tokens: 2048,
            cache_ttl: DEFAULT_TTL,
            cache_capacity: None,
            research_max_iterations: DEFAULT_RESEARCH_ITERATIONS,
            progress_buffer: DEFAULT_BUFFER,
            openrouter_key: None,
            brave_search_key: None,
        }
    }
}

impl RouterConfig {
    /// Defaults overridden by the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overridden by `lookup`. Blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let mut config = Self::default();

        if let Some(model) = get(ENV_MODEL) {
            config.model = model;
        }
        if let Some(raw) = get(ENV_CACHE_TTL_SECS) {
            let secs = raw.parse::<u64>().map_err(|_| ConfigError::InvalidValue {
                var: ENV_CACHE_TTL_SECS,
                value: raw.clone(),
            })?;
            config.cache_ttl = Duration::from_secs(secs);
        }
        if let Some(raw) = get(ENV_CACHE_CAPACITY) {
            let cap = raw
                .parse::<usize>()
                .ok()
                .filter(|&n| n > 0)
                .ok_or_else(|| ConfigError::InvalidValue {
                    var: ENV_CACHE_CAPACITY,
                    value: raw.clone(),
                })?;
            config.cache_capacity = Some(cap);
        }
        config.openrouter_key = get(ENV_OPENROUTER_KEY);
        config.brave_search_key = get(ENV_BRAVE_SEARCH_KEY);
        Ok(config)
    }

    /// The OpenRouter key, or [`ConfigError::MissingVar`].
    pub fn require_openrouter_key(&self) -> Result<&str, ConfigError> {
        self.openrouter_key
            .as_deref()
            .ok_or(ConfigError::MissingVar(ENV_OPENROUTER_KEY))
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    pub fn with_cache_capacity(mut self, capacity: Option<usize>) -> Self {
        self.cache_capacity = capacity;
        self
    }

    pub fn with_research_max_iterations(mut self, n: usize) -> Self {
        self.research_max_iterations = n;
        self
    }

    pub fn with_progress_buffer(mut self, events: usize) -> Self {
        self.progress_buffer = events;
        self
    }

    pub fn with_openrouter_key(mut self, key: impl Into<String>) -> Self {
        self.openrouter_key = Some(key.into());
        self
    }

    pub fn with_brave_search_key(mut self, key: impl Into<String>) -> Self {
        self.brave_search_key = Some(key.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults() {
        let config = RouterConfig::default();
        assert_eq!(config.model, DEFAULT_MODEL);
        assert_eq!(config.cache_ttl, Duration::from_secs(300));
        assert_eq!(config.cache_capacity, None);
        assert_eq!(config.research_max_iterations, 2);
        assert_eq!(config.progress_buffer, 64);
        assert!((config.temperature - 0.7).abs() < f32::EPSILON);
    }

    #[test]
    fn environment_overrides() {
        let config = RouterConfig::from_lookup(lookup(&[
            (ENV_MODEL, "anthropic/claude-sonnet-4"),
            (ENV_CACHE_TTL_SECS, "60"),
            (ENV_CACHE_CAPACITY, "500"),
            (ENV_OPENROUTER_KEY, "sk-test"),
            (ENV_BRAVE_SEARCH_KEY, "  "),
        ]))
        .unwrap();
        assert_eq!(config.model, "anthropic/claude-sonnet-4");
        assert_eq!(config.cache_ttl, Duration::from_secs(60));
        assert_eq!(config.cache_capacity, Some(500));
        assert_eq!(config.openrouter_key.as_deref(), Some("sk-test"));
        assert_eq!(config.brave_search_key, None);
    }

    #[test]
    fn invalid_numbers_are_rejected() {
        let err = RouterConfig::from_lookup(lookup(&[(ENV_CACHE_TTL_SECS, "five")])).unwrap_err();
        assert_eq!(
            err,
            ConfigError::InvalidValue {
                var: ENV_CACHE_TTL_SECS,
                value: "five".into()
            }
        );
        assert!(RouterConfig::from_lookup(lookup(&[(ENV_CACHE_CAPACITY, "0")])).is_err());
    }

    #[test]
    fn missing_openrouter_key() {
        assert_eq!(
            RouterConfig::default().require_openrouter_key(),
            Err(ConfigError::MissingVar(ENV_OPENROUTER_KEY))
        );
        let config = RouterConfig::default().with_openrouter_key("k");
        assert_eq!(config.require_openrouter_key(), Ok("k"));
    }

    #[test]
    fn debug_hides_keys() {
        let config = RouterConfig::default().with_openrouter_key("sk-secret");
        let shown = format!("{config:?}");
        assert!(!shown.contains("sk-secret"));
        assert!(shown.contains("<set>"));
    }
}

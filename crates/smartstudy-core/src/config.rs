// Assistant configuration
//
// AssistantConfig is an injected, read-only value. The binary builds it from
// the environment once at startup; tests build it directly.

use serde::{Deserialize, Serialize};

use crate::llm::LlmCallConfig;

pub const DEFAULT_MODEL: &str = "llama-3.3-70b-versatile";

/// Configuration for the assistant pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssistantConfig {
    /// Model identifier sent to the chat-completions backend
    pub model: String,

    /// Sampling temperature; intent extraction wants determinism
    #[serde(default)]
    pub temperature: f32,

    /// Maximum tokens to generate per response
    #[serde(default)]
    pub max_tokens: Option<u32>,

    /// Number of days ahead whose events are shown to the model
    #[serde(default = "default_context_days")]
    pub context_days: i64,

    /// Maximum number of open tasks shown to the model
    #[serde(default = "default_context_task_limit")]
    pub context_task_limit: usize,
}

fn default_context_days() -> i64 {
    14
}

fn default_context_task_limit() -> usize {
    6
}

impl AssistantConfig {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            ..Default::default()
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn with_context_days(mut self, days: i64) -> Self {
        self.context_days = days;
        self
    }

    pub fn with_context_task_limit(mut self, limit: usize) -> Self {
        self.context_task_limit = limit;
        self
    }

    /// Call settings for intent extraction: JSON-object output
    pub fn call_config(&self) -> LlmCallConfig {
        let config = LlmCallConfig::new(&self.model)
            .with_temperature(self.temperature)
            .json_object();
        match self.max_tokens {
            Some(max) => config.with_max_tokens(max),
            None => config,
        }
    }
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            temperature: 0.0,
            max_tokens: None,
            context_days: default_context_days(),
            context_task_limit: default_context_task_limit(),
        }
    }
}

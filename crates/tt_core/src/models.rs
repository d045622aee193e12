use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::Result;

/// One chat-completion call: a system prompt, a user prompt and sampling limits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionRequest {
    pub system: String,
    pub prompt: String,
    /// Overrides the model configured on the backend when set.
    pub model: Option<String>,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl CompletionRequest {
    pub fn new(system: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            prompt: prompt.into(),
            model: None,
            temperature: 0.7,
            max_tokens: 2000,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }
}

#[async_trait]
pub trait InferenceModel: Send + Sync + std::fmt::Debug {
    /// Backend name, used in logs
    fn name(&self) -> &str;

    /// Run a single completion and return the assistant text
    async fn complete(&self, request: &CompletionRequest) -> Result<String>;
}

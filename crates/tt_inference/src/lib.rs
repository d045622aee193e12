use tt_core::config::DEFAULT_OPENAI_BASE_URL;

pub mod models;
pub mod reviews;
pub mod tierlist;

/// Settings for a chat-completion backend.
#[derive(Clone, Default)]
pub struct Config {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub model_name: Option<String>,
}

impl Config {
    pub fn from_core(config: &tt_core::Config) -> Self {
        Self {
            api_key: config.openai_api_key.clone(),
            base_url: Some(config.openai_base_url.clone()),
            model_name: Some(config.article_model.clone()),
        }
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_deref().unwrap_or(DEFAULT_OPENAI_BASE_URL)
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("api_key", &self.api_key.as_deref().map(|_| "<redacted>"))
            .field("base_url", &self.base_url)
            .field("model_name", &self.model_name)
            .finish()
    }
}

pub mod prelude {
    pub use super::models::create_model;
    pub use super::Config;
    pub use tt_core::{CompletionRequest, Error, InferenceModel, Result};
}

pub use models::create_model;

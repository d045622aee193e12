use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;
use tt_core::{CompletionRequest, Error, InferenceModel, Result};

use crate::Config;

pub const DEFAULT_MODEL: &str = "gpt-4";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: Message,
}

#[derive(Deserialize)]
struct Message {
    #[serde(default)]
    content: Option<String>,
}

/// Chat completions against an OpenAI-compatible endpoint.
pub struct OpenAiModel {
    client: Arc<Client>,
    api_key: String,
    base_url: String,
    model: String,
}

impl OpenAiModel {
    pub fn new(config: &Config) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| Error::Config("OPENAI_API_KEY is required".to_string()))?;
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            client: Arc::new(client),
            api_key,
            base_url: config.base_url().trim_end_matches('/').to_string(),
            model: config.model_name.clone().unwrap_or_else(|| DEFAULT_MODEL.to_string()),
        })
    }

    fn chat_request<'a>(&'a self, request: &'a CompletionRequest) -> ChatRequest<'a> {
        ChatRequest {
            model: request.model.as_deref().unwrap_or(&self.model),
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: &request.system,
                },
                ChatMessage {
                    role: "user",
                    content: &request.prompt,
                },
            ],
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        }
    }
}

impl fmt::Debug for OpenAiModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenAiModel")
            .field("client", &"<reqwest::Client>")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .finish()
    }
}

#[async_trait]
impl InferenceModel for OpenAiModel {
    fn name(&self) -> &str {
        "OpenAI"
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<String> {
        let body = self.chat_request(request);
        debug!("Sending completion request to {} with model {}", self.base_url, body.model);

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(Error::Inference(format!(
                "Completion request failed with HTTP {}: {}",
                status,
                detail.chars().take(200).collect::<String>()
            )));
        }

        let response = response.json::<ChatResponse>().await?;
        response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|content| content.trim().to_string())
            .ok_or_else(|| Error::Inference("Completion response had no content".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> Config {
        Config {
            api_key: Some("sk-secret".to_string()),
            base_url: Some("https://llm.example.com/v1/".to_string()),
            model_name: None,
        }
    }

    #[test]
    fn test_model_requires_api_key() {
        let result = OpenAiModel::new(&Config::default());
        assert_eq!(result.unwrap_err().to_string(), "Configuration error: OPENAI_API_KEY is required");

        let blank = Config {
            api_key: Some("  ".to_string()),
            ..Default::default()
        };
        assert!(OpenAiModel::new(&blank).is_err());
        assert!(OpenAiModel::new(&config()).is_ok());
    }

    #[test]
    fn test_chat_request_body() {
        let model = OpenAiModel::new(&config()).unwrap();
        assert_eq!(model.base_url, "https://llm.example.com/v1");

        let request = CompletionRequest::new("be brief", "review this").with_max_tokens(100);
        let body = serde_json::to_value(model.chat_request(&request)).unwrap();
        assert_eq!(body["model"], "gpt-4");
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"], "review this");
        assert_eq!(body["max_tokens"], 100);

        let request = request.with_model("gpt-4o-mini");
        let body = serde_json::to_value(model.chat_request(&request)).unwrap();
        assert_eq!(body["model"], "gpt-4o-mini");
    }

    #[test]
    fn test_debug_redacts_key() {
        let model = OpenAiModel::new(&config()).unwrap();
        let debug = format!("{:?}", model);
        assert!(!debug.contains("sk-secret"));
        assert!(debug.contains("<redacted>"));
    }

    #[test]
    fn test_response_parsing() {
        let response: ChatResponse =
            serde_json::from_str(r#"{"choices":[{"message":{"role":"assistant","content":"  Hi  "}}]}"#).unwrap();
        assert_eq!(response.choices[0].message.content.as_deref(), Some("  Hi  "));

        let empty: ChatResponse = serde_json::from_str(r#"{"choices":[{"message":{"role":"assistant"}}]}"#).unwrap();
        assert!(empty.choices[0].message.content.is_none());
    }
}

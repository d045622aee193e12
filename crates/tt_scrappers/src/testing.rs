//! In-memory stand-ins for the network used across this crate's tests.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use tt_core::{CompletionRequest, Error, HttpClient, HttpResponse, InferenceModel, Result};

/// Canned responses keyed by URL. Unknown pages answer 404.
#[derive(Debug, Default)]
pub struct FakeHttp {
    heads: HashMap<String, HttpResponse>,
    pages: HashMap<String, HttpResponse>,
    /// (substring of the URL, body)
    json: Vec<(String, serde_json::Value)>,
    fail_all: bool,
    calls: Mutex<Vec<String>>,
}

impl FakeHttp {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every request fails as if the network were down.
    pub fn failing() -> Self {
        Self {
            fail_all: true,
            ..Self::default()
        }
    }

    pub fn with_image(mut self, url: &str) -> Self {
        self.heads.insert(
            url.to_string(),
            HttpResponse {
                status: 200,
                content_type: Some("image/jpeg".to_string()),
                body: String::new(),
            },
        );
        self
    }

    pub fn with_head(mut self, url: &str, status: u16, content_type: &str) -> Self {
        self.heads.insert(
            url.to_string(),
            HttpResponse {
                status,
                content_type: Some(content_type.to_string()),
                body: String::new(),
            },
        );
        self
    }

    pub fn with_page(mut self, url: &str, status: u16, body: &str) -> Self {
        self.pages.insert(
            url.to_string(),
            HttpResponse {
                status,
                content_type: Some("text/html; charset=utf-8".to_string()),
                body: body.to_string(),
            },
        );
        self
    }

    pub fn with_json(mut self, url_part: &str, body: serde_json::Value) -> Self {
        self.json.push((url_part.to_string(), body));
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, url: &str) -> Result<()> {
        self.calls.lock().unwrap().push(url.to_string());
        if self.fail_all {
            return Err(Error::Scraping(format!("connection refused: {}", url)));
        }
        Ok(())
    }

    fn not_found() -> HttpResponse {
        HttpResponse {
            status: 404,
            content_type: Some("text/html".to_string()),
            body: String::new(),
        }
    }
}

#[async_trait]
impl HttpClient for FakeHttp {
    async fn head(&self, url: &str) -> Result<HttpResponse> {
        self.record(url)?;
        Ok(self.heads.get(url).cloned().unwrap_or_else(Self::not_found))
    }

    async fn get_page(&self, url: &str) -> Result<HttpResponse> {
        self.record(url)?;
        Ok(self.pages.get(url).cloned().unwrap_or_else(Self::not_found))
    }

    async fn get_json(&self, url: &str) -> Result<serde_json::Value> {
        self.record(url)?;
        self.json
            .iter()
            .find(|(part, _)| url.contains(part.as_str()))
            .map(|(_, body)| body.clone())
            .ok_or_else(|| Error::Scraping(format!("no canned JSON for {}", url)))
    }
}

/// Returns the scripted replies in order, then repeats the last one.
#[derive(Debug, Default)]
pub struct ScriptedModel {
    replies: Vec<String>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedModel {
    pub fn new(replies: &[&str]) -> Self {
        Self {
            replies: replies.iter().map(|r| r.to_string()).collect(),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl InferenceModel for ScriptedModel {
    fn name(&self) -> &str {
        "Scripted"
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<String> {
        let mut requests = self.requests.lock().unwrap();
        let index = requests.len().min(self.replies.len().saturating_sub(1));
        requests.push(request.clone());
        self.replies
            .get(index)
            .cloned()
            .ok_or_else(|| Error::Inference("no scripted reply".to_string()))
    }
}

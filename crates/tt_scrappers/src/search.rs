use std::sync::Arc;

use serde_json::Value;
use tracing::debug;
use tt_core::http::redact_query;
use tt_core::{Error, HttpClient, Result};
use url::Url;

pub const SERPAPI_ENDPOINT: &str = "https://serpapi.com/search.json";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrganicResult {
    pub title: String,
    pub snippet: String,
    pub link: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShoppingResult {
    pub title: String,
    pub link: Option<String>,
    pub thumbnail: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WebResults {
    pub organic: Vec<OrganicResult>,
    pub shopping: Vec<ShoppingResult>,
}

/// One entry of an image search.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImageHit {
    /// Full-size image URL.
    pub original: Option<String>,
    /// Page the image was found on.
    pub link: Option<String>,
    /// Site name or URL of the hosting page.
    pub source: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

fn string_field(value: &Value, key: &str) -> Option<String> {
    value
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Dimensions arrive as numbers or numeric strings.
fn dimension(value: &Value, key: &str) -> Option<u32> {
    match value.get(key)? {
        Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn array<'a>(data: &'a Value, key: &str) -> impl Iterator<Item = &'a Value> {
    data.get(key).and_then(Value::as_array).into_iter().flatten()
}

/// Client for the SerpAPI search endpoints.
#[derive(Debug, Clone)]
pub struct SerpApiClient {
    http: Arc<dyn HttpClient>,
    api_key: String,
    endpoint: String,
}

impl SerpApiClient {
    pub fn new(http: Arc<dyn HttpClient>, api_key: impl Into<String>) -> Self {
        Self {
            http,
            api_key: api_key.into(),
            endpoint: SERPAPI_ENDPOINT.to_string(),
        }
    }

    fn url(&self, params: &[(&str, &str)]) -> Result<String> {
        let mut all: Vec<(&str, &str)> = params.to_vec();
        all.push(("api_key", &self.api_key));
        Url::parse_with_params(&self.endpoint, &all)
            .map(String::from)
            .map_err(|e| Error::InvalidUrl(e.to_string()))
    }

    async fn fetch(&self, params: &[(&str, &str)]) -> Result<Value> {
        let url = self.url(params)?;
        debug!("🔎 Querying {}", redact_query(&url));
        let data = self.http.get_json(&url).await?;
        if let Some(message) = data.get("error").and_then(Value::as_str) {
            return Err(Error::Scraping(format!("Search API error: {}", message)));
        }
        Ok(data)
    }

    /// Web search: organic results plus any shopping results.
    pub async fn web(&self, query: &str) -> Result<WebResults> {
        let data = self.fetch(&[("engine", "google"), ("q", query)]).await?;
        let organic = array(&data, "organic_results")
            .map(|r| OrganicResult {
                title: string_field(r, "title").unwrap_or_default(),
                snippet: string_field(r, "snippet").unwrap_or_default(),
                link: string_field(r, "link").unwrap_or_default(),
            })
            .collect();
        let shopping = array(&data, "shopping_results")
            .map(|r| ShoppingResult {
                title: string_field(r, "title").unwrap_or_default(),
                link: string_field(r, "link"),
                thumbnail: string_field(r, "thumbnail"),
            })
            .collect();
        Ok(WebResults { organic, shopping })
    }

    /// Image search. An absent result list is an empty result, not an error.
    pub async fn images(&self, query: &str) -> Result<Vec<ImageHit>> {
        let data = self
            .fetch(&[
                ("engine", "google_images"),
                ("q", query),
                ("safe", "active"),
                ("num", "20"),
                ("ijn", "0"),
            ])
            .await?;
        Ok(array(&data, "images_results")
            .map(|r| ImageHit {
                original: string_field(r, "original"),
                link: string_field(r, "link"),
                source: string_field(r, "source"),
                width: dimension(r, "original_width"),
                height: dimension(r, "original_height"),
            })
            .collect())
    }
}

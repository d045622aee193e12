use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, CONTENT_TYPE, USER_AGENT};
use reqwest::Client;

use crate::{Error, Result};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

/// User agent sent to API endpoints.
pub const API_USER_AGENT: &str = "TrendTiers Content Pipeline 1.0";

/// Desktop browser user agent for retailer product pages.
pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn is_image(&self) -> bool {
        self.content_type
            .as_deref()
            .map(|ct| ct.trim().to_ascii_lowercase().starts_with("image/"))
            .unwrap_or(false)
    }
}

/// Outbound HTTP used by the scrapers and the search client.
///
/// Kept behind a trait so the resolution chain can run against canned responses.
#[async_trait]
pub trait HttpClient: Send + Sync + fmt::Debug {
    /// Header-only existence probe. The returned body is always empty.
    async fn head(&self, url: &str) -> Result<HttpResponse>;

    /// Fetches an HTML page the way a desktop browser would.
    async fn get_page(&self, url: &str) -> Result<HttpResponse>;

    /// Fetches a JSON API endpoint.
    async fn get_json(&self, url: &str) -> Result<serde_json::Value>;
}

pub struct ReqwestClient {
    client: Client,
}

impl ReqwestClient {
    pub fn new() -> Result<Self> {
        Self::with_timeout(DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }

    fn browser_headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(BROWSER_USER_AGENT));
        headers.insert(
            ACCEPT,
            HeaderValue::from_static(
                "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,image/apng,*/*;q=0.8",
            ),
        );
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));
        headers.insert(HeaderName::from_static("upgrade-insecure-requests"), HeaderValue::from_static("1"));
        headers
    }

    fn content_type(headers: &HeaderMap) -> Option<String> {
        headers
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string())
    }
}

impl fmt::Debug for ReqwestClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReqwestClient")
            .field("client", &"<reqwest::Client>")
            .finish()
    }
}

#[async_trait]
impl HttpClient for ReqwestClient {
    async fn head(&self, url: &str) -> Result<HttpResponse> {
        let response = self
            .client
            .head(url)
            .header(USER_AGENT, BROWSER_USER_AGENT)
            .send()
            .await?;
        Ok(HttpResponse {
            status: response.status().as_u16(),
            content_type: Self::content_type(response.headers()),
            body: String::new(),
        })
    }

    async fn get_page(&self, url: &str) -> Result<HttpResponse> {
        let response = self
            .client
            .get(url)
            .headers(Self::browser_headers())
            .send()
            .await?;
        let status = response.status().as_u16();
        let content_type = Self::content_type(response.headers());
        let body = response.text().await?;
        Ok(HttpResponse {
            status,
            content_type,
            body,
        })
    }

    async fn get_json(&self, url: &str) -> Result<serde_json::Value> {
        let response = self
            .client
            .get(url)
            .header(USER_AGENT, API_USER_AGENT)
            .send()
            .await
            .map_err(|e| Error::Http(e.without_url()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::Scraping(format!("{} returned HTTP {}", redact_query(url), status)));
        }
        response
            .json::<serde_json::Value>()
            .await
            .map_err(|e| Error::Http(e.without_url()))
    }
}

/// Drops the query string so API keys never reach the logs.
pub fn redact_query(url: &str) -> &str {
    url.split('?').next().unwrap_or(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_helpers() {
        let response = HttpResponse {
            status: 200,
            content_type: Some("Image/JPEG".to_string()),
            body: String::new(),
        };
        assert!(response.is_success());
        assert!(response.is_image());

        let page = HttpResponse {
            status: 404,
            content_type: Some("text/html; charset=utf-8".to_string()),
            body: String::new(),
        };
        assert!(!page.is_success());
        assert!(!page.is_image());
    }

    #[test]
    fn test_redact_query() {
        assert_eq!(
            redact_query("https://serpapi.com/search.json?api_key=secret&q=x"),
            "https://serpapi.com/search.json"
        );
        assert_eq!(redact_query("https://example.com"), "https://example.com");
    }

    #[test]
    fn test_client_builds() {
        assert!(ReqwestClient::new().is_ok());
    }
}

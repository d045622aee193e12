//! Product image resolution.
//!
//! A lookup walks three steps and stops at the first hit:
//! the catalog CDN, the catalog product page, then an image search ranked by [`ranking::pick_best`].
//! Every outcome is an [`ImageResult`]; network trouble is folded into the `error` source.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, info, warn};
use tt_core::affiliate::is_catalog_id;
use tt_core::{HttpClient, ImageResult, ImageSource, Result};

use crate::search::SerpApiClient;

pub mod catalog;
pub mod ranking;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageQuery {
    Catalog { id: String, name: Option<String> },
    Name(String),
}

impl ImageQuery {
    /// Treats catalog-shaped input (ten letters or digits, at least one digit) as an ID.
    pub fn parse(input: &str) -> Self {
        let input = input.trim();
        if is_catalog_id(input) && input.chars().any(|c| c.is_ascii_digit()) {
            ImageQuery::Catalog {
                id: input.to_ascii_uppercase(),
                name: None,
            }
        } else {
            ImageQuery::Name(input.to_string())
        }
    }
}

impl fmt::Display for ImageQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImageQuery::Catalog { id, name: Some(name) } => write!(f, "{} ({})", name, id),
            ImageQuery::Catalog { id, name: None } => write!(f, "{}", id),
            ImageQuery::Name(name) => write!(f, "{}", name),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ImageResolver {
    http: Arc<dyn HttpClient>,
    /// Image search is skipped without an API key.
    search: Option<SerpApiClient>,
}

impl ImageResolver {
    pub fn new(http: Arc<dyn HttpClient>, search: Option<SerpApiClient>) -> Self {
        if search.is_none() {
            debug!("Image search disabled: no search API key");
        }
        Self { http, search }
    }

    pub async fn resolve(&self, query: &ImageQuery) -> ImageResult {
        let mut failed = false;

        let name = match query {
            ImageQuery::Catalog { id, name } => {
                if !is_catalog_id(id) {
                    debug!("Skipping malformed catalog ID {:?}", id);
                    return ImageResult::none();
                }

                match catalog::probe_cdn(self.http.as_ref(), id).await {
                    Ok(Some(url)) => return ImageResult::found(url, ImageSource::CatalogCdn),
                    Ok(None) => {}
                    Err(e) => {
                        warn!("⚠️ CDN probe failed for {}: {}", id, e);
                        failed = true;
                    }
                }

                let mut recovered = None;
                match catalog::scrape_product_page(self.http.as_ref(), id).await {
                    Ok(page) => {
                        if let Some(url) = page.image {
                            return ImageResult::found(url, ImageSource::CatalogScrape);
                        }
                        recovered = page.title;
                    }
                    Err(e) => {
                        warn!("⚠️ Product page scrape failed for {}: {}", id, e);
                        failed = true;
                    }
                }

                name.as_deref()
                    .map(str::trim)
                    .filter(|n| !n.is_empty())
                    .map(str::to_string)
                    .or(recovered)
                    .unwrap_or_else(|| catalog::guess_category(id).to_string())
            }
            ImageQuery::Name(name) => {
                let name = name.trim();
                if name.is_empty() {
                    return ImageResult::none();
                }
                name.to_string()
            }
        };

        if let Some(search) = &self.search {
            match search_image(search, &name).await {
                Ok(Some((url, source))) => return ImageResult::found(url, source),
                Ok(None) => {}
                Err(e) => {
                    warn!("⚠️ Image search failed for {}: {}", name, e);
                    failed = true;
                }
            }
        }

        if failed {
            ImageResult::error()
        } else {
            ImageResult::none()
        }
    }
}

async fn search_image(search: &SerpApiClient, name: &str) -> Result<Option<(String, ImageSource)>> {
    let query = ranking::clean_query(name);
    info!("🔍 Searching images for: \"{}\"", query);
    let hits = search.images(&query).await?;
    Ok(ranking::pick_best(&hits))
}

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Which resolution step produced a product image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageSource {
    CatalogCdn,
    CatalogScrape,
    SearchRetail,
    SearchQuality,
    SearchFallback,
    None,
    Error,
}

impl ImageSource {
    pub const ALL: [ImageSource; 7] = [
        ImageSource::CatalogCdn,
        ImageSource::CatalogScrape,
        ImageSource::SearchRetail,
        ImageSource::SearchQuality,
        ImageSource::SearchFallback,
        ImageSource::None,
        ImageSource::Error,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ImageSource::CatalogCdn => "catalog_cdn",
            ImageSource::CatalogScrape => "catalog_scrape",
            ImageSource::SearchRetail => "search_retail",
            ImageSource::SearchQuality => "search_quality",
            ImageSource::SearchFallback => "search_fallback",
            ImageSource::None => "none",
            ImageSource::Error => "error",
        }
    }

    /// Human readable label used by the coverage reports.
    pub fn display_name(&self) -> &'static str {
        match self {
            ImageSource::CatalogCdn => "Catalog CDN",
            ImageSource::CatalogScrape => "Catalog page scrape",
            ImageSource::SearchRetail => "Search engine (retail)",
            ImageSource::SearchQuality => "Search engine (high quality)",
            ImageSource::SearchFallback => "Search engine (fallback)",
            ImageSource::None => "No image found",
            ImageSource::Error => "Processing error",
        }
    }

    /// True for tags that carry an actual image.
    pub fn is_hit(&self) -> bool {
        !matches!(self, ImageSource::None | ImageSource::Error)
    }
}

impl fmt::Display for ImageSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ImageSource {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        // Older articles were written with provider-specific tags.
        match s.trim() {
            "catalog_cdn" | "amazon_cdn" => Ok(ImageSource::CatalogCdn),
            "catalog_scrape" | "amazon_scraping" => Ok(ImageSource::CatalogScrape),
            "search_retail" | "serpapi_retail" | "search_engine_retail" => Ok(ImageSource::SearchRetail),
            "search_quality" | "serpapi_quality" | "search_engine" => Ok(ImageSource::SearchQuality),
            "search_fallback" | "serpapi_fallback" => Ok(ImageSource::SearchFallback),
            "none" => Ok(ImageSource::None),
            "error" | "serpapi_error" => Ok(ImageSource::Error),
            other => Err(format!("Unknown image source tag: {}", other)),
        }
    }
}

/// Outcome of an image lookup. `url` is only set for hit sources.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageResult {
    pub url: Option<String>,
    pub source: ImageSource,
}

impl ImageResult {
    pub fn found(url: impl Into<String>, source: ImageSource) -> Self {
        Self {
            url: Some(url.into()),
            source,
        }
    }

    pub fn none() -> Self {
        Self {
            url: None,
            source: ImageSource::None,
        }
    }

    pub fn error() -> Self {
        Self {
            url: None,
            source: ImageSource::Error,
        }
    }

    pub fn is_found(&self) -> bool {
        self.url.is_some()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub name: String,
    #[serde(default)]
    pub review: String,
    #[serde(default)]
    pub link: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(rename = "imageSource", default, skip_serializing_if = "Option::is_none")]
    pub image_source: Option<ImageSource>,
    /// Props this pipeline does not know about, kept so a rewrite does not drop them.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Product {
    pub fn new(name: impl Into<String>, review: impl Into<String>, link: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            review: review.into(),
            link: link.into(),
            ..Default::default()
        }
    }

    /// A usable image: present, non-blank and not a placeholder service URL.
    pub fn has_image(&self) -> bool {
        self.image
            .as_deref()
            .map(|url| !url.trim().is_empty() && !url.contains("placeholder"))
            .unwrap_or(false)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tier {
    /// Key used in the component markup, e.g. "S".
    pub key: String,
    /// Optional display label; tiers written with a label use the `{ label, products }` shape.
    pub label: Option<String>,
    pub products: Vec<Product>,
}

impl Tier {
    pub fn new(key: impl Into<String>, products: Vec<Product>) -> Self {
        Self {
            key: key.into(),
            label: None,
            products,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}

/// Ordered tier mapping. Tier order is the order of appearance.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TierList {
    pub tiers: Vec<Tier>,
}

impl TierList {
    pub fn new(tiers: Vec<Tier>) -> Self {
        Self { tiers }
    }

    pub fn is_empty(&self) -> bool {
        self.tiers.iter().all(|t| t.products.is_empty())
    }

    pub fn product_count(&self) -> usize {
        self.tiers.iter().map(|t| t.products.len()).sum()
    }

    pub fn get(&self, key: &str) -> Option<&Tier> {
        self.tiers.iter().find(|t| t.key == key)
    }

    pub fn products(&self) -> impl Iterator<Item = (&Tier, &Product)> {
        self.tiers
            .iter()
            .flat_map(|tier| tier.products.iter().map(move |p| (tier, p)))
    }

    pub fn products_mut(&mut self) -> impl Iterator<Item = &mut Product> {
        self.tiers.iter_mut().flat_map(|tier| tier.products.iter_mut())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Frontmatter {
    pub title: String,
    pub description: String,
    pub pub_date: Option<NaiveDate>,
    pub slug: Option<String>,
    pub tags: Vec<String>,
    pub image: Option<String>,
}

impl Frontmatter {
    /// Adds a tag unless it is already present.
    pub fn add_tag(&mut self, tag: impl Into<String>) {
        let tag = tag.into();
        if !tag.trim().is_empty() && !self.tags.contains(&tag) {
            self.tags.push(tag);
        }
    }
}

/// Search-derived notes about one product, fed to article generation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResearchedProduct {
    pub name: String,
    pub specs: String,
    pub reviews: String,
    pub image: Option<String>,
    pub link: Option<String>,
}

/// A freshly generated article, before it is rendered to a content file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    pub frontmatter: Frontmatter,
    pub introduction: String,
    pub category: Option<String>,
    pub tiers: TierList,
    pub summary: String,
}

impl Article {
    pub fn slug(&self) -> &str {
        self.frontmatter.slug.as_deref().unwrap_or_default()
    }
}

/// Turns a title into a URL slug: lowercase ascii, dashes, at most 50 chars.
pub fn slugify(title: &str) -> String {
    let cleaned: String = title
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c.is_whitespace() || *c == '-')
        .collect();
    let dashed = cleaned.split_whitespace().collect::<Vec<_>>().join("-");
    dashed.chars().take(50).collect::<String>().trim_end_matches('-').to_string()
}

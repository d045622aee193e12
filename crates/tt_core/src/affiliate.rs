//! Marketplace affiliate links.
//!
//! Every product link written by the pipeline should point at the marketplace
//! and carry the site's tracking tag. [`normalize_link`] is a pure string
//! transformation: it never touches the network.

use lazy_static::lazy_static;
use regex::Regex;
use url::{form_urlencoded, Url};

lazy_static! {
    static ref CATALOG_ID_IN_PATH: Regex = Regex::new(r"/([A-Z0-9]{10})(?:[/?#]|$)").unwrap();
    static ref NAME_NOISE: Regex = Regex::new(r"[^\w\s-]").unwrap();
}

const TAG_PARAM: &str = "tag";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AffiliateConfig {
    /// Tracking tag appended as `tag=<value>`.
    pub tag: String,
    /// Hosts (and their subdomains) treated as the marketplace.
    pub domains: Vec<String>,
    /// Base URL of the marketplace search page used for fallback links.
    pub search_url: String,
    /// Base URL of a product page, the catalog ID is appended to it.
    pub product_url: String,
}

impl AffiliateConfig {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            domains: vec!["amazon.com".to_string(), "amzn.to".to_string(), "a.co".to_string()],
            search_url: "https://www.amazon.com/s".to_string(),
            product_url: "https://www.amazon.com/dp/".to_string(),
        }
    }

    /// Points the normalizer at a different marketplace host.
    pub fn with_marketplace(mut self, host: &str) -> Self {
        let bare = host.trim_start_matches("www.");
        self.domains = vec![bare.to_string()];
        self.search_url = format!("https://{}/s", host);
        self.product_url = format!("https://{}/dp/", host);
        self
    }

    pub fn is_marketplace_host(&self, host: &str) -> bool {
        let host = host.to_ascii_lowercase();
        self.domains
            .iter()
            .any(|d| host == *d || host.ends_with(&format!(".{}", d)))
    }
}

/// Parses `link` and returns it when its host is a marketplace host.
fn marketplace_url(link: &str, config: &AffiliateConfig) -> Option<Url> {
    let url = Url::parse(link.trim()).ok()?;
    if !matches!(url.scheme(), "http" | "https") {
        return None;
    }
    let host = url.host_str()?;
    config.is_marketplace_host(host).then_some(url)
}

/// At least one `tag` pair, and every `tag` pair carries `tag`.
fn has_tag(url: &Url, tag: &str) -> bool {
    let mut tags = url.query_pairs().filter(|(k, _)| k == TAG_PARAM).peekable();
    tags.peek().is_some() && tags.all(|(_, v)| v == tag)
}

/// Strips every `tag` query pair from `link` and appends the configured one.
///
/// Other query pairs are kept byte for byte, the fragment stays at the end.
fn retag(link: &str, tag: &str) -> String {
    let link = link.trim();
    let (without_fragment, fragment) = match link.split_once('#') {
        Some((head, frag)) => (head, Some(frag)),
        None => (link, None),
    };
    let (base, query) = match without_fragment.split_once('?') {
        Some((base, query)) => (base, query),
        None => (without_fragment, ""),
    };

    let mut pairs: Vec<&str> = query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .filter(|pair| pair.split('=').next() != Some(TAG_PARAM))
        .collect();
    let tag_pair = format!("{}={}", TAG_PARAM, encode(tag));
    pairs.push(&tag_pair);

    let mut out = format!("{}?{}", base, pairs.join("&"));
    if let Some(frag) = fragment {
        out.push('#');
        out.push_str(frag);
    }
    out
}

fn encode(value: &str) -> String {
    form_urlencoded::byte_serialize(value.as_bytes()).collect()
}

/// Marketplace search URL for `name`, tagged.
pub fn search_link(name: &str, config: &AffiliateConfig) -> String {
    let cleaned = NAME_NOISE.replace_all(name, "");
    let words = cleaned.split_whitespace().collect::<Vec<_>>().join(" ");
    format!(
        "{}?k={}&{}={}",
        config.search_url,
        encode(&words),
        TAG_PARAM,
        encode(&config.tag)
    )
}

/// Canonical tagged product page link for a catalog ID.
pub fn catalog_link(catalog_id: &str, config: &AffiliateConfig) -> String {
    format!(
        "{}{}/?{}={}",
        config.product_url,
        catalog_id,
        TAG_PARAM,
        encode(&config.tag)
    )
}

/// Returns a marketplace link carrying the configured tracking tag.
///
/// 1. marketplace link with the right tag: unchanged;
/// 2. marketplace link with a missing, wrong or conflicting tag: retagged;
/// 3. anything else: a marketplace search URL built from `name`.
pub fn normalize_link(name: &str, link: &str, config: &AffiliateConfig) -> String {
    match marketplace_url(link, config) {
        Some(url) if has_tag(&url, &config.tag) => link.to_string(),
        Some(_) => retag(link, &config.tag),
        None => search_link(name, config),
    }
}

/// True when `link` is a marketplace link already carrying the configured tag.
pub fn is_tracked(link: &str, config: &AffiliateConfig) -> bool {
    marketplace_url(link, config)
        .map(|url| has_tag(&url, &config.tag))
        .unwrap_or(false)
}

/// Extracts a 10-character catalog ID from a marketplace product link.
pub fn extract_catalog_id(link: &str, config: &AffiliateConfig) -> Option<String> {
    let url = marketplace_url(link, config)?;
    CATALOG_ID_IN_PATH
        .captures(url.path())
        .map(|caps| caps[1].to_string())
}

/// A catalog ID is exactly ten ASCII letters or digits.
pub fn is_catalog_id(candidate: &str) -> bool {
    candidate.len() == 10 && candidate.chars().all(|c| c.is_ascii_alphanumeric())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> AffiliateConfig {
        AffiliateConfig::new("tag123")
    }

    #[test]
    fn test_appends_missing_tag() {
        let config = AffiliateConfig::new("tag123").with_marketplace("www.marketplace.com");
        let link = "https://www.marketplace.com/dp/AAAAAAAAAA";
        assert_eq!(
            normalize_link("Anything", link, &config),
            "https://www.marketplace.com/dp/AAAAAAAAAA?tag=tag123"
        );
    }

    #[test]
    fn test_correct_tag_is_unchanged() {
        let link = "https://www.amazon.com/dp/B08N5WRWNW/?th=1&tag=tag123";
        assert_eq!(normalize_link("Sony", link, &config()), link);
    }

    #[test]
    fn test_wrong_tag_is_replaced() {
        let link = "https://www.amazon.com/dp/B08N5WRWNW?tag=someone-20&th=1#reviews";
        assert_eq!(
            normalize_link("Sony", link, &config()),
            "https://www.amazon.com/dp/B08N5WRWNW?th=1&tag=tag123#reviews"
        );
    }

    #[test]
    fn test_conflicting_second_tag_is_dropped() {
        let link = "https://www.amazon.com/dp/B08N5WRWNW?tag=tag123&tag=other-20";
        let fixed = normalize_link("Sony", link, &config());
        assert_eq!(fixed, "https://www.amazon.com/dp/B08N5WRWNW?tag=tag123");
        assert!(!is_tracked(link, &config()));
        assert_eq!(normalize_link("Sony", &fixed, &config()), fixed);
    }

    #[test]
    fn test_non_marketplace_becomes_search() {
        let link = "https://www.bestbuy.com/site/widget/123.p";
        assert_eq!(
            normalize_link("Example Widget (2nd Gen)", link, &config()),
            "https://www.amazon.com/s?k=Example+Widget+2nd+Gen&tag=tag123"
        );
        assert_eq!(
            normalize_link("Example Widget", "", &config()),
            "https://www.amazon.com/s?k=Example+Widget&tag=tag123"
        );
    }

    #[test]
    fn test_lookalike_host_is_not_marketplace() {
        let link = "https://amazon.com.evil.example/dp/B08N5WRWNW?tag=tag123";
        assert!(normalize_link("Widget", link, &config()).starts_with("https://www.amazon.com/s?k="));
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let inputs = [
            ("Widget", ""),
            ("Widget", "not a url"),
            ("Widget", "https://amzn.to/3xyz"),
            ("Widget", "https://www.amazon.com/dp/B08N5WRWNW?tag=other&tag=again"),
            ("Widget & Co.", "https://example.com/widget"),
            ("Widget", "https://smile.amazon.com/dp/B08N5WRWNW#top"),
        ];
        for (name, link) in inputs {
            let once = normalize_link(name, link, &config());
            let twice = normalize_link(name, &once, &config());
            assert_eq!(once, twice, "not idempotent for {:?}", link);
            assert!(is_tracked(&once, &config()));
        }
    }

    #[test]
    fn test_extract_catalog_id() {
        let cfg = config();
        assert_eq!(
            extract_catalog_id("https://www.amazon.com/Sony-WH-1000XM4/dp/B0863TXGM3/", &cfg).as_deref(),
            Some("B0863TXGM3")
        );
        assert_eq!(
            extract_catalog_id("https://amazon.com/dp/B08N5WRWNW", &cfg).as_deref(),
            Some("B08N5WRWNW")
        );
        assert_eq!(extract_catalog_id("https://www.amazon.com/s?k=widget", &cfg), None);
        assert_eq!(extract_catalog_id("https://example.com/dp/B08N5WRWNW", &cfg), None);
    }

    #[test]
    fn test_catalog_link() {
        assert_eq!(
            catalog_link("B08N5WRWNW", &config()),
            "https://www.amazon.com/dp/B08N5WRWNW/?tag=tag123"
        );
    }

    #[test]
    fn test_is_catalog_id() {
        assert!(is_catalog_id("B08N5WRWNW"));
        assert!(is_catalog_id("0316769487"));
        assert!(!is_catalog_id("B08N5WRWN"));
        assert!(!is_catalog_id("B08N5WRWNW1"));
        assert!(!is_catalog_id("B08N5-RWNW"));
    }
}

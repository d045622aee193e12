//! Catalog lookups: direct CDN probes and the marketplace product page.

use lazy_static::lazy_static;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use serde_json::Value;
use tracing::debug;
use tt_core::{HttpClient, Result};
use url::Url;

pub const CDN_HOSTS: [&str; 2] = ["m.media-amazon.com", "images-na.ssl-images-amazon.com"];
pub const CDN_SUFFIXES: [&str; 4] = ["_SCLZZZZZZZ_", "_AC_SL1500_", "LZZZZZZZ", "MZZZZZZZ"];
pub const PRODUCT_PAGE_BASE: &str = "https://www.amazon.com/dp/";

/// Image hosts accepted from a scraped product page (subdomains included).
const IMAGE_DOMAINS: [&str; 2] = ["media-amazon.com", "ssl-images-amazon.com"];

lazy_static! {
    static ref LANDING_IMAGE: Selector = Selector::parse("#landingImage").unwrap();
    static ref DYNAMIC_IMAGE: Selector = Selector::parse("img[data-a-dynamic-image]").unwrap();
    static ref ALT_IMAGES: Vec<Selector> = [
        "#imgTagWrapperId img",
        "#main-image-container img",
        "img.a-dynamic-image",
        "#imgBlkFront",
    ]
    .iter()
    .map(|s| Selector::parse(s).unwrap())
    .collect();
    static ref PRODUCT_TITLE: Selector = Selector::parse("#productTitle").unwrap();
    static ref PAGE_TITLE: Selector = Selector::parse("title").unwrap();
    static ref EMBEDDED_URL: Regex =
        Regex::new(r#""(?:hiRes|large|mainUrl)"\s*:\s*"((?:[^"\\]|\\.)+)""#).unwrap();
}

/// Every CDN URL worth probing for `id`, in probe order.
pub fn cdn_urls(id: &str) -> Vec<String> {
    CDN_HOSTS
        .iter()
        .flat_map(|host| {
            CDN_SUFFIXES
                .iter()
                .map(move |suffix| format!("https://{}/images/P/{}.01.{}.jpg", host, id, suffix))
        })
        .collect()
}

/// HEADs each CDN variant and returns the first that serves an image.
///
/// Errors only when every probe failed at the transport level.
pub async fn probe_cdn(http: &dyn HttpClient, id: &str) -> Result<Option<String>> {
    let urls = cdn_urls(id);
    let mut last_error = None;
    let mut answered = false;

    for url in urls {
        match http.head(&url).await {
            Ok(response) => {
                answered = true;
                if response.is_success() && response.is_image() {
                    debug!("🖼️ CDN hit: {}", url);
                    return Ok(Some(url));
                }
            }
            Err(e) => {
                debug!("CDN probe failed for {}: {}", url, e);
                last_error = Some(e);
            }
        }
    }

    match last_error {
        Some(e) if !answered => Err(e),
        _ => Ok(None),
    }
}

/// What a product page gave up.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductPage {
    pub image: Option<String>,
    /// Product title, used as a search name when the caller had none.
    pub title: Option<String>,
}

pub fn is_robot_check(html: &str) -> bool {
    html.contains("Robot Check") || html.to_lowercase().contains("captcha")
}

/// Only https URLs on the catalog image hosts are kept.
pub fn is_catalog_image_url(candidate: &str) -> bool {
    let Ok(url) = Url::parse(candidate) else {
        return false;
    };
    if url.scheme() != "https" {
        return false;
    }
    let host = url.host_str().unwrap_or_default().to_ascii_lowercase();
    IMAGE_DOMAINS
        .iter()
        .any(|domain| host == *domain || host.ends_with(&format!(".{}", domain)))
}

fn attr(element: &ElementRef, name: &str) -> Option<String> {
    element
        .value()
        .attr(name)
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn hires_or_src(element: &ElementRef) -> Vec<String> {
    ["data-old-hires", "src"].iter().filter_map(|name| attr(element, name)).collect()
}

/// Largest image in a `{"url": [width, height]}` map.
fn largest_dynamic_image(raw: &str) -> Option<String> {
    let map: serde_json::Map<String, Value> = serde_json::from_str(raw).ok()?;
    map.into_iter()
        .filter_map(|(url, size)| {
            let dims = size.as_array()?;
            let width = dims.first()?.as_u64()?;
            let height = dims.get(1)?.as_u64()?;
            Some((width.saturating_mul(height), url))
        })
        .max_by_key(|(area, _)| *area)
        .map(|(_, url)| url)
}

/// Decodes a JSON string body such as `https:\/\/m.media-amazon.com\/a.jpg`.
fn unescape_json_string(raw: &str) -> Option<String> {
    serde_json::from_str::<String>(&format!("\"{}\"", raw)).ok()
}

fn image_candidates(document: &Html, html: &str) -> Vec<String> {
    let mut candidates = Vec::new();

    for element in document.select(&LANDING_IMAGE) {
        candidates.extend(hires_or_src(&element));
    }

    if let Some(best) = document
        .select(&DYNAMIC_IMAGE)
        .filter_map(|element| attr(&element, "data-a-dynamic-image"))
        .filter_map(|raw| largest_dynamic_image(&raw))
        .next()
    {
        candidates.push(best);
    }

    for selector in ALT_IMAGES.iter() {
        for element in document.select(selector) {
            candidates.extend(hires_or_src(&element));
        }
    }

    candidates.extend(
        EMBEDDED_URL
            .captures_iter(html)
            .filter_map(|caps| unescape_json_string(&caps[1])),
    );
    candidates
}

fn text_of(document: &Html, selector: &Selector) -> Option<String> {
    document
        .select(selector)
        .next()
        .map(|el| el.text().collect::<String>().split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|t| !t.is_empty())
}

/// Pulls the main image and title out of a product page.
pub fn parse_product_page(html: &str) -> ProductPage {
    if is_robot_check(html) {
        return ProductPage::default();
    }
    let document = Html::parse_document(html);
    let image = image_candidates(&document, html)
        .into_iter()
        .find(|candidate| is_catalog_image_url(candidate));
    let title = text_of(&document, &PRODUCT_TITLE).or_else(|| text_of(&document, &PAGE_TITLE));
    ProductPage { image, title }
}

/// Fetches and parses the product page. Blocked or missing pages give an empty page.
pub async fn scrape_product_page(http: &dyn HttpClient, id: &str) -> Result<ProductPage> {
    let url = format!("{}{}", PRODUCT_PAGE_BASE, id);
    let response = http.get_page(&url).await?;
    if !response.is_success() {
        debug!("Product page {} returned HTTP {}", url, response.status);
        return Ok(ProductPage::default());
    }
    if is_robot_check(&response.body) {
        debug!("🤖 Robot check served for {}", url);
        return Ok(ProductPage::default());
    }
    Ok(parse_product_page(&response.body))
}

/// Rough product kind for an ID when nothing better is known.
pub fn guess_category(id: &str) -> &'static str {
    let bytes = id.as_bytes();
    let isbn10 = bytes.len() == 10
        && bytes[..9].iter().all(u8::is_ascii_digit)
        && (bytes[9].is_ascii_digit() || bytes[9] == b'X' || bytes[9] == b'x');
    if isbn10 {
        "book"
    } else {
        "product"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeHttp;

    #[test]
    fn test_dynamic_image_with_huge_dimensions() {
        let html = r#"<html><body><img class="a-dynamic-image" data-a-dynamic-image='{"https://m.media-amazon.com/images/I/small.jpg":[300,300],"https://m.media-amazon.com/images/I/huge.jpg":[18446744073709551615,2]}'></body></html>"#;
        let page = parse_product_page(html);
        assert_eq!(page.image.as_deref(), Some("https://m.media-amazon.com/images/I/huge.jpg"));
    }

    #[test]
    fn test_cdn_urls_order() {
        let urls = cdn_urls("B08N5WRWNW");
        assert_eq!(urls.len(), 8);
        assert_eq!(urls[0], "https://m.media-amazon.com/images/P/B08N5WRWNW.01._SCLZZZZZZZ_.jpg");
        assert_eq!(urls[7], "https://images-na.ssl-images-amazon.com/images/P/B08N5WRWNW.01.MZZZZZZZ.jpg");
    }

    #[tokio::test]
    async fn test_probe_cdn() {
        let second = "https://m.media-amazon.com/images/P/B08N5WRWNW.01._AC_SL1500_.jpg";
        let http = FakeHttp::new()
            .with_head("https://m.media-amazon.com/images/P/B08N5WRWNW.01._SCLZZZZZZZ_.jpg", 200, "text/html")
            .with_image(second);
        assert_eq!(probe_cdn(&http, "B08N5WRWNW").await.unwrap().as_deref(), Some(second));
        assert_eq!(http.calls().len(), 2);

        assert_eq!(probe_cdn(&FakeHttp::new(), "B08N5WRWNW").await.unwrap(), None);
        assert!(probe_cdn(&FakeHttp::failing(), "B08N5WRWNW").await.is_err());
    }

    #[test]
    fn test_parse_product_page_prefers_landing_image() {
        let html = r#"<html><head><title>Amazon.com: Widget</title></head><body>
            <span id="productTitle">  Example   Widget Pro </span>
            <img id="landingImage" data-old-hires="" src="https://m.media-amazon.com/images/I/landing.jpg">
            </body></html>"#;
        let page = parse_product_page(html);
        assert_eq!(page.image.as_deref(), Some("https://m.media-amazon.com/images/I/landing.jpg"));
        assert_eq!(page.title.as_deref(), Some("Example Widget Pro"));
    }

    #[test]
    fn test_parse_product_page_dynamic_and_embedded() {
        let dynamic = r#"<html><head><title>Widget</title></head><body>
            <img data-a-dynamic-image='{"https://m.media-amazon.com/images/I/small.jpg":[100,100],"https://m.media-amazon.com/images/I/big.jpg":[1500,1500]}'>
            </body></html>"#;
        let page = parse_product_page(dynamic);
        assert_eq!(page.image.as_deref(), Some("https://m.media-amazon.com/images/I/big.jpg"));
        assert_eq!(page.title.as_deref(), Some("Widget"));

        let embedded = r#"<html><body><img id="landingImage" src="http://evil.example/x.jpg">
            <script>var data = {"hiRes":"https:\/\/images-na.ssl-images-amazon.com\/images\/I\/hi.jpg"};</script>
            </body></html>"#;
        let page = parse_product_page(embedded);
        assert_eq!(
            page.image.as_deref(),
            Some("https://images-na.ssl-images-amazon.com/images/I/hi.jpg")
        );
    }

    #[tokio::test]
    async fn test_scrape_blocked_or_missing_page() {
        let http = FakeHttp::new().with_page(
            "https://www.amazon.com/dp/B08N5WRWNW",
            200,
            "<html><title>Robot Check</title><p>Enter the characters you see</p></html>",
        );
        assert_eq!(scrape_product_page(&http, "B08N5WRWNW").await.unwrap(), ProductPage::default());
        assert_eq!(scrape_product_page(&http, "B000000000").await.unwrap(), ProductPage::default());
    }

    #[test]
    fn test_image_url_allowlist() {
        assert!(is_catalog_image_url("https://m.media-amazon.com/images/I/a.jpg"));
        assert!(is_catalog_image_url("https://images-na.ssl-images-amazon.com/images/I/a.jpg"));
        assert!(!is_catalog_image_url("http://m.media-amazon.com/images/I/a.jpg"));
        assert!(!is_catalog_image_url("https://media-amazon.com.evil.example/a.jpg"));
        assert!(!is_catalog_image_url("data:image/gif;base64,R0lGOD"));
    }

    #[test]
    fn test_guess_category() {
        assert_eq!(guess_category("0316769487"), "book");
        assert_eq!(guess_category("080442957X"), "book");
        assert_eq!(guess_category("B08N5WRWNW"), "product");
    }
}

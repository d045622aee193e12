//! Picking the best image out of a search engine's results.

use lazy_static::lazy_static;
use regex::Regex;
use tt_core::ImageSource;
use url::Url;

use crate::search::ImageHit;

pub const RETAIL_DOMAINS: [&str; 21] = [
    "amazon.com",
    "amazon.co.uk",
    "bestbuy.com",
    "newegg.com",
    "logitech.com",
    "corsair.com",
    "razer.com",
    "steelseries.com",
    "hyperx.com",
    "asus.com",
    "msi.com",
    "sony.com",
    "apple.com",
    "walmart.com",
    "target.com",
    "microcenter.com",
    "officedepot.com",
    "staples.com",
    "costco.com",
    "samsclub.com",
    "bhphotovideo.com",
];

/// Hosts whose images are usually low quality or watermarked.
pub const DENIED_HOSTS: [&str; 4] = ["pinterest", "ebay", "aliexpress", "temu"];

pub const MIN_QUALITY_SIZE: u32 = 500;
const IMAGE_EXTENSIONS: [&str; 4] = [".jpg", ".jpeg", ".png", ".webp"];

lazy_static! {
    static ref NOISE_WORDS: Regex =
        Regex::new(r"(?i)\b(?:the|a|an|for|with|and|or|best|top|review|reviews|\d{4})\b").unwrap();
}

/// Strips filler words and years, then asks for the product shot.
pub fn clean_query(name: &str) -> String {
    let stripped = NOISE_WORDS.replace_all(name, " ");
    let words: Vec<&str> = stripped.split_whitespace().collect();
    format!("{} product", words.join(" ")).trim().to_string()
}

fn host_of(value: &str) -> Option<String> {
    let parsed = Url::parse(value).or_else(|_| Url::parse(&format!("https://{}", value))).ok()?;
    parsed.host_str().map(|h| h.to_ascii_lowercase())
}

fn hosts(hit: &ImageHit) -> Vec<String> {
    [&hit.original, &hit.link, &hit.source]
        .into_iter()
        .flatten()
        .filter_map(|v| host_of(v))
        .collect()
}

fn is_retail(hit: &ImageHit) -> bool {
    hosts(hit).iter().any(|host| {
        RETAIL_DOMAINS
            .iter()
            .any(|domain| host == domain || host.ends_with(&format!(".{}", domain)))
    })
}

fn is_denied(hit: &ImageHit) -> bool {
    hosts(hit)
        .iter()
        .any(|host| DENIED_HOSTS.iter().any(|denied| host.contains(denied)))
}

fn is_large(hit: &ImageHit) -> bool {
    matches!((hit.width, hit.height), (Some(w), Some(h)) if w >= MIN_QUALITY_SIZE && h >= MIN_QUALITY_SIZE)
}

fn has_image_extension(url: &str) -> bool {
    Url::parse(url)
        .map(|u| {
            let path = u.path().to_ascii_lowercase();
            IMAGE_EXTENSIONS.iter().any(|ext| path.ends_with(ext))
        })
        .unwrap_or(false)
}

/// Ranks hits in three passes: retail sites, large images, then anything that looks like an image file.
pub fn pick_best(hits: &[ImageHit]) -> Option<(String, ImageSource)> {
    let usable: Vec<(&ImageHit, &str)> = hits
        .iter()
        .filter_map(|hit| hit.original.as_deref().map(|url| (hit, url)))
        .collect();

    if let Some((_, url)) = usable.iter().find(|(hit, _)| is_retail(hit)) {
        return Some((url.to_string(), ImageSource::SearchRetail));
    }
    if let Some((_, url)) = usable.iter().find(|(hit, _)| is_large(hit) && !is_denied(hit)) {
        return Some((url.to_string(), ImageSource::SearchQuality));
    }
    usable
        .iter()
        .find(|(_, url)| has_image_extension(url))
        .map(|(_, url)| (url.to_string(), ImageSource::SearchFallback))
}

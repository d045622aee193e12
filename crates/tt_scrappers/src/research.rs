//! Finding candidate products for a category and gathering notes about them.

use std::time::Duration;

use lazy_static::lazy_static;
use regex::Regex;
use tracing::{error, info};
use tt_core::{ResearchedProduct, Result};

use crate::search::SerpApiClient;

pub const MAX_PRODUCTS: usize = 8;
const MAX_ORGANIC_RESULTS: usize = 10;
const SPECS_LIMIT: usize = 500;
const REVIEWS_LIMIT: usize = 800;
const EXCLUDED_WORDS: [&str; 3] = ["best", "review", "guide"];

lazy_static! {
    static ref NAME_PATTERNS: [Regex; 2] = [
        // Brand Model, optionally followed by more capitalised or numeric words
        Regex::new(r"\b([A-Z][a-z]+ [A-Z][a-z]+(?:\s+[A-Z0-9][a-z0-9]*)*)\b").unwrap(),
        // Brand plus alphanumeric model
        Regex::new(r"\b([A-Z][a-z]+\s+[A-Z0-9]+[a-z0-9]*)\b").unwrap(),
    ];
}

fn is_candidate(name: &str) -> bool {
    let lower = name.to_lowercase();
    (6..50).contains(&name.len()) && !EXCLUDED_WORDS.iter().any(|w| lower.contains(w))
}

/// Pulls product-like names out of free text.
pub fn extract_product_names(text: &str) -> Vec<String> {
    NAME_PATTERNS
        .iter()
        .flat_map(|pattern| pattern.find_iter(text).map(|m| m.as_str().trim().to_string()))
        .filter(|name| is_candidate(name))
        .collect()
}

fn push_unique(names: &mut Vec<String>, candidates: Vec<String>, max: usize) {
    for candidate in candidates {
        if names.len() >= max {
            break;
        }
        if !names.contains(&candidate) {
            names.push(candidate);
        }
    }
}

/// Searches `category` and returns up to `max` distinct product names in first-seen order.
pub async fn find_products(search: &SerpApiClient, category: &str, max: usize) -> Result<Vec<String>> {
    info!("🛍️ Finding top products for \"{}\"...", category);
    let results = search.web(category).await?;

    let mut names = Vec::new();
    for result in results.organic.iter().take(MAX_ORGANIC_RESULTS) {
        let text = format!("{} {}", result.title, result.snippet);
        push_unique(&mut names, extract_product_names(&text), max);
        if names.len() >= max {
            break;
        }
    }
    info!("✅ Found {} products: {:?}", names.len(), names);
    Ok(names)
}

fn truncate(text: &str, limit: usize) -> String {
    text.chars().take(limit).collect()
}

pub async fn research_product(search: &SerpApiClient, name: &str, year: i32) -> Result<ResearchedProduct> {
    let results = search.web(&format!("{} specifications review {}", name, year)).await?;
    let top = &results.organic[..results.organic.len().min(3)];

    let specs = top.iter().map(|r| r.snippet.as_str()).collect::<Vec<_>>().join(" ");
    let reviews = top
        .iter()
        .map(|r| format!("{} {}", r.title, r.snippet))
        .collect::<Vec<_>>()
        .join(" ");
    let shopping = results.shopping.first();

    Ok(ResearchedProduct {
        name: name.to_string(),
        specs: truncate(&specs, SPECS_LIMIT),
        reviews: truncate(&reviews, REVIEWS_LIMIT),
        image: shopping.and_then(|s| s.thumbnail.clone()),
        link: shopping.and_then(|s| s.link.clone()),
    })
}

/// Researches each product in turn. Failures are logged and skipped.
pub async fn research_products(
    search: &SerpApiClient,
    names: &[String],
    year: i32,
    delay: Duration,
) -> Vec<ResearchedProduct> {
    info!("📚 Researching {} products...", names.len());
    let mut researched = Vec::with_capacity(names.len());
    for (i, name) in names.iter().enumerate() {
        info!("   Researching: {}", name);
        match research_product(search, name, year).await {
            Ok(product) => researched.push(product),
            Err(e) => error!("❌ Error researching {}: {}", name, e),
        }
        if i + 1 < names.len() && !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
    info!("✅ Successfully researched {} products", researched.len());
    researched
}

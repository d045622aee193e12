//! Turning product research into a ranked article.

use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{info, warn};
use tt_core::affiliate::{normalize_link, AffiliateConfig};
use tt_core::{
    slugify, Article, CompletionRequest, Error, Frontmatter, InferenceModel, Product, ResearchedProduct, Result, Tier,
    TierList,
};

const SYSTEM_PROMPT: &str =
    "You are an expert product reviewer who creates detailed, honest tier lists. Always provide balanced, informative reviews.";

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GeneratedProduct {
    pub name: String,
    #[serde(default)]
    pub review: String,
}

/// The JSON object the model is asked to produce.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GeneratedContent {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub introduction: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub tiers: Map<String, Value>,
}

impl GeneratedContent {
    /// Tiers in the order the model wrote them. Malformed entries are skipped.
    pub fn ordered_tiers(&self) -> Vec<(String, Vec<GeneratedProduct>)> {
        self.tiers
            .iter()
            .map(|(key, value)| {
                let products = match value {
                    Value::Array(items) => items
                        .iter()
                        .filter_map(|item| serde_json::from_value::<GeneratedProduct>(item.clone()).ok())
                        .filter(|p| !p.name.trim().is_empty())
                        .collect(),
                    _ => {
                        warn!("⚠️ Tier {} is not a list, ignoring it", key);
                        Vec::new()
                    }
                };
                (key.clone(), products)
            })
            .collect()
    }
}

pub fn tier_label(key: &str) -> &'static str {
    match key {
        "S" => "Top Picks",
        "A" => "Great Options",
        _ => "Budget Choices",
    }
}

pub fn build_request(category: &str, products: &[ResearchedProduct]) -> CompletionRequest {
    let listing = products
        .iter()
        .enumerate()
        .map(|(i, p)| format!("{}. {}\nSpecs: {}\nReviews: {}\n", i + 1, p.name, p.specs, p.reviews))
        .collect::<Vec<_>>()
        .join("\n");

    let prompt = format!(
        r#"You are creating a comprehensive tier list for "{category}".

Here are the products to rank and review:

{listing}
Rank these products into S, A and B tiers based on performance and quality, value for money, user satisfaction, and build quality.
For each product, write a concise 1-2 sentence review explaining its placement.

Also write a catchy title, a 2-sentence SEO description, a 3-4 sentence introduction, a brief summary and 5-7 tags.

Respond with JSON only:
{{
  "title": "...",
  "description": "...",
  "introduction": "...",
  "summary": "...",
  "tags": ["tag1", "tag2"],
  "tiers": {{
    "S": [{{"name": "Product Name", "review": "Review text"}}],
    "A": [{{"name": "Product Name", "review": "Review text"}}],
    "B": [{{"name": "Product Name", "review": "Review text"}}]
  }}
}}"#
    );
    CompletionRequest::new(SYSTEM_PROMPT, prompt)
}

/// Pulls the JSON object out of a completion, tolerating markdown fences and chatter.
pub fn parse_response(text: &str) -> Result<GeneratedContent> {
    let start = text
        .find('{')
        .ok_or_else(|| Error::Inference("Completion contained no JSON object".to_string()))?;
    let end = text
        .rfind('}')
        .filter(|end| *end > start)
        .ok_or_else(|| Error::Inference("Completion contained no JSON object".to_string()))?;
    serde_json::from_str(&text[start..=end])
        .map_err(|e| Error::Inference(format!("Completion was not the expected JSON: {}", e)))
}

pub async fn generate(
    model: &dyn InferenceModel,
    category: &str,
    products: &[ResearchedProduct],
    model_name: Option<&str>,
) -> Result<GeneratedContent> {
    info!("🤖 Generating tier list content with {}...", model.name());
    let mut request = build_request(category, products);
    if let Some(name) = model_name {
        request = request.with_model(name);
    }
    let response = model.complete(&request).await?;
    let content = parse_response(&response)?;
    info!("✅ Generated content for: {}", content.title);
    Ok(content)
}

fn find_research<'a>(research: &'a [ResearchedProduct], name: &str) -> Option<&'a ResearchedProduct> {
    let name = name.to_lowercase();
    research.iter().find(|r| {
        let candidate = r.name.to_lowercase();
        candidate.contains(&name) || name.contains(&candidate)
    })
}

/// Assembles the article: labelled tiers, research images, tracked links.
pub fn into_article(
    content: GeneratedContent,
    research: &[ResearchedProduct],
    category: &str,
    affiliate: &AffiliateConfig,
    today: NaiveDate,
) -> Article {
    let tiers = content
        .ordered_tiers()
        .into_iter()
        .map(|(key, generated)| {
            let products = generated
                .into_iter()
                .map(|g| {
                    let found = find_research(research, &g.name);
                    let link = found.and_then(|r| r.link.as_deref()).unwrap_or_default();
                    let mut product = Product::new(g.name.clone(), g.review, normalize_link(&g.name, link, affiliate));
                    product.image = found.and_then(|r| r.image.clone()).filter(|i| !i.trim().is_empty());
                    product
                })
                .collect();
            Tier::new(key.clone(), products).with_label(tier_label(&key))
        })
        .collect();

    let slug = slugify(&content.title);
    let mut frontmatter = Frontmatter {
        image: Some(format!("/images/{}-hero.webp", slug)),
        title: content.title,
        description: content.description,
        pub_date: Some(today),
        slug: Some(slug),
        tags: Vec::new(),
    };
    for tag in content.tags {
        frontmatter.add_tag(tag);
    }

    let category = frontmatter
        .tags
        .first()
        .cloned()
        .unwrap_or_else(|| category.to_string());
    Article {
        frontmatter,
        introduction: content.introduction,
        category: Some(category),
        tiers: TierList::new(tiers),
        summary: content.summary,
    }
}

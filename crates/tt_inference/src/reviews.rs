use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tracing::{error, info, warn};
use tt_core::{CompletionRequest, InferenceModel, Result};

const PLACEHOLDERS: [&str; 10] = [
    "placeholder",
    "todo",
    "tbd",
    "coming soon",
    "review pending",
    "great product",
    "excellent choice",
    "good option",
    "solid pick",
    "recommended",
];

const MIN_WORDS: usize = 15;
const MIN_CHARS: usize = 80;
/// Replies this short are treated as failures.
const MIN_REPLY_CHARS: usize = 10;

const CATEGORY_KEYWORDS: [(&str, &str); 12] = [
    ("headset", "gaming headsets"),
    ("headphone", "headphones"),
    ("mouse", "gaming mice"),
    ("mice", "gaming mice"),
    ("keyboard", "gaming keyboards"),
    ("laptop", "laptops"),
    ("chair", "office chairs"),
    ("monitor", "monitors"),
    ("earbuds", "wireless earbuds"),
    ("speaker", "speakers"),
    ("webcam", "webcams"),
    ("microphone", "microphones"),
];

const SYSTEM_PROMPT: &str = "You are a professional product reviewer who writes concise, informative reviews focusing on key features and use cases. Keep reviews between 20-40 words.";

/// True when a review is missing, a placeholder, or too thin to keep.
pub fn needs_review(review: &str) -> bool {
    let clean = review.trim().to_lowercase();
    if clean.is_empty() {
        return true;
    }
    if PLACEHOLDERS.iter().any(|p| clean.contains(p)) {
        return true;
    }
    clean.split_whitespace().count() < MIN_WORDS || clean.chars().count() < MIN_CHARS
}

/// Guesses the product category from an article title or file path.
pub fn extract_category(title: &str, path: &str) -> &'static str {
    let title = title.to_lowercase();
    let path = path.to_lowercase();
    CATEGORY_KEYWORDS
        .iter()
        .find(|(keyword, _)| title.contains(keyword) || path.contains(keyword))
        .map(|(_, category)| *category)
        .unwrap_or("products")
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewRequest {
    pub name: String,
    pub tier: String,
    pub category: String,
}

pub fn build_request(review: &ReviewRequest) -> CompletionRequest {
    let prompt = format!(
        "Write a concise, informative product review for the {name} in the {category} category.\n\n\
         Requirements:\n\
         - 1-2 sentences maximum (20-40 words)\n\
         - Focus on key strengths and use cases\n\
         - Professional, helpful tone\n\
         - No marketing fluff or excessive adjectives\n\
         - Tier {tier} quality level context (S=exceptional, A=great, B=good, C=basic)\n\
         - Include specific technical benefits or standout features\n\n\
         Product: {name}\nReview:",
        name = review.name,
        category = review.category,
        tier = review.tier,
    );
    CompletionRequest::new(SYSTEM_PROMPT, prompt).with_max_tokens(100)
}

/// Asks the model for one review. Failures and too-short replies yield `None`.
pub async fn write_review(model: &dyn InferenceModel, review: &ReviewRequest, model_name: Option<&str>) -> Option<String> {
    info!("🤖 Generating review for: \"{}\" (Tier {})", review.name, review.tier);
    let mut request = build_request(review);
    if let Some(name) = model_name {
        request = request.with_model(name);
    }
    match model.complete(&request).await {
        Ok(text) => {
            let text = text.trim().trim_matches('"').trim().to_string();
            if text.chars().count() > MIN_REPLY_CHARS {
                Some(text)
            } else {
                warn!("❌ Invalid review generated for {}", review.name);
                None
            }
        }
        Err(e) => {
            error!("❌ Error generating review for {}: {}", review.name, e);
            None
        }
    }
}

#[derive(Debug, Clone)]
pub struct BatchOptions {
    pub batch_size: usize,
    /// Pause between batches.
    pub delay: Duration,
    pub model_name: Option<String>,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            batch_size: 3,
            delay: Duration::from_millis(1000),
            model_name: None,
        }
    }
}

/// Writes reviews `batch_size` at a time, pausing between batches.
///
/// The output lines up with `requests`; `None` marks a failed review.
pub async fn generate_reviews(
    model: Arc<dyn InferenceModel>,
    requests: &[ReviewRequest],
    options: &BatchOptions,
) -> Result<Vec<Option<String>>> {
    let batch_size = options.batch_size.max(1);
    let batches = (requests.len() + batch_size - 1) / batch_size;
    let mut results = Vec::with_capacity(requests.len());

    for (i, batch) in requests.chunks(batch_size).enumerate() {
        info!("📝 Processing batch {}/{}...", i + 1, batches);
        let calls = batch
            .iter()
            .map(|request| write_review(model.as_ref(), request, options.model_name.as_deref()));
        results.extend(join_all(calls).await);

        if i + 1 < batches && !options.delay.is_zero() {
            tokio::time::sleep(options.delay).await;
        }
    }
    Ok(results)
}

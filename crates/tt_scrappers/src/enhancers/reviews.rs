use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use tt_content::store::file_name;
use tt_content::TierListDocument;
use tt_core::{InferenceModel, Result};
use tt_inference::reviews::{extract_category, generate_reviews, needs_review, BatchOptions, ReviewRequest};

use super::{Enhancer, PassOptions, PassReport};
use crate::logging::Logger;

/// Rewrites missing, placeholder or thin reviews with the model.
#[derive(Debug, Clone)]
pub struct ReviewEnhancer {
    model: Arc<dyn InferenceModel>,
    batch: BatchOptions,
}

impl ReviewEnhancer {
    pub fn new(model: Arc<dyn InferenceModel>, batch: BatchOptions) -> Self {
        Self { model, batch }
    }
}

#[async_trait]
impl Enhancer for ReviewEnhancer {
    fn name(&self) -> &str {
        "reviews"
    }

    fn uses_network(&self) -> bool {
        true
    }

    async fn enhance(
        &self,
        path: &Path,
        document: &mut TierListDocument,
        options: &PassOptions,
        report: &mut PassReport,
    ) -> Result<bool> {
        let logger = Logger::new().with_prefix(file_name(path));
        let category = extract_category(document.title().unwrap_or_default(), &path.to_string_lossy());

        let mut targets = Vec::new();
        let mut requests = Vec::new();
        for (t, tier) in document.tiers.tiers.iter().enumerate() {
            for (p, product) in tier.products.iter().enumerate() {
                report.products_seen += 1;
                if needs_review(&product.review) {
                    targets.push((t, p));
                    requests.push(ReviewRequest {
                        name: product.name.clone(),
                        tier: tier.key.clone(),
                        category: category.to_string(),
                    });
                }
            }
        }

        if requests.is_empty() {
            logger.info("✅ All reviews look good");
            return Ok(false);
        }
        logger.info(&format!("🔍 {} products need reviews ({})", requests.len(), category));
        if options.dry_run {
            for request in &requests {
                logger.info(&format!("   Would review: {} (Tier {})", request.name, request.tier));
            }
            report.pending += requests.len();
            return Ok(false);
        }

        let batch = BatchOptions {
            delay: options.delay,
            ..self.batch.clone()
        };
        let reviews = generate_reviews(self.model.clone(), &requests, &batch).await?;

        let mut changed = false;
        for ((t, p), review) in targets.into_iter().zip(reviews) {
            match review {
                Some(review) => {
                    document.tiers.tiers[t].products[p].review = review;
                    report.products_changed += 1;
                    changed = true;
                }
                None => report.products_failed += 1,
            }
        }
        Ok(changed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enhancers::{fixtures, run_pass};
    use crate::testing::ScriptedModel;
    use std::time::Duration;
    use tempfile::tempdir;
    use tt_content::store::read_document;

    const FRESH: &str = "Twenty-five programmable buttons and an adjustable weight system make this a flexible pick for shooters and MMO players alike.";

    fn options() -> PassOptions {
        PassOptions {
            delay: Duration::ZERO,
            file_delay: Duration::ZERO,
            ..PassOptions::default()
        }
    }

    #[tokio::test]
    async fn test_review_pass_rewrites_weak_reviews() {
        let dir = tempdir().unwrap();
        let path = fixtures::write(dir.path(), "best-gaming-mice.mdx", fixtures::MICE);
        let model = Arc::new(ScriptedModel::new(&[FRESH, "short"]));
        let enhancer = ReviewEnhancer::new(model.clone(), BatchOptions::default());

        let report = run_pass(&enhancer, &[path.clone()], &options()).await;
        assert_eq!(report.products_seen, 3);
        assert_eq!(report.products_changed, 1);
        assert_eq!(report.products_failed, 1);

        let requests = model.requests();
        assert_eq!(requests.len(), 2);
        assert!(requests[0].prompt.contains("Logitech G502 in the gaming mice category"));

        let document = read_document(&path).await.unwrap();
        let products: Vec<_> = document.tiers.products().map(|(_, p)| p).collect();
        assert_eq!(products[0].review, FRESH);
        assert!(products[1].review.starts_with("An ultralight"));
        assert_eq!(products[2].review, "");
    }

    #[tokio::test]
    async fn test_dry_run_counts_without_calling() {
        let dir = tempdir().unwrap();
        let path = fixtures::write(dir.path(), "mice.mdx", fixtures::MICE);
        let model = Arc::new(ScriptedModel::new(&[FRESH]));
        let enhancer = ReviewEnhancer::new(model.clone(), BatchOptions::default());

        let options = PassOptions {
            dry_run: true,
            ..options()
        };
        let report = run_pass(&enhancer, &[path], &options).await;
        assert_eq!(report.pending, 2);
        assert!(model.requests().is_empty());
    }
}

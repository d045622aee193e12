use std::path::Path;

use async_trait::async_trait;
use tt_content::store::file_name;
use tt_content::TierListDocument;
use tt_core::affiliate::{extract_catalog_id, AffiliateConfig};
use tt_core::{Product, Result};

use super::{Enhancer, PassOptions, PassReport};
use crate::images::{ImageQuery, ImageResolver};
use crate::logging::Logger;

/// Fills in missing product images through the resolver chain.
#[derive(Debug, Clone)]
pub struct ImageEnhancer {
    resolver: ImageResolver,
    affiliate: AffiliateConfig,
}

impl ImageEnhancer {
    pub fn new(resolver: ImageResolver, affiliate: AffiliateConfig) -> Self {
        Self { resolver, affiliate }
    }

    /// Looks up by catalog ID when the link carries one, else by name.
    pub fn query_for(&self, product: &Product) -> ImageQuery {
        match extract_catalog_id(&product.link, &self.affiliate) {
            Some(id) => ImageQuery::Catalog {
                id,
                name: Some(product.name.clone()),
            },
            None => ImageQuery::Name(product.name.clone()),
        }
    }
}

#[async_trait]
impl Enhancer for ImageEnhancer {
    fn name(&self) -> &str {
        "images"
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
        let mut changed = false;
        let mut lookups = 0;

        for tier in document.tiers.tiers.iter_mut() {
            let logger = logger.clone().with_prefix(&tier.key);
            for product in tier.products.iter_mut() {
                report.products_seen += 1;
                if product.has_image() && !options.overwrite {
                    continue;
                }
                if options.dry_run {
                    logger.info(&format!("🔍 Would resolve image for {}", product.name));
                    report.pending += 1;
                    continue;
                }

                if lookups > 0 && !options.delay.is_zero() {
                    tokio::time::sleep(options.delay).await;
                }
                lookups += 1;

                let query = self.query_for(product);
                logger.info(&format!("🔍 Resolving image for {}", query));
                let result = self.resolver.resolve(&query).await;
                report.record_source(result.source);

                match result.url {
                    Some(url) => {
                        logger.info(&format!("✅ {} via {}", product.name, result.source.display_name()));
                        product.image = Some(url);
                        product.image_source = Some(result.source);
                        report.products_changed += 1;
                        changed = true;
                    }
                    None => {
                        logger.warn(&format!("❌ No image for {} ({})", product.name, result.source));
                        report.products_failed += 1;
                        // An existing image survives a failed re-resolve.
                        if !product.has_image() && product.image_source != Some(result.source) {
                            product.image_source = Some(result.source);
                            changed = true;
                        }
                    }
                }
            }
        }
        Ok(changed)
    }
}

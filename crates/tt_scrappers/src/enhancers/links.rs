use std::path::Path;

use async_trait::async_trait;
use tt_content::store::file_name;
use tt_content::TierListDocument;
use tt_core::affiliate::{normalize_link, AffiliateConfig};
use tt_core::Result;

use super::{Enhancer, PassOptions, PassReport};
use crate::logging::Logger;

/// Points every product link at a tracked marketplace URL.
#[derive(Debug, Clone)]
pub struct LinkEnhancer {
    affiliate: AffiliateConfig,
}

impl LinkEnhancer {
    pub fn new(affiliate: AffiliateConfig) -> Self {
        Self { affiliate }
    }
}

#[async_trait]
impl Enhancer for LinkEnhancer {
    fn name(&self) -> &str {
        "links"
    }

    async fn enhance(
        &self,
        path: &Path,
        document: &mut TierListDocument,
        _options: &PassOptions,
        report: &mut PassReport,
    ) -> Result<bool> {
        let logger = Logger::new().with_prefix(file_name(path));
        let mut updated = 0;
        for product in document.tiers.products_mut() {
            report.products_seen += 1;
            let link = normalize_link(&product.name, &product.link, &self.affiliate);
            if link != product.link {
                logger.debug(&format!("🔗 {}: {} -> {}", product.name, product.link, link));
                product.link = link;
                report.products_changed += 1;
                updated += 1;
            }
        }
        if updated > 0 {
            logger.info(&format!("🔗 Updated {} links", updated));
        }
        Ok(updated > 0)
    }
}

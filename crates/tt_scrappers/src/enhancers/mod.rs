//! Passes that rewrite the `<TierList>` component of existing content files.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use tt_content::store::{file_name, read_document, write_document};
use tt_content::TierListDocument;
use tt_core::{ImageSource, Result};

use crate::logging::Logger;

pub mod images;
pub mod links;
pub mod reviews;

pub use images::ImageEnhancer;
pub use links::LinkEnhancer;
pub use reviews::ReviewEnhancer;

#[derive(Debug, Clone)]
pub struct PassOptions {
    /// Re-resolve products that already have an image.
    pub overwrite: bool,
    /// No network lookups and no writes.
    pub dry_run: bool,
    /// Pause between outbound calls.
    pub delay: Duration,
    /// Pause between files for passes that hit the network.
    pub file_delay: Duration,
}

impl Default for PassOptions {
    fn default() -> Self {
        Self {
            overwrite: false,
            dry_run: false,
            delay: Duration::from_millis(1000),
            file_delay: Duration::from_millis(3000),
        }
    }
}

/// Counts gathered by a pass. In a dry run `pending` holds the work that was skipped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PassReport {
    pub files_seen: usize,
    pub files_changed: usize,
    pub files_skipped: usize,
    pub products_seen: usize,
    pub products_changed: usize,
    pub products_failed: usize,
    pub pending: usize,
    pub sources: BTreeMap<ImageSource, usize>,
}

impl PassReport {
    pub fn record_source(&mut self, source: ImageSource) {
        *self.sources.entry(source).or_default() += 1;
    }

    pub fn log_summary(&self, pass: &str) {
        let logger = Logger::new().with_prefix(pass);
        logger.info("📊 Summary:");
        logger.info(&format!(
            "   Files: {} processed, {} updated, {} skipped",
            self.files_seen, self.files_changed, self.files_skipped
        ));
        logger.info(&format!(
            "   Products: {} seen, {} updated, {} failed",
            self.products_seen, self.products_changed, self.products_failed
        ));
        if self.pending > 0 {
            logger.info(&format!("   Dry run: {} products would be processed", self.pending));
        }
        for (source, count) in &self.sources {
            logger.info(&format!("   {}: {}", source.display_name(), count));
        }
    }
}

/// One kind of per-file rewrite.
#[async_trait]
pub trait Enhancer: Send + Sync {
    fn name(&self) -> &str;

    /// True when the pass makes outbound calls, so files are spaced out.
    fn uses_network(&self) -> bool {
        false
    }

    /// Updates `document` in place and returns whether anything changed.
    async fn enhance(
        &self,
        path: &Path,
        document: &mut TierListDocument,
        options: &PassOptions,
        report: &mut PassReport,
    ) -> Result<bool>;
}

/// Runs `enhancer` over `files` one at a time.
///
/// Unreadable or unparsable files are logged and left untouched; a failing file never stops the pass.
pub async fn run_pass(enhancer: &dyn Enhancer, files: &[PathBuf], options: &PassOptions) -> PassReport {
    let mut report = PassReport::default();
    let logger = Logger::new().with_prefix(enhancer.name());
    logger.info(&format!("🚀 Processing {} files...", files.len()));

    for (i, path) in files.iter().enumerate() {
        let logger = logger.clone().with_prefix(file_name(path));
        report.files_seen += 1;

        let mut document = match read_document(path).await {
            Ok(document) => document,
            Err(e) => {
                logger.warn(&format!("⚠️ Skipping file: {}", e));
                report.files_skipped += 1;
                continue;
            }
        };

        match enhancer.enhance(path, &mut document, options, &mut report).await {
            Ok(true) if options.dry_run => logger.info("🔍 Dry run: changes not written"),
            Ok(true) => match write_document(path, &document).await {
                Ok(()) => {
                    report.files_changed += 1;
                    logger.info("💾 Updated");
                }
                Err(e) => {
                    logger.error(&format!("❌ Failed to write: {}", e));
                    report.files_skipped += 1;
                }
            },
            Ok(false) => logger.debug("No changes"),
            Err(e) => {
                logger.error(&format!("❌ {}", e));
                report.files_skipped += 1;
            }
        }

        let spaced = enhancer.uses_network() && !options.dry_run && !options.file_delay.is_zero();
        if spaced && i + 1 < files.len() {
            tokio::time::sleep(options.file_delay).await;
        }
    }

    report.log_summary(enhancer.name());
    report
}


#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[derive(Debug)]
    struct Upcase;

    #[async_trait]
    impl Enhancer for Upcase {
        fn name(&self) -> &str {
            "upcase"
        }

        async fn enhance(
            &self,
            _path: &Path,
            document: &mut TierListDocument,
            _options: &PassOptions,
            report: &mut PassReport,
        ) -> Result<bool> {
            for product in document.tiers.products_mut() {
                report.products_seen += 1;
                product.name = product.name.to_uppercase();
                report.products_changed += 1;
            }
            Ok(true)
        }
    }

    #[tokio::test]
    async fn test_run_pass_writes_and_skips() {
        let dir = tempdir().unwrap();
        let good = fixtures::write(dir.path(), "mice.mdx", fixtures::MICE);
        let broken = fixtures::write(dir.path(), "broken.mdx", "---\ntitle: x\n---\nno component here\n");
        let missing = dir.path().join("missing.mdx");

        let options = PassOptions {
            delay: Duration::ZERO,
            file_delay: Duration::ZERO,
            ..PassOptions::default()
        };
        let report = run_pass(&Upcase, &[good.clone(), broken.clone(), missing], &options).await;

        assert_eq!(report.files_seen, 3);
        assert_eq!(report.files_changed, 1);
        assert_eq!(report.files_skipped, 2);
        assert_eq!(report.products_changed, 3);

        let text = std::fs::read_to_string(&good).unwrap();
        assert!(text.contains("name: \"LOGITECH G502\""));
        assert!(text.ends_with("## 📦 Summary\n\nOutro stays put.\n"));
        assert_eq!(
            std::fs::read_to_string(&broken).unwrap(),
            "---\ntitle: x\n---\nno component here\n"
        );
    }

    #[tokio::test]
    async fn test_dry_run_leaves_files_alone() {
        let dir = tempdir().unwrap();
        let path = fixtures::write(dir.path(), "mice.mdx", fixtures::MICE);
        let options = PassOptions {
            dry_run: true,
            ..PassOptions::default()
        };
        let report = run_pass(&Upcase, &[path.clone()], &options).await;
        assert_eq!(report.files_changed, 0);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), fixtures::MICE);
    }
}

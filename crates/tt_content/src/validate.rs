//! Read-only reports over the content directory.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::{info, warn};
use tt_core::{ImageSource, Result, TierList};

use crate::frontmatter;
use crate::store::{self, ContentDir};
use crate::tierlist;

const UNKNOWN_SOURCE: &str = "unknown";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingImage {
    pub name: String,
    pub tier: String,
}

/// Image coverage of one tier list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImageCoverage {
    pub total: usize,
    pub with_images: usize,
    pub missing: Vec<MissingImage>,
    /// Source tag of every product that has an image.
    pub sources: BTreeMap<String, usize>,
}

impl ImageCoverage {
    pub fn analyze(tiers: &TierList) -> Self {
        let mut coverage = Self::default();
        for (tier, product) in tiers.products() {
            coverage.total += 1;
            if product.has_image() {
                coverage.with_images += 1;
                let source = product
                    .image_source
                    .map(|s| s.as_str().to_string())
                    .unwrap_or_else(|| UNKNOWN_SOURCE.to_string());
                *coverage.sources.entry(source).or_default() += 1;
            } else {
                coverage.missing.push(MissingImage {
                    name: product.name.clone(),
                    tier: tier.key.clone(),
                });
            }
        }
        coverage
    }

    pub fn without_images(&self) -> usize {
        self.missing.len()
    }

    pub fn percent(&self) -> f64 {
        percent(self.with_images, self.total)
    }

    fn merge(&mut self, other: &ImageCoverage) {
        self.total += other.total;
        self.with_images += other.with_images;
        self.missing.extend(other.missing.iter().cloned());
        for (source, count) in &other.sources {
            *self.sources.entry(source.clone()).or_default() += count;
        }
    }
}

fn percent(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 * 100.0 / whole as f64
    }
}

#[derive(Debug, Clone)]
pub struct FileCoverage {
    pub file: PathBuf,
    pub coverage: ImageCoverage,
}

#[derive(Debug, Clone, Default)]
pub struct CoverageReport {
    pub files: Vec<FileCoverage>,
    /// Files that could not be read or parsed, with the reason.
    pub problems: Vec<(PathBuf, String)>,
    pub overall: ImageCoverage,
}

impl CoverageReport {
    pub fn has_issues(&self) -> bool {
        self.overall.without_images() > 0 || !self.problems.is_empty()
    }

    /// Products whose tag says the lookup came back empty or failed, or that carry no tag.
    pub fn low_quality_count(&self) -> usize {
        [ImageSource::None.as_str(), ImageSource::Error.as_str(), UNKNOWN_SOURCE]
            .iter()
            .filter_map(|s| self.overall.sources.get(*s))
            .sum()
    }

    pub fn log_summary(&self) {
        for entry in &self.files {
            let c = &entry.coverage;
            let status = if c.missing.is_empty() { "✅" } else { "⚠️" };
            info!("{} {}", status, store::file_name(&entry.file));
            info!(
                "   Products: {} | With images: {} ({:.1}%) | Missing: {}",
                c.total,
                c.with_images,
                c.percent(),
                c.without_images()
            );
            for missing in &c.missing {
                info!("     • {} (Tier {})", missing.name, missing.tier);
            }
        }
        for (file, reason) in &self.problems {
            warn!("❌ Could not process {}: {}", store::file_name(file), reason);
        }

        info!("📊 Image coverage summary");
        info!("Files processed: {}", self.files.len() + self.problems.len());
        info!("Total products: {}", self.overall.total);
        info!("Products with images: {}", self.overall.with_images);
        info!("Products without images: {}", self.overall.without_images());
        info!("Image coverage: {:.1}%", self.overall.percent());

        if !self.overall.sources.is_empty() {
            info!("📈 Image source breakdown:");
            for (source, count) in &self.overall.sources {
                let label = source
                    .parse::<ImageSource>()
                    .map(|s| s.display_name())
                    .unwrap_or("Unknown source");
                info!("   {}: {} ({:.1}%)", label, count, percent(*count, self.overall.with_images));
            }
        }

        if self.overall.without_images() > 0 {
            warn!("• {} products are missing images, run `tt images` to resolve them", self.overall.without_images());
        }
        let low_quality = self.low_quality_count();
        if low_quality > 0 {
            warn!("• {} products have low-quality or untagged image sources", low_quality);
        }
        if self.has_issues() {
            warn!("❌ Validation found issues");
        } else {
            info!("✅ All tier lists have complete image coverage");
        }
    }
}

/// Builds the coverage report for `files`. Unreadable files are recorded, not fatal.
pub async fn image_coverage(files: &[PathBuf]) -> CoverageReport {
    let mut report = CoverageReport::default();
    for file in files {
        let text = match store::read_text(file).await {
            Ok(text) => text,
            Err(e) => {
                report.problems.push((file.clone(), e.to_string()));
                continue;
            }
        };
        match tierlist::parse(&text) {
            Ok(component) => {
                let coverage = ImageCoverage::analyze(&component.tiers);
                report.overall.merge(&coverage);
                report.files.push(FileCoverage {
                    file: file.clone(),
                    coverage,
                });
            }
            Err(e) => report.problems.push((file.clone(), e.to_string())),
        }
    }
    report
}

/// How one content file maps onto a site route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteInfo {
    pub file: String,
    pub file_slug: String,
    pub title: Option<String>,
    pub frontmatter_slug: Option<String>,
}

impl RouteInfo {
    pub fn route(&self) -> String {
        format!("/{}", self.file_slug)
    }

    pub fn is_demo(&self) -> bool {
        self.file_slug.contains("demo")
    }

    /// True when a frontmatter slug is set and disagrees with the file name.
    pub fn slug_mismatch(&self) -> bool {
        self.frontmatter_slug
            .as_deref()
            .map_or(false, |slug| slug != self.file_slug)
    }
}

pub fn route_info(path: &Path, text: &str) -> RouteInfo {
    let fm = frontmatter::parse(text);
    let file_slug = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    RouteInfo {
        file: store::file_name(path),
        file_slug,
        title: fm.as_ref().map(|f| f.title.clone()).filter(|t| !t.is_empty()),
        frontmatter_slug: fm.and_then(|f| f.slug),
    }
}

#[derive(Debug, Clone, Default)]
pub struct RouteReport {
    pub routes: Vec<RouteInfo>,
    pub stray_files: Vec<PathBuf>,
}

impl RouteReport {
    /// Routes that would appear in listings; demo pages are left out.
    pub fn listed(&self) -> impl Iterator<Item = &RouteInfo> {
        self.routes.iter().filter(|r| !r.is_demo())
    }

    pub fn log_summary(&self) {
        info!("📁 Found {} tier list files", self.routes.len());
        for route in &self.routes {
            info!("   ✅ {}", route.file);
            info!("      Title: {}", route.title.as_deref().unwrap_or("No title"));
            info!("      File slug: {}", route.file_slug);
            info!(
                "      Frontmatter slug: {}",
                route.frontmatter_slug.as_deref().unwrap_or("No slug in frontmatter")
            );
            info!("      Route: {}", route.route());
            if route.slug_mismatch() {
                warn!("      ⚠️ Frontmatter slug differs from the file name");
            }
        }
        info!("🏠 Listed routes (demo pages excluded):");
        for route in self.listed() {
            info!("      {}", route.route());
        }
        for stray in &self.stray_files {
            warn!("⚠️ Stray file in content directory: {}", store::file_name(stray));
        }
    }
}

pub async fn routes(content: &ContentDir) -> Result<RouteReport> {
    let mut report = RouteReport::default();
    for path in content.list().await? {
        let text = store::read_text(&path).await?;
        report.routes.push(route_info(&path, &text));
    }
    report.stray_files = content.stray_files().await?;
    Ok(report)
}

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use tracing::{error, info, warn};
use tt_content::ads::{build_ads_config, write_ads_config, DEFAULT_ADS_PATH};
use tt_content::ContentDir;
use tt_core::{Config, Error, HttpClient, InferenceModel, Result};
use tt_inference::reviews::BatchOptions;
use tt_inference::tierlist::{generate, into_article};

use crate::categories::{current_year, select_category};
use crate::enhancers::{run_pass, Enhancer, ImageEnhancer, LinkEnhancer, PassOptions, PassReport, ReviewEnhancer};
use crate::images::ImageResolver;
use crate::research::{find_products, research_products, MAX_PRODUCTS};
use crate::search::SerpApiClient;

/// What one orchestrator run produced.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub article: PathBuf,
    pub passes: Vec<(String, PassReport)>,
    pub ads_written: bool,
}

/// Drives the whole pipeline: research, generation, then the enhancement passes.
#[derive(Debug, Clone)]
pub struct PipelineManager {
    config: Config,
    content: ContentDir,
    http: Arc<dyn HttpClient>,
    search: SerpApiClient,
    model: Arc<dyn InferenceModel>,
    ads_path: PathBuf,
}

impl PipelineManager {
    /// Fails with [`Error::Config`] when no search API key is configured.
    pub fn new(config: &Config, http: Arc<dyn HttpClient>, model: Arc<dyn InferenceModel>) -> Result<Self> {
        let search = SerpApiClient::new(http.clone(), config.require_serpapi_key()?);
        Ok(Self {
            content: ContentDir::new(&config.content_dir),
            config: config.clone(),
            http,
            search,
            model,
            ads_path: PathBuf::from(DEFAULT_ADS_PATH),
        })
    }

    pub fn with_ads_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.ads_path = path.into();
        self
    }

    pub fn content(&self) -> &ContentDir {
        &self.content
    }

    pub fn resolver(&self) -> ImageResolver {
        ImageResolver::new(self.http.clone(), Some(self.search.clone()))
    }

    pub fn pass_options(&self) -> PassOptions {
        PassOptions {
            delay: self.config.request_delay,
            file_delay: self.config.file_delay,
            ..PassOptions::default()
        }
    }

    /// Researches a category and writes one new article. Returns its path.
    pub async fn generate_article(&self, category: Option<&str>) -> Result<PathBuf> {
        let category = select_category(category);
        info!("🎯 Selected category: {}", category);

        let names = find_products(&self.search, &category, MAX_PRODUCTS).await?;
        if names.is_empty() {
            return Err(Error::Scraping(format!("No products found for \"{}\"", category)));
        }

        let researched = research_products(&self.search, &names, current_year(), self.config.request_delay).await;
        if researched.is_empty() {
            return Err(Error::Scraping(format!("No products could be researched for \"{}\"", category)));
        }

        let content = generate(
            self.model.as_ref(),
            &category,
            &researched,
            Some(self.config.article_model.as_str()),
        )
        .await?;
        let article = into_article(
            content,
            &researched,
            &category,
            &self.config.affiliate(),
            Utc::now().date_naive(),
        );
        self.content.write_article(&article).await
    }

    /// Writes the ads config. Callers treat failure as non-fatal.
    pub async fn generate_ads(&self) -> Result<&Path> {
        let ads = build_ads_config(&self.config.credentials, Utc::now());
        write_ads_config(&ads, &self.ads_path).await?;
        Ok(self.ads_path.as_path())
    }

    /// Image pass, review pass, ads config, then link pass over every article.
    pub async fn enhance_all(&self) -> Result<(Vec<(String, PassReport)>, bool)> {
        let files = self.content.list().await?;
        let options = self.pass_options();

        let images = ImageEnhancer::new(self.resolver(), self.config.affiliate());
        let reviews = ReviewEnhancer::new(
            self.model.clone(),
            BatchOptions {
                model_name: Some(self.config.review_model.clone()),
                ..BatchOptions::default()
            },
        );
        let links = LinkEnhancer::new(self.config.affiliate());

        let mut passes = Vec::new();
        for enhancer in [&images as &dyn Enhancer, &reviews] {
            info!("✨ Running {} pass...", enhancer.name());
            passes.push((enhancer.name().to_string(), run_pass(enhancer, &files, &options).await));
        }

        let ads_written = match self.generate_ads().await {
            Ok(path) => {
                info!("📢 Ads config written to {}", path.display());
                true
            }
            Err(e) => {
                warn!("⚠️ Ads config generation failed: {}", e);
                false
            }
        };

        info!("✨ Running {} pass...", links.name());
        passes.push((links.name().to_string(), run_pass(&links, &files, &options).await));
        Ok((passes, ads_written))
    }

    /// One full cycle. Only generating the article is fatal.
    pub async fn run(&self, category: Option<&str>) -> Result<RunReport> {
        info!("🚀 Starting content pipeline...");
        let article = self.generate_article(category).await.map_err(|e| {
            error!("❌ Article generation failed: {}", e);
            e
        })?;
        let (passes, ads_written) = self.enhance_all().await?;
        info!("🎉 Pipeline finished: {}", article.display());
        Ok(RunReport {
            article,
            passes,
            ads_written,
        })
    }
}

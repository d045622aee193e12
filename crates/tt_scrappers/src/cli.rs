use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Args, Subcommand};
use tt_content::ContentDir;
use tt_core::{Config, HttpClient, InferenceModel, Result};
use tt_inference::models::create_model;
use tt_inference::reviews::BatchOptions;

use crate::enhancers::{run_pass, ImageEnhancer, LinkEnhancer, PassOptions, PassReport, ReviewEnhancer};
use crate::images::ImageResolver;
use crate::search::SerpApiClient;

#[derive(Args, Debug, Clone)]
pub struct PassArgs {
    /// One content file. Every .mdx file in the content directory when omitted.
    pub file: Option<PathBuf>,
    /// Report what would change without calling out or writing
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum EnhanceCommands {
    /// Resolve missing product images
    Images {
        #[command(flatten)]
        pass: PassArgs,
        /// Re-resolve products that already have an image
        #[arg(long)]
        overwrite: bool,
        /// Milliseconds between lookups
        #[arg(long, value_name = "MS")]
        delay: Option<u64>,
    },
    /// Rewrite missing, placeholder or thin reviews
    Reviews {
        #[command(flatten)]
        pass: PassArgs,
        /// Milliseconds between batches
        #[arg(long, value_name = "MS")]
        delay: Option<u64>,
        #[arg(long, default_value_t = 3)]
        batch_size: usize,
    },
    /// Point every product link at a tracked marketplace URL
    Links {
        #[command(flatten)]
        pass: PassArgs,
    },
}

impl EnhanceCommands {
    fn pass(&self) -> &PassArgs {
        match self {
            EnhanceCommands::Images { pass, .. }
            | EnhanceCommands::Reviews { pass, .. }
            | EnhanceCommands::Links { pass } => pass,
        }
    }
}

fn pass_options(config: &Config, pass: &PassArgs, delay: Option<u64>) -> PassOptions {
    PassOptions {
        dry_run: pass.dry_run,
        delay: delay.map(Duration::from_millis).unwrap_or(config.request_delay),
        file_delay: config.file_delay,
        ..PassOptions::default()
    }
}

fn review_model(config: &Config, model: &str, dry_run: bool) -> Result<Arc<dyn InferenceModel>> {
    // A dry run never calls the model, so it does not need credentials.
    let name = if dry_run { "dummy" } else { model };
    create_model(name, Some(tt_inference::Config::from_core(config)))
}

/// Runs one enhancement pass. A missing explicit file is an error; everything else is reported.
pub async fn handle_command(
    command: EnhanceCommands,
    config: &Config,
    http: Arc<dyn HttpClient>,
    model: &str,
) -> Result<PassReport> {
    let content = ContentDir::new(&config.content_dir);
    let files = content.resolve_targets(command.pass().file.as_deref()).await?;

    let report = match &command {
        EnhanceCommands::Images {
            pass,
            overwrite,
            delay,
        } => {
            let search = config
                .serpapi_key
                .as_deref()
                .map(|key| SerpApiClient::new(http.clone(), key));
            let enhancer = ImageEnhancer::new(ImageResolver::new(http, search), config.affiliate());
            let options = PassOptions {
                overwrite: *overwrite,
                ..pass_options(config, pass, *delay)
            };
            run_pass(&enhancer, &files, &options).await
        }
        EnhanceCommands::Reviews {
            pass,
            delay,
            batch_size,
        } => {
            let batch = BatchOptions {
                batch_size: *batch_size,
                model_name: Some(config.review_model.clone()),
                ..BatchOptions::default()
            };
            let enhancer = ReviewEnhancer::new(review_model(config, model, pass.dry_run)?, batch);
            run_pass(&enhancer, &files, &pass_options(config, pass, *delay)).await
        }
        EnhanceCommands::Links { pass } => {
            let enhancer = LinkEnhancer::new(config.affiliate());
            run_pass(&enhancer, &files, &pass_options(config, pass, None)).await
        }
    };
    Ok(report)
}

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing::{error, info, warn};
use tt_content::ads::{build_ads_config, write_ads_config, DEFAULT_ADS_PATH};
use tt_content::validate::{image_coverage, routes};
use tt_content::ContentDir;
use tt_core::{Config, Error, HttpClient, ReqwestClient, Result};
use tt_inference::models::create_model;
use tt_scrappers::cli::{handle_command, EnhanceCommands};
use tt_scrappers::logging::init_logging;
use tt_scrappers::search::SerpApiClient;
use tt_scrappers::{ImageQuery, ImageResolver, PipelineManager};

mod git;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct HumanDuration(Duration);

impl FromStr for HumanDuration {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let mut total_seconds = 0u64;
        let mut current_number = String::new();
        let mut has_unit = false;

        for c in s.chars() {
            if c.is_ascii_digit() {
                current_number.push(c);
            } else if let Ok(num) = current_number.parse::<u64>() {
                match c {
                    's' => total_seconds += num,
                    'm' => total_seconds += num * 60,
                    'h' => total_seconds += num * 3600,
                    'd' => total_seconds += num * 86400,
                    _ => return Err(format!("Invalid duration unit: {}", c)),
                }
                current_number.clear();
                has_unit = true;
            } else if !c.is_whitespace() {
                return Err(format!("Invalid character in duration: {}", c));
            }
        }

        // A trailing bare number counts as minutes
        if !current_number.is_empty() {
            let num = current_number
                .parse::<u64>()
                .map_err(|_| "Invalid number in duration".to_string())?;
            total_seconds += num * 60;
            has_unit = true;
        }

        if !has_unit || total_seconds == 0 {
            return Err("Duration must be a positive amount such as 90m or 1h30m".to_string());
        }
        Ok(HumanDuration(Duration::from_secs(total_seconds)))
    }
}

#[derive(Parser, Debug)]
#[command(name = "tt", author, version, about = "TrendTiers content pipeline", long_about = None)]
struct Cli {
    /// Directory holding the tier list articles
    #[arg(long, global = true, value_name = "DIR")]
    content_dir: Option<PathBuf>,
    /// JSON file whose keys fill unset environment variables [default: credentials.json]
    #[arg(long, global = true, value_name = "FILE")]
    credentials: Option<PathBuf>,
    #[arg(long, global = true, default_value = "openai", help = "Model used for generation and reviews. Available models: openai (default), dummy")]
    model: String,
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Research a category and write one new tier list
    Generate {
        /// Search category such as "best webcams 2025". Random when omitted.
        #[arg(long)]
        category: Option<String>,
    },
    #[command(flatten)]
    Enhance(EnhanceCommands),
    /// Report image coverage per article
    Validate {
        file: Option<PathBuf>,
        /// Exit with an error when images are missing or files are unreadable
        #[arg(long)]
        strict: bool,
    },
    /// List article routes, slug mismatches and stray files
    Routes,
    /// Resolve one image by product name or catalog ID
    Resolve {
        #[arg(value_name = "NAME|CATALOG_ID")]
        query: String,
    },
    /// Write the ads config
    Ads {
        #[arg(long, value_name = "FILE")]
        out: Option<PathBuf>,
    },
    /// Generate an article, then run every pass over the content directory
    Run {
        #[arg(long)]
        category: Option<String>,
    },
    /// Repeat `run` forever
    Forever {
        /// Pause between cycles (e.g. 90m, 1h30m). Defaults to CYCLE_MINUTES.
        #[arg(long)]
        interval: Option<HumanDuration>,
    },
}

fn pipeline(config: &Config, http: Arc<dyn HttpClient>, model: &str) -> Result<PipelineManager> {
    config.require_serpapi_key()?;
    let model = create_model(model, Some(tt_inference::Config::from_core(config)))?;
    PipelineManager::new(config, http, model)
}

async fn autocommit(config: &Config, paths: &[PathBuf], message: &str) {
    if !config.git_autocommit {
        return;
    }
    if let Err(e) = git::commit_paths(Path::new("."), paths, message, config.git_push).await {
        warn!("⚠️ Git auto-commit failed: {}", e);
    }
}

fn commit_message(article: &Path) -> String {
    let name = article.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default();
    format!("Add tier list: {}", name)
}

async fn run(cli: Cli) -> Result<()> {
    let mut config = Config::from_env(cli.credentials.as_deref())?;
    if let Some(dir) = cli.content_dir {
        config.content_dir = dir;
    }
    let http: Arc<dyn HttpClient> = Arc::new(ReqwestClient::new()?);
    let content = ContentDir::new(&config.content_dir);

    match cli.command {
        Commands::Generate { category } => {
            let manager = pipeline(&config, http, &cli.model)?;
            let article = manager.generate_article(category.as_deref()).await?;
            autocommit(&config, &[article.clone()], &commit_message(&article)).await;
        }
        Commands::Enhance(command) => {
            handle_command(command, &config, http, &cli.model).await?;
        }
        Commands::Validate { file, strict } => {
            let files = content.resolve_targets(file.as_deref()).await?;
            let report = image_coverage(&files).await;
            report.log_summary();
            if strict && report.has_issues() {
                return Err(Error::External(anyhow::anyhow!(
                    "{} products without images, {} unreadable files",
                    report.overall.without_images(),
                    report.problems.len()
                )));
            }
        }
        Commands::Routes => {
            routes(&content).await?.log_summary();
        }
        Commands::Resolve { query } => {
            let search = config
                .serpapi_key
                .as_deref()
                .map(|key| SerpApiClient::new(http.clone(), key));
            let query = ImageQuery::parse(&query);
            info!("🔍 Resolving image for {}", query);
            let result = ImageResolver::new(http, search).resolve(&query).await;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        Commands::Ads { out } => {
            let path = out.unwrap_or_else(|| PathBuf::from(DEFAULT_ADS_PATH));
            write_ads_config(&build_ads_config(&config.credentials, chrono::Utc::now()), &path).await?;
        }
        Commands::Run { category } => {
            let manager = pipeline(&config, http, &cli.model)?;
            let report = manager.run(category.as_deref()).await?;
            autocommit(
                &config,
                &[config.content_dir.clone(), PathBuf::from(DEFAULT_ADS_PATH)],
                &commit_message(&report.article),
            )
            .await;
        }
        Commands::Forever { interval } => {
            let interval = interval.map(|i| i.0).unwrap_or(config.cycle_interval);
            let manager = pipeline(&config, http, &cli.model)?;
            info!("♾️ Running forever, one cycle every {} minutes", interval.as_secs() / 60);
            loop {
                match manager.run(None).await {
                    Ok(report) => {
                        autocommit(
                            &config,
                            &[config.content_dir.clone(), PathBuf::from(DEFAULT_ADS_PATH)],
                            &commit_message(&report.article),
                        )
                        .await
                    }
                    Err(e) => error!("❌ Cycle failed: {}", e),
                }
                info!("⏳ Next cycle in {} minutes", interval.as_secs() / 60);
                tokio::time::sleep(interval).await;
            }
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    init_logging();
    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        error!("❌ {}", e);
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_human_duration() {
        assert_eq!("1h30m".parse::<HumanDuration>().unwrap().0, Duration::from_secs(5400));
        assert_eq!("45".parse::<HumanDuration>().unwrap().0, Duration::from_secs(2700));
        assert_eq!("1d 2s".parse::<HumanDuration>().unwrap().0, Duration::from_secs(86402));
        assert!("1w".parse::<HumanDuration>().is_err());
        assert!("".parse::<HumanDuration>().is_err());
        assert!("0m".parse::<HumanDuration>().is_err());
    }

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_subcommands() {
        let cli = Cli::parse_from(["tt", "--model", "dummy", "images", "a.mdx", "--overwrite", "--delay", "0"]);
        assert_eq!(cli.model, "dummy");
        match cli.command {
            Commands::Enhance(EnhanceCommands::Images {
                pass, overwrite, delay, ..
            }) => {
                assert_eq!(pass.file, Some(PathBuf::from("a.mdx")));
                assert!(overwrite);
                assert_eq!(delay, Some(0));
            }
            other => panic!("unexpected command: {:?}", other),
        }

        let cli = Cli::parse_from(["tt", "forever", "--interval", "2h"]);
        assert!(matches!(
            cli.command,
            Commands::Forever { interval: Some(HumanDuration(d)) } if d == Duration::from_secs(7200)
        ));

        let cli = Cli::parse_from(["tt", "validate", "--strict", "--content-dir", "out"]);
        assert_eq!(cli.content_dir, Some(PathBuf::from("out")));
        assert!(matches!(cli.command, Commands::Validate { file: None, strict: true }));
    }

    #[test]
    fn test_commit_message() {
        assert_eq!(
            commit_message(Path::new("src/content/tierlists/best-webcams-2025.mdx")),
            "Add tier list: best-webcams-2025"
        );
    }
}

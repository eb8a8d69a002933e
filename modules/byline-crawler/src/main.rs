use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::sync::watch;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use byline_common::{load_config, Config, FileConfig};
use byline_crawler::infra::{BrowserlessPageSource, HttpPageSource};
use byline_crawler::store::JsonFileStateStore;
use byline_crawler::traits::{PageSource, StateStore};
use byline_crawler::{Crawler, RunPhase, RunProgress, ScrapeResult};

#[derive(Parser)]
#[command(name = "byline", about = "Incremental author discovery crawler")]
#[command(version)]
struct Cli {
    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    /// State file (overrides BYLINE_STATE_PATH)
    #[arg(long, global = true)]
    state: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Crawl, merge into saved state, and print the result
    Run {
        /// TOML config file (overrides BYLINE_CONFIG)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Extra keyword source, repeatable
        #[arg(long = "keyword")]
        keywords: Vec<String>,

        /// Extra tag source, repeatable
        #[arg(long = "tag")]
        tags: Vec<String>,

        /// Skip the sitemap source even if configured
        #[arg(long)]
        no_sitemap: bool,

        /// Write the result JSON here instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,

        /// Extra render time per page, Browserless only
        #[arg(long)]
        render_wait_ms: Option<u64>,
    },

    /// Print the saved crawl state
    Export,

    /// Delete the saved crawl state
    Reset,

    /// Let the next run enrich this handle again
    ForgetProfile { handle: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_logging(cli.json_logs)?;

    let env = Config::from_env();
    let state_path = cli.state.clone().unwrap_or_else(|| env.state_path.clone());
    let store = JsonFileStateStore::new(&state_path);

    match cli.command {
        Commands::Run {
            config,
            keywords,
            tags,
            no_sitemap,
            output,
            render_wait_ms,
        } => {
            env.log_redacted();
            let config_path = config.unwrap_or_else(|| env.config_path.clone());
            let file_config = if config_path.exists() {
                load_config(&config_path)?
            } else {
                warn!(path = %config_path.display(), "Config file not found, using defaults");
                FileConfig::default()
            };

            let mut crawl_config = file_config.into_crawl_config();
            crawl_config.keywords.extend(keywords);
            crawl_config.tags.extend(tags);
            if no_sitemap {
                crawl_config.sitemap = None;
            }
            crawl_config.validate()?;

            let source = page_source(&env, crawl_config.fetch.timeout, render_wait_ms)?;
            let (progress_tx, progress_rx) = watch::channel(RunProgress::default());
            let watcher = tokio::spawn(log_phases(progress_rx));

            let mut crawler = Crawler::new(crawl_config, source);
            let outcome = crawler.run_with_store(&store, &progress_tx).await;
            drop(progress_tx);
            watcher.await.ok();
            let outcome = outcome?;

            write_result(&outcome.result, output.as_deref()).await?;
            eprintln!("{}", outcome.result.stats);
        }
        Commands::Export => {
            let snapshot = store.load().await?.unwrap_or_default();
            println!("{}", serde_json::to_string_pretty(&snapshot)?);
        }
        Commands::Reset => {
            store.clear().await?;
            info!(path = %state_path.display(), "State cleared");
        }
        Commands::ForgetProfile { handle } => {
            let Some(mut snapshot) = store.load().await? else {
                warn!(path = %state_path.display(), "No saved state");
                return Ok(());
            };
            if snapshot.processed_profiles.remove(&handle) {
                store.save(&snapshot).await?;
                info!(handle = handle.as_str(), "Profile will be enriched on the next run");
            } else {
                warn!(handle = handle.as_str(), "Profile was not marked processed");
            }
        }
    }

    Ok(())
}

/// Pretty JSON to `path`, or stdout when no path is given.
async fn write_result(result: &ScrapeResult, path: Option<&Path>) -> Result<()> {
    let json = serde_json::to_string_pretty(result)?;
    match path {
        Some(path) => {
            tokio::fs::write(path, json)
                .await
                .with_context(|| format!("Failed to write output: {}", path.display()))?;
            info!(path = %path.display(), "Result written");
        }
        None => println!("{json}"),
    }
    Ok(())
}

fn init_logging(json: bool) -> Result<()> {
    let filter = EnvFilter::from_default_env().add_directive("byline=info".parse()?);
    if json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
    Ok(())
}

/// Browserless when configured, plain HTTP otherwise.
fn page_source(
    env: &Config,
    timeout: std::time::Duration,
    render_wait_ms: Option<u64>,
) -> Result<Arc<dyn PageSource>> {
    match env.browserless_url.as_deref() {
        Some(url) => {
            let mut source =
                BrowserlessPageSource::new(url, env.browserless_token.as_deref(), timeout)?;
            if let Some(ms) = render_wait_ms {
                source = source.with_render_wait(ms);
            }
            Ok(Arc::new(source))
        }
        None => {
            if render_wait_ms.is_some() {
                warn!("--render-wait-ms has no effect without BROWSERLESS_URL");
            }
            Ok(Arc::new(HttpPageSource::new(timeout)?))
        }
    }
}

async fn log_phases(mut rx: watch::Receiver<RunProgress>) {
    let mut last = RunPhase::Starting;
    while rx.changed().await.is_ok() {
        let progress = rx.borrow_and_update().clone();
        if progress.phase != last {
            info!(
                phase = ?progress.phase,
                refs = progress.refs_collected,
                urls = progress.urls_processed,
                "Phase changed"
            );
            last = progress.phase;
        }
    }
}

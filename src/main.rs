use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::json;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;
use url::Url;

use pricedrop_watcher::config::{AppConfig, LoggingConfig};
use pricedrop_watcher::extract::{MetadataExtractor, PriceExtractor, SelectorCatalog};
use pricedrop_watcher::models::ProductList;
use pricedrop_watcher::page::{ChromeDriver, StaticDocument};
use pricedrop_watcher::plugins::{JsonlHistoryStore, MemoryHistoryStore, PluginManager, PriceHistoryStore};
use pricedrop_watcher::product_manager::ProductManager;
use pricedrop_watcher::scraper::ProductScraper;

#[derive(Parser)]
#[command(
    name = "pricedrop-watcher",
    about = "Extract product prices from web pages and watch for price drops",
    version
)]
struct Cli {
    /// Log at debug level regardless of configuration.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract price and metadata from a saved HTML file.
    Extract {
        /// HTML file to read.
        #[arg(short, long)]
        file: PathBuf,

        /// URL the page was saved from.
        #[arg(short, long)]
        url: String,
    },

    /// Load a live page in headless Chrome and extract its price.
    Scrape {
        url: String,
    },

    /// Run one check cycle over a products file.
    Check {
        /// TOML file with one [[products]] table per product.
        #[arg(short, long, default_value = "products.toml")]
        products: PathBuf,

        /// Append price records to this JSONL file.
        #[arg(long)]
        history: Option<PathBuf>,

        /// Leave the products file untouched after the cycle.
        #[arg(long)]
        no_save: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let mut config = AppConfig::from_env().context("Failed to load configuration")?;
    if cli.verbose {
        config.logging.level = "debug".to_string();
    }
    let _log_guard = init_tracing(&config.logging)?;

    info!("Starting pricedrop-watcher...");
    let catalog = Arc::new(SelectorCatalog::standard());

    match cli.command {
        Commands::Extract { file, url } => extract_file(&config, catalog, &file, &url).await,
        Commands::Scrape { url } => scrape_url(&config, catalog, &url).await,
        Commands::Check {
            products,
            history,
            no_save,
        } => match history {
            Some(path) => check_products(&config, catalog, &products, JsonlHistoryStore::new(path), !no_save).await,
            None => check_products(&config, catalog, &products, MemoryHistoryStore::new(), !no_save).await,
        },
    }
}

/// Console logging, plus a daily-rotated file when `logging.directory` is set.
fn init_tracing(config: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(format!("pricedrop_watcher={}", config.level))?,
    };

    let (file_layer, guard) = match &config.directory {
        Some(directory) => {
            let appender = tracing_appender::rolling::daily(directory, "pricedrop-watcher.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer().with_writer(writer).with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .init();

    Ok(guard)
}

async fn extract_file(config: &AppConfig, catalog: Arc<SelectorCatalog>, file: &Path, url: &str) -> Result<()> {
    let url = Url::parse(url).with_context(|| format!("Invalid URL: {}", url))?;
    let html = tokio::fs::read_to_string(file)
        .await
        .with_context(|| format!("Failed to read {}", file.display()))?;

    let page = StaticDocument::new(url.as_str(), html);
    let extraction = PriceExtractor::new(catalog, &config.extraction)
        .extract(&page, &url)
        .await?;
    let metadata = MetadataExtractor::new().extract(&page, &url).await;

    println!(
        "{}",
        serde_json::to_string_pretty(&json!({ "extraction": extraction, "metadata": metadata }))?
    );
    Ok(())
}

async fn scrape_url(config: &AppConfig, catalog: Arc<SelectorCatalog>, url: &str) -> Result<()> {
    let url = Url::parse(url).with_context(|| format!("Invalid URL: {}", url))?;
    let driver = ChromeDriver::launch(&config.scraper)?;
    let scraper = ProductScraper::new(driver, catalog, config);

    let outcome = scraper.scrape(&url).await?;
    println!("{}", serde_json::to_string_pretty(&outcome)?);
    Ok(())
}

async fn check_products<H: PriceHistoryStore>(
    config: &AppConfig,
    catalog: Arc<SelectorCatalog>,
    products_path: &Path,
    history: H,
    save: bool,
) -> Result<()> {
    let raw = tokio::fs::read_to_string(products_path)
        .await
        .with_context(|| format!("Failed to read {}", products_path.display()))?;
    let mut list = ProductList::from_toml(&raw)?;

    let driver = ChromeDriver::launch(&config.scraper)?;
    let scraper = ProductScraper::new(driver, catalog, config);

    let plugin_manager = PluginManager::new();
    plugin_manager.initialize_default_plugins().await;

    let manager = ProductManager::new(scraper, history, plugin_manager, config.monitor.clone());
    let (results, summary) = manager.run_cycle(&mut list.products).await;

    if save {
        tokio::fs::write(products_path, list.to_toml()?)
            .await
            .with_context(|| format!("Failed to write {}", products_path.display()))?;
    }

    println!(
        "{}",
        serde_json::to_string_pretty(&json!({ "summary": summary, "results": results }))?
    );
    Ok(())
}

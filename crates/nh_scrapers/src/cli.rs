use clap::{Args, Subcommand};
use nh_core::{ArticleStorage, Result, Settings};
use std::sync::Arc;
use tracing::info;

use crate::fetcher::HttpFetcher;
use crate::manager::{CrawlReport, ScraperManager};
use crate::scrapers::build_scrapers;

#[derive(Args, Debug, Clone)]
pub struct ScraperArgs {
    #[command(subcommand)]
    pub command: ScraperCommands,
}

#[derive(Subcommand, Debug, Clone)]
pub enum ScraperCommands {
    /// Crawl one source, or all of them, and store new articles
    Scrape(ScrapeOptions),
    /// List configured sources
    List,
}

#[derive(Args, Debug, Clone, PartialEq)]
pub struct ScrapeOptions {
    /// Source name (habr, newsvl, ixbt, naked-science, interfax) or "all"
    #[arg(long, default_value = "all")]
    pub site: String,
    /// Listing pages per source
    #[arg(long)]
    pub pages: Option<usize>,
    /// Maximum articles taken from each listing page
    #[arg(long)]
    pub articles_per_page: Option<usize>,
    /// Database file for the sqlite backend
    #[arg(long)]
    pub db: Option<String>,
    /// Storage backend: sqlite or memory
    #[arg(long, default_value = "sqlite")]
    pub storage: String,
    /// Fetch and extract without storing anything
    #[arg(long)]
    pub dry_run: bool,
    /// Requests per second per source
    #[arg(long)]
    pub rps: Option<f64>,
}

impl ScrapeOptions {
    /// Applies command-line overrides on top of loaded settings.
    pub fn apply(&self, settings: &mut Settings) {
        if let Some(pages) = self.pages {
            settings.crawl.max_pages = pages;
        }
        if let Some(articles) = self.articles_per_page {
            settings.crawl.max_articles_per_page = articles;
        }
        if let Some(rps) = self.rps {
            settings.crawl.requests_per_second = rps;
        }
    }

    /// The requested source, or `None` for all of them.
    pub fn selected_site(&self) -> Option<&str> {
        match self.site.as_str() {
            "" | "all" => None,
            name => Some(name),
        }
    }
}

pub async fn handle_command(args: ScraperArgs, settings: Settings) -> Result<()> {
    match args.command {
        ScraperCommands::Scrape(options) => {
            let reports = scrape(&options, settings).await?;
            for report in &reports {
                println!("{}", report);
            }
            let total: usize = reports.iter().map(CrawlReport::result_count).sum();
            let verb = if options.dry_run { "extracted" } else { "stored" };
            println!("Total articles {}: {}", verb, total);
        }
        ScraperCommands::List => {
            println!("Available sources:");
            for line in source_lines(&settings) {
                println!("  {}", line);
            }
        }
    }
    Ok(())
}

/// Runs a crawl with the given options and returns one report per source.
pub async fn scrape(options: &ScrapeOptions, mut settings: Settings) -> Result<Vec<CrawlReport>> {
    options.apply(&mut settings);
    let scrapers = build_scrapers(&settings, options.selected_site())?;

    let storage: Option<Arc<dyn ArticleStorage>> = if options.dry_run {
        info!("Dry run: nothing will be stored");
        None
    } else {
        let storage = nh_storage::create_storage(&options.storage, options.db.as_deref()).await?;
        info!("Storage initialized (using {})", options.storage);
        Some(storage)
    };

    let fetcher = Arc::new(HttpFetcher::new(&settings.crawl)?);
    let manager = ScraperManager::new(fetcher, storage, settings.crawl.clone()).with_scrapers(scrapers);
    info!(
        "Scraping {}",
        options.selected_site().unwrap_or("all sources")
    );
    manager.scrape_all().await
}

fn source_lines(settings: &Settings) -> Vec<String> {
    settings
        .sources
        .iter()
        .map(|source| {
            let paging = match &source.page_pattern {
                Some(pattern) => format!("pages {}", pattern),
                None => "daily pages".to_string(),
            };
            format!("{} - {} ({})", source.name, source.base_url, paging)
        })
        .collect()
}

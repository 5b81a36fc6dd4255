pub mod cleaner;
pub mod cli;
pub mod fetcher;
pub mod logging;
pub mod manager;
pub mod rate_limit;
pub mod scrapers;

pub use cleaner::TextNormalizer;
pub use cli::{handle_command, ScrapeOptions, ScraperArgs, ScraperCommands};
pub use fetcher::HttpFetcher;
pub use manager::{CrawlReport, ScraperManager};
pub use rate_limit::RateLimiter;
pub use scrapers::{build_scraper, build_scrapers, BoxedScraper};

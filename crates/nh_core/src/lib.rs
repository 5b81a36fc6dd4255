pub mod config;
pub mod error;
pub mod fetch;
pub mod scraper;
pub mod storage;
pub mod types;

pub use config::{CleanerConfig, CrawlConfig, ExtractionConfig, Settings, SourceConfig};
pub use error::{Error, Result};
pub use fetch::{Fetcher, Headers};
pub use scraper::Scraper;
pub use storage::ArticleStorage;
pub use types::{ArticleRecord, ArticleStub, StoredArticle};

use crate::config::SourceConfig;
use crate::types::{ArticleRecord, ArticleStub};

/// Per-site extraction rules.
///
/// Implementations are pure: they never fetch anything themselves and never
/// fail a whole batch because of one malformed item.
pub trait Scraper: Send + Sync {
    /// Configuration this scraper was built from
    fn config(&self) -> &SourceConfig;

    /// Returns the name of the news source
    fn source(&self) -> &str {
        &self.config().name
    }

    /// Extracts article stubs from a listing page.
    ///
    /// Returns an empty list when the listing container is missing. Items
    /// that fail to parse, or whose URL cannot be made absolute, are skipped.
    fn parse_listing(&self, document: &str) -> Vec<ArticleStub>;

    /// Extracts the full article.
    ///
    /// Returns `None` when the body cannot be located or the cleaned
    /// description is too short.
    fn parse_article(&self, document: &str, stub: &ArticleStub) -> Option<ArticleRecord>;
}

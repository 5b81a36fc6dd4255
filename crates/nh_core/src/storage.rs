use async_trait::async_trait;
use crate::types::{ArticleRecord, StoredArticle};
use crate::Result;

#[async_trait]
pub trait ArticleStorage: Send + Sync {
    /// Returns true if an article with this URL has already been stored
    async fn exists(&self, url: &str) -> Result<bool>;

    /// Inserts the record unless its url or guid is already present.
    ///
    /// Returns the new row id, or `None` when a uniqueness constraint
    /// rejected the record. Only failures of the store itself are errors.
    async fn insert(&self, record: &ArticleRecord) -> Result<Option<i64>>;

    /// Looks up a stored article by URL
    async fn get_by_url(&self, url: &str) -> Result<Option<StoredArticle>>;

    /// Number of stored articles
    async fn count(&self) -> Result<usize>;
}

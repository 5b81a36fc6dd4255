use async_trait::async_trait;
use chrono::Utc;
use nh_core::{ArticleRecord, ArticleStorage, Result, StoredArticle};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Default)]
pub struct MemoryStore {
    articles: Vec<StoredArticle>,
    urls: HashSet<String>,
    guids: HashSet<String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn exists(&self, url: &str) -> bool {
        self.urls.contains(url)
    }

    pub fn insert(&mut self, record: &ArticleRecord) -> Option<i64> {
        if self.urls.contains(&record.url) || self.guids.contains(&record.guid) {
            return None;
        }
        let id = self.articles.len() as i64 + 1;
        self.urls.insert(record.url.clone());
        self.guids.insert(record.guid.clone());
        self.articles.push(StoredArticle {
            id,
            created_at: Utc::now().timestamp(),
            article: record.clone(),
        });
        Some(id)
    }

    pub fn get_by_url(&self, url: &str) -> Option<StoredArticle> {
        self.articles.iter().find(|a| a.article.url == url).cloned()
    }

    pub fn len(&self) -> usize {
        self.articles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.articles.is_empty()
    }
}

/// Process-local storage. Uniqueness checks and the insert itself happen
/// under a single write lock.
#[derive(Clone, Default)]
pub struct MemoryStorage {
    store: Arc<RwLock<MemoryStore>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ArticleStorage for MemoryStorage {
    async fn exists(&self, url: &str) -> Result<bool> {
        Ok(self.store.read().await.exists(url))
    }

    async fn insert(&self, record: &ArticleRecord) -> Result<Option<i64>> {
        Ok(self.store.write().await.insert(record))
    }

    async fn get_by_url(&self, url: &str) -> Result<Option<StoredArticle>> {
        Ok(self.store.read().await.get_by_url(url))
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.store.read().await.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(guid: &str, url: &str) -> ArticleRecord {
        ArticleRecord {
            guid: guid.to_string(),
            title: Some("Test Article".to_string()),
            description: "This is a test article about politics.".to_string(),
            url: url.to_string(),
            published_at: None,
            comments_count: Some(3),
            rating: Some(1.5),
        }
    }

    #[tokio::test]
    async fn test_insert_then_exists() {
        let storage = MemoryStorage::new();
        assert!(!storage.exists("http://test.com/a").await.unwrap());

        let id = storage.insert(&record("g1", "http://test.com/a")).await.unwrap();
        assert_eq!(id, Some(1));
        assert!(storage.exists("http://test.com/a").await.unwrap());
        assert!(!storage.exists("http://test.com/b").await.unwrap());

        let stored = storage.get_by_url("http://test.com/a").await.unwrap().unwrap();
        assert_eq!(stored.article.guid, "g1");
        assert!(stored.created_at > 0);
    }

    #[tokio::test]
    async fn test_duplicate_url_is_rejected() {
        let storage = MemoryStorage::new();
        assert!(storage.insert(&record("g1", "http://test.com/a")).await.unwrap().is_some());
        assert_eq!(storage.insert(&record("g2", "http://test.com/a")).await.unwrap(), None);
        assert_eq!(storage.count().await.unwrap(), 1);
        let stored = storage.get_by_url("http://test.com/a").await.unwrap().unwrap();
        assert_eq!(stored.article.guid, "g1");
    }

    #[tokio::test]
    async fn test_duplicate_guid_is_rejected() {
        let storage = MemoryStorage::new();
        assert!(storage.insert(&record("g1", "http://test.com/a")).await.unwrap().is_some());
        assert_eq!(storage.insert(&record("g1", "http://test.com/b")).await.unwrap(), None);
        assert!(!storage.exists("http://test.com/b").await.unwrap());
    }

    #[tokio::test]
    async fn test_concurrent_inserts_store_one_row() {
        let storage = MemoryStorage::new();
        let handles: Vec<_> = (0..16)
            .map(|i| {
                let storage = storage.clone();
                tokio::spawn(async move {
                    storage.insert(&record(&format!("g{}", i), "http://test.com/same")).await
                })
            })
            .collect();

        let mut inserted = 0;
        for handle in handles {
            if handle.await.unwrap().unwrap().is_some() {
                inserted += 1;
            }
        }
        assert_eq!(inserted, 1);
        assert_eq!(storage.count().await.unwrap(), 1);
    }
}

use chrono::Local;
use futures::future::join_all;
use nh_core::{ArticleStorage, CrawlConfig, Fetcher, Headers, Result, Scraper};
use rand::seq::SliceRandom;
use std::fmt;
use std::sync::Arc;

use crate::logging::Logger;
use crate::rate_limit::RateLimiter;
use crate::scrapers::BoxedScraper;

/// Counters for one source's crawl.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrawlReport {
    pub source: String,
    pub pages_fetched: usize,
    pub pages_failed: usize,
    pub stubs_found: usize,
    /// Stubs whose URL was already stored; their pages are never fetched
    pub skipped_existing: usize,
    pub article_fetch_failures: usize,
    pub extraction_failures: usize,
    pub extracted: usize,
    pub stored: usize,
    /// Records the store rejected as already present
    pub duplicates: usize,
    pub dry_run: bool,
}

impl CrawlReport {
    pub fn new(source: impl Into<String>, dry_run: bool) -> Self {
        Self {
            source: source.into(),
            dry_run,
            ..Default::default()
        }
    }

    /// Newly stored records, or extracted ones when nothing is stored.
    pub fn result_count(&self) -> usize {
        if self.dry_run {
            self.extracted
        } else {
            self.stored
        }
    }
}

impl fmt::Display for CrawlReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} {} (pages {}/{}, stubs {}, known {}, fetch errors {}, rejected {}, duplicates {})",
            self.source,
            self.result_count(),
            if self.dry_run { "extracted" } else { "stored" },
            self.pages_fetched,
            self.pages_fetched + self.pages_failed,
            self.stubs_found,
            self.skipped_existing,
            self.article_fetch_failures,
            self.extraction_failures,
            self.duplicates,
        )
    }
}

/// Drives listing and article fetches for a set of scrapers.
///
/// Without storage the manager runs dry: articles are fetched and extracted
/// but nothing is persisted and no duplicate check is made.
pub struct ScraperManager {
    fetcher: Arc<dyn Fetcher>,
    storage: Option<Arc<dyn ArticleStorage>>,
    crawl: CrawlConfig,
    scrapers: Vec<BoxedScraper>,
}

impl ScraperManager {
    pub fn new(
        fetcher: Arc<dyn Fetcher>,
        storage: Option<Arc<dyn ArticleStorage>>,
        crawl: CrawlConfig,
    ) -> Self {
        Self {
            fetcher,
            storage,
            crawl,
            scrapers: Vec::new(),
        }
    }

    pub fn with_scrapers(mut self, scrapers: Vec<BoxedScraper>) -> Self {
        self.scrapers.extend(scrapers);
        self
    }

    pub fn scrapers(&self) -> &[BoxedScraper] {
        &self.scrapers
    }

    pub fn is_dry_run(&self) -> bool {
        self.storage.is_none()
    }

    /// Crawls every registered source concurrently. Only storage failures
    /// abort the run.
    pub async fn scrape_all(&self) -> Result<Vec<CrawlReport>> {
        let runs = self.scrapers.iter().map(|scraper| self.scrape_source(scraper.as_ref()));
        join_all(runs).await.into_iter().collect()
    }

    /// Crawls the first `max_pages` listing pages of one source.
    pub async fn scrape_source(&self, scraper: &dyn Scraper) -> Result<CrawlReport> {
        let today = Local::now().date_naive();
        let urls = scraper.config().listing_urls(self.crawl.max_pages, today);
        self.scrape_urls(scraper, &urls).await
    }

    /// Crawls the given listing pages in order.
    pub async fn scrape_urls(&self, scraper: &dyn Scraper, listing_urls: &[String]) -> Result<CrawlReport> {
        let log = Logger::new().with_prefix(format!("[{}]", scraper.source()));
        let mut limiter = RateLimiter::new(self.crawl.requests_per_second);
        let mut report = CrawlReport::new(scraper.source(), self.is_dry_run());

        for url in listing_urls.iter().take(self.crawl.max_pages) {
            let listing = match self.fetch(&mut limiter, url).await {
                Ok(document) => document,
                Err(e) => {
                    log.warn(&format!("Skipping listing page {}: {}", url, e));
                    report.pages_failed += 1;
                    continue;
                }
            };
            report.pages_fetched += 1;

            let stubs = scraper.parse_listing(&listing);
            log.info(&format!("Found {} articles on {}", stubs.len(), url));
            report.stubs_found += stubs.len();

            for stub in stubs.into_iter().take(self.crawl.max_articles_per_page) {
                if let Some(storage) = &self.storage {
                    let known = storage.exists(&stub.url).await.map_err(|e| {
                        log.error(&format!("Storage lookup failed for {}: {}", stub.url, e));
                        e
                    })?;
                    if known {
                        log.debug(&format!("Already stored: {}", stub.url));
                        report.skipped_existing += 1;
                        continue;
                    }
                }

                let document = match self.fetch(&mut limiter, &stub.url).await {
                    Ok(document) => document,
                    Err(e) => {
                        log.warn(&format!("Skipping article {}: {}", stub.url, e));
                        report.article_fetch_failures += 1;
                        continue;
                    }
                };
                let Some(record) = scraper.parse_article(&document, &stub) else {
                    log.info(&format!("No usable content in {}", stub.url));
                    report.extraction_failures += 1;
                    continue;
                };
                report.extracted += 1;

                match &self.storage {
                    Some(storage) => match storage.insert(&record).await.map_err(|e| {
                        log.error(&format!("Storage insert failed for {}: {}", record.url, e));
                        e
                    })? {
                        Some(id) => {
                            log.debug(&format!("Stored #{}: {}", id, record.url));
                            report.stored += 1;
                        }
                        None => {
                            log.debug(&format!("Already present: {}", record.url));
                            report.duplicates += 1;
                        }
                    },
                    None => log.info(&format!(
                        "Extracted {} ({} chars)",
                        record.title.as_deref().unwrap_or(&record.url),
                        record.description.chars().count()
                    )),
                }
            }
        }

        log.info(&format!("{}", report));
        Ok(report)
    }

    async fn fetch(&self, limiter: &mut RateLimiter, url: &str) -> Result<String> {
        let headers = self.headers();
        limiter.wait().await;
        self.fetcher.fetch(url, &headers).await
    }

    fn headers(&self) -> Headers {
        let mut headers = Headers::new();
        if let Some(agent) = self.crawl.user_agents.choose(&mut rand::thread_rng()) {
            headers.insert("User-Agent".to_string(), agent.clone());
        }
        headers
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scrapers::build_scrapers;
    use async_trait::async_trait;
    use nh_core::{ArticleRecord, ArticleStub, Error, Settings, StoredArticle};
    use nh_storage::MemoryStorage;
    use std::collections::HashMap;
    use std::sync::Mutex;

    const LISTING_URL: &str = "https://habr.com/ru/news/";
    const FIRST: &str = "https://habr.com/ru/news/1/";
    const SECOND: &str = "https://habr.com/ru/news/2/";

    #[derive(Default)]
    struct MockFetcher {
        pages: HashMap<String, String>,
        requests: Mutex<Vec<(String, Headers)>>,
    }

    impl MockFetcher {
        fn with_page(mut self, url: &str, body: &str) -> Self {
            self.pages.insert(url.to_string(), body.to_string());
            self
        }

        fn requested(&self) -> Vec<String> {
            self.requests.lock().unwrap().iter().map(|(url, _)| url.clone()).collect()
        }
    }

    #[async_trait]
    impl Fetcher for MockFetcher {
        async fn fetch(&self, url: &str, headers: &Headers) -> Result<String> {
            self.requests.lock().unwrap().push((url.to_string(), headers.clone()));
            self.pages
                .get(url)
                .cloned()
                .ok_or_else(|| Error::Scraping(format!("404 for {}", url)))
        }
    }

    struct BrokenStorage;

    #[async_trait]
    impl ArticleStorage for BrokenStorage {
        async fn exists(&self, _url: &str) -> Result<bool> {
            Err(Error::Storage("connection lost".to_string()))
        }

        async fn insert(&self, _record: &ArticleRecord) -> Result<Option<i64>> {
            Err(Error::Storage("connection lost".to_string()))
        }

        async fn get_by_url(&self, _url: &str) -> Result<Option<StoredArticle>> {
            Ok(None)
        }

        async fn count(&self) -> Result<usize> {
            Ok(0)
        }
    }

    /// Reports every URL as new, then loses every insert to a concurrent writer.
    struct RacyStorage;

    #[async_trait]
    impl ArticleStorage for RacyStorage {
        async fn exists(&self, _url: &str) -> Result<bool> {
            Ok(false)
        }

        async fn insert(&self, _record: &ArticleRecord) -> Result<Option<i64>> {
            Ok(None)
        }

        async fn get_by_url(&self, _url: &str) -> Result<Option<StoredArticle>> {
            Ok(None)
        }

        async fn count(&self) -> Result<usize> {
            Ok(0)
        }
    }

    fn listing() -> String {
        r#"<div class="tm-articles-list">
                 <article class="tm-articles-list__item"><a class="tm-title__link" href="/ru/news/1/">Первая новость</a></article>
                 <article class="tm-articles-list__item"><a class="tm-title__link" href="/ru/news/2/">Вторая новость</a></article>
               </div>"#
            .to_string()
    }

    fn article(text: &str) -> String {
        format!("<article><p>{}</p></article>", text)
    }

    fn fetcher() -> MockFetcher {
        MockFetcher::default()
            .with_page(LISTING_URL, &listing())
            .with_page(FIRST, &article("Текст первой новости достаточно длинный для сохранения."))
            .with_page(SECOND, &article("Текст второй новости тоже достаточно длинный для сохранения."))
    }

    fn habr() -> BoxedScraper {
        build_scrapers(&Settings::default(), Some("habr")).unwrap().remove(0)
    }

    fn manager(fetcher: Arc<MockFetcher>, storage: Option<Arc<dyn ArticleStorage>>, crawl: CrawlConfig) -> ScraperManager {
        ScraperManager::new(fetcher, storage, crawl).with_scrapers(vec![habr()])
    }

    #[tokio::test(start_paused = true)]
    async fn test_stores_only_new_articles() {
        let storage = Arc::new(MemoryStorage::new());
        let known = ArticleRecord::from_stub(&ArticleStub::new("Первая новость", FIRST), "Ранее сохранённый текст".to_string());
        storage.insert(&known).await.unwrap();

        let fetcher = Arc::new(fetcher());
        let manager = manager(fetcher.clone(), Some(storage.clone()), CrawlConfig::default());
        let report = manager.scrape_urls(manager.scrapers()[0].as_ref(), &[LISTING_URL.to_string()]).await.unwrap();

        assert_eq!(report.result_count(), 1);
        assert_eq!(report.skipped_existing, 1);
        assert_eq!(report.stubs_found, 2);
        assert_eq!(fetcher.requested(), vec![LISTING_URL, SECOND]);
        assert_eq!(storage.count().await.unwrap(), 2);

        let stored = storage.get_by_url(SECOND).await.unwrap().unwrap();
        assert_eq!(stored.article.title.as_deref(), Some("Вторая новость"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_listing_page_is_skipped() {
        let storage: Arc<dyn ArticleStorage> = Arc::new(MemoryStorage::new());
        let manager = manager(Arc::new(fetcher()), Some(storage), CrawlConfig { max_pages: 2, ..Default::default() });
        let urls = vec!["https://habr.com/ru/news/missing/".to_string(), LISTING_URL.to_string()];
        let report = manager.scrape_urls(manager.scrapers()[0].as_ref(), &urls).await.unwrap();

        assert_eq!(report.pages_failed, 1);
        assert_eq!(report.pages_fetched, 1);
        assert_eq!(report.stored, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_article_failures_are_skipped() {
        let fetcher = MockFetcher::default()
            .with_page(LISTING_URL, &listing())
            .with_page(FIRST, &article("Коротко"));
        let storage: Arc<dyn ArticleStorage> = Arc::new(MemoryStorage::new());
        let manager = manager(Arc::new(fetcher), Some(storage.clone()), CrawlConfig::default());
        let report = manager.scrape_urls(manager.scrapers()[0].as_ref(), &[LISTING_URL.to_string()]).await.unwrap();

        assert_eq!(report.extraction_failures, 1);
        assert_eq!(report.article_fetch_failures, 1);
        assert_eq!(report.result_count(), 0);
        assert_eq!(storage.count().await.unwrap(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dry_run_counts_extracted() {
        let manager = manager(Arc::new(fetcher()), None, CrawlConfig::default());
        assert!(manager.is_dry_run());
        let report = manager.scrape_urls(manager.scrapers()[0].as_ref(), &[LISTING_URL.to_string()]).await.unwrap();

        assert!(report.dry_run);
        assert_eq!(report.extracted, 2);
        assert_eq!(report.stored, 0);
        assert_eq!(report.result_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_page_and_article_caps() {
        let fetcher = Arc::new(fetcher());
        let crawl = CrawlConfig {
            max_pages: 1,
            max_articles_per_page: 1,
            ..Default::default()
        };
        let manager = manager(fetcher.clone(), None, crawl);
        let urls = vec![LISTING_URL.to_string(), LISTING_URL.to_string()];
        let report = manager.scrape_urls(manager.scrapers()[0].as_ref(), &urls).await.unwrap();

        assert_eq!(report.pages_fetched, 1);
        assert_eq!(report.extracted, 1);
        assert_eq!(fetcher.requested(), vec![LISTING_URL, FIRST]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_requests_are_spaced_and_carry_user_agent() {
        let fetcher = Arc::new(fetcher());
        let crawl = CrawlConfig {
            requests_per_second: 2.0,
            ..Default::default()
        };
        let agents = crawl.user_agents.clone();
        let manager = manager(fetcher.clone(), None, crawl);

        let start = tokio::time::Instant::now();
        manager.scrape_urls(manager.scrapers()[0].as_ref(), &[LISTING_URL.to_string()]).await.unwrap();
        assert!(start.elapsed() >= std::time::Duration::from_millis(1000));

        let requests = fetcher.requests.lock().unwrap();
        assert_eq!(requests.len(), 3);
        assert!(requests
            .iter()
            .all(|(_, headers)| agents.contains(&headers["User-Agent"])));
    }

    #[tokio::test(start_paused = true)]
    async fn test_scrape_all_and_storage_errors() {
        let storage: Arc<dyn ArticleStorage> = Arc::new(MemoryStorage::new());
        let manager = manager(Arc::new(fetcher()), Some(storage), CrawlConfig::default());
        let reports = manager.scrape_all().await.unwrap();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].source, "habr");
        assert_eq!(reports[0].stored, 2);

        let broken = manager_with_broken_storage();
        assert!(matches!(broken.scrape_all().await, Err(Error::Storage(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_insert_conflict_counts_as_duplicate() {
        let crawl = CrawlConfig {
            max_articles_per_page: 1,
            ..Default::default()
        };
        let manager = manager(Arc::new(fetcher()), Some(Arc::new(RacyStorage)), crawl);
        let report = manager.scrape_urls(manager.scrapers()[0].as_ref(), &[LISTING_URL.to_string()]).await.unwrap();

        assert_eq!(report.extracted, 1);
        assert_eq!(report.duplicates, 1);
        assert_eq!(report.stored, 0);
        assert_eq!(report.skipped_existing, 0);
        assert_eq!(report.result_count(), 0);
    }

    fn manager_with_broken_storage() -> ScraperManager {
        manager(Arc::new(fetcher()), Some(Arc::new(BrokenStorage)), CrawlConfig::default())
    }

    #[test]
    fn test_report_summary() {
        let mut report = CrawlReport::new("ixbt", false);
        report.pages_fetched = 2;
        report.pages_failed = 1;
        report.stored = 4;
        report.extracted = 5;
        report.duplicates = 1;
        assert_eq!(report.result_count(), 4);
        assert_eq!(
            report.to_string(),
            "ixbt: 4 stored (pages 2/3, stubs 0, known 0, fetch errors 0, rejected 0, duplicates 1)"
        );
        assert_eq!(CrawlReport { dry_run: true, ..report }.result_count(), 5);
    }
}

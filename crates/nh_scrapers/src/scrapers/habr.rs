use nh_core::{
    ArticleRecord, ArticleStub, CleanerConfig, ExtractionConfig, Result, Scraper, SourceConfig,
};
use scraper::{ElementRef, Html, Selector};
use tracing::debug;

use super::utils::{self, element_text, selector};
use super::BodyExtractor;

#[derive(Debug, Clone)]
pub struct HabrScraper {
    config: SourceConfig,
    container: Selector,
    item: Selector,
    link: Selector,
    time: Selector,
    comments: Selector,
    rating: Selector,
    body: BodyExtractor,
}

impl HabrScraper {
    pub fn new(config: SourceConfig, cleaner: &CleanerConfig, extraction: &ExtractionConfig) -> Result<Self> {
        Ok(Self {
            container: selector(".tm-articles-list")?,
            item: selector(".tm-articles-list__item")?,
            link: selector(".tm-title__link")?,
            time: selector("time")?,
            comments: selector("[data-test-id=\"counter-comments\"] .tm-comments-counter__value")?,
            rating: selector("[data-test-id=\"votes-meter-value\"]")?,
            body: BodyExtractor::new(&config, cleaner, extraction)?,
            config,
        })
    }

    fn parse_item(&self, item: ElementRef) -> Option<ArticleStub> {
        let link = item.select(&self.link).next()?;
        let url = utils::resolve_url(&self.config.domain, link.value().attr("href")?)?;
        let mut stub = ArticleStub::new(element_text(link), url);

        if let Some(time) = item.select(&self.time).next() {
            if let Some(datetime) = time.value().attr("datetime") {
                stub.published_at =
                    utils::parse_iso_datetime(datetime).or_else(|| Some(element_text(time)));
            }
        }
        stub.comments_count = item
            .select(&self.comments)
            .next()
            .and_then(|el| utils::first_number(&element_text(el)));
        stub.rating = item
            .select(&self.rating)
            .next()
            .and_then(|el| utils::first_signed_number(&element_text(el)));

        Some(stub)
    }
}

impl Scraper for HabrScraper {
    fn config(&self) -> &SourceConfig {
        &self.config
    }

    fn parse_listing(&self, document: &str) -> Vec<ArticleStub> {
        let document = Html::parse_document(document);
        let Some(container) = document.select(&self.container).next() else {
            return Vec::new();
        };

        container
            .select(&self.item)
            .filter_map(|item| {
                let stub = self.parse_item(item);
                if stub.is_none() {
                    debug!(source = %self.config.name, "Skipping listing item without a usable link");
                }
                stub
            })
            .collect()
    }

    fn parse_article(&self, document: &str, stub: &ArticleStub) -> Option<ArticleRecord> {
        let document = Html::parse_document(document);
        self.body.extract(&document, stub)
    }
}

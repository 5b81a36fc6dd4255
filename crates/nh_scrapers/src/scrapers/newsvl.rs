use nh_core::{
    ArticleRecord, ArticleStub, CleanerConfig, ExtractionConfig, Result, Scraper, SourceConfig,
};
use scraper::{ElementRef, Html, Selector};
use tracing::debug;

use super::utils::{self, element_text, selector};
use super::BodyExtractor;

#[derive(Debug, Clone)]
pub struct NewsVlScraper {
    config: SourceConfig,
    containers: Vec<Selector>,
    item: Selector,
    title: Selector,
    date: Selector,
    body: BodyExtractor,
}

impl NewsVlScraper {
    pub fn new(config: SourceConfig, cleaner: &CleanerConfig, extraction: &ExtractionConfig) -> Result<Self> {
        Ok(Self {
            containers: vec![selector(".story-list_default")?, selector(".story-list")?],
            item: selector(".story-list__item")?,
            title: selector(".story-list__item-title a")?,
            date: selector(".story-list__item-date")?,
            body: BodyExtractor::new(&config, cleaner, extraction)?,
            config,
        })
    }

    fn parse_item(&self, item: ElementRef) -> Option<ArticleStub> {
        let link = item.select(&self.title).next()?;
        let url = utils::resolve_url(&self.config.domain, link.value().attr("href")?)?;
        let mut stub = ArticleStub::new(element_text(link), url);

        stub.published_at = item.select(&self.date).next().map(|el| {
            let raw = element_text(el);
            utils::parse_human_date(&raw).unwrap_or(raw)
        });
        Some(stub)
    }
}

impl Scraper for NewsVlScraper {
    fn config(&self) -> &SourceConfig {
        &self.config
    }

    fn parse_listing(&self, document: &str) -> Vec<ArticleStub> {
        let document = Html::parse_document(document);
        let Some(container) = self.containers.iter().find_map(|s| document.select(s).next()) else {
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

use lazy_static::lazy_static;
use nh_core::{
    ArticleRecord, ArticleStub, CleanerConfig, ExtractionConfig, Result, Scraper, SourceConfig,
};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use tracing::debug;

use super::utils::{self, element_text, selector};
use super::BodyExtractor;

lazy_static! {
    static ref COMMENTS_HEADING: Regex = Regex::new(r"\((\d+)\)").unwrap();
}

/// ixbt.games has no stable listing container; article links are picked up
/// wherever they appear on the page.
#[derive(Debug, Clone)]
pub struct IxbtScraper {
    config: SourceConfig,
    links: Vec<Selector>,
    heading: Selector,
    section_heading: Selector,
    datetime: Vec<Selector>,
    min_title_length: usize,
    body: BodyExtractor,
}

impl IxbtScraper {
    pub fn new(config: SourceConfig, cleaner: &CleanerConfig, extraction: &ExtractionConfig) -> Result<Self> {
        Ok(Self {
            links: vec![selector("a[href*=\"/news/\"]")?, selector("a[href*=\"/article/\"]")?],
            heading: selector("h3")?,
            section_heading: selector("h2")?,
            datetime: vec![selector("time[datetime]")?, selector("[datetime]")?],
            min_title_length: extraction.min_title_length,
            body: BodyExtractor::new(&config, cleaner, extraction)?,
            config,
        })
    }

    fn card<'a>(link: ElementRef<'a>) -> Option<ElementRef<'a>> {
        link.ancestors().filter_map(ElementRef::wrap).find(|el| {
            el.value()
                .attr("class")
                .map_or(false, |class| class.to_lowercase().contains("card"))
        })
    }

    fn parse_link(&self, link: ElementRef, url: String) -> Option<ArticleStub> {
        let scope = Self::card(link).unwrap_or(link);
        let title = element_text(scope.select(&self.heading).next()?);
        if title.chars().count() < self.min_title_length {
            return None;
        }

        let mut stub = ArticleStub::new(title, url);
        stub.published_at = utils::date_from_url(&stub.url);
        Some(stub)
    }

    /// Count from a "Комментарии (N)" section heading.
    fn heading_comments(&self, document: &Html) -> Option<u32> {
        document
            .select(&self.section_heading)
            .map(element_text)
            .filter(|text| text.to_lowercase().contains("комментарии"))
            .find_map(|text| {
                COMMENTS_HEADING
                    .captures(&text)
                    .and_then(|c| c[1].parse().ok())
            })
    }

    fn page_date(&self, document: &Html) -> Option<String> {
        self.datetime.iter().find_map(|s| {
            document
                .select(s)
                .next()
                .and_then(|el| el.value().attr("datetime"))
                .and_then(utils::parse_iso_datetime)
        })
    }
}

impl Scraper for IxbtScraper {
    fn config(&self) -> &SourceConfig {
        &self.config
    }

    fn parse_listing(&self, document: &str) -> Vec<ArticleStub> {
        let document = Html::parse_document(document);
        let Some(links) = self
            .links
            .iter()
            .map(|s| document.select(s).collect::<Vec<_>>())
            .find(|links| !links.is_empty())
        else {
            return Vec::new();
        };

        let mut seen = HashSet::new();
        let mut stubs = Vec::new();
        for link in links {
            let Some(url) = link
                .value()
                .attr("href")
                .and_then(|href| utils::resolve_url(&self.config.domain, href))
            else {
                continue;
            };
            if seen.contains(&url) {
                continue;
            }
            match self.parse_link(link, url.clone()) {
                Some(stub) => {
                    seen.insert(url);
                    stubs.push(stub);
                }
                None => debug!(source = %self.config.name, %url, "Skipping link without a usable title"),
            }
        }
        stubs
    }

    fn parse_article(&self, document: &str, stub: &ArticleStub) -> Option<ArticleRecord> {
        let document = Html::parse_document(document);
        let mut record = self.body.extract(&document, stub)?;

        if let Some(count) = self.heading_comments(&document) {
            record.comments_count = Some(count);
        }
        if record.published_at.is_none() {
            record.published_at = utils::date_from_url(&record.url).or_else(|| self.page_date(&document));
        }
        Some(record)
    }
}

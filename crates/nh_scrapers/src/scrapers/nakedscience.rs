use lazy_static::lazy_static;
use nh_core::{
    ArticleRecord, ArticleStub, CleanerConfig, ExtractionConfig, Result, Scraper, SourceConfig,
};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::debug;

use super::utils::{self, element_text, selector};
use super::BodyExtractor;

lazy_static! {
    static ref TRAILING_SCORE: Regex = Regex::new(r"\s*\d+\.\d+\s*$").unwrap();
}

#[derive(Debug, Clone)]
pub struct NakedScienceScraper {
    config: SourceConfig,
    item: Selector,
    title: Vec<Selector>,
    date: Selector,
    body: BodyExtractor,
}

impl NakedScienceScraper {
    pub fn new(config: SourceConfig, cleaner: &CleanerConfig, extraction: &ExtractionConfig) -> Result<Self> {
        Ok(Self {
            item: selector(".news-item")?,
            title: vec![selector(".news-item-title h3 a")?, selector(".news-item-title a")?],
            date: selector(".echo_date")?,
            body: BodyExtractor::new(&config, cleaner, extraction)?,
            config,
        })
    }

    /// Link text without embedded `<span>` badges and trailing scores.
    fn clean_title(link: ElementRef) -> String {
        let text = link
            .descendants()
            .filter(|node| {
                !node
                    .ancestors()
                    .take_while(|ancestor| ancestor.id() != link.id())
                    .any(|ancestor| ancestor.value().as_element().map_or(false, |el| el.name() == "span"))
            })
            .filter_map(|node| node.value().as_text())
            .flat_map(|text| text.split_whitespace())
            .collect::<Vec<_>>()
            .join(" ");
        TRAILING_SCORE.replace(&text, "").trim().to_string()
    }

    fn parse_item(&self, item: ElementRef) -> Option<ArticleStub> {
        let link = self.title.iter().find_map(|s| item.select(s).next())?;
        let url = utils::resolve_url(&self.config.domain, link.value().attr("href")?)?;
        let mut stub = ArticleStub::new(Self::clean_title(link), url);

        stub.published_at = item.select(&self.date).next().map(|el| {
            let raw = element_text(el);
            utils::parse_human_date(&raw).unwrap_or(raw)
        });
        Some(stub)
    }
}

impl Scraper for NakedScienceScraper {
    fn config(&self) -> &SourceConfig {
        &self.config
    }

    fn parse_listing(&self, document: &str) -> Vec<ArticleStub> {
        let document = Html::parse_document(document);
        document
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

#[cfg(test)]
mod tests {
    use super::*;
    use nh_core::Settings;

    fn scraper() -> NakedScienceScraper {
        let settings = Settings::default();
        let config = settings.source("naked-science").unwrap().clone();
        NakedScienceScraper::new(config, &settings.cleaner, &settings.extraction).unwrap()
    }

    #[test]
    fn test_parse_listing() {
        let html = r#"
            <div class="news-item">
              <div class="news-item-title">
                <h3><a href="/article/physics/black-holes">Чёрные дыры испаряются быстрее <span class="badge">Новое</span> 4.5</a></h3>
              </div>
              <span class="echo_date">12 марта 2024, 14:30</span>
            </div>
            <div class="news-item">
              <div class="news-item-title"><a href="https://naked-science.ru/article/biology/cats">Кошки узнают голос хозяина</a></div>
              <span class="echo_date">вчера</span>
            </div>
            <div class="news-item"><div class="news-item-title"><a>Без ссылки</a></div></div>
        "#;
        let stubs = scraper().parse_listing(html);
        assert_eq!(stubs.len(), 2);
        assert_eq!(stubs[0].title, "Чёрные дыры испаряются быстрее");
        assert_eq!(stubs[0].url, "https://naked-science.ru/article/physics/black-holes");
        assert_eq!(stubs[0].published_at.as_deref(), Some("2024-03-12T14:30:00"));
        assert_eq!(stubs[1].title, "Кошки узнают голос хозяина");
        assert_eq!(stubs[1].published_at.as_deref(), Some("вчера"));
    }

    #[test]
    fn test_parse_listing_without_items() {
        assert!(scraper().parse_listing("<div class=\"content\"></div>").is_empty());
    }

    #[test]
    fn test_parse_article_drops_repeated_headline() {
        let html = r#"
            <div class="body">
              <p>Breaking: Big Event Happens Today — full story follows.</p>
              <div class="ads_single"><p>Реклама: купите телескоп прямо сейчас!</p></div>
              <p>Scientists confirmed the observation after weeks of analysis.</p>
              <p>The results will be published in a peer-reviewed journal.</p>
            </div>
            <div class="index_importance_news">Важность: 4.7</div>
            <div id="comments"><span class="comments-counter">23 комментария</span></div>
        "#;
        let stub = ArticleStub::new("Breaking: Big Event Happens Today", "https://naked-science.ru/article/x");
        let record = scraper().parse_article(html, &stub).unwrap();
        assert_eq!(
            record.description,
            "Scientists confirmed the observation after weeks of analysis.\n\
             The results will be published in a peer-reviewed journal."
        );
        assert_eq!(record.title.as_deref(), Some("Breaking: Big Event Happens Today"));
        assert_eq!(record.rating, Some(4.7));
        assert_eq!(record.comments_count, Some(23));
    }

    #[test]
    fn test_parse_article_too_short_after_headline_removal() {
        let html = r#"<div class="body"><p>Breaking: Big Event Happens Today — full story follows.</p></div>"#;
        let stub = ArticleStub::new("Breaking: Big Event Happens Today", "https://naked-science.ru/article/x");
        assert!(scraper().parse_article(html, &stub).is_none());
    }

    #[test]
    fn test_parse_article_without_text_blocks() {
        let html = r#"<div class="body"><p>Источник: пресс-релиз университета и журнал Nature</p></div>"#;
        let stub = ArticleStub::new("Учёные открыли новый вид", "https://naked-science.ru/article/y");
        assert!(scraper().parse_article(html, &stub).is_none());
    }
}

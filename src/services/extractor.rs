// src/services/extractor.rs

//! Post extraction service.
//!
//! Turns one rendered post document into a [`PostRecord`] using the
//! configured field locators. Extraction is pure with respect to storage:
//! the record is returned to the caller, which owns persistence.

use chrono::Utc;

use crate::error::Result;
use crate::models::{CrawlerConfig, NO_TITLE, PostRecord, SelectorConfig, UNKNOWN_AUTHOR};
use crate::render::PageRenderer;
use crate::utils::time::RelativeTimeParser;

/// Extracts typed post records from rendered documents.
pub struct PostExtractor<'a> {
    crawler: &'a CrawlerConfig,
    selectors: &'a SelectorConfig,
    time_parser: &'a RelativeTimeParser,
}

impl<'a> PostExtractor<'a> {
    /// Create an extractor over the given configuration.
    pub fn new(
        crawler: &'a CrawlerConfig,
        selectors: &'a SelectorConfig,
        time_parser: &'a RelativeTimeParser,
    ) -> Self {
        Self {
            crawler,
            selectors,
            time_parser,
        }
    }

    /// Extract a post record from `url`.
    ///
    /// Load and visibility timeouts fail the extraction; a missing or
    /// malformed field only degrades to its default.
    pub async fn extract(&self, renderer: &dyn PageRenderer, url: &str) -> Result<PostRecord> {
        let now = Utc::now();

        renderer.load(url, self.crawler.load_timeout()).await?;
        renderer
            .wait_for_visible(
                &self.selectors.content_ready,
                self.crawler.visible_timeout(),
            )
            .await?;

        // The vote widget lives inside the body container; strip it so its
        // counter text never leaks into the content.
        let body = renderer
            .read_body(&self.selectors.body, Some(&self.selectors.vote_widget))
            .await?;
        let (text_content, html_content) = match body {
            Some(body) => (body.text, Some(body.html)),
            None => {
                log::warn!("Body container missing for {}", url);
                (String::new(), None)
            }
        };

        let title = match renderer.text_of(&self.selectors.title).await? {
            Some(title) if !title.is_empty() => title,
            _ => {
                log::warn!("Title missing for {}", url);
                NO_TITLE.to_string()
            }
        };

        let author = match renderer.text_of(&self.selectors.author).await? {
            Some(author) if !author.is_empty() => author,
            _ => {
                log::warn!("Author missing for {}", url);
                UNKNOWN_AUTHOR.to_string()
            }
        };

        let like_count = self
            .read_count(renderer, &self.selectors.like_count, url, "like")
            .await?;
        let dislike_count = self
            .read_count(renderer, &self.selectors.dislike_count, url, "dislike")
            .await?;

        let registered_at = match renderer.text_of(&self.selectors.timestamp).await? {
            Some(stamp) => self.time_parser.parse(&stamp, now),
            None => {
                log::warn!("Timestamp missing for {}, using scrape time", url);
                now
            }
        };

        Ok(PostRecord {
            link: url.to_string(),
            author,
            title,
            text_content,
            html_content,
            like_count,
            dislike_count,
            registered_at,
        })
    }

    /// Read a vote counter, coercing absent or malformed text to 0.
    ///
    /// Dislike counters render with a leading sign marker; strip it before
    /// parsing.
    async fn read_count(
        &self,
        renderer: &dyn PageRenderer,
        selector: &str,
        url: &str,
        label: &str,
    ) -> Result<u32> {
        let text = renderer.text_of(selector).await?.unwrap_or_default();
        let cleaned = text.replace('-', "");
        let trimmed = cleaned.trim();

        if trimmed.is_empty() {
            return Ok(0);
        }
        match trimmed.parse() {
            Ok(count) => Ok(count),
            Err(_) => {
                log::warn!("Unparseable {} count '{}' for {}", label, text, url);
                Ok(0)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::testing::{FakePostPage, FakeRenderer};
    use chrono::Duration;

    fn extractor_parts() -> (CrawlerConfig, SelectorConfig, RelativeTimeParser) {
        (
            CrawlerConfig::default(),
            SelectorConfig::default(),
            RelativeTimeParser::default(),
        )
    }

    const POST_URL: &str = "https://board.example.com/post/42";

    #[tokio::test]
    async fn test_extracts_full_record() {
        let (crawler, selectors, time_parser) = extractor_parts();
        let renderer = FakeRenderer::new().with_post(
            POST_URL,
            FakePostPage::new()
                .title("오늘의 유머")
                .author("개드립러")
                .timestamp("3분 ")
                .likes("12")
                .dislikes("-3")
                .body("본문 내용", "<p>본문 내용</p>"),
        );

        let extractor = PostExtractor::new(&crawler, &selectors, &time_parser);
        let record = extractor.extract(&renderer, POST_URL).await.unwrap();

        assert_eq!(record.link, POST_URL);
        assert_eq!(record.title, "오늘의 유머");
        assert_eq!(record.author, "개드립러");
        assert_eq!(record.text_content, "본문 내용");
        assert_eq!(record.html_content.as_deref(), Some("<p>본문 내용</p>"));
        assert_eq!(record.like_count, 12);
        assert_eq!(record.dislike_count, 3);

        let age = Utc::now() - record.registered_at;
        assert!(age >= Duration::minutes(3));
        assert!(age < Duration::minutes(4));
    }

    #[tokio::test]
    async fn test_missing_fields_degrade_to_defaults() {
        let (crawler, selectors, time_parser) = extractor_parts();
        let renderer = FakeRenderer::new().with_post(POST_URL, FakePostPage::new());

        let extractor = PostExtractor::new(&crawler, &selectors, &time_parser);
        let before = Utc::now();
        let record = extractor.extract(&renderer, POST_URL).await.unwrap();

        assert_eq!(record.title, NO_TITLE);
        assert_eq!(record.author, UNKNOWN_AUTHOR);
        assert_eq!(record.text_content, "");
        assert_eq!(record.html_content, None);
        assert_eq!(record.like_count, 0);
        assert_eq!(record.dislike_count, 0);
        assert!(record.registered_at >= before);
    }

    #[tokio::test]
    async fn test_vote_widget_text_is_stripped() {
        let (crawler, selectors, time_parser) = extractor_parts();
        let renderer = FakeRenderer::new().with_post(
            POST_URL,
            FakePostPage::new()
                .body("본문 내용", "<p>본문 내용</p>")
                .vote_widget_text("추천 12 비추 3"),
        );

        let extractor = PostExtractor::new(&crawler, &selectors, &time_parser);
        let record = extractor.extract(&renderer, POST_URL).await.unwrap();

        assert_eq!(record.text_content, "본문 내용");
        assert!(!record.text_content.contains("추천"));
    }

    #[tokio::test]
    async fn test_malformed_counts_coerce_to_zero() {
        let (crawler, selectors, time_parser) = extractor_parts();
        let renderer = FakeRenderer::new().with_post(
            POST_URL,
            FakePostPage::new().likes("many").dislikes("??"),
        );

        let extractor = PostExtractor::new(&crawler, &selectors, &time_parser);
        let record = extractor.extract(&renderer, POST_URL).await.unwrap();

        assert_eq!(record.like_count, 0);
        assert_eq!(record.dislike_count, 0);
    }

    #[tokio::test]
    async fn test_unloadable_post_fails_extraction() {
        let (crawler, selectors, time_parser) = extractor_parts();
        let renderer = FakeRenderer::new();

        let extractor = PostExtractor::new(&crawler, &selectors, &time_parser);
        let result = extractor.extract(&renderer, POST_URL).await;
        assert!(result.unwrap_err().is_timeout());
    }
}

//! Application configuration structures.

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Renderer and crawling behavior settings
    #[serde(default)]
    pub crawler: CrawlerConfig,

    /// Logical field name to DOM locator mappings
    #[serde(default)]
    pub selectors: SelectorConfig,

    /// Relative-time marker substrings
    #[serde(default)]
    pub time_markers: TimeMarkers,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.crawler.base_listing_url.trim().is_empty() {
            return Err(AppError::validation("crawler.base_listing_url is empty"));
        }
        if url::Url::parse(&self.crawler.base_listing_url).is_err() {
            return Err(AppError::validation(
                "crawler.base_listing_url is not a valid URL",
            ));
        }
        if self.crawler.user_agent.trim().is_empty() {
            return Err(AppError::validation("crawler.user_agent is empty"));
        }
        if self.crawler.load_timeout_secs == 0 {
            return Err(AppError::validation("crawler.load_timeout_secs must be > 0"));
        }
        if self.crawler.visible_timeout_secs == 0 {
            return Err(AppError::validation(
                "crawler.visible_timeout_secs must be > 0",
            ));
        }
        if self.crawler.max_attempts == 0 {
            return Err(AppError::validation("crawler.max_attempts must be > 0"));
        }
        if self.selectors.post_list.trim().is_empty() {
            return Err(AppError::validation("selectors.post_list is empty"));
        }
        if self.selectors.post_link.trim().is_empty() {
            return Err(AppError::validation("selectors.post_link is empty"));
        }
        if self.selectors.body.trim().is_empty() {
            return Err(AppError::validation("selectors.body is empty"));
        }
        Ok(())
    }
}

/// Renderer and crawling behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlerConfig {
    /// Listing page URL without the page query parameter
    #[serde(default = "defaults::base_listing_url")]
    pub base_listing_url: String,

    /// Request identity presented by the renderer before navigation
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Page load (navigation settle) timeout in seconds
    #[serde(default = "defaults::load_timeout")]
    pub load_timeout_secs: u64,

    /// Element visibility timeout in seconds
    #[serde(default = "defaults::visible_timeout")]
    pub visible_timeout_secs: u64,

    /// Maximum extraction attempts per post (including the first)
    #[serde(default = "defaults::max_attempts")]
    pub max_attempts: u32,

    /// Fixed delay between extraction attempts in milliseconds
    #[serde(default = "defaults::retry_delay")]
    pub retry_delay_ms: u64,

    /// Upper bound for the jittered delay between posts in milliseconds
    #[serde(default = "defaults::post_delay_max")]
    pub post_delay_max_ms: u64,

    /// Upper bound for the jittered delay between pages in milliseconds
    #[serde(default = "defaults::page_delay_max")]
    pub page_delay_max_ms: u64,
}

impl CrawlerConfig {
    pub fn load_timeout(&self) -> Duration {
        Duration::from_secs(self.load_timeout_secs)
    }

    pub fn visible_timeout(&self) -> Duration {
        Duration::from_secs(self.visible_timeout_secs)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            base_listing_url: defaults::base_listing_url(),
            user_agent: defaults::user_agent(),
            load_timeout_secs: defaults::load_timeout(),
            visible_timeout_secs: defaults::visible_timeout(),
            max_attempts: defaults::max_attempts(),
            retry_delay_ms: defaults::retry_delay(),
            post_delay_max_ms: defaults::post_delay_max(),
            page_delay_max_ms: defaults::page_delay_max(),
        }
    }
}

/// DOM locators for each logical field, injected into the extractor so
/// markup changes stay a configuration edit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectorConfig {
    /// Rows of the listing page
    #[serde(default = "defaults::post_list")]
    pub post_list: String,

    /// Anchor elements carrying post links
    #[serde(default = "defaults::post_link")]
    pub post_link: String,

    /// Attribute holding the link target
    #[serde(default = "defaults::link_attr")]
    pub link_attr: String,

    /// Container whose visibility marks the post document as ready
    #[serde(default = "defaults::content_ready")]
    pub content_ready: String,

    /// Post title element
    #[serde(default = "defaults::title")]
    pub title: String,

    /// Author name element
    #[serde(default = "defaults::author")]
    pub author: String,

    /// Relative publish time element
    #[serde(default = "defaults::timestamp")]
    pub timestamp: String,

    /// Upvote counter element
    #[serde(default = "defaults::like_count")]
    pub like_count: String,

    /// Downvote counter element
    #[serde(default = "defaults::dislike_count")]
    pub dislike_count: String,

    /// Post body container
    #[serde(default = "defaults::body")]
    pub body: String,

    /// Vote widget inside the body, removed before reading text
    #[serde(default = "defaults::vote_widget")]
    pub vote_widget: String,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            post_list: defaults::post_list(),
            post_link: defaults::post_link(),
            link_attr: defaults::link_attr(),
            content_ready: defaults::content_ready(),
            title: defaults::title(),
            author: defaults::author(),
            timestamp: defaults::timestamp(),
            like_count: defaults::like_count(),
            dislike_count: defaults::dislike_count(),
            body: defaults::body(),
            vote_widget: defaults::vote_widget(),
        }
    }
}

/// Marker substrings for relative-time classification.
///
/// Matched by containment, so markers keep their trailing space where the
/// site renders one ("3분 " → minutes).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeMarkers {
    #[serde(default = "defaults::marker_minutes")]
    pub minutes: String,

    #[serde(default = "defaults::marker_hours")]
    pub hours: String,

    #[serde(default = "defaults::marker_days")]
    pub days: String,

    #[serde(default = "defaults::marker_months")]
    pub months: String,

    #[serde(default = "defaults::marker_years")]
    pub years: String,

    #[serde(default = "defaults::marker_just_now")]
    pub just_now: String,
}

impl Default for TimeMarkers {
    fn default() -> Self {
        Self {
            minutes: defaults::marker_minutes(),
            hours: defaults::marker_hours(),
            days: defaults::marker_days(),
            months: defaults::marker_months(),
            years: defaults::marker_years(),
            just_now: defaults::marker_just_now(),
        }
    }
}

/// Listing page range for one crawl run, supplied by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRange {
    /// First listing page, 1-based
    pub start: u32,

    /// Last listing page inclusive; `None` crawls until cancelled
    pub end: Option<u32>,
}

impl PageRange {
    /// A bounded range from `start` to `end` inclusive.
    pub fn bounded(start: u32, end: u32) -> Self {
        Self {
            start,
            end: Some(end),
        }
    }

    /// An intentionally unbounded range, stopped only by cancellation.
    pub fn unbounded(start: u32) -> Self {
        Self { start, end: None }
    }

    /// Validate range bounds.
    pub fn validate(&self) -> Result<()> {
        if self.start == 0 {
            return Err(AppError::validation("page range must start at 1 or above"));
        }
        if let Some(end) = self.end {
            if end < self.start {
                return Err(AppError::validation("page range end is before its start"));
            }
        }
        Ok(())
    }
}

mod defaults {
    // Crawler defaults
    pub fn base_listing_url() -> String {
        "https://www.dogdrip.net/dogdrip".into()
    }
    pub fn user_agent() -> String {
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36".into()
    }
    pub fn load_timeout() -> u64 {
        30
    }
    pub fn visible_timeout() -> u64 {
        10
    }
    pub fn max_attempts() -> u32 {
        3
    }
    pub fn retry_delay() -> u64 {
        2000
    }
    pub fn post_delay_max() -> u64 {
        1000
    }
    pub fn page_delay_max() -> u64 {
        250
    }

    // Selector defaults for the XE-based board markup
    pub fn post_list() -> String {
        "#main > div > div > div > div.ed.board-list > ul > li".into()
    }
    pub fn post_link() -> String {
        "#main > div > div > div > div.ed.board-list > ul > li > a".into()
    }
    pub fn link_attr() -> String {
        "href".into()
    }
    pub fn content_ready() -> String {
        "#main > div > div.eq.section.secontent.background-color-content > div > div:nth-child(3) > div:nth-child(1)"
            .into()
    }
    pub fn title() -> String {
        "#main > div > div > div > div:nth-child(3) > div:nth-child(1) > div > div.ed.article-head.margin-bottom-large > h4 > a"
            .into()
    }
    pub fn author() -> String {
        "#main > div > div > div > div:nth-child(3) > div:nth-child(1) > div > div.ed.article-head.margin-bottom-large > div.ed.flex.flex-wrap.flex-left.flex-middle.title-toolbar > div.ed.flex.flex-wrap > span:nth-child(1) > a"
            .into()
    }
    pub fn timestamp() -> String {
        "#main > div > div > div > div:nth-child(3) > div:nth-child(1) > div > div.ed.article-head.margin-bottom-large > div.ed.flex.flex-wrap.flex-left.flex-middle.title-toolbar > div.ed.flex.flex-wrap > span:nth-child(2) > span:nth-child(2)"
            .into()
    }
    pub fn like_count() -> String {
        "#document_voted_count".into()
    }
    pub fn dislike_count() -> String {
        "#document_blamed_count".into()
    }
    pub fn body() -> String {
        "#main > div > div > div > div:nth-child(3) > div:nth-child(1) > div > div.ed.clearfix.margin-vertical-large > div.rhymix_content.xe_content"
            .into()
    }
    pub fn vote_widget() -> String {
        ".addon_addvote".into()
    }

    // Relative-time marker defaults (Korean board locale)
    pub fn marker_minutes() -> String {
        "분 ".into()
    }
    pub fn marker_hours() -> String {
        "시간 ".into()
    }
    pub fn marker_days() -> String {
        "일 ".into()
    }
    pub fn marker_months() -> String {
        "개월 ".into()
    }
    pub fn marker_years() -> String {
        "년 ".into()
    }
    pub fn marker_just_now() -> String {
        "방금".into()
    }
}

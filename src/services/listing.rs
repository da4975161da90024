// src/services/listing.rs

//! Listing page walker.
//!
//! Renders one listing page and returns the post links it carries, in
//! document order. Timeouts here fail the page as a whole; retry is the
//! post extractor's concern, not the walker's.

use crate::error::Result;
use crate::models::{CrawlerConfig, SelectorConfig};
use crate::render::PageRenderer;
use crate::utils::{is_harvestable_link, listing_url};

/// Walks listing pages and discovers post links.
pub struct ListingWalker<'a> {
    crawler: &'a CrawlerConfig,
    selectors: &'a SelectorConfig,
}

impl<'a> ListingWalker<'a> {
    /// Create a walker over the given configuration.
    pub fn new(crawler: &'a CrawlerConfig, selectors: &'a SelectorConfig) -> Self {
        Self { crawler, selectors }
    }

    /// Return the ordered post links on listing page `page_index`.
    ///
    /// An empty listing yields `Ok(vec![])`; only load or visibility
    /// timeouts are failures.
    pub async fn list_posts(
        &self,
        renderer: &dyn PageRenderer,
        page_index: u32,
    ) -> Result<Vec<String>> {
        let url = listing_url(&self.crawler.base_listing_url, page_index)?;
        log::info!("Navigating to page {}: {}", page_index, url);

        renderer.load(&url, self.crawler.load_timeout()).await?;
        renderer
            .wait_for_visible(&self.selectors.post_list, self.crawler.visible_timeout())
            .await?;

        let hrefs = renderer
            .attr_of_all(&self.selectors.post_link, &self.selectors.link_attr)
            .await?;

        let links: Vec<String> = hrefs
            .into_iter()
            .filter(|href| is_harvestable_link(href))
            .collect();

        log::info!("Found {} posts on page {}", links.len(), page_index);
        Ok(links)
    }
}

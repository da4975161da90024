//! Utility functions and helpers.

pub mod time;

use url::Url;

use crate::error::Result;

/// Build the listing URL for a 1-based page index.
pub fn listing_url(base: &str, page: u32) -> Result<String> {
    let mut url = Url::parse(base)?;
    url.query_pairs_mut().append_pair("page", &page.to_string());
    Ok(url.to_string())
}

/// Whether an href points at a harvestable post.
///
/// Keeps only absolute secure links and rejects script-protocol
/// placeholders the board uses for inline actions.
pub fn is_harvestable_link(href: &str) -> bool {
    href.contains("https://") && !href.contains("javascript:")
}

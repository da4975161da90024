//! Post data structure.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Author sentinel used when the field cannot be extracted.
pub const UNKNOWN_AUTHOR: &str = "Unknown";

/// Title sentinel used when the field cannot be extracted.
pub const NO_TITLE: &str = "No Title";

/// A post harvested from a board.
///
/// Constructed once per successful extraction and handed to the sink;
/// never mutated afterwards. `link` is the post's identity.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PostRecord {
    /// Canonical URL of the post
    pub link: String,

    /// Author display name (`UNKNOWN_AUTHOR` when unextractable)
    pub author: String,

    /// Post title (`NO_TITLE` when unextractable)
    pub title: String,

    /// Plain-text body with vote-widget text stripped
    pub text_content: String,

    /// Raw markup snapshot of the body, same scope as `text_content`
    pub html_content: Option<String>,

    /// Upvote count; parse failures coerce to 0
    pub like_count: u32,

    /// Downvote count; parse failures coerce to 0
    pub dislike_count: u32,

    /// Absolute publish time derived from the relative-time string at
    /// scrape time. Never null: parse failures fall back to scrape time.
    pub registered_at: DateTime<Utc>,
}

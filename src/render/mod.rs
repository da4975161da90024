//! Page rendering capability.
//!
//! The pipeline never talks to a browser directly; it is handed a
//! [`PageRenderer`] that owns one rendered document at a time. DOM queries
//! are stateful relative to the currently loaded document, so callers keep
//! page-by-page processing strictly sequential per renderer instance.

#[cfg(feature = "chromium")]
pub mod chromium;

use std::time::Duration;

use async_trait::async_trait;

use crate::error::Result;

#[cfg(feature = "chromium")]
pub use chromium::ChromiumRenderer;

/// Body container snapshot: plain text plus the raw markup it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BodySnapshot {
    pub text: String,
    pub html: String,
}

/// Capability for loading pages and querying the resulting document.
#[async_trait]
pub trait PageRenderer: Send + Sync {
    /// Set the request identity string presented on subsequent navigations.
    async fn set_user_agent(&self, user_agent: &str) -> Result<()>;

    /// Navigate to `url` and wait for network-idle-equivalent settling,
    /// bounded by `timeout`.
    async fn load(&self, url: &str, timeout: Duration) -> Result<()>;

    /// Wait until an element matching `selector` is visible in the current
    /// document, bounded by `timeout`.
    async fn wait_for_visible(&self, selector: &str, timeout: Duration) -> Result<()>;

    /// Trimmed text content of the first element matching `selector`, or
    /// `None` when the element is absent.
    async fn text_of(&self, selector: &str) -> Result<Option<String>>;

    /// Attribute values collected from every element matching `selector`,
    /// in document order. Elements without the attribute are skipped.
    async fn attr_of_all(&self, selector: &str, attr: &str) -> Result<Vec<String>>;

    /// Snapshot of the container matching `selector`, with any children
    /// matching `strip` removed before reading. `None` when the container
    /// is absent.
    async fn read_body(&self, selector: &str, strip: Option<&str>) -> Result<Option<BodySnapshot>>;

    /// Release the underlying rendering engine. Called exactly once at run
    /// teardown; further calls must be no-ops.
    async fn close(&self) -> Result<()>;
}

// src/models/stats.rs

//! Per-page and per-run crawl statistics.

use serde::Serialize;

/// Counters for a single listing page.
///
/// Invariant: `posts_processed + posts_failed` equals the number of links
/// discovered on the page after filtering.
#[derive(Debug, Default, Clone, Serialize)]
pub struct PageStats {
    /// Posts extracted and persisted
    pub posts_processed: usize,

    /// Posts that failed after retries (or failed to persist)
    pub posts_failed: usize,

    /// Per-post durations in seconds, in processing order
    pub post_secs: Vec<f64>,
}

impl PageStats {
    /// Average seconds per post, or 0.0 when nothing was timed.
    pub fn avg_post_secs(&self) -> f64 {
        if self.post_secs.is_empty() {
            return 0.0;
        }
        self.post_secs.iter().sum::<f64>() / self.post_secs.len() as f64
    }
}

/// Cumulative totals across a crawl run.
#[derive(Debug, Default, Clone, Serialize)]
pub struct CrawlStats {
    /// Listing pages walked successfully
    pub total_pages: usize,

    /// Posts extracted and persisted across all pages
    pub total_posts: usize,

    /// Listing pages that failed to walk
    pub failed_pages: usize,

    /// Posts that failed across all pages
    pub failed_posts: usize,

    /// Per-page durations in seconds, in page order
    pub page_secs: Vec<f64>,
}

impl CrawlStats {
    /// Fold a completed page's counters into the run totals.
    pub fn absorb(&mut self, page: &PageStats, page_secs: f64) {
        self.total_pages += 1;
        self.total_posts += page.posts_processed;
        self.failed_posts += page.posts_failed;
        self.page_secs.push(page_secs);
    }

    /// Average seconds per page, or 0.0 when nothing was timed.
    pub fn avg_page_secs(&self) -> f64 {
        if self.page_secs.is_empty() {
            return 0.0;
        }
        self.page_secs.iter().sum::<f64>() / self.page_secs.len() as f64
    }

    /// Log the end-of-run summary block.
    pub fn log_summary(&self, total_secs: f64) {
        log::info!("Crawl finished");
        log::info!("-----------------------------------");
        log::info!("CRAWL STATISTICS:");
        log::info!("Total duration: {:.2} seconds", total_secs);
        log::info!(
            "Pages processed: {} ({} failed)",
            self.total_pages,
            self.failed_pages
        );
        log::info!(
            "Posts processed: {} ({} failed)",
            self.total_posts,
            self.failed_posts
        );
        log::info!("Average time per page: {:.2} seconds", self.avg_page_secs());
        if self.total_posts > 0 {
            log::info!(
                "Average time per post: {:.2} seconds",
                total_secs / self.total_posts as f64
            );
        }
        log::info!("-----------------------------------");
    }
}

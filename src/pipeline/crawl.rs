// src/pipeline/crawl.rs

//! Crawl orchestration.
//!
//! Walks a range of listing pages, extracts every discovered post through
//! the bounded retry policy, and hands each record to the sink. The run is
//! best-effort by mandate: failures are counted and logged, never fatal.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use rand::Rng;

use crate::error::Result;
use crate::models::{Config, CrawlStats, PageRange, PageStats};
use crate::pipeline::RetryPolicy;
use crate::render::PageRenderer;
use crate::services::{ListingWalker, PostExtractor};
use crate::storage::PostSink;
use crate::utils::time::RelativeTimeParser;

/// Top-level crawl driver over an injected renderer and sink.
pub struct Orchestrator {
    config: Arc<Config>,
    renderer: Arc<dyn PageRenderer>,
    sink: Arc<dyn PostSink>,
    stop: Arc<AtomicBool>,
}

impl Orchestrator {
    /// Create an orchestrator over the given capabilities.
    pub fn new(
        config: Arc<Config>,
        renderer: Arc<dyn PageRenderer>,
        sink: Arc<dyn PostSink>,
    ) -> Self {
        Self {
            config,
            renderer,
            sink,
            stop: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Flag that requests cancellation at the next page or post boundary.
    /// In-flight operations complete or time out naturally.
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stop)
    }

    fn stop_requested(&self) -> bool {
        self.stop.load(Ordering::Relaxed)
    }

    /// Crawl the given page range and return the accumulated statistics.
    ///
    /// The renderer is released exactly once when the run ends, whether it
    /// succeeded, failed, or was cancelled.
    pub async fn run(&self, range: PageRange) -> Result<CrawlStats> {
        range.validate()?;

        log::info!(
            "Starting crawl from page {} to {}",
            range.start,
            range
                .end
                .map_or_else(|| "unbounded".to_string(), |end| end.to_string())
        );

        let started = Instant::now();
        let mut stats = CrawlStats::default();
        let result = self.crawl_pages(range, &mut stats).await;

        if let Err(e) = self.renderer.close().await {
            log::warn!("Renderer release failed: {}", e);
        }
        result?;

        stats.log_summary(started.elapsed().as_secs_f64());
        if let Err(e) = self.sink.write_stats(&stats).await {
            log::warn!("Failed to write stats snapshot: {}", e);
        }
        Ok(stats)
    }

    async fn crawl_pages(&self, range: PageRange, stats: &mut CrawlStats) -> Result<()> {
        let crawler = &self.config.crawler;
        self.renderer.set_user_agent(&crawler.user_agent).await?;

        let walker = ListingWalker::new(crawler, &self.config.selectors);
        let time_parser = RelativeTimeParser::new(self.config.time_markers.clone());
        let extractor = PostExtractor::new(crawler, &self.config.selectors, &time_parser);
        let retry = RetryPolicy::new(crawler.max_attempts, crawler.retry_delay());

        let mut page = range.start;
        loop {
            if self.stop_requested() {
                log::info!("Cancellation requested, stopping before page {}", page);
                break;
            }
            if let Some(end) = range.end {
                if page > end {
                    break;
                }
            }

            let page_started = Instant::now();
            match walker.list_posts(self.renderer.as_ref(), page).await {
                Ok(links) => {
                    let page_stats = self.process_page(&extractor, &retry, page, &links).await;
                    let page_secs = page_started.elapsed().as_secs_f64();

                    log::info!("Page {} statistics:", page);
                    log::info!("- Posts processed: {}", page_stats.posts_processed);
                    log::info!("- Posts failed: {}", page_stats.posts_failed);
                    log::info!(
                        "- Average time per post: {:.2} seconds",
                        page_stats.avg_post_secs()
                    );

                    stats.absorb(&page_stats, page_secs);
                }
                Err(e) => {
                    log::error!("Error walking listing page {}: {}", page, e);
                    stats.failed_pages += 1;
                }
            }

            if range.end != Some(page) {
                pace(crawler.page_delay_max_ms).await;
            }
            page += 1;
        }

        Ok(())
    }

    /// Process every link of one listing page in order.
    async fn process_page(
        &self,
        extractor: &PostExtractor<'_>,
        retry: &RetryPolicy,
        page: u32,
        links: &[String],
    ) -> PageStats {
        let mut page_stats = PageStats::default();

        for (index, link) in links.iter().enumerate() {
            if self.stop_requested() {
                log::info!("Cancellation requested, leaving page {} early", page);
                break;
            }

            let post_started = Instant::now();
            log::info!(
                "Processing post {}/{} on page {}",
                index + 1,
                links.len(),
                page
            );

            let outcome = retry
                .run(|| extractor.extract(self.renderer.as_ref(), link))
                .await;

            match outcome {
                Ok(record) => match self.sink.create(&record).await {
                    Ok(_) => {
                        let secs = post_started.elapsed().as_secs_f64();
                        log::info!(
                            "Post {}/{} processed in {:.2} seconds",
                            index + 1,
                            links.len(),
                            secs
                        );
                        page_stats.posts_processed += 1;
                        page_stats.post_secs.push(secs);
                    }
                    Err(e) => {
                        log::error!("Error persisting post {}: {}", link, e);
                        page_stats.posts_failed += 1;
                    }
                },
                Err(e) => {
                    log::error!("Error processing post {}: {}", link, e);
                    page_stats.posts_failed += 1;
                }
            }

            if index + 1 < links.len() {
                pace(self.config.crawler.post_delay_max_ms).await;
            }
        }

        page_stats
    }
}

/// Sleep a jittered delay of up to `max_ms` milliseconds.
async fn pace(max_ms: u64) {
    if max_ms == 0 {
        return;
    }
    let delay = rand::thread_rng().gen_range(0..=max_ms);
    tokio::time::sleep(Duration::from_millis(delay)).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use async_trait::async_trait;

    use crate::error::AppError;
    use crate::models::PostRecord;
    use crate::render::testing::{FakePostPage, FakeRenderer};
    use crate::storage::PersistedId;

    /// In-memory sink; optionally rejects writes or trips a stop flag
    /// after a record quota.
    #[derive(Default)]
    struct MemorySink {
        records: Mutex<Vec<PostRecord>>,
        stats: Mutex<Option<CrawlStats>>,
        reject_writes: bool,
        stop_after: Mutex<Option<(usize, Arc<AtomicBool>)>>,
    }

    impl MemorySink {
        fn new() -> Self {
            Self::default()
        }

        fn rejecting() -> Self {
            Self {
                reject_writes: true,
                ..Self::default()
            }
        }

        /// Set `flag` once `count` records have been persisted.
        fn set_stop_after(&self, count: usize, flag: Arc<AtomicBool>) {
            *self.stop_after.lock().unwrap() = Some((count, flag));
        }

        fn records(&self) -> Vec<PostRecord> {
            self.records.lock().unwrap().clone()
        }

        fn stats(&self) -> Option<CrawlStats> {
            self.stats.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl PostSink for MemorySink {
        async fn create(&self, record: &PostRecord) -> crate::error::Result<PersistedId> {
            if self.reject_writes {
                return Err(AppError::persistence("sink is full"));
            }
            let mut records = self.records.lock().unwrap();
            records.push(record.clone());

            let stop_after = self.stop_after.lock().unwrap().clone();
            if let Some((count, flag)) = stop_after {
                if records.len() >= count {
                    flag.store(true, Ordering::Relaxed);
                }
            }
            Ok(records.len() as PersistedId)
        }

        async fn write_stats(&self, stats: &CrawlStats) -> crate::error::Result<()> {
            *self.stats.lock().unwrap() = Some(stats.clone());
            Ok(())
        }
    }

    fn test_config() -> Arc<Config> {
        let mut config = Config::default();
        config.crawler.base_listing_url = "https://board.example.com/humor".to_string();
        config.crawler.retry_delay_ms = 0;
        config.crawler.post_delay_max_ms = 0;
        config.crawler.page_delay_max_ms = 0;
        Arc::new(config)
    }

    fn post_url(n: u32) -> String {
        format!("https://board.example.com/post/{}", n)
    }

    fn scripted_post(n: u32) -> FakePostPage {
        FakePostPage::new()
            .title(&format!("제목 {}", n))
            .author("개드립러")
            .timestamp("3분 ")
            .likes("10")
            .dislikes("-2")
            .body("본문", "<p>본문</p>")
    }

    #[tokio::test]
    async fn test_processes_only_harvestable_links() {
        let mut links: Vec<String> = (1..=5).map(post_url).collect();
        links.push("javascript:void(0)".to_string());

        let mut renderer = FakeRenderer::new().with_listing(1, links);
        for n in 1..=5 {
            renderer = renderer.with_post(&post_url(n), scripted_post(n));
        }

        let sink = Arc::new(MemorySink::new());
        let orchestrator = Orchestrator::new(test_config(), Arc::new(renderer), sink.clone());
        let stats = orchestrator.run(PageRange::bounded(1, 1)).await.unwrap();

        assert_eq!(stats.total_pages, 1);
        assert_eq!(stats.total_posts, 5);
        assert_eq!(stats.failed_posts, 0);
        assert_eq!(stats.failed_pages, 0);
        assert_eq!(sink.records().len(), 5);
        assert_eq!(sink.stats().unwrap().total_posts, 5);
    }

    #[tokio::test]
    async fn test_retry_recovers_flaky_post() {
        let url = post_url(1);
        let renderer = Arc::new(
            FakeRenderer::new()
                .with_listing(1, vec![url.clone()])
                .with_post(&url, scripted_post(1))
                .with_load_failures(&url, 2),
        );

        let sink = Arc::new(MemorySink::new());
        let orchestrator = Orchestrator::new(test_config(), renderer.clone(), sink.clone());
        let stats = orchestrator.run(PageRange::bounded(1, 1)).await.unwrap();

        assert_eq!(stats.total_posts, 1);
        assert_eq!(stats.failed_posts, 0);

        let records = sink.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].title, "제목 1");
        assert_eq!(records[0].link, url);

        // Listing load plus two failed and one successful extraction.
        let post_loads = renderer.loads().iter().filter(|u| **u == url).count();
        assert_eq!(post_loads, 3);
    }

    #[tokio::test]
    async fn test_exhausted_retries_fail_post_not_page() {
        let dead = post_url(1);
        let alive = post_url(2);
        let renderer = FakeRenderer::new()
            .with_listing(1, vec![dead.clone(), alive.clone()])
            .with_post(&alive, scripted_post(2));

        let sink = Arc::new(MemorySink::new());
        let orchestrator = Orchestrator::new(test_config(), Arc::new(renderer), sink.clone());
        let stats = orchestrator.run(PageRange::bounded(1, 1)).await.unwrap();

        assert_eq!(stats.total_pages, 1);
        assert_eq!(stats.total_posts, 1);
        assert_eq!(stats.failed_posts, 1);

        let records = sink.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].link, alive);
    }

    #[tokio::test]
    async fn test_listing_failure_skips_page_and_continues() {
        let url = post_url(1);
        let renderer = FakeRenderer::new()
            .with_listing(2, vec![url.clone()])
            .with_post(&url, scripted_post(1));

        let sink = Arc::new(MemorySink::new());
        let orchestrator = Orchestrator::new(test_config(), Arc::new(renderer), sink.clone());
        let stats = orchestrator.run(PageRange::bounded(1, 2)).await.unwrap();

        assert_eq!(stats.failed_pages, 1);
        assert_eq!(stats.total_pages, 1);
        assert_eq!(stats.total_posts, 1);
    }

    #[tokio::test]
    async fn test_persistence_failure_counts_failed_post() {
        let url = post_url(1);
        let renderer = FakeRenderer::new()
            .with_listing(1, vec![url.clone()])
            .with_post(&url, scripted_post(1));

        let sink = Arc::new(MemorySink::rejecting());
        let orchestrator = Orchestrator::new(test_config(), Arc::new(renderer), sink.clone());
        let stats = orchestrator.run(PageRange::bounded(1, 1)).await.unwrap();

        assert_eq!(stats.total_posts, 0);
        assert_eq!(stats.failed_posts, 1);
        assert!(sink.records().is_empty());
    }

    #[tokio::test]
    async fn test_rerun_duplicates_rows() {
        let url = post_url(1);
        let renderer = Arc::new(
            FakeRenderer::new()
                .with_listing(1, vec![url.clone()])
                .with_post(&url, scripted_post(1)),
        );

        let sink = Arc::new(MemorySink::new());
        let config = test_config();

        for _ in 0..2 {
            let orchestrator = Orchestrator::new(config.clone(), renderer.clone(), sink.clone());
            orchestrator.run(PageRange::bounded(1, 1)).await.unwrap();
        }

        // No uniqueness constraint on link: two runs, two rows.
        let records = sink.records();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].link, records[1].link);
    }

    #[tokio::test]
    async fn test_renderer_released_exactly_once() {
        let renderer = Arc::new(FakeRenderer::new().with_listing(1, vec![]));
        let sink = Arc::new(MemorySink::new());

        let orchestrator = Orchestrator::new(test_config(), renderer.clone(), sink);
        orchestrator.run(PageRange::bounded(1, 1)).await.unwrap();

        assert_eq!(renderer.close_count(), 1);
    }

    #[tokio::test]
    async fn test_pre_set_cancellation_crawls_nothing() {
        let renderer = Arc::new(FakeRenderer::new().with_listing(1, vec![]));
        let sink = Arc::new(MemorySink::new());

        let orchestrator = Orchestrator::new(test_config(), renderer.clone(), sink);
        orchestrator.stop_handle().store(true, Ordering::Relaxed);
        let stats = orchestrator.run(PageRange::bounded(1, 5)).await.unwrap();

        assert_eq!(stats.total_pages, 0);
        assert_eq!(stats.failed_pages, 0);
        assert_eq!(renderer.close_count(), 1);
    }

    #[tokio::test]
    async fn test_unbounded_run_stops_on_cancellation() {
        let mut renderer = FakeRenderer::new();
        for page in 1..=3 {
            let url = post_url(page);
            renderer = renderer
                .with_listing(page, vec![url.clone()])
                .with_post(&url, scripted_post(page));
        }

        let sink = Arc::new(MemorySink::new());
        let orchestrator = Orchestrator::new(test_config(), Arc::new(renderer), sink.clone());

        // The sink trips the cancellation flag once three records landed;
        // the run must observe it at the next boundary instead of walking
        // listing pages forever.
        sink.set_stop_after(3, orchestrator.stop_handle());

        let stats = orchestrator.run(PageRange::unbounded(1)).await.unwrap();

        assert_eq!(stats.total_posts, 3);
        assert_eq!(sink.records().len(), 3);
    }
}

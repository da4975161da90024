//! Headless Chromium renderer backend.
//!
//! Owns a single browser and a single reusable page. The browser launches
//! lazily on first navigation and is released by [`PageRenderer::close`];
//! every DOM read goes through JS evaluation against the current document.

use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::page::Page;
use futures::StreamExt;
use serde::Deserialize;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::error::{AppError, Result};
use crate::render::{BodySnapshot, PageRenderer};

/// Poll interval for visibility waits.
const VISIBILITY_POLL: Duration = Duration::from_millis(100);

/// Launch settings for the headless browser.
#[derive(Debug, Clone)]
pub struct ChromiumConfig {
    /// Viewport width in pixels
    pub window_width: u32,
    /// Viewport height in pixels
    pub window_height: u32,
    /// Path to a Chrome/Chromium executable (`None` for auto-detection)
    pub chrome_path: Option<String>,
}

impl Default for ChromiumConfig {
    fn default() -> Self {
        Self {
            window_width: 1366,
            window_height: 768,
            chrome_path: None,
        }
    }
}

struct BrowserState {
    browser: Browser,
    page: Page,
    handler_task: JoinHandle<()>,
}

/// `PageRenderer` backed by headless Chromium.
pub struct ChromiumRenderer {
    config: ChromiumConfig,
    state: Mutex<Option<BrowserState>>,
    user_agent: Mutex<Option<String>>,
}

impl ChromiumRenderer {
    /// Create a renderer; the browser is not launched until first use.
    pub fn new(config: ChromiumConfig) -> Self {
        Self {
            config,
            state: Mutex::new(None),
            user_agent: Mutex::new(None),
        }
    }

    /// Launch the browser and open the working page if not already running.
    async fn ensure_state(&self) -> Result<()> {
        let mut state = self.state.lock().await;
        if state.is_some() {
            return Ok(());
        }

        log::info!("Launching headless browser");

        let mut builder = BrowserConfig::builder()
            .window_size(self.config.window_width, self.config.window_height)
            .no_sandbox()
            .arg("--headless=new")
            .arg("--disable-gpu")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-accelerated-2d-canvas")
            .arg("--disable-setuid-sandbox")
            .arg("--mute-audio");

        if let Some(ref chrome_path) = self.config.chrome_path {
            builder = builder.chrome_executable(chrome_path);
        }

        let browser_config = builder.build().map_err(AppError::renderer)?;

        let (browser, mut handler) = Browser::launch(browser_config)
            .await
            .map_err(AppError::renderer)?;

        // Drive CDP events until the connection closes.
        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    log::debug!("Browser handler error: {}", e);
                }
            }
        });

        let page = browser
            .new_page("about:blank")
            .await
            .map_err(AppError::renderer)?;

        let user_agent = self.user_agent.lock().await.clone();
        if let Some(ua) = user_agent {
            page.set_user_agent(&ua).await.map_err(AppError::renderer)?;
        }

        *state = Some(BrowserState {
            browser,
            page,
            handler_task,
        });

        log::info!("Headless browser ready");
        Ok(())
    }

    /// Evaluate a JS expression against the current document.
    async fn evaluate<T>(&self, expression: String) -> Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        self.ensure_state().await?;
        let state = self.state.lock().await;
        let page = &state.as_ref().expect("state ensured above").page;

        page.evaluate(expression)
            .await
            .map_err(AppError::renderer)?
            .into_value()
            .map_err(AppError::renderer)
    }
}

#[async_trait]
impl PageRenderer for ChromiumRenderer {
    async fn set_user_agent(&self, user_agent: &str) -> Result<()> {
        *self.user_agent.lock().await = Some(user_agent.to_string());

        let state = self.state.lock().await;
        if let Some(state) = state.as_ref() {
            state
                .page
                .set_user_agent(user_agent)
                .await
                .map_err(AppError::renderer)?;
        }
        Ok(())
    }

    async fn load(&self, url: &str, timeout: Duration) -> Result<()> {
        self.ensure_state().await?;
        let state = self.state.lock().await;
        let page = &state.as_ref().expect("state ensured above").page;

        let navigation = async {
            page.goto(url).await.map_err(AppError::renderer)?;
            page.wait_for_navigation()
                .await
                .map_err(AppError::renderer)?;
            Ok::<(), AppError>(())
        };

        match tokio::time::timeout(timeout, navigation).await {
            Ok(result) => result,
            Err(_) => Err(AppError::navigation_timeout(url)),
        }
    }

    async fn wait_for_visible(&self, selector: &str, timeout: Duration) -> Result<()> {
        let expression = format!(
            r"(() => {{
                const el = document.querySelector({sel});
                if (!el) return false;
                const style = window.getComputedStyle(el);
                return style.display !== 'none'
                    && style.visibility !== 'hidden'
                    && el.getClientRects().length > 0;
            }})()",
            sel = js_string(selector)
        );

        let deadline = Instant::now() + timeout;
        loop {
            if self.evaluate::<bool>(expression.clone()).await? {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(AppError::selector_timeout(selector));
            }
            tokio::time::sleep(VISIBILITY_POLL).await;
        }
    }

    async fn text_of(&self, selector: &str) -> Result<Option<String>> {
        // A bare null result is dropped by the protocol's by-value
        // serialization, so nullable reads come back wrapped in an object.
        let expression = format!(
            r"(() => {{
                const el = document.querySelector({sel});
                const text = el && el.textContent !== null ? el.textContent.trim() : null;
                return {{ value: text }};
            }})()",
            sel = js_string(selector)
        );
        let wrapped: JsValue<Option<String>> = self.evaluate(expression).await?;
        Ok(wrapped.value)
    }

    async fn attr_of_all(&self, selector: &str, attr: &str) -> Result<Vec<String>> {
        let expression = format!(
            r"(() => {{
                const values = [];
                document.querySelectorAll({sel}).forEach((el) => {{
                    const value = el.getAttribute({attr});
                    if (value !== null) values.push(value);
                }});
                return values;
            }})()",
            sel = js_string(selector),
            attr = js_string(attr)
        );
        self.evaluate(expression).await
    }

    async fn read_body(&self, selector: &str, strip: Option<&str>) -> Result<Option<BodySnapshot>> {
        let strip_stmt = match strip {
            Some(strip) => format!(
                "clone.querySelectorAll({}).forEach((n) => n.remove());",
                js_string(strip)
            ),
            None => String::new(),
        };
        let expression = format!(
            r"(() => {{
                const el = document.querySelector({sel});
                if (!el) return {{ value: null }};
                const clone = el.cloneNode(true);
                {strip_stmt}
                return {{
                    value: {{
                        text: clone.textContent ? clone.textContent.trim() : '',
                        html: clone.innerHTML,
                    }},
                }};
            }})()",
            sel = js_string(selector),
            strip_stmt = strip_stmt
        );

        let wrapped: JsValue<Option<BodyPayload>> = self.evaluate(expression).await?;
        Ok(wrapped.value.map(|p| BodySnapshot {
            text: p.text,
            html: p.html,
        }))
    }

    async fn close(&self) -> Result<()> {
        let mut state = self.state.lock().await;
        if let Some(mut state) = state.take() {
            log::info!("Closing browser instance");
            if let Err(e) = state.browser.close().await {
                log::warn!("Browser close failed: {}", e);
            }
            state.handler_task.abort();
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct JsValue<T> {
    value: T,
}

#[derive(Debug, Deserialize)]
struct BodyPayload {
    text: String,
    html: String,
}

/// Quote a string for safe embedding in a JS expression.
fn js_string(s: &str) -> String {
    serde_json::to_string(s).expect("string serialization is infallible")
}

//! Headless-browser rendering sessions.
//!
//! One Chrome process is launched per batch run and reused across
//! documents; each document gets its own page (a scoped session) that is
//! always closed before the next one starts, bounding peak memory to one
//! active render. The capture sequence mirrors what a reader's browser
//! does: navigate, wait for fonts and images to settle, measure the real
//! content height, then print a single page at exactly that size.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig as ChromiumConfig};
use chromiumoxide::cdp::browser_protocol::emulation::{
    SetDeviceMetricsOverrideParams, SetEmulatedMediaParams,
};
use chromiumoxide::cdp::browser_protocol::page::{
    EventLifecycleEvent, PrintToPdfParams, SetLifecycleEventsEnabledParams,
};
use chromiumoxide::Page;
use futures::StreamExt;
use std::time::Duration;
use tokio::task::JoinHandle;

use crate::config::BrowserConfig;
use crate::snapshot::{GenerationReason, PageRenderer};

/// CSS pixels per inch; CDP's print API takes paper sizes in inches.
const CSS_PPI: f64 = 96.0;

/// Resolves once fonts are loaded and every image has either loaded or
/// errored. Capturing before this point is the primary correctness risk:
/// the PDF would bake in missing glyphs or empty image boxes.
const READINESS_BARRIER_JS: &str = r#"async () => {
    await document.fonts.ready;
    await Promise.all(Array.from(document.images).map((img) =>
        img.complete ? Promise.resolve() : new Promise((res) => { img.onload = img.onerror = res; })
    ));
}"#;

/// Full rendered content extent across the document's root elements.
const CONTENT_HEIGHT_JS: &str = r#"() => {
    const b = document.body, e = document.documentElement;
    return Math.max(
        b.scrollHeight, e.scrollHeight,
        b.offsetHeight, e.offsetHeight,
        b.clientHeight, e.clientHeight
    );
}"#;

/// Print stylesheets must not repaginate or shift the layout; the output
/// maps 1:1 to on-screen rendering.
const STRIP_PRINT_MARGINS_JS: &str = r#"() => {
    const style = document.createElement('style');
    style.textContent = '@page { size: auto; margin: 0; } html, body { margin: 0 !important; }';
    document.head.appendChild(style);
}"#;

/// A shared headless Chrome instance plus its CDP event loop.
pub struct Renderer {
    browser: Browser,
    handler_task: JoinHandle<()>,
    settings: BrowserConfig,
}

impl Renderer {
    /// Launches headless Chrome with the flags the snapshot pipeline needs
    /// (sandbox off for containerized runs, deterministic font rendering).
    pub async fn launch(settings: &BrowserConfig) -> Result<Self> {
        let config = ChromiumConfig::builder()
            .window_size(settings.viewport_width, settings.viewport_height)
            .arg("--no-sandbox")
            .arg("--disable-setuid-sandbox")
            .arg("--font-render-hinting=none")
            .build()
            .map_err(|e| anyhow::anyhow!("invalid browser config: {e}"))?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .context("Failed to launch headless Chrome")?;

        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        Ok(Self {
            browser,
            handler_task,
            settings: settings.clone(),
        })
    }

    /// Shuts the browser down and reaps the CDP event loop.
    pub async fn close(mut self) {
        let _ = self.browser.close().await;
        let _ = self.browser.wait().await;
        self.handler_task.abort();
    }

    async fn render_on(&self, page: &Page, url: &str) -> Result<Vec<u8>, GenerationReason> {
        let nav_timeout = Duration::from_secs(self.settings.nav_timeout_secs);

        // Fixed viewport, screen media: the PDF must match what the screen
        // shows, not the print stylesheet.
        page.execute(SetDeviceMetricsOverrideParams::new(
            i64::from(self.settings.viewport_width),
            i64::from(self.settings.viewport_height),
            1.0,
            false,
        ))
        .await
        .map_err(|e| GenerationReason::NavigationFailed(e.to_string()))?;
        page.execute(SetEmulatedMediaParams {
            media: Some("screen".to_string()),
            ..Default::default()
        })
        .await
        .map_err(|e| GenerationReason::NavigationFailed(e.to_string()))?;

        // The lifecycle listener must be registered before navigating or
        // the idle event could slip past it.
        page.execute(SetLifecycleEventsEnabledParams::new(true))
            .await
            .map_err(|e| GenerationReason::NavigationFailed(e.to_string()))?;
        let mut lifecycle = page
            .event_listener::<EventLifecycleEvent>()
            .await
            .map_err(|e| GenerationReason::NavigationFailed(e.to_string()))?;

        let navigation = async {
            page.goto(url).await?;
            page.wait_for_navigation().await?;
            // Network idle: no in-flight requests for 500ms. Subresources
            // the readiness barrier cannot see (CSS backgrounds, late
            // fetches) must settle before the capture.
            while let Some(event) = lifecycle.next().await {
                if event.name == "networkIdle" {
                    break;
                }
            }
            Ok::<(), chromiumoxide::error::CdpError>(())
        };
        match tokio::time::timeout(nav_timeout, navigation).await {
            Err(_) => {
                return Err(GenerationReason::NavigationFailed(format!(
                    "timed out after {}s loading {url}",
                    nav_timeout.as_secs()
                )))
            }
            Ok(Err(e)) => return Err(GenerationReason::NavigationFailed(e.to_string())),
            Ok(Ok(())) => {}
        }

        // Visual-readiness barrier: fonts + images settled.
        page.evaluate_function(READINESS_BARRIER_JS)
            .await
            .map_err(|e| GenerationReason::CaptureFailed(e.to_string()))?;

        let height: f64 = page
            .evaluate_function(CONTENT_HEIGHT_JS)
            .await
            .map_err(|e| GenerationReason::CaptureFailed(e.to_string()))?
            .into_value()
            .map_err(|e| GenerationReason::CaptureFailed(e.to_string()))?;
        if height <= 0.0 {
            return Err(GenerationReason::ZeroHeight);
        }

        page.evaluate_function(STRIP_PRINT_MARGINS_JS)
            .await
            .map_err(|e| GenerationReason::CaptureFailed(e.to_string()))?;

        // Single page, exact extent: no pagination, no headers or footers.
        let params = PrintToPdfParams {
            print_background: Some(true),
            prefer_css_page_size: Some(true),
            paper_width: Some(f64::from(self.settings.viewport_width) / CSS_PPI),
            paper_height: Some(height / CSS_PPI),
            margin_top: Some(0.0),
            margin_bottom: Some(0.0),
            margin_left: Some(0.0),
            margin_right: Some(0.0),
            ..Default::default()
        };
        page.pdf(params)
            .await
            .map_err(|e| GenerationReason::CaptureFailed(e.to_string()))
    }
}

#[async_trait]
impl PageRenderer for Renderer {
    /// Renders one document in a fresh page, under this renderer's own
    /// wall-clock budget. The timeout wraps only the render work, never the
    /// page handle, so even a timed-out render closes its page and cannot
    /// leak the session into the next document.
    async fn render_pdf(&self, url: &str) -> Result<Vec<u8>, GenerationReason> {
        let budget = Duration::from_secs(self.settings.render_timeout_secs);
        let page = self
            .browser
            .new_page("about:blank")
            .await
            .map_err(|e| GenerationReason::NavigationFailed(e.to_string()))?;

        let result = match tokio::time::timeout(budget, self.render_on(&page, url)).await {
            Err(_) => Err(GenerationReason::Timeout(budget.as_secs())),
            Ok(result) => result,
        };
        let _ = page.close().await;
        result
    }
}

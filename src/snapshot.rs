//! Batch snapshot generation.
//!
//! Walks the backend's post list and captures one PDF per post by driving a
//! headless browser against the post's own print view. The print view has
//! already resolved every media reference for the public context, so the
//! capture is a pure "render what a reader would see" step.
//!
//! One document's failure never aborts the batch: each post gets an
//! independent scoped browser session with a wall-clock budget, and the run
//! ends with a per-slug summary. Only a missing public base address is
//! fatal up front, since no document could succeed without it.

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use thiserror::Error;

use crate::backend::BackendClient;
use crate::browser::Renderer;
use crate::config::Config;
use crate::models::Post;
use crate::store::ArtifactStore;

/// Why one document's snapshot could not be generated.
#[derive(Debug, Error)]
pub enum GenerationReason {
    #[error("render timed out after {0}s")]
    Timeout(u64),
    #[error("document not found")]
    NotFound,
    #[error("rendered page has zero height")]
    ZeroHeight,
    #[error("navigation failed: {0}")]
    NavigationFailed(String),
    #[error("capture failed: {0}")]
    CaptureFailed(String),
    #[error("artifact store: {0}")]
    Store(String),
}

/// A per-document generation failure. Recoverable at the batch level:
/// logged, skipped, and reported in the final summary.
#[derive(Debug, Error)]
#[error("{slug}: {reason}")]
pub struct GenerationError {
    pub slug: String,
    pub reason: GenerationReason,
}

/// One rendered page → PDF bytes. Implemented by the chromiumoxide-backed
/// [`Renderer`]; batch semantics are written against this seam so they can
/// be tested without a browser.
#[async_trait]
pub trait PageRenderer: Send + Sync {
    async fn render_pdf(&self, url: &str) -> Result<Vec<u8>, GenerationReason>;
}

/// Outcome of one batch run.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub generated: Vec<String>,
    pub failed: Vec<GenerationError>,
}

/// Slack granted on top of the per-document budget before the batch-level
/// backstop fires. The renderer enforces its own budget internally so it
/// can clean up its session; the backstop only catches a renderer that
/// misses its own deadline.
const RENDER_BACKSTOP_GRACE: Duration = Duration::from_secs(5);

/// Renders and stores a snapshot for every post, sequentially, against one
/// shared renderer. Failures are isolated per document.
pub async fn generate_batch(
    renderer: &dyn PageRenderer,
    store: &ArtifactStore,
    site_base: &str,
    posts: &[Post],
    render_timeout: Duration,
) -> BatchReport {
    let mut report = BatchReport::default();
    let backstop = render_timeout + RENDER_BACKSTOP_GRACE;

    for post in posts {
        let url = print_view_url(site_base, &post.slug);
        let result = tokio::time::timeout(backstop, renderer.render_pdf(&url)).await;

        let outcome = match result {
            Err(_) => Err(GenerationReason::Timeout(render_timeout.as_secs())),
            Ok(Err(reason)) => Err(reason),
            Ok(Ok(bytes)) => store
                .save(&post.slug, &bytes)
                .await
                .map_err(|e| GenerationReason::Store(e.to_string())),
        };

        match outcome {
            Ok(path) => {
                println!("  {} -> {}", post.slug, path.display());
                report.generated.push(post.slug.clone());
            }
            Err(reason) => {
                let err = GenerationError {
                    slug: post.slug.clone(),
                    reason,
                };
                eprintln!("  {} FAILED: {}", err.slug, err.reason);
                report.failed.push(err);
            }
        }
    }

    report
}

/// The print view address the browser navigates to for `slug`.
pub fn print_view_url(site_base: &str, slug: &str) -> String {
    format!("{}/posts/{}/print", site_base.trim_end_matches('/'), slug)
}

/// `press generate` — snapshot every published post (or one, with
/// `--slug`), writing artifacts to the configured directory.
pub async fn run_generate(config: &Config, slug: Option<String>, dry_run: bool) -> Result<()> {
    // No document can succeed without a public base: media inside the
    // artifacts and the print view itself resolve against it.
    config.api.require_public_base()?;

    let client = BackendClient::new(config)?;
    let mut posts = client.list_posts().await?;

    let mut missing_filter = None;
    if let Some(ref wanted) = slug {
        posts.retain(|p| p.slug == *wanted);
        if posts.is_empty() {
            missing_filter = Some(wanted.clone());
        }
    }

    if dry_run {
        println!("generate (dry-run)");
        for post in &posts {
            println!("  {} <- {}", post.slug, print_view_url(&config.site.base, &post.slug));
        }
        println!("  posts: {}", posts.len());
        return Ok(());
    }

    println!("generate");
    let store = ArtifactStore::new(config.artifacts.dir.clone());
    let render_timeout = Duration::from_secs(config.browser.render_timeout_secs);

    let mut report = if posts.is_empty() {
        BatchReport::default()
    } else {
        let renderer = Renderer::launch(&config.browser).await?;
        let report = generate_batch(
            &renderer,
            &store,
            &config.site.base,
            &posts,
            render_timeout,
        )
        .await;
        renderer.close().await;
        report
    };

    // A --slug that matched nothing is a per-document not-found, reported
    // in the same shape as any other failure.
    if let Some(wanted) = missing_filter {
        report.failed.push(GenerationError {
            slug: wanted,
            reason: GenerationReason::NotFound,
        });
    }

    println!("  generated: {}", report.generated.len());
    println!("  failed: {}", report.failed.len());
    for err in &report.failed {
        println!("    {} ({})", err.slug, err.reason);
    }
    println!("ok");
    Ok(())
}

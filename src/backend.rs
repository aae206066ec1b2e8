//! Backend API client.
//!
//! The backend owns post persistence, asset storage, and on-demand snapshot
//! generation; this crate only consumes it. All calls here go over the
//! internal base address. Addresses handed to remote clients (the redirect
//! target for on-demand generation) are built from the public base instead,
//! via [`on_demand_snapshot_url`].

use std::time::Duration;

use anyhow::{Context, Result};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use reqwest::StatusCode;

use crate::config::Config;
use crate::models::Post;

/// URL path-segment encoding; keeps the characters valid slugs are made of.
const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'_').remove(b'.');

pub struct BackendClient {
    http: reqwest::Client,
    base: String,
}

impl BackendClient {
    /// Creates a client for the backend API over the internal base address.
    pub fn new(config: &Config) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.api.request_timeout_secs))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            http,
            base: config.api.internal_base.clone(),
        })
    }

    /// Lists published posts (`GET /api/posts`), newest first.
    pub async fn list_posts(&self) -> Result<Vec<Post>> {
        let url = format!("{}/api/posts", self.base);
        let resp = self
            .http
            .get(&url)
            .send()
            .await
            .with_context(|| format!("Failed to reach backend at {url}"))?;
        if !resp.status().is_success() {
            anyhow::bail!("Backend returned {} for {url}", resp.status());
        }
        resp.json().await.context("Invalid post list payload")
    }

    /// Fetches one post by slug (`GET /api/posts/slug/{slug}`).
    /// A 404 is not an error; it returns `None`.
    pub async fn get_post(&self, slug: &str) -> Result<Option<Post>> {
        let url = format!("{}/api/posts/slug/{}", self.base, encode_segment(slug));
        let resp = self
            .http
            .get(&url)
            .send()
            .await
            .with_context(|| format!("Failed to reach backend at {url}"))?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !resp.status().is_success() {
            anyhow::bail!("Backend returned {} for {url}", resp.status());
        }
        Ok(Some(resp.json().await.context("Invalid post payload")?))
    }
}

/// The backend's on-demand snapshot endpoint for `slug`, addressed so that
/// a remote client can follow it. Used as the redirect target when no
/// pre-generated artifact exists.
pub fn on_demand_snapshot_url(public_base: &str, slug: &str) -> String {
    format!(
        "{}/api/posts/slug/{}/pdf",
        public_base.trim_end_matches('/'),
        encode_segment(slug)
    )
}

fn encode_segment(s: &str) -> String {
    utf8_percent_encode(s, PATH_SEGMENT).to_string()
}

/// `press posts` — prints the published posts the backend knows about.
pub async fn run_posts(config: &Config) -> Result<()> {
    let client = BackendClient::new(config)?;
    let posts = client.list_posts().await?;

    println!("posts ({})", posts.len());
    for post in &posts {
        println!("  {}  [{}]  {}", post.slug, post.source_type, post.title);
    }
    println!("ok");
    Ok(())
}

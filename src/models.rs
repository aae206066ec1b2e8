//! Core data types shared across the snapshot pipeline.
//!
//! [`Post`] and [`MediaRef`] mirror the JSON shapes returned by the backend
//! API; [`Artifact`] is what the store hands back for a generated snapshot.

use chrono::{DateTime, Utc};
use serde::Deserialize;

/// A published post as returned by the backend API.
///
/// When `content_html` is present it is authoritative for rendering;
/// otherwise `content_text` (markdown) is rendered instead.
#[derive(Debug, Clone, Deserialize)]
pub struct Post {
    pub id: String,
    pub slug: String,
    pub title: String,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub content_text: Option<String>,
    #[serde(default)]
    pub content_html: Option<String>,
    #[serde(default)]
    pub images: Vec<MediaRef>,
    /// Provenance: `"upload"`, `"external"`, or `"manual"`.
    pub source_type: String,
    #[serde(default)]
    pub source_url: Option<String>,
}

/// A single embedded-media pointer within a post: an address plus an
/// optional label. The address may be in any of the storage conventions
/// understood by [`crate::rewrite`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MediaRef {
    pub url: String,
    #[serde(default)]
    pub alt: Option<String>,
}

/// A generated snapshot for one slug: immutable PDF bytes plus metadata.
///
/// At most one artifact exists per slug; regeneration overwrites it.
#[derive(Debug, Clone)]
pub struct Artifact {
    pub slug: String,
    pub bytes: Vec<u8>,
    pub content_type: &'static str,
    pub generated_at: DateTime<Utc>,
}

/// Returns true if `slug` is safe to use as a storage key and URL path
/// segment. Slugs are the sole external key for snapshot lookup, so
/// anything that could escape the artifact directory is rejected here.
pub fn is_valid_slug(slug: &str) -> bool {
    !slug.is_empty()
        && slug
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

//! Durable artifact storage.
//!
//! One PDF per slug, stored as `<dir>/<slug>.pdf` under the public asset
//! directory so a static file server can also serve it directly.
//! Regeneration is a destructive overwrite; no history is kept.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use tokio::fs;

use crate::models::{is_valid_slug, Artifact};

/// Content type every served artifact must declare.
pub const PDF_CONTENT_TYPE: &str = "application/pdf";

/// Leading bytes of every well-formed PDF.
const PDF_MAGIC: &[u8] = b"%PDF-";

#[derive(Debug, Clone)]
pub struct ArtifactStore {
    dir: PathBuf,
}

impl ArtifactStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Storage path for `slug`. Callers must validate the slug first; this
    /// only joins, it does not sanitize.
    pub fn path_for(&self, slug: &str) -> PathBuf {
        self.dir.join(format!("{slug}.pdf"))
    }

    /// Persists `bytes` as the current artifact for `slug`, overwriting
    /// any previous one. Creates the artifact directory on first use.
    pub async fn save(&self, slug: &str, bytes: &[u8]) -> Result<PathBuf> {
        if !is_valid_slug(slug) {
            anyhow::bail!("refusing to store artifact under invalid slug: {slug:?}");
        }
        fs::create_dir_all(&self.dir)
            .await
            .with_context(|| format!("Failed to create artifact dir {}", self.dir.display()))?;
        let path = self.path_for(slug);
        fs::write(&path, bytes)
            .await
            .with_context(|| format!("Failed to write artifact {}", path.display()))?;
        Ok(path)
    }

    /// Loads the current artifact for `slug`, if one exists and is a real
    /// PDF. A file that does not carry the PDF magic (a truncated write, a
    /// stray file dropped in the directory) is treated as absent — serving
    /// it with a PDF content type would violate the artifact contract.
    pub async fn load(&self, slug: &str) -> Result<Option<Artifact>> {
        if !is_valid_slug(slug) {
            return Ok(None);
        }
        let path = self.path_for(slug);
        let bytes = match fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to read {}", path.display()))
            }
        };
        if !bytes.starts_with(PDF_MAGIC) {
            return Ok(None);
        }
        let generated_at = modified_time(&path).await.unwrap_or_else(Utc::now);
        Ok(Some(Artifact {
            slug: slug.to_string(),
            bytes,
            content_type: PDF_CONTENT_TYPE,
            generated_at,
        }))
    }
}

async fn modified_time(path: &Path) -> Option<DateTime<Utc>> {
    let meta = fs::metadata(path).await.ok()?;
    let modified = meta.modified().ok()?;
    Some(DateTime::<Utc>::from(modified))
}

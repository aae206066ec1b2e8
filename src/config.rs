use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::rewrite::Resolver;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub api: ApiConfig,
    pub site: SiteConfig,
    pub server: ServerConfig,
    pub artifacts: ArtifactsConfig,
    #[serde(default)]
    pub browser: BrowserConfig,
}

/// Base addresses of the backend API for the two render contexts.
///
/// `internal_base` is how this process reaches the backend (private network
/// address); `public_base` is what remote clients and generated artifacts
/// dereference. `public_base` may be absent for rewriter-only use, but the
/// snapshot generator and the snapshot route cannot operate without it.
#[derive(Debug, Deserialize, Clone)]
pub struct ApiConfig {
    pub internal_base: String,
    #[serde(default)]
    pub public_base: Option<String>,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_request_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct SiteConfig {
    /// Origin where this server's print views are reachable by the
    /// rendering browser (e.g. `http://localhost:3001`).
    pub base: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub bind: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ArtifactsConfig {
    /// Directory holding one `<slug>.pdf` per generated snapshot, laid out
    /// so a static file server can serve it directly when present.
    pub dir: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BrowserConfig {
    #[serde(default = "default_viewport_width")]
    pub viewport_width: u32,
    #[serde(default = "default_viewport_height")]
    pub viewport_height: u32,
    #[serde(default = "default_nav_timeout_secs")]
    pub nav_timeout_secs: u64,
    /// Wall-clock budget for one document's full render, navigation
    /// through PDF bytes. A hung page becomes a per-document timeout
    /// failure instead of stalling the batch.
    #[serde(default = "default_render_timeout_secs")]
    pub render_timeout_secs: u64,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            viewport_width: default_viewport_width(),
            viewport_height: default_viewport_height(),
            nav_timeout_secs: default_nav_timeout_secs(),
            render_timeout_secs: default_render_timeout_secs(),
        }
    }
}

fn default_viewport_width() -> u32 {
    1200
}
fn default_viewport_height() -> u32 {
    800
}
fn default_nav_timeout_secs() -> u64 {
    30
}
fn default_render_timeout_secs() -> u64 {
    60
}

impl ApiConfig {
    /// The public base address, or a configuration error if unset.
    ///
    /// Callers that emit addresses for remote clients (generator, snapshot
    /// route) must go through this so the absence fails fast and uniformly.
    pub fn require_public_base(&self) -> Result<&str> {
        self.public_base.as_deref().ok_or_else(|| {
            anyhow::anyhow!(
                "public base address not configured: set [api].public_base or PUBLIC_API_BASE"
            )
        })
    }
}

impl Config {
    /// Builds the context → base address mapping used by every resolution
    /// call. Requires the public base; constructed once at startup.
    pub fn resolver(&self) -> Result<Resolver> {
        let public = self.api.require_public_base()?;
        Ok(Resolver::new(self.api.internal_base.clone(), public))
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let mut config: Config =
        toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    // Base addresses may come from the environment (deployment platforms
    // inject them); env wins over the file.
    if let Ok(v) = std::env::var("INTERNAL_API_BASE") {
        if !v.trim().is_empty() {
            config.api.internal_base = v;
        }
    }
    if let Ok(v) = std::env::var("PUBLIC_API_BASE") {
        if !v.trim().is_empty() {
            config.api.public_base = Some(v);
        }
    }

    config.api.internal_base = normalize_base(&config.api.internal_base);
    config.api.public_base = config
        .api
        .public_base
        .as_deref()
        .map(normalize_base)
        .filter(|s| !s.is_empty());
    config.site.base = normalize_base(&config.site.base);

    if config.api.internal_base.is_empty() {
        anyhow::bail!("api.internal_base must not be empty");
    }
    if config.site.base.is_empty() {
        anyhow::bail!("site.base must not be empty");
    }
    if config.browser.viewport_width == 0 {
        anyhow::bail!("browser.viewport_width must be > 0");
    }
    if config.browser.render_timeout_secs == 0 {
        anyhow::bail!("browser.render_timeout_secs must be > 0");
    }

    Ok(config)
}

/// Strips surrounding whitespace and trailing slashes so bases join
/// cleanly with root-relative paths.
fn normalize_base(base: &str) -> String {
    base.trim().trim_end_matches('/').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(content: &str) -> (tempfile::TempDir, PathBuf) {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("press.toml");
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(content.as_bytes()).unwrap();
        (tmp, path)
    }

    const MINIMAL: &str = r#"
[api]
internal_base = "http://server:8000/"

[site]
base = "http://localhost:3001"

[server]
bind = "127.0.0.1:3001"

[artifacts]
dir = "public/blog"
"#;

    #[test]
    fn test_minimal_config_loads_with_defaults() {
        let (_tmp, path) = write_config(MINIMAL);
        let cfg = load_config(&path).unwrap();
        assert_eq!(cfg.api.internal_base, "http://server:8000");
        assert!(cfg.api.public_base.is_none());
        assert_eq!(cfg.browser.viewport_width, 1200);
        assert_eq!(cfg.browser.render_timeout_secs, 60);
    }

    #[test]
    fn test_public_base_trailing_slash_trimmed() {
        let with_public = MINIMAL.replace(
            "internal_base = \"http://server:8000/\"",
            "internal_base = \"http://server:8000/\"\npublic_base = \"https://api.example//\"",
        );
        let (_tmp, path) = write_config(&with_public);
        let cfg = load_config(&path).unwrap();
        assert_eq!(cfg.api.require_public_base().unwrap(), "https://api.example");
    }

    #[test]
    fn test_missing_public_base_is_an_error_when_required() {
        let (_tmp, path) = write_config(MINIMAL);
        let cfg = load_config(&path).unwrap();
        let err = cfg.api.require_public_base().unwrap_err();
        assert!(err.to_string().contains("public base"));
        assert!(cfg.resolver().is_err());
    }

    #[test]
    fn test_zero_viewport_rejected() {
        let (_tmp, path) = write_config(&format!("{MINIMAL}\n[browser]\nviewport_width = 0\n"));
        assert!(load_config(&path).is_err());
    }
}

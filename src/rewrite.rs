//! Media reference resolution.
//!
//! Posts accumulate media addresses in several storage conventions from
//! different eras of the product: legacy filesystem paths under
//! `/static/images/` and `/static/uploads/`, the current Redis-backed
//! key-value convention under `/static-redis/` with kind-qualified keys
//! (`image:…`, `upload:…`), and plain root-relative paths. Browsers and the
//! PDF pipeline can only dereference absolute addresses, so every reference
//! must be resolved against the base address of the requesting context
//! before the markup leaves this process.
//!
//! Resolution is deliberately best-effort: an address that matches no known
//! convention is passed through unchanged rather than rejected, on the
//! assumption it is already correct. Every rewritten form is absolute, so
//! resolving already-resolved content is a no-op — the rendering path and
//! the snapshot path both run the rewriter without coordinating.
//!
//! The matching order is encoded once in [`classify`]; the legacy roots
//! must be tested before the generic root-relative fallback or they would
//! be silently shadowed.

use std::borrow::Cow;
use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::models::MediaRef;

/// Historical filesystem root for scraped/extracted images.
pub const LEGACY_IMAGES_ROOT: &str = "/static/images/";
/// Historical filesystem root for user uploads.
pub const LEGACY_UPLOADS_ROOT: &str = "/static/uploads/";
/// Current key-value store root; keys are kind-qualified (`image:x.png`).
pub const KV_ROOT: &str = "/static-redis/";

/// The network vantage point a reference is being resolved for.
///
/// Each context maps to exactly one base address; same reference + same
/// context always yields the same resolved address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderContext {
    /// The resolving process reaches the backend over a private address
    /// (e.g. a compose-network hostname). Never emitted to remote clients.
    Internal,
    /// The output will be dereferenced by an external client: viewed in a
    /// browser, embedded in share metadata, or burned into a PDF artifact.
    Public,
}

/// Classification of a raw media address, in match-priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RefKind<'a> {
    /// `http(s)://…` — used verbatim, never rewritten. This also covers
    /// previously resolved addresses, which is what makes resolution
    /// idempotent.
    Absolute,
    /// `/static/images/<name>` — legacy image, moves to `image:<name>`.
    LegacyImage(&'a str),
    /// `/static/uploads/<name>` — legacy upload, moves to `upload:<name>`.
    LegacyUpload(&'a str),
    /// `/static-redis/<kind>:<name>` — already in the current convention,
    /// only needs the base prefix.
    KvKey,
    /// Any other root-relative path — generic base-prefix fallback.
    RootRelative,
    /// Not absolute, not root-relative. Unclassifiable; left unchanged.
    Opaque,
}

fn classify(url: &str) -> RefKind<'_> {
    if url.starts_with("http://") || url.starts_with("https://") {
        return RefKind::Absolute;
    }
    if let Some(name) = url.strip_prefix(LEGACY_IMAGES_ROOT) {
        return RefKind::LegacyImage(name);
    }
    if let Some(name) = url.strip_prefix(LEGACY_UPLOADS_ROOT) {
        return RefKind::LegacyUpload(name);
    }
    if url.starts_with(KV_ROOT) {
        return RefKind::KvKey;
    }
    if url.starts_with('/') {
        return RefKind::RootRelative;
    }
    RefKind::Opaque
}

/// `src="…"` attributes in rendered HTML. The value may carry leading
/// whitespace (seen in scraped content), which is dropped on rewrite.
static SRC_ATTR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)src\s*=\s*"\s*([^"]*)""#).expect("valid src regex"));

/// Markdown image destinations: `![alt](url)`.
static MD_IMAGE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"!\[([^\]]*)\]\(\s*([^)\s]+)\s*\)").expect("valid md regex"));

/// The `RenderContext → base address` mapping, constructed once at process
/// start from configuration and passed explicitly to every resolution call.
#[derive(Debug, Clone)]
pub struct Resolver {
    internal_base: String,
    public_base: String,
}

impl Resolver {
    /// Creates a resolver from the two configured base addresses.
    /// Trailing slashes are trimmed so joining is always `base + "/path"`.
    pub fn new(internal_base: impl Into<String>, public_base: impl Into<String>) -> Self {
        Self {
            internal_base: trim_base(internal_base.into()),
            public_base: trim_base(public_base.into()),
        }
    }

    /// The base address for `context`.
    pub fn base(&self, context: RenderContext) -> &str {
        match context {
            RenderContext::Internal => &self.internal_base,
            RenderContext::Public => &self.public_base,
        }
    }

    /// Resolves a single media address for `context`.
    ///
    /// Total: every input maps to exactly one output, and unrecognized
    /// inputs map to themselves. Idempotent: resolved output is absolute
    /// and passes through unchanged on a second call.
    pub fn resolve_url<'a>(&self, url: &'a str, context: RenderContext) -> Cow<'a, str> {
        let base = self.base(context);
        match classify(url) {
            RefKind::Absolute | RefKind::Opaque => Cow::Borrowed(url),
            RefKind::LegacyImage(name) => Cow::Owned(format!("{base}{KV_ROOT}image:{name}")),
            RefKind::LegacyUpload(name) => Cow::Owned(format!("{base}{KV_ROOT}upload:{name}")),
            RefKind::KvKey | RefKind::RootRelative => Cow::Owned(format!("{base}{url}")),
        }
    }

    /// Resolves every `src="…"` attribute value in an HTML fragment.
    pub fn resolve_html(&self, html: &str, context: RenderContext) -> String {
        SRC_ATTR_RE
            .replace_all(html, |caps: &Captures| {
                format!(r#"src="{}""#, self.resolve_url(&caps[1], context))
            })
            .into_owned()
    }

    /// Resolves every markdown image destination (`![alt](url)`) in a
    /// markdown document. Link destinations are left alone; only images
    /// are media references.
    pub fn resolve_markdown(&self, markdown: &str, context: RenderContext) -> String {
        MD_IMAGE_RE
            .replace_all(markdown, |caps: &Captures| {
                format!("![{}]({})", &caps[1], self.resolve_url(&caps[2], context))
            })
            .into_owned()
    }

    /// Resolves a discrete list of media references, preserving order and
    /// labels. Produces the same addresses as the inline forms.
    pub fn resolve_refs(&self, refs: &[MediaRef], context: RenderContext) -> Vec<MediaRef> {
        refs.iter()
            .map(|r| MediaRef {
                url: self.resolve_url(&r.url, context).into_owned(),
                alt: r.alt.clone(),
            })
            .collect()
    }
}

fn trim_base(mut base: String) -> String {
    while base.ends_with('/') {
        base.pop();
    }
    base
}

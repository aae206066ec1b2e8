//! Print view rendering.
//!
//! The print view is the page the snapshot browser navigates to: a
//! self-contained HTML rendering of one post with every media reference
//! already resolved for the requested context. `content_html` is
//! authoritative when the backend stored it; otherwise the markdown body
//! is rendered with pulldown-cmark. The extracted-images gallery is
//! appended after the body, as on the reader-facing page.

use pulldown_cmark::{html, Options, Parser};

use crate::models::Post;
use crate::rewrite::{RenderContext, Resolver};

/// Renders the full print-view HTML document for `post`.
pub fn render_print_view(post: &Post, resolver: &Resolver, context: RenderContext) -> String {
    let title = html_escape::encode_safe(&post.title);
    let description = post.summary.as_deref().unwrap_or("");
    let og_description: String = description.chars().take(180).collect();

    let body = match (&post.content_html, &post.content_text) {
        (Some(content_html), _) => resolver.resolve_html(content_html, context),
        (None, Some(markdown)) => {
            let resolved = resolver.resolve_markdown(markdown, context);
            markdown_to_html(&resolved)
        }
        (None, None) => String::new(),
    };

    let gallery = render_gallery(post, resolver, context);

    format!(
        r#"<!doctype html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>{title}</title>
<meta property="og:title" content="{og_title}">
<meta property="og:description" content="{og_description}">
<style>
body {{ margin: 0; font-family: system-ui, sans-serif; color: #1a1a1a; background: #fff; }}
main {{ max-width: 1120px; margin: 0 auto; padding: 40px; }}
article img {{ max-width: 100%; height: auto; }}
.gallery {{ display: grid; gap: 12px; grid-template-columns: repeat(auto-fill, minmax(160px, 1fr)); }}
.gallery img {{ width: 100%; height: 160px; object-fit: cover; }}
</style>
</head>
<body>
<main>
<h1>{title}</h1>
<article>{body}</article>
{gallery}
</main>
</body>
</html>
"#,
        og_title = html_escape::encode_double_quoted_attribute(&post.title),
        og_description = html_escape::encode_double_quoted_attribute(&og_description),
    )
}

fn render_gallery(post: &Post, resolver: &Resolver, context: RenderContext) -> String {
    if post.images.is_empty() {
        return String::new();
    }
    let items: String = resolver
        .resolve_refs(&post.images, context)
        .iter()
        .map(|media| {
            format!(
                r#"<img src="{}" alt="{}">"#,
                html_escape::encode_double_quoted_attribute(&media.url),
                html_escape::encode_double_quoted_attribute(media.alt.as_deref().unwrap_or("")),
            )
        })
        .collect();
    format!("<section class=\"gallery\">{items}</section>")
}

fn markdown_to_html(markdown: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    let parser = Parser::new_ext(markdown, options);
    let mut out = String::new();
    html::push_html(&mut out, parser);
    out
}

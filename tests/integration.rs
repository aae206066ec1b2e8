//! End-to-end tests for the HTTP surface: print views and the two-tier
//! snapshot read path. The backend API is stubbed with a small in-process
//! axum router; no browser is involved (batch semantics are covered by
//! unit tests against the renderer seam).

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::{extract::Path as AxumPath, http::StatusCode, routing::get, Json, Router};
use tempfile::TempDir;

use pressroom::config::{
    ApiConfig, ArtifactsConfig, BrowserConfig, Config, ServerConfig, SiteConfig,
};
use pressroom::server::{router, AppState};
use pressroom::store::ArtifactStore;

/// Serves a fixed post list the way the backend API would.
async fn spawn_stub_backend() -> SocketAddr {
    async fn list_posts() -> Json<serde_json::Value> {
        Json(serde_json::json!([post_json("hello-world")]))
    }

    async fn get_post(
        AxumPath(slug): AxumPath<String>,
    ) -> Result<Json<serde_json::Value>, StatusCode> {
        if slug == "hello-world" {
            Ok(Json(post_json("hello-world")))
        } else {
            Err(StatusCode::NOT_FOUND)
        }
    }

    fn post_json(slug: &str) -> serde_json::Value {
        serde_json::json!({
            "id": "11111111-2222-3333-4444-555555555555",
            "title": "Hello World",
            "slug": slug,
            "source_type": "upload",
            "content_html": "<p><img src=\"/static/images/cat.png\"></p>",
            "images": [{"url": "/static/uploads/chart.png", "alt": "chart"}]
        })
    }

    let app = Router::new()
        .route("/api/posts", get(list_posts))
        .route("/api/posts/slug/{slug}", get(get_post));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

fn test_config(backend: SocketAddr, artifacts_dir: PathBuf, public_base: Option<&str>) -> Config {
    Config {
        api: ApiConfig {
            internal_base: format!("http://{backend}"),
            public_base: public_base.map(str::to_string),
            request_timeout_secs: 5,
        },
        site: SiteConfig {
            base: "http://localhost:3001".to_string(),
        },
        server: ServerConfig {
            bind: "127.0.0.1:0".to_string(),
        },
        artifacts: ArtifactsConfig { dir: artifacts_dir },
        browser: BrowserConfig::default(),
    }
}

/// Binds the pressroom router on an ephemeral port and returns its base URL.
async fn spawn_server(config: Config) -> String {
    let state = AppState::new(Arc::new(config)).unwrap();
    let app = router(state);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

/// Redirects must be observed, not followed.
fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap()
}

#[tokio::test]
async fn test_health() {
    let backend = spawn_stub_backend().await;
    let tmp = TempDir::new().unwrap();
    let base = spawn_server(test_config(backend, tmp.path().into(), Some("https://api.example"))).await;

    let resp = client().get(format!("{base}/health")).send().await.unwrap();
    assert_eq!(resp.status(), 200);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_snapshot_served_from_cache() {
    let backend = spawn_stub_backend().await;
    let tmp = TempDir::new().unwrap();
    let store = ArtifactStore::new(tmp.path());
    store.save("hello-world", b"%PDF-1.4 cached bytes").await.unwrap();
    let base = spawn_server(test_config(backend, tmp.path().into(), Some("https://api.example"))).await;

    let resp = client()
        .get(format!("{base}/posts/hello-world/snapshot"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(
        resp.headers().get("content-type").unwrap(),
        "application/pdf"
    );
    assert_eq!(
        resp.headers().get("content-disposition").unwrap(),
        "inline; filename=\"hello-world.pdf\""
    );
    assert_eq!(resp.bytes().await.unwrap().as_ref(), b"%PDF-1.4 cached bytes");
}

#[tokio::test]
async fn test_snapshot_miss_redirects_to_on_demand_generation() {
    let backend = spawn_stub_backend().await;
    let tmp = TempDir::new().unwrap();
    let base = spawn_server(test_config(backend, tmp.path().into(), Some("https://api.example"))).await;

    let resp = client()
        .get(format!("{base}/posts/hello-world/snapshot"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 307);
    assert_eq!(
        resp.headers().get("location").unwrap(),
        "https://api.example/api/posts/slug/hello-world/pdf"
    );
}

#[tokio::test]
async fn test_snapshot_invalid_artifact_treated_as_miss() {
    let backend = spawn_stub_backend().await;
    let tmp = TempDir::new().unwrap();
    std::fs::write(tmp.path().join("hello-world.pdf"), b"<html>oops</html>").unwrap();
    let base = spawn_server(test_config(backend, tmp.path().into(), Some("https://api.example"))).await;

    let resp = client()
        .get(format!("{base}/posts/hello-world/snapshot"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 307);
}

#[tokio::test]
async fn test_snapshot_without_public_base_is_config_error() {
    let backend = spawn_stub_backend().await;
    let tmp = TempDir::new().unwrap();
    let base = spawn_server(test_config(backend, tmp.path().into(), None)).await;

    let resp = client()
        .get(format!("{base}/posts/hello-world/snapshot"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 500);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "config_error");
}

#[tokio::test]
async fn test_snapshot_cache_hit_works_even_without_public_base() {
    // The redirect address is only needed on a miss; a cached artifact
    // must still be served.
    let backend = spawn_stub_backend().await;
    let tmp = TempDir::new().unwrap();
    let store = ArtifactStore::new(tmp.path());
    store.save("hello-world", b"%PDF-1.4 ok").await.unwrap();
    let base = spawn_server(test_config(backend, tmp.path().into(), None)).await;

    let resp = client()
        .get(format!("{base}/posts/hello-world/snapshot"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
}

#[tokio::test]
async fn test_snapshot_rejects_invalid_slug() {
    let backend = spawn_stub_backend().await;
    let tmp = TempDir::new().unwrap();
    let base = spawn_server(test_config(backend, tmp.path().into(), Some("https://api.example"))).await;

    let resp = client()
        .get(format!("{base}/posts/bad%20slug/snapshot"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "bad_request");
}

#[tokio::test]
async fn test_print_view_resolves_media_for_public_context() {
    let backend = spawn_stub_backend().await;
    let tmp = TempDir::new().unwrap();
    let base = spawn_server(test_config(backend, tmp.path().into(), Some("https://api.example"))).await;

    let resp = client()
        .get(format!("{base}/posts/hello-world/print"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let html = resp.text().await.unwrap();
    assert!(html.contains("src=\"https://api.example/static-redis/image:cat.png\""));
    assert!(html.contains("src=\"https://api.example/static-redis/upload:chart.png\""));
    assert!(!html.contains("src=\"/static/"));
}

#[tokio::test]
async fn test_print_view_internal_context() {
    let backend = spawn_stub_backend().await;
    let tmp = TempDir::new().unwrap();
    let internal = format!("http://{backend}");
    let base = spawn_server(test_config(backend, tmp.path().into(), Some("https://api.example"))).await;

    let resp = client()
        .get(format!("{base}/posts/hello-world/print?context=internal"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let html = resp.text().await.unwrap();
    assert!(html.contains(&format!("src=\"{internal}/static-redis/image:cat.png\"")));
}

#[tokio::test]
async fn test_print_view_without_public_base_is_config_error() {
    let backend = spawn_stub_backend().await;
    let tmp = TempDir::new().unwrap();
    let base = spawn_server(test_config(backend, tmp.path().into(), None)).await;

    let resp = client()
        .get(format!("{base}/posts/hello-world/print"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 500);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "config_error");
}

#[tokio::test]
async fn test_print_view_unknown_post_is_404() {
    let backend = spawn_stub_backend().await;
    let tmp = TempDir::new().unwrap();
    let base = spawn_server(test_config(backend, tmp.path().into(), Some("https://api.example"))).await;

    let resp = client()
        .get(format!("{base}/posts/missing-post/print"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "not_found");
}

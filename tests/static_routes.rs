use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use tempfile::TempDir;
use tower::ServiceExt;

use caption_voice::frontend;

const INDEX_HTML: &str = "<html><body>caption voice</body></html>";
const APP_JS: &str = "console.log('caption voice');";

fn demo_site() -> (TempDir, Router) {
    let dir = tempfile::tempdir().expect("tempdir");
    std::fs::write(dir.path().join("index.html"), INDEX_HTML).expect("write index");
    std::fs::write(dir.path().join("app.js"), APP_JS).expect("write asset");
    let router = Router::new().fallback_service(frontend::spa(dir.path()));
    (dir, router)
}

async fn get(router: Router, uri: &str) -> (StatusCode, String) {
    let response = router
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, String::from_utf8(bytes.to_vec()).unwrap())
}

#[tokio::test]
async fn root_serves_the_index_document() {
    let (_dir, router) = demo_site();
    let (status, body) = get(router, "/").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, INDEX_HTML);
}

#[tokio::test]
async fn existing_asset_is_served_directly() {
    let (_dir, router) = demo_site();
    let (status, body) = get(router, "/app.js").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, APP_JS);
}

#[tokio::test]
async fn unknown_path_falls_back_to_the_index_document() {
    let (_dir, router) = demo_site();
    let (root_status, root_body) = get(router.clone(), "/").await;
    let (status, body) = get(router, "/dashboard/settings").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(root_status, StatusCode::OK);
    assert_eq!(body, root_body);
}

#[tokio::test]
async fn nested_unknown_paths_fall_back_too() {
    let (_dir, router) = demo_site();
    let (status, body) = get(router, "/a/b/c/d").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, INDEX_HTML);
}

//! Integration tests for the templated HTML entry point.

use axum::http::StatusCode;
use upstream_gateway::Credential;

mod common;

const INDEX: &str =
    "<html><head><title>Agency Console</title></head><body><div id=\"app\"></div></body></html>";

fn site_dir() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("index.html"), INDEX).unwrap();
    std::fs::write(dir.path().join("app.css"), "body{margin:0}").unwrap();
    dir
}

#[tokio::test]
async fn entry_point_gains_interceptors_when_credential_present() {
    let dir = site_dir();
    let mut config = common::gateway_config(None, None);
    config.site.root = dir.path().to_string_lossy().into_owned();
    let gateway = common::start_gateway(config, Some(Credential::new("super-secret"))).await;
    common::settle().await;

    let response = common::http_client()
        .get(format!("http://{}/", gateway))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let html = response.text().await.unwrap();
    assert_eq!(html.matches("<script>").count(), 2);
    assert!(html.contains("generativelanguage.googleapis.com"));
    assert!(html.contains("/proxy"));
    // the scripts configure rewriting only; the secret never ships downstream
    assert!(!html.contains("super-secret"));
}

#[tokio::test]
async fn entry_point_is_untouched_without_credential() {
    let dir = site_dir();
    let mut config = common::gateway_config(None, None);
    config.site.root = dir.path().to_string_lossy().into_owned();
    let gateway = common::start_gateway(config, None).await;
    common::settle().await;

    let html = common::http_client()
        .get(format!("http://{}/", gateway))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert_eq!(html, INDEX);
}

#[tokio::test]
async fn static_assets_are_served_from_the_site_root() {
    let dir = site_dir();
    let mut config = common::gateway_config(None, None);
    config.site.root = dir.path().to_string_lossy().into_owned();
    let gateway = common::start_gateway(config, None).await;
    common::settle().await;

    let response = common::http_client()
        .get(format!("http://{}/app.css", gateway))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.text().await.unwrap(), "body{margin:0}");
}

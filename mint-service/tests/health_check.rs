mod common;

use common::TestApp;
use mint_service::services::metrics::{sample_value, LATENCY_GAUGE_NAME};

#[tokio::test]
async fn root_reports_alive() {
    let app = TestApp::spawn(&[]).await;

    let response = app.client.get(app.url("/")).send().await.unwrap();

    assert_eq!(response.status(), 200);
    assert_eq!(response.text().await.unwrap(), "System Alive ✅");
}

#[tokio::test]
async fn health_check_returns_ok() {
    let app = TestApp::spawn(&[]).await;

    let response = app.client.get(app.url("/health")).send().await.unwrap();

    assert_eq!(response.status(), 200);
    assert!(response.headers().contains_key("x-request-id"));
    assert_eq!(response.text().await.unwrap(), "ok");
}

#[tokio::test]
async fn error_route_returns_500() {
    let app = TestApp::spawn(&[]).await;

    let response = app.client.get(app.url("/error")).send().await.unwrap();

    assert_eq!(response.status(), 500);
    assert_eq!(response.text().await.unwrap(), "intentional error");
}

#[tokio::test]
async fn metrics_exposes_latency_sample() {
    let app = TestApp::spawn(&[]).await;

    let response = app.client.get(app.url("/metrics")).send().await.unwrap();

    assert_eq!(response.status(), 200);
    let content_type = response.headers()["content-type"].to_str().unwrap().to_string();
    assert!(content_type.starts_with("text/plain; version=0.0.4"));

    let body = response.text().await.unwrap();
    assert!(body.contains(&format!("# HELP {}", LATENCY_GAUGE_NAME)));
    assert!(body.contains(&format!("# TYPE {} gauge", LATENCY_GAUGE_NAME)));
    let value = sample_value(&body, LATENCY_GAUGE_NAME).expect("sample missing");
    assert!((0.0..1.0).contains(&value));
}

#[tokio::test]
async fn debug_env_masks_secrets() {
    std::env::set_var("MINT_HEALTH_TEST_API_KEY", "do-not-leak");
    std::env::set_var("MINT_HEALTH_TEST_PLAIN", "visible");
    let app = TestApp::spawn(&[]).await;

    let response = app.client.get(app.url("/debug/env")).send().await.unwrap();

    assert_eq!(response.status(), 200);
    let body = response.text().await.unwrap();
    assert!(!body.contains("do-not-leak"));

    let json: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["MINT_HEALTH_TEST_API_KEY"], "***");
    assert_eq!(json["MINT_HEALTH_TEST_PLAIN"], "visible");
}

#[tokio::test]
async fn quiz_page_is_html() {
    let app = TestApp::spawn(&[]).await;

    let response = app
        .client
        .get(app.url("/quiz?token=abc"))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    let content_type = response.headers()["content-type"].to_str().unwrap().to_string();
    assert!(content_type.starts_with("text/html"));
    assert!(response.headers().contains_key("content-security-policy"));
    let body = response.text().await.unwrap();
    assert!(body.contains("name=\"q4\""));
    assert!(body.contains("abc"));
}

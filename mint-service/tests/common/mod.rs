#![allow(dead_code)]

use axum::body::Body;
use axum::http::Request;
use axum::response::Response;
use axum::Router;
use http_body_util::BodyExt;
use mint_service::config::MintConfig;
use mint_service::services::{LatencyGauge, Minter, TraitDeriver};
use mint_service::startup::{build_router, AppState, Application};
use service_core::config::Config as CoreConfig;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tower::ServiceExt;
use uuid::Uuid;

/// A service running on a real listener.
pub struct TestApp {
    pub address: String,
    pub port: u16,
    pub client: reqwest::Client,
}

impl TestApp {
    /// Spawn with configuration read from the given pairs only, never from
    /// the process environment.
    pub async fn spawn(env: &[(&str, &str)]) -> Self {
        let config = config_from(env);
        let app = Application::build(config)
            .await
            .expect("Failed to build test application");

        let port = app.port();
        let address = format!("http://127.0.0.1:{}", port);

        tokio::spawn(async move {
            app.run_until_stopped().await.ok();
        });

        let client = reqwest::Client::new();
        let health_url = format!("{}/health", address);
        for _ in 0..50 {
            if client.get(&health_url).send().await.is_ok() {
                break;
            }
            tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;
        }

        TestApp {
            address,
            port,
            client,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.address, path)
    }
}

pub fn config_from(env: &[(&str, &str)]) -> MintConfig {
    let env: HashMap<String, String> = env
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    MintConfig::from_lookup(CoreConfig { port: 0 }, |key| env.get(key).cloned())
}

/// Router around the given minter, for `oneshot` tests.
pub fn router_with(minter: Minter) -> Router {
    router_with_config(minter, config_from(&[]))
}

pub fn router_with_config(minter: Minter, config: MintConfig) -> Router {
    let state = AppState {
        config: Arc::new(config),
        minter: Arc::new(minter),
        metrics: Arc::new(LatencyGauge::new().expect("Failed to register metrics")),
    };
    build_router(state, None)
}

pub fn deterministic_router() -> Router {
    router_with(Minter::new(TraitDeriver::deterministic()))
}

pub async fn send(router: Router, request: Request<Body>) -> Response {
    router.oneshot(request).await.expect("Request failed")
}

pub fn post_json(path: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(path)
        .header("content-type", "application/json")
        .header("host", "mint.test")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub async fn body_string(response: Response) -> String {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("Failed to read body")
        .to_bytes();
    String::from_utf8(bytes.to_vec()).expect("Body is not UTF-8")
}

pub async fn body_json(response: Response) -> serde_json::Value {
    serde_json::from_str(&body_string(response).await).expect("Body is not JSON")
}

/// Fresh directory under the system temp dir.
pub fn temp_asset_dir() -> PathBuf {
    std::env::temp_dir().join(format!("mint-test-assets-{}", Uuid::new_v4()))
}

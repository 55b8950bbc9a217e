//! Application startup and lifecycle management.

use crate::config::{MintConfig, StorageConfig};
use crate::handlers::{debug, health, metrics, mint, quiz};
use crate::services::providers::gemini::{GeminiConfig, GeminiImageProvider, GeminiTextProvider};
use crate::services::storage::{AssetStore, GcsStore, LocalStore};
use crate::services::{LatencyGauge, Minter, TraitDeriver};
use axum::middleware::from_fn;
use axum::routing::{get, post};
use axum::Router;
use service_core::error::AppError;
use service_core::middleware::{
    panic_response, request_id_middleware, security_headers_middleware, REQUEST_ID_HEADER,
};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

/// Shared application state. Everything in it is built once and read-only.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<MintConfig>,
    pub minter: Arc<Minter>,
    pub metrics: Arc<LatencyGauge>,
}

/// Build the HTTP router.
///
/// `asset_dir` is served under `/assets` when the local store is in use.
pub fn build_router(state: AppState, asset_dir: Option<PathBuf>) -> Router {
    let mut router = Router::new()
        .route("/", get(health::root))
        .route("/health", get(health::health_check))
        .route("/error", get(health::intentional_error))
        .route("/metrics", get(metrics::metrics))
        .route("/debug/env", get(debug::debug_env))
        .route("/quiz", get(quiz::quiz_page))
        .route("/mint", post(mint::mint));

    if let Some(dir) = asset_dir {
        router = router.nest_service("/assets", ServeDir::new(dir));
    }

    router
        .layer(from_fn(security_headers_middleware))
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                let request_id = request
                    .headers()
                    .get(REQUEST_ID_HEADER)
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("-");

                tracing::info_span!(
                    "http_request",
                    request_id = %request_id,
                    method = %request.method(),
                    uri = %request.uri(),
                )
            }),
        )
        .layer(from_fn(request_id_middleware))
        .with_state(state)
}

/// Wire the minter from configuration.
///
/// Text generation follows the presence of an API key. Image generation
/// additionally needs the feature flag and a configured store.
pub async fn build_minter(config: &MintConfig) -> Result<Minter, AppError> {
    let store: Option<Arc<dyn AssetStore>> = match &config.storage {
        StorageConfig::Disabled => None,
        StorageConfig::Gcs(gcs) => {
            let store = GcsStore::new(gcs.clone())
                .map_err(|e| AppError::ConfigError(anyhow::Error::new(e)))?;
            tracing::info!(bucket = %store.bucket(), "Using GCS asset store");
            Some(Arc::new(store))
        }
        StorageConfig::Local { dir } => {
            let store = LocalStore::new(dir.clone(), "/assets")
                .await
                .map_err(|e| AppError::ConfigError(anyhow::Error::new(e)))?;
            tracing::info!(dir = %store.base_path().display(), "Using local asset store");
            Some(Arc::new(store))
        }
    };

    let Some(genai) = &config.genai else {
        tracing::info!("GEMINI_API_KEY not set, deriving horses deterministically");
        let minter = Minter::new(TraitDeriver::deterministic());
        return Ok(match store {
            Some(store) => minter.with_store(store),
            None => minter,
        });
    };

    let gemini_config = GeminiConfig::new(
        genai.api_key.clone(),
        &genai.text_model,
        &genai.image_model,
    );
    let text_provider = GeminiTextProvider::new(gemini_config.clone())
        .map_err(|e| AppError::ConfigError(anyhow::Error::new(e)))?;
    tracing::info!(model = %genai.text_model, "Initialized Gemini text provider");

    let mut minter = Minter::new(TraitDeriver::generative(Arc::new(text_provider)));

    if config.image_generation_enabled() {
        if store.is_some() {
            let image_provider = GeminiImageProvider::new(gemini_config)
                .map_err(|e| AppError::ConfigError(anyhow::Error::new(e)))?;
            tracing::info!(
                model = %genai.image_model,
                attempts = genai.image_retry.attempts,
                "Initialized Gemini image provider"
            );
            minter = minter.with_images(Arc::new(image_provider), genai.image_retry.clone());
        } else {
            tracing::warn!("Image generation enabled but no asset store configured, using SVG cards");
        }
    }

    if let Some(store) = store {
        minter = minter.with_store(store);
    }
    Ok(minter)
}

/// Application container for managing server lifecycle.
pub struct Application {
    port: u16,
    listener: TcpListener,
    router: Router,
}

impl Application {
    /// Build the application with the given configuration.
    ///
    /// Port 0 binds a random port, which tests rely on.
    pub async fn build(config: MintConfig) -> Result<Self, AppError> {
        let addr = SocketAddr::from(([0, 0, 0, 0], config.common.port));
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            tracing::error!("Failed to bind HTTP listener to {}: {}", addr, e);
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();

        let minter = build_minter(&config).await?;
        let metrics = LatencyGauge::new()
            .map_err(|e| AppError::InternalError(anyhow::Error::new(e).context("register metrics")))?;

        let asset_dir = match &config.storage {
            StorageConfig::Local { dir } => Some(dir.clone()),
            _ => None,
        };

        let state = AppState {
            config: Arc::new(config),
            minter: Arc::new(minter),
            metrics: Arc::new(metrics),
        };
        let router = build_router(state, asset_dir);

        tracing::info!("Mint service listening on port {}", port);

        Ok(Self {
            port,
            listener,
            router,
        })
    }

    /// Get the port the server is listening on.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Serve until SIGINT or SIGTERM.
    pub async fn run_until_stopped(self) -> Result<(), std::io::Error> {
        axum::serve(self.listener, self.router)
            .with_graceful_shutdown(shutdown_signal())
            .await
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}

//! The mint pipeline: derive, render, store, link.
//!
//! Each call is independent. Collaborators are shared read-only; nothing
//! here takes a lock or keeps per-request state between calls.

use crate::dtos::AssetMetadata;
use crate::models::{Creature, QuizAnswers};
use crate::services::deriver::TraitDeriver;
use crate::services::providers::ImageProvider;
use crate::services::renderer::{image_prompt, render_svg};
use crate::services::retry::{retry_provider_call, ImageRetry};
use crate::services::storage::{self, AssetStore};
use crate::views::SharePage;
use askama::Template;
use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

/// What kind of artifact a mint produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetKind {
    Svg,
    Png,
}

#[derive(Debug, Clone)]
pub struct MintOutcome {
    pub token_id: Uuid,
    pub creature: Creature,
    /// `None` only when no artifact could be rendered.
    pub asset_kind: Option<AssetKind>,
    pub asset_url: Option<String>,
    pub metadata_url: Option<String>,
    pub permalink: String,
}

struct RenderedAsset {
    kind: AssetKind,
    path: String,
    bytes: Vec<u8>,
    content_type: String,
}

#[derive(Clone)]
pub struct Minter {
    deriver: TraitDeriver,
    image_provider: Option<Arc<dyn ImageProvider>>,
    image_retry: ImageRetry,
    store: Option<Arc<dyn AssetStore>>,
}

impl Minter {
    pub fn new(deriver: TraitDeriver) -> Self {
        Self {
            deriver,
            image_provider: None,
            image_retry: ImageRetry::default(),
            store: None,
        }
    }

    pub fn with_images(mut self, provider: Arc<dyn ImageProvider>, retry: ImageRetry) -> Self {
        self.image_provider = Some(provider);
        self.image_retry = retry;
        self
    }

    pub fn with_store(mut self, store: Arc<dyn AssetStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn storage_enabled(&self) -> bool {
        self.store.is_some()
    }

    pub async fn mint(&self, answers: &QuizAnswers, base_url: &str) -> MintOutcome {
        let creature = self.deriver.derive(answers).await;
        let token_id = Uuid::new_v4();
        let permalink = permalink(base_url, &token_id);

        let (asset_kind, asset_url) = match self.render_asset(&creature, &token_id).await {
            Some(asset) => {
                let url = self
                    .put(&asset.path, asset.bytes, &asset.content_type, base_url)
                    .await;
                (Some(asset.kind), url)
            }
            None => (None, None),
        };

        let metadata_url = if self.storage_enabled() {
            self.store_documents(&creature, &token_id, asset_url.clone(), &permalink, base_url)
                .await
        } else {
            None
        };

        MintOutcome {
            token_id,
            creature,
            asset_kind,
            asset_url,
            metadata_url,
            permalink,
        }
    }

    /// Generated PNG when an image provider and a store are both present,
    /// the SVG card otherwise or when generation fails.
    async fn render_asset(&self, creature: &Creature, token_id: &Uuid) -> Option<RenderedAsset> {
        if let (Some(provider), true) = (&self.image_provider, self.storage_enabled()) {
            let prompt = image_prompt(creature);
            match retry_provider_call(&self.image_retry, "generate_image", || provider.generate(&prompt)).await {
                Ok(image) => {
                    return Some(RenderedAsset {
                        kind: AssetKind::Png,
                        path: storage::image_path(token_id),
                        bytes: image.bytes,
                        content_type: image.mime_type,
                    });
                }
                Err(e) => {
                    tracing::warn!(
                        token_id = %token_id,
                        error = %e,
                        "Image generation failed, rendering SVG card"
                    );
                }
            }
        }

        match render_svg(creature, token_id) {
            Ok(svg) => Some(RenderedAsset {
                kind: AssetKind::Svg,
                path: storage::svg_path(token_id),
                bytes: svg.into_bytes(),
                content_type: "image/svg+xml".to_string(),
            }),
            Err(e) => {
                tracing::error!(token_id = %token_id, error = %e, "Failed to render SVG card");
                None
            }
        }
    }

    /// Metadata JSON and share page. Returns the metadata URL.
    async fn store_documents(
        &self,
        creature: &Creature,
        token_id: &Uuid,
        asset_url: Option<String>,
        permalink: &str,
        base_url: &str,
    ) -> Option<String> {
        let metadata = AssetMetadata::new(creature, token_id, asset_url.clone(), Utc::now().timestamp());
        let metadata_url = match serde_json::to_vec_pretty(&metadata) {
            Ok(bytes) => {
                self.put(&storage::metadata_path(token_id), bytes, "application/json", base_url)
                    .await
            }
            Err(e) => {
                tracing::error!(token_id = %token_id, error = %e, "Failed to serialize metadata");
                None
            }
        };

        let page = SharePage {
            horse: creature.clone(),
            token_id: token_id.to_string(),
            asset_url,
            permalink: permalink.to_string(),
        };
        match page.render() {
            Ok(html) => {
                self.put(
                    &storage::page_path(token_id),
                    html.into_bytes(),
                    "text/html; charset=utf-8",
                    base_url,
                )
                .await;
            }
            Err(e) => {
                tracing::error!(token_id = %token_id, error = %e, "Failed to render share page");
            }
        }

        metadata_url
    }

    /// Store one object; failures are logged and yield `None`. Relative
    /// store URLs are resolved against the same base as the permalink.
    async fn put(&self, path: &str, bytes: Vec<u8>, content_type: &str, base_url: &str) -> Option<String> {
        let store = self.store.as_ref()?;
        match store.put(path, bytes, content_type).await {
            Ok(url) => {
                let url = absolute_url(base_url, url);
                tracing::debug!(path, url = %url, "Stored asset");
                Some(url)
            }
            Err(e) => {
                tracing::warn!(path, error = %e, "Failed to store asset");
                None
            }
        }
    }
}

pub fn permalink(base_url: &str, token_id: &Uuid) -> String {
    format!("{}/quiz?token={}", base_url.trim_end_matches('/'), token_id)
}

fn absolute_url(base_url: &str, url: String) -> String {
    if url.starts_with('/') {
        format!("{}{}", base_url.trim_end_matches('/'), url)
    } else {
        url
    }
}

//! Google Cloud Storage store via the JSON API.

use super::signing::signed_get_url;
use super::{validate_path, AssetStore, StoreError};
use async_trait::async_trait;
use chrono::Utc;
use reqwest::{Client, Response, Url};
use secrecy::{ExposeSecret, Secret};
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

pub const GCS_ENDPOINT: &str = "https://storage.googleapis.com";

const METADATA_TOKEN_URL: &str =
    "http://metadata.google.internal/computeMetadata/v1/instance/service-accounts/default/token";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// HMAC interoperability key used to sign URLs.
#[derive(Debug, Clone)]
pub struct HmacKey {
    pub access_id: String,
    pub secret: Secret<String>,
}

#[derive(Debug, Clone)]
pub struct GcsStoreConfig {
    pub bucket: String,
    /// Static OAuth token. When absent the metadata server is asked.
    pub access_token: Option<Secret<String>>,
    /// Enables the signed-URL fallback for buckets that refuse public ACLs.
    pub hmac_key: Option<HmacKey>,
    pub signed_url_ttl: Duration,
    pub endpoint: String,
}

impl GcsStoreConfig {
    pub fn new(bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            access_token: None,
            hmac_key: None,
            signed_url_ttl: Duration::from_secs(60 * 60 * 24),
            endpoint: GCS_ENDPOINT.to_string(),
        }
    }
}

pub struct GcsStore {
    config: GcsStoreConfig,
    client: Client,
}

#[derive(Debug, Deserialize)]
struct MetadataToken {
    access_token: String,
}

impl GcsStore {
    pub fn new(config: GcsStoreConfig) -> Result<Self, StoreError> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| StoreError::Request(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { config, client })
    }

    pub fn bucket(&self) -> &str {
        &self.config.bucket
    }

    async fn bearer_token(&self) -> Result<String, StoreError> {
        if let Some(token) = &self.config.access_token {
            return Ok(token.expose_secret().clone());
        }

        let response = self
            .client
            .get(METADATA_TOKEN_URL)
            .header("Metadata-Flavor", "Google")
            .send()
            .await
            .map_err(|e| StoreError::Credentials(format!("Metadata server unreachable: {}", e)))?;

        let token: MetadataToken = check(response)
            .await?
            .json()
            .await
            .map_err(|e| StoreError::Credentials(format!("Malformed metadata token: {}", e)))?;

        Ok(token.access_token)
    }

    fn endpoint_url(&self, segments: &[&str]) -> Result<Url, StoreError> {
        let mut url = Url::parse(&self.config.endpoint)
            .map_err(|e| StoreError::Request(format!("Invalid storage endpoint: {}", e)))?;
        url.path_segments_mut()
            .map_err(|_| StoreError::Request("Storage endpoint cannot be a base".to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn upload(
        &self,
        token: &str,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<(), StoreError> {
        let url = self.endpoint_url(&["upload", "storage", "v1", "b", &self.config.bucket, "o"])?;

        let response = self
            .client
            .post(url)
            .query(&[("uploadType", "media"), ("name", path)])
            .bearer_auth(token)
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(bytes)
            .send()
            .await
            .map_err(|e| StoreError::Request(e.to_string()))?;

        check(response).await?;
        Ok(())
    }

    async fn make_public(&self, token: &str, path: &str) -> Result<(), StoreError> {
        // The object name is one path segment, so its slashes get encoded.
        let url = self.endpoint_url(&["storage", "v1", "b", &self.config.bucket, "o", path])?;

        let response = self
            .client
            .patch(url)
            .bearer_auth(token)
            .json(&json!({ "acl": [{ "entity": "allUsers", "role": "READER" }] }))
            .send()
            .await
            .map_err(|e| StoreError::Request(e.to_string()))?;

        check(response).await?;
        Ok(())
    }

    fn public_url(&self, path: &str) -> String {
        format!(
            "{}/{}/{}",
            self.config.endpoint.trim_end_matches('/'),
            self.config.bucket,
            path
        )
    }

    fn signed_url(&self, path: &str) -> Result<String, StoreError> {
        let key = self.config.hmac_key.as_ref().ok_or_else(|| {
            StoreError::NotReadable("no HMAC key configured for signed URLs".to_string())
        })?;

        signed_get_url(
            &self.config.endpoint,
            &self.config.bucket,
            path,
            &key.access_id,
            key.secret.expose_secret(),
            self.config.signed_url_ttl.as_secs(),
            Utc::now(),
        )
    }
}

async fn check(response: Response) -> Result<Response, StoreError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(StoreError::Rejected {
        status: status.as_u16(),
        body,
    })
}

#[async_trait]
impl AssetStore for GcsStore {
    async fn put(&self, path: &str, bytes: Vec<u8>, content_type: &str) -> Result<String, StoreError> {
        validate_path(path)?;

        let token = self.bearer_token().await?;
        self.upload(&token, path, bytes, content_type).await?;

        match self.make_public(&token, path).await {
            Ok(()) => Ok(self.public_url(path)),
            Err(e) => {
                tracing::warn!(
                    bucket = %self.config.bucket,
                    path,
                    error = %e,
                    "Could not make object public, falling back to signed URL"
                );
                self.signed_url(path)
            }
        }
    }
}

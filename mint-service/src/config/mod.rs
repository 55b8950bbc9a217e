use crate::services::storage::{GcsStoreConfig, HmacKey};
use crate::services::ImageRetry;
use secrecy::Secret;
use service_core::config as core_config;
use service_core::error::AppError;
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_TEXT_MODEL: &str = "gemini-1.5-flash";
const DEFAULT_IMAGE_MODEL: &str = "imagen-3.0-generate-002";
const DEFAULT_IMAGE_ATTEMPTS: u32 = 2;
const DEFAULT_IMAGE_RETRY_DELAY_MS: u64 = 2000;
const DEFAULT_SIGNED_URL_TTL_SECS: u64 = 86_400;

#[derive(Debug, Clone)]
pub struct MintConfig {
    pub common: core_config::Config,
    /// Overrides the `Host`-derived base of permalinks and local asset URLs.
    pub public_base_url: Option<String>,
    /// Present only when `GEMINI_API_KEY` is set.
    pub genai: Option<GenaiSettings>,
    pub storage: StorageConfig,
    pub otlp_endpoint: Option<String>,
}

#[derive(Debug, Clone)]
pub struct GenaiSettings {
    pub api_key: Secret<String>,
    pub text_model: String,
    pub image_model: String,
    pub image_enabled: bool,
    pub image_retry: ImageRetry,
}

#[derive(Debug, Clone)]
pub enum StorageConfig {
    Disabled,
    Gcs(GcsStoreConfig),
    Local { dir: PathBuf },
}

impl MintConfig {
    pub fn load() -> Result<Self, AppError> {
        let common = core_config::Config::load()?;
        Ok(Self::from_lookup(common, |key| std::env::var(key).ok()))
    }

    /// Build from any key lookup. Empty values count as unset.
    ///
    /// A GCS bucket takes precedence over a local asset directory.
    pub fn from_lookup<F>(common: core_config::Config, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let genai = get("GEMINI_API_KEY").map(|key| GenaiSettings {
            api_key: Secret::new(key),
            text_model: get("GENAI_TEXT_MODEL").unwrap_or_else(|| DEFAULT_TEXT_MODEL.to_string()),
            image_model: get("GENAI_IMAGE_MODEL")
                .unwrap_or_else(|| DEFAULT_IMAGE_MODEL.to_string()),
            image_enabled: get("GENAI_IMAGE_ENABLED").is_some_and(|v| parse_flag(&v)),
            image_retry: ImageRetry {
                attempts: parse_or(get("GENAI_IMAGE_ATTEMPTS"), DEFAULT_IMAGE_ATTEMPTS),
                delay: Duration::from_millis(parse_or(
                    get("GENAI_IMAGE_RETRY_DELAY_MS"),
                    DEFAULT_IMAGE_RETRY_DELAY_MS,
                )),
            },
        });

        let storage = if let Some(bucket) = get("GCS_BUCKET") {
            let mut gcs = GcsStoreConfig::new(bucket);
            gcs.access_token = get("GCS_ACCESS_TOKEN").map(Secret::new);
            gcs.hmac_key = match (get("GCS_HMAC_ACCESS_ID"), get("GCS_HMAC_SECRET")) {
                (Some(access_id), Some(secret)) => Some(HmacKey {
                    access_id,
                    secret: Secret::new(secret),
                }),
                _ => None,
            };
            gcs.signed_url_ttl = Duration::from_secs(parse_or(
                get("GCS_SIGNED_URL_TTL_SECS"),
                DEFAULT_SIGNED_URL_TTL_SECS,
            ));
            StorageConfig::Gcs(gcs)
        } else if let Some(dir) = get("ASSET_LOCAL_DIR") {
            StorageConfig::Local {
                dir: PathBuf::from(dir),
            }
        } else {
            StorageConfig::Disabled
        };

        Self {
            common,
            public_base_url: get("PUBLIC_BASE_URL").map(|u| u.trim_end_matches('/').to_string()),
            genai,
            storage,
            otlp_endpoint: get("OTLP_ENDPOINT"),
        }
    }

    pub fn image_generation_enabled(&self) -> bool {
        self.genai.as_ref().is_some_and(|g| g.image_enabled)
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

fn parse_or<T: std::str::FromStr>(value: Option<String>, default: T) -> T {
    value.and_then(|v| v.parse().ok()).unwrap_or(default)
}

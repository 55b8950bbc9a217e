//! Asset store: write-once objects addressed by token.

pub mod gcs;
pub mod local;
pub mod signing;

pub use gcs::{GcsStore, GcsStoreConfig, HmacKey};
pub use local::LocalStore;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid object path: {0}")]
    InvalidPath(String),

    #[error("Credentials unavailable: {0}")]
    Credentials(String),

    #[error("Storage request failed: {0}")]
    Request(String),

    #[error("Storage rejected request with status {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("Object stored but not readable: {0}")]
    NotReadable(String),
}

/// Persist bytes and hand back a URL the public can fetch them from.
#[async_trait]
pub trait AssetStore: Send + Sync {
    async fn put(&self, path: &str, bytes: Vec<u8>, content_type: &str) -> Result<String, StoreError>;
}

pub fn svg_path(token_id: &Uuid) -> String {
    format!("horses/{}.svg", token_id)
}

pub fn image_path(token_id: &Uuid) -> String {
    format!("tokens/{}/image.png", token_id)
}

pub fn metadata_path(token_id: &Uuid) -> String {
    format!("tokens/{}/metadata.json", token_id)
}

pub fn page_path(token_id: &Uuid) -> String {
    format!("tokens/{}/index.html", token_id)
}

/// Object paths are relative, `/`-separated and never climb out of the root.
pub(crate) fn validate_path(path: &str) -> Result<(), StoreError> {
    let bad = path.is_empty()
        || path.starts_with('/')
        || path.contains('\\')
        || path.split('/').any(|seg| seg.is_empty() || seg == "." || seg == "..");
    if bad {
        return Err(StoreError::InvalidPath(path.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_are_token_addressed() {
        let token = Uuid::parse_str("0b5d8c2e-1111-4222-8333-444455556666").unwrap();
        assert_eq!(svg_path(&token), "horses/0b5d8c2e-1111-4222-8333-444455556666.svg");
        assert_eq!(
            metadata_path(&token),
            "tokens/0b5d8c2e-1111-4222-8333-444455556666/metadata.json"
        );
        assert!(image_path(&token).ends_with("/image.png"));
        assert!(page_path(&token).ends_with("/index.html"));
    }

    #[test]
    fn traversal_is_rejected() {
        assert!(validate_path("tokens/abc/metadata.json").is_ok());
        for bad in ["", "/etc/passwd", "../x", "a/../b", "a//b", "a\\b", "a/./b"] {
            assert!(validate_path(bad).is_err(), "{bad} should be rejected");
        }
    }
}

//! V4 signed URLs for Cloud Storage using HMAC interoperability keys.
//!
//! Format: `GOOG4-HMAC-SHA256`, region `auto`, single signed header `host`,
//! unsigned payload.

use super::StoreError;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use reqwest::Url;
use sha2::{Digest, Sha256};

type HmacSha256 = Hmac<Sha256>;

pub const SIGNING_ALGORITHM: &str = "GOOG4-HMAC-SHA256";

/// Longest lifetime Cloud Storage accepts for a V4 signature (7 days).
pub const MAX_EXPIRY_SECS: u64 = 604_800;

const REGION: &str = "auto";
const SERVICE: &str = "storage";
const REQUEST_TYPE: &str = "goog4_request";

/// Build a signed GET URL for `bucket/object` valid for `expires_secs`
/// from `now`.
pub fn signed_get_url(
    endpoint: &str,
    bucket: &str,
    object: &str,
    access_id: &str,
    secret: &str,
    expires_secs: u64,
    now: DateTime<Utc>,
) -> Result<String, StoreError> {
    let endpoint = Url::parse(endpoint)
        .map_err(|e| StoreError::Request(format!("Invalid storage endpoint: {}", e)))?;
    let host = match (endpoint.host_str(), endpoint.port()) {
        (Some(host), Some(port)) => format!("{}:{}", host, port),
        (Some(host), None) => host.to_string(),
        (None, _) => {
            return Err(StoreError::Request("Storage endpoint has no host".to_string()));
        }
    };

    let date = now.format("%Y%m%d").to_string();
    let timestamp = now.format("%Y%m%dT%H%M%SZ").to_string();
    let scope = format!("{}/{}/{}/{}", date, REGION, SERVICE, REQUEST_TYPE);
    let expires = expires_secs.clamp(1, MAX_EXPIRY_SECS);

    let canonical_uri = format!("/{}/{}", percent_encode(bucket, false), percent_encode(object, true));
    let credential = format!("{}/{}", access_id, scope);
    let expires = expires.to_string();
    // Already in byte order of the keys.
    let query_params = [
        ("X-Goog-Algorithm", SIGNING_ALGORITHM),
        ("X-Goog-Credential", credential.as_str()),
        ("X-Goog-Date", timestamp.as_str()),
        ("X-Goog-Expires", expires.as_str()),
        ("X-Goog-SignedHeaders", "host"),
    ];
    let canonical_query = query_params
        .iter()
        .map(|(k, v)| format!("{}={}", percent_encode(k, false), percent_encode(v, false)))
        .collect::<Vec<_>>()
        .join("&");

    let canonical_request = format!(
        "GET\n{}\n{}\nhost:{}\n\nhost\nUNSIGNED-PAYLOAD",
        canonical_uri, canonical_query, host
    );
    let string_to_sign = format!(
        "{}\n{}\n{}\n{}",
        SIGNING_ALGORITHM,
        timestamp,
        scope,
        hex::encode(Sha256::digest(canonical_request.as_bytes()))
    );

    let signing_key = [REGION, SERVICE, REQUEST_TYPE].iter().try_fold(
        hmac_sha256(format!("GOOG4{}", secret).as_bytes(), &date)?,
        |key, part| hmac_sha256(&key, part),
    )?;
    let signature = hex::encode(hmac_sha256(&signing_key, &string_to_sign)?);

    Ok(format!(
        "{}://{}{}?{}&X-Goog-Signature={}",
        endpoint.scheme(),
        host,
        canonical_uri,
        canonical_query,
        signature
    ))
}

fn hmac_sha256(key: &[u8], data: &str) -> Result<Vec<u8>, StoreError> {
    let mut mac = HmacSha256::new_from_slice(key)
        .map_err(|e| StoreError::Credentials(format!("Invalid key length: {}", e)))?;
    mac.update(data.as_bytes());
    Ok(mac.finalize().into_bytes().to_vec())
}

/// RFC 3986 encoding: unreserved characters pass, everything else becomes
/// `%XX`. With `keep_slash` each `/`-separated segment is encoded on its own.
fn percent_encode(input: &str, keep_slash: bool) -> String {
    if keep_slash {
        input
            .split('/')
            .map(urlencoding::encode)
            .collect::<Vec<_>>()
            .join("/")
    } else {
        urlencoding::encode(input).into_owned()
    }
}

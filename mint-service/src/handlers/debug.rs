//! Environment dump for operators. Sensitive values never leave the process.

use axum::Json;
use std::collections::BTreeMap;

const SENSITIVE_MARKERS: [&str; 4] = ["KEY", "SECRET", "TOKEN", "PASSWORD"];
const MASK: &str = "***";

pub async fn debug_env() -> Json<BTreeMap<String, String>> {
    let vars = std::env::vars_os().map(|(k, v)| {
        (
            k.to_string_lossy().into_owned(),
            v.to_string_lossy().into_owned(),
        )
    });
    Json(mask_env(vars))
}

pub fn mask_env(vars: impl IntoIterator<Item = (String, String)>) -> BTreeMap<String, String> {
    vars.into_iter()
        .map(|(key, value)| {
            if is_sensitive(&key) {
                (key, MASK.to_string())
            } else {
                (key, value)
            }
        })
        .collect()
}

fn is_sensitive(key: &str) -> bool {
    let upper = key.to_uppercase();
    SENSITIVE_MARKERS.iter().any(|m| upper.contains(m))
}

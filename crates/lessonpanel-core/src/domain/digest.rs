//! Content digests for lesson versions.
//!
//! A lesson version is identified by the SHA-256 of its canonical JSON form
//! (object keys sorted, no insignificant whitespace), so two deep-equal plans
//! always share a digest.

use sha2::{Digest, Sha256};

use super::error::Result;
use super::lesson::LessonPlan;

fn canonicalize(value: &serde_json::Value) -> serde_json::Value {
    match value {
        serde_json::Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            let mut sorted = serde_json::Map::new();
            for key in keys {
                if let Some(v) = map.get(key) {
                    sorted.insert(key.clone(), canonicalize(v));
                }
            }
            serde_json::Value::Object(sorted)
        }
        serde_json::Value::Array(items) => {
            serde_json::Value::Array(items.iter().map(canonicalize).collect())
        }
        other => other.clone(),
    }
}

/// SHA-256 hex digest of any serializable value's canonical JSON.
pub fn canonical_digest<T: serde::Serialize>(value: &T) -> Result<String> {
    let json = serde_json::to_value(value)?;
    let bytes = serde_json::to_vec(&canonicalize(&json))?;
    Ok(hex::encode(Sha256::digest(&bytes)))
}

/// Digest identifying one lesson version.
pub fn lesson_digest(plan: &LessonPlan) -> Result<String> {
    canonical_digest(plan)
}

//! Device fingerprint generation for callers that don't supply their own.
//! Not consulted by the engine itself.

use chrono::{DateTime, Utc};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

/// Hex length of a generated fingerprint.
pub const FINGERPRINT_LEN: usize = 16;

/// Derive an opaque fingerprint from the user agent plus arbitrary extra
/// data. The timestamp is bucketed to the hour, so the same device and
/// browser yield a stable fingerprint within one hour.
pub fn generate(user_agent: &str, extra: &BTreeMap<String, Value>) -> String {
    generate_at(user_agent, extra, Utc::now())
}

pub fn generate_at(
    user_agent: &str,
    extra: &BTreeMap<String, Value>,
    now: DateTime<Utc>,
) -> String {
    let mut doc: BTreeMap<String, Value> = BTreeMap::new();
    doc.insert("userAgent".to_string(), Value::from(user_agent));
    for (key, value) in extra {
        doc.insert(key.clone(), value.clone());
    }
    doc.insert("timestamp".to_string(), Value::from(now.timestamp() / 3600));

    // Serializing a BTreeMap keeps key order stable across calls.
    let encoded = serde_json::to_string(&doc).unwrap_or_default();
    let digest = Sha256::digest(encoded.as_bytes());
    let mut hex = String::with_capacity(FINGERPRINT_LEN);
    for byte in digest.iter().take(FINGERPRINT_LEN / 2) {
        hex.push_str(&format!("{byte:02x}"));
    }
    hex
}

//! reqscan-codec
//!
//! Encode/decode of the opaque captured-request payload stored in a
//! `ScanRecord`'s `data` column, and the content hash used to dedup inserts.
//! Treated as bytes by the queue; this crate is the only place that knows
//! the shape inside.

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// `data_hash` must fit in a 63-char column. A 48-char hex prefix of a
/// SHA-256 digest leaves headroom under that limit while keeping collision
/// probability negligible at realistic record counts — this is a dedup
/// key, not a security control.
pub const HASH_LEN: usize = 48;

/// One HTTP request captured by the instrumented runtime, as handed to the
/// queue for storage and later replayed verbatim by the probe session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapturedRequest {
    pub method: String,
    pub url: String,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    #[serde(default, with = "body_as_hex")]
    pub body: Vec<u8>,
    /// Runtime metadata (request id, source thread, etc.) carried verbatim.
    #[serde(default)]
    pub meta: serde_json::Value,
}

/// `encode(record) -> bytes`
pub fn encode(req: &CapturedRequest) -> Result<Vec<u8>> {
    serde_json::to_vec(req).context("encode captured request")
}

/// `decode(bytes) -> record`
pub fn decode(data: &[u8]) -> Result<CapturedRequest> {
    serde_json::from_slice(data).context("decode captured request")
}

/// `hash(record) -> string of <= 63 chars, stable, collision-resistant for
/// practical inputs`. Computed over the canonical encoded bytes so that
/// `hash(decode(encode(r))) == hash(r)`.
pub fn hash(req: &CapturedRequest) -> Result<String> {
    let bytes = encode(req)?;
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    let digest = hasher.finalize();
    let full = hex::encode(digest);
    Ok(full[..HASH_LEN].to_string())
}

/// Request/response bodies are arbitrary bytes; JSON can't carry them
/// directly, so they ride as hex — reusing the `hex` crate already pulled
/// in for content hashing rather than adding a base64 dependency.
mod body_as_hex {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], s: S) -> Result<S::Ok, S::Error> {
        hex::encode(bytes).serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(d)?;
        hex::decode(&s).map_err(serde::de::Error::custom)
    }
}

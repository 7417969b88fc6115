//! Hashing and id-generation helpers shared across the pipeline, chiefly
//! for the content hashes recorded in a policy artifact's metadata.

use sha2::{Digest, Sha256};
use uuid::Uuid;

/// SHA-256 hash of a content string, hex-encoded.
///
/// ```
/// use pw_utils::compute_content_hash;
///
/// let hash = compute_content_hash("hello world");
/// assert_eq!(hash.len(), 64);
/// ```
#[must_use]
pub fn compute_content_hash(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    hex::encode(hasher.finalize())
}

/// Hashes any serializable value by its canonical JSON encoding — used to
/// derive `csr_hash`/`cpr_hash`/`simulator_params_hash` from the loaded
/// registries and parameters rather than their source file bytes, so
/// semantically-identical reorderings hash the same.
pub fn compute_value_hash<T: serde::Serialize>(value: &T) -> Result<String, serde_json::Error> {
    let canonical = serde_json::to_string(value)?;
    Ok(compute_content_hash(&canonical))
}

/// Generates a new random v4 UUID string, used for policy-artifact
/// versions absent an explicit caller-supplied version.
#[must_use]
pub fn generate_uuid() -> String {
    Uuid::new_v4().to_string()
}

//! Content hashing for identity derivation.
//!
//! Paper ids are the sha256 hex digest of the raw PDF bytes; author and
//! keyword ids hash the trimmed name. Deterministic, fixed-length (64 hex
//! chars); the string form rejects empty or whitespace-only input.

use sha2::{Digest, Sha256};

use crate::error::TaskError;

/// Sha256 hex digest of a byte slice. Total over all inputs.
pub fn hash_bytes(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// Sha256 hex digest of a trimmed string.
///
/// Errors on empty or whitespace-only input: hashing a blank identity would
/// silently collapse distinct records onto one id.
pub fn hash_text(text: &str) -> Result<String, TaskError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(TaskError::Hash(
            "input string must not be empty or only whitespace".into(),
        ));
    }
    Ok(hash_bytes(trimmed.as_bytes()))
}

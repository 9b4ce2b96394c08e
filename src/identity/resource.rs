//! Content-hashed resource ids.

use std::fmt::Debug;

use serde::Serialize;
use xxhash_rust::xxh3::xxh3_64;

/// Ids reserved by the synthesis engine; they are never hashed or renamed.
pub const RESERVED_IDS: [&str; 2] = ["Resource", "Default"];

/// Placeholder used whenever an id would otherwise be empty.
pub const UNKNOWN_ID: &str = "unknown";

/// Number of hex characters kept from the content hash.
pub const HASH_LEN: usize = 8;

/// Builds the id `prefix-xxxxxxxx` for `value`.
///
/// Reserved prefixes are returned untouched and an empty prefix becomes
/// [`UNKNOWN_ID`]. The value is encoded by the first strategy that accepts
/// it: a string is hashed as its raw bytes, then JSON, then postcard, and as
/// a last resort its `Debug` rendering.
#[must_use]
pub fn resource_id<T>(prefix: &str, value: &T) -> String
where
    T: Serialize + Debug + ?Sized,
{
    let prefix = prefix.trim();
    if RESERVED_IDS.contains(&prefix) {
        return prefix.to_string();
    }
    let prefix = if prefix.is_empty() { UNKNOWN_ID } else { prefix };

    format!("{prefix}-{}", short_hash(&encode(value)))
}

/// Returns the prefix of a resource id, stripping a valid trailing hash.
///
/// Ids without a hash suffix are returned unchanged and the empty id maps to
/// [`UNKNOWN_ID`].
#[must_use]
pub fn extract_resource(id: &str) -> &str {
    if id.is_empty() {
        return UNKNOWN_ID;
    }
    match id.rsplit_once('-') {
        Some((prefix, hash)) if is_short_hash(hash) => prefix,
        _ => id,
    }
}

/// Returns true if `s` is exactly [`HASH_LEN`] lowercase hex characters.
#[must_use]
pub fn is_short_hash(s: &str) -> bool {
    s.len() == HASH_LEN && s.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}

/// Hashes `bytes` and keeps the first [`HASH_LEN`] hex characters.
#[must_use]
pub fn short_hash(bytes: &[u8]) -> String {
    let mut hashed = full_hash(bytes);
    hashed.truncate(HASH_LEN);
    hashed
}

/// Full 16-character hex digest of `bytes`.
pub(crate) fn full_hash(bytes: &[u8]) -> String {
    hex::encode(xxh3_64(bytes).to_be_bytes())
}

fn encode<T>(value: &T) -> Vec<u8>
where
    T: Serialize + Debug + ?Sized,
{
    if let Ok(serde_json::Value::String(s)) = serde_json::to_value(value) {
        return s.into_bytes();
    }
    serde_json::to_vec(value)
        .ok()
        .or_else(|| postcard::to_allocvec(value).ok())
        .unwrap_or_else(|| format!("{value:?}").into_bytes())
}

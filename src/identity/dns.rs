//! DNS-1035 label normalization.

use super::resource::{RESERVED_IDS, UNKNOWN_ID, full_hash, is_short_hash};

/// Maximum length of a DNS label.
pub const MAX_LABEL_LEN: usize = 63;

/// Converts an id into a DNS-1035 label.
///
/// The result is lowercase, only contains letters, digits and single
/// hyphens, starts with a letter, ends alphanumeric and is at most
/// [`MAX_LABEL_LEN`] characters. A trailing content hash is preserved when
/// the leading part has to be cut.
#[must_use]
pub fn to_dns_label(id: &str) -> String {
    let id = id.trim();
    if id.is_empty() {
        return UNKNOWN_ID.to_string();
    }
    if RESERVED_IDS.contains(&id) {
        return id.to_lowercase();
    }

    let mapped: String = id
        .to_lowercase()
        .chars()
        .map(|c| if is_label_char(c) { c } else { '-' })
        .collect();
    let cleaned = collapse_hyphens(mapped.trim_matches('-'));
    if cleaned.is_empty() {
        return UNKNOWN_ID.to_string();
    }

    let (prefix, hash) = match cleaned.rsplit_once('-') {
        Some((prefix, hash)) if is_short_hash(hash) => (prefix.to_string(), hash),
        None if is_short_hash(&cleaned) => (UNKNOWN_ID.to_string(), cleaned.as_str()),
        _ => (cleaned.clone(), ""),
    };

    let prefix = if prefix.starts_with(|c: char| c.is_ascii_lowercase()) || prefix.is_empty() {
        prefix
    } else {
        match prefix.find(|c: char| c.is_ascii_lowercase()) {
            Some(idx) => prefix[idx..].to_string(),
            None => format!("{UNKNOWN_ID}-{}", full_hash(prefix.as_bytes())),
        }
    };

    let joined = format!("{prefix}-{hash}");
    let label = joined.trim_matches('-');
    if label.len() <= MAX_LABEL_LEN {
        return label.to_string();
    }

    let tail = &label[label.len() - MAX_LABEL_LEN..];
    if tail.starts_with(|c: char| c.is_ascii_lowercase()) {
        tail.to_string()
    } else {
        format!("id-{}", tail[3..].trim_start_matches('-'))
    }
}

const fn is_label_char(c: char) -> bool {
    c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-'
}

fn collapse_hyphens(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if c == '-' && out.ends_with('-') {
            continue;
        }
        out.push(c);
    }
    out
}

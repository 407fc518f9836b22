//! Slot and content key helpers.
//!
//! Gallery-style slot keys end in a numeric index (`gallery.images.3`).
//! Editors and older rows sometimes carry zero-padded indices (`03`), so every
//! write and lookup goes through [`normalize`] to keep one representation per
//! index. Keys without a numeric final segment pass through untouched.

use std::borrow::Cow;

use crate::error::{ContentError, Result};

/// Upper bound on any key or prefix accepted at the storage boundary.
pub const MAX_KEY_LEN: usize = 200;

/// Canonicalize an optional slot key. A missing or empty key is no key, so
/// both give `None`.
pub fn normalize(key: Option<&str>) -> Option<String> {
    key.filter(|k| !k.is_empty()).map(|k| normalize_str(k).into_owned())
}

/// Strip leading zeros from a bare numeric final segment (`a.b.007` -> `a.b.7`).
pub fn normalize_str(key: &str) -> Cow<'_, str> {
    let Some((head, last)) = key.rsplit_once('.') else { return Cow::Borrowed(key) };
    if last.is_empty() || !last.bytes().all(|b| b.is_ascii_digit()) {
        return Cow::Borrowed(key);
    }
    let trimmed = last.trim_start_matches('0');
    let index = if trimmed.is_empty() { "0" } else { trimmed };
    if index.len() == last.len() {
        return Cow::Borrowed(key);
    }
    Cow::Owned(format!("{head}.{index}"))
}

/// Slot key for position `index` under a gallery prefix ending in `.`.
pub fn indexed(prefix: &str, index: usize) -> String {
    format!("{prefix}{index}")
}

fn is_key_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-')
}

/// Validate a content key, slot key, or text prefix: non-empty, bounded,
/// identifier-safe characters only.
pub fn validate_key(field: &'static str, key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(ContentError::validation(field, "must not be empty"));
    }
    validate_prefix(field, key)
}

/// Like [`validate_key`] but accepts the empty string (match everything).
pub fn validate_prefix(field: &'static str, prefix: &str) -> Result<()> {
    if prefix.len() > MAX_KEY_LEN {
        return Err(ContentError::validation(field, format!("longer than {MAX_KEY_LEN} bytes")));
    }
    if let Some(bad) = prefix.chars().find(|c| !is_key_char(*c)) {
        return Err(ContentError::validation(field, format!("unexpected character {bad:?} in {prefix:?}")));
    }
    Ok(())
}

//! Per-key text resolution with locale fallback.
//!
//! English returns the canonical value. Spanish returns the published value
//! only when the record is approved, then falls back to English, then to the
//! caller's fallback. Every path returns a string.

use crate::error::Result;
use crate::slot_key::validate_key;
use crate::storage::ContentStore;
use crate::types::{ContentBundle, ContentRecord, Locale};

/// Null or whitespace only.
pub fn is_blank(value: Option<&str>) -> bool {
    value.map_or(true, |v| v.trim().is_empty())
}

fn non_blank(value: Option<&String>) -> Option<&str> {
    value.map(String::as_str).filter(|v| !is_blank(Some(*v)))
}

/// Apply the locale policy to a single record.
pub fn resolve_record(record: &ContentRecord, locale: Locale, fallback: &str) -> String {
    let canonical = non_blank(record.value_canonical.as_ref());
    let value = match locale {
        Locale::En => canonical,
        Locale::Es => {
            let published = if record.approved { non_blank(record.value_published_alt.as_ref()) } else { None };
            published.or(canonical)
        }
    };
    value.unwrap_or(fallback).to_string()
}

/// Bulk path: look `key` up in an already-fetched bundle.
pub fn resolve(bundle: &ContentBundle, key: &str, fallback: &str) -> String {
    bundle.get(key).filter(|v| !is_blank(Some(*v))).unwrap_or(fallback).to_string()
}

/// Point path: fetch one record directly, bypassing bundles.
pub async fn try_resolve_one(store: &dyn ContentStore, key: &str, locale: Locale, fallback: &str) -> Result<String> {
    validate_key("content key", key)?;
    let record = store.fetch_one(key).await?;
    Ok(match record {
        Some(r) => resolve_record(&r, locale, fallback),
        None => fallback.to_string(),
    })
}

/// Like [`try_resolve_one`], but a failed lookup yields `fallback`.
pub async fn resolve_one(store: &dyn ContentStore, key: &str, locale: Locale, fallback: &str) -> String {
    match try_resolve_one(store, key, locale, fallback).await {
        Ok(v) => v,
        Err(e) => {
            tracing::warn!(key, %locale, error = %e, "text lookup failed, using fallback");
            fallback.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(canonical: Option<&str>, published: Option<&str>, approved: bool) -> ContentRecord {
        ContentRecord {
            key: "home.title".into(),
            value_canonical: canonical.map(Into::into),
            value_draft_alt: Some("Bienvenido".into()),
            value_published_alt: published.map(Into::into),
            approved,
            ..Default::default()
        }
    }

    #[test]
    fn english_uses_canonical_then_fallback() {
        assert_eq!(resolve_record(&record(Some("Welcome"), None, false), Locale::En, "fb"), "Welcome");
        assert_eq!(resolve_record(&record(Some("  \t"), None, false), Locale::En, "fb"), "fb");
        assert_eq!(resolve_record(&record(None, Some("Hola"), true), Locale::En, "fb"), "fb");
    }

    #[test]
    fn spanish_requires_approval() {
        assert_eq!(resolve_record(&record(Some("Welcome"), Some("Hola"), false), Locale::Es, "fb"), "Welcome");
        assert_eq!(resolve_record(&record(Some("Welcome"), Some("Hola"), true), Locale::Es, "fb"), "Hola");
        assert_eq!(resolve_record(&record(Some("Welcome"), Some(" "), true), Locale::Es, "fb"), "Welcome");
        assert_eq!(resolve_record(&record(None, None, true), Locale::Es, "fb"), "fb");
    }

    #[test]
    fn draft_is_never_visible() {
        let r = record(None, None, false);
        assert_eq!(resolve_record(&r, Locale::Es, ""), "");
    }

    #[test]
    fn unapproved_published_never_leaks() {
        for canonical in [None, Some(""), Some("Welcome")] {
            for published in [None, Some(""), Some("Hola")] {
                let out = resolve_record(&record(canonical, published, false), Locale::Es, "fb");
                assert_ne!(out, "Hola");
            }
        }
    }

    #[test]
    fn bundle_lookup_falls_back() {
        let mut bundle = ContentBundle::default();
        bundle.strings.insert("home.title".into(), "Welcome".into());
        assert_eq!(resolve(&bundle, "home.title", "x"), "Welcome");
        assert_eq!(resolve(&bundle, "home.missing", "x"), "x");
    }

    #[test]
    fn blankness() {
        assert!(is_blank(None));
        assert!(is_blank(Some(" \n")));
        assert!(!is_blank(Some(" a ")));
    }
}

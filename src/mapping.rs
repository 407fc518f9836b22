use std::collections::HashMap;

use crate::resolver::resolve_record;
use crate::types::{BundleId, BundlePayload, ContentBundle, ResolvedMediaItem, SlotRow};

/// Public URL for an object: `{base}/{bucket}/{object_path}`.
///
/// Returns an empty string when no base URL is configured, which callers
/// treat as "no media".
pub fn public_url(storage_base_url: Option<&str>, bucket: &str, object_path: &str) -> String {
    let base = match storage_base_url.map(str::trim) {
        Some(b) if !b.is_empty() => b.trim_end_matches('/'),
        _ => return String::new(),
    };
    let bucket = bucket.trim_matches('/');
    let path = object_path.trim_start_matches('/');
    if bucket.is_empty() || path.is_empty() {
        return String::new();
    }
    format!("{base}/{bucket}/{path}")
}

/// Project a slot row into a bundle item. Unbound slots and private assets
/// yield `None`.
pub fn resolved_item_from_row(row: &SlotRow, storage_base_url: Option<&str>) -> Option<ResolvedMediaItem> {
    let asset = row.asset.as_ref().filter(|a| a.is_public)?;
    Some(ResolvedMediaItem {
        slot_key: row.binding.slot_key.clone(),
        sort_rank: row.binding.sort_rank,
        asset_id: asset.id.clone(),
        title: asset.title.clone(),
        kind: asset.kind,
        url: public_url(storage_base_url, &asset.bucket, &asset.object_path),
    })
}

/// Build the immutable bundle for `id` from a fetched payload. Text is resolved
/// for the bundle's locale; blank results are left out so lookups fall back.
pub fn bundle_from_payload(id: &BundleId, payload: BundlePayload, storage_base_url: Option<&str>) -> ContentBundle {
    let mut strings = HashMap::with_capacity(payload.records.len());
    for record in &payload.records {
        if !record.key.starts_with(&id.text_prefix) { continue; }
        let value = resolve_record(record, id.locale, "");
        if !value.is_empty() {
            strings.insert(record.key.clone(), value);
        }
    }
    let media = payload
        .media
        .iter()
        .filter(|row| row.binding.slot_key.starts_with(&id.media_prefix))
        .filter_map(|row| resolved_item_from_row(row, storage_base_url))
        .collect();
    ContentBundle {
        locale: id.locale,
        text_prefix: id.text_prefix.clone(),
        media_prefix: id.media_prefix.clone(),
        strings,
        media,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ContentRecord, Locale, MediaAsset, MediaKind, MediaSlotBinding};

    fn row(slot: &str, asset: Option<(&str, bool)>) -> SlotRow {
        SlotRow {
            binding: MediaSlotBinding { slot_key: slot.into(), asset_id: asset.map(|a| a.0.to_string()), sort_rank: Some(0) },
            asset: asset.map(|(id, public)| MediaAsset {
                id: id.into(),
                title: None,
                bucket: "site".into(),
                object_path: format!("img/{id}.jpg"),
                is_public: public,
                kind: MediaKind::Photo,
                category: None,
            }),
        }
    }

    #[test]
    fn url_scheme() {
        assert_eq!(public_url(Some("https://cdn.example.com/storage/"), "site", "/a/b.jpg"), "https://cdn.example.com/storage/site/a/b.jpg");
        assert_eq!(public_url(None, "site", "a.jpg"), "");
        assert_eq!(public_url(Some("  "), "site", "a.jpg"), "");
        assert_eq!(public_url(Some("https://x"), "", "a.jpg"), "");
    }

    #[test]
    fn private_and_unbound_rows_are_skipped() {
        assert!(resolved_item_from_row(&row("home.hero", None), Some("https://x")).is_none());
        assert!(resolved_item_from_row(&row("home.hero", Some(("a", false))), Some("https://x")).is_none());
        let item = resolved_item_from_row(&row("home.hero", Some(("a", true))), Some("https://x")).unwrap();
        assert_eq!(item.url, "https://x/site/img/a.jpg");
    }

    #[test]
    fn bundle_resolves_for_locale_and_drops_blanks() {
        let mut es = ContentRecord::new("home.title", "Welcome");
        es.value_published_alt = Some("Bienvenido".into());
        es.approved = true;
        let blank = ContentRecord::new("home.blank", "   ");
        let outside = ContentRecord::new("about.title", "About");
        let payload = BundlePayload { records: vec![es, blank, outside], media: vec![row("home.hero", Some(("a", true)))] };

        let id = BundleId::new(Locale::Es, "home.", "home.");
        let bundle = bundle_from_payload(&id, payload, None);
        assert_eq!(bundle.get("home.title"), Some("Bienvenido"));
        assert_eq!(bundle.get("home.blank"), None);
        assert_eq!(bundle.get("about.title"), None);
        assert_eq!(bundle.media.len(), 1);
        assert_eq!(bundle.media[0].url, "");
    }
}

//! Full-replace rewrite of an indexed slot collection (`prefix.0 .. prefix.N-1`).
//!
//! The rewrite stores the desired count, deletes every binding under the
//! prefix, then recreates `count` bindings with `sort_rank == index`. Nothing
//! is diffed, so repeated partial edits cannot leave orphans or duplicates.
//!
//! The two phases are not atomic. If recreation fails after the delete, the
//! collection reads as empty (or short) until the next successful rewrite.

use crate::error::{ContentError, Result};
use crate::overlay::Capability;
use crate::resolver::is_blank;
use crate::slot_key::{indexed, normalize_str, validate_key};
use crate::storage::ContentStore;
use crate::types::{ContentBundle, MediaSlotBinding, TextField};

/// Upper bound on a gallery's size.
pub const MAX_GALLERY_SLOTS: usize = 500;

/// Prefix with exactly one trailing `.`, so `gallery.images` never matches
/// `gallery.imagesX`.
pub fn canonical_prefix(prefix: &str) -> Result<String> {
    let trimmed = prefix.trim_end_matches('.');
    validate_key("gallery prefix", trimmed)?;
    Ok(format!("{trimmed}."))
}

/// Text key holding the desired slot count for a gallery prefix.
pub fn count_key(prefix: &str) -> String {
    format!("{}.count", prefix.trim_end_matches('.'))
}

/// The stored count for a gallery, read from a bundle covering its count key.
pub fn stored_count(bundle: &ContentBundle, prefix: &str) -> Option<usize> {
    bundle.get(&count_key(prefix)).and_then(|v| v.trim().parse().ok())
}

/// Bindings a rewrite will produce. Selections past `count` are ignored and
/// missing ones leave the slot unbound.
pub fn plan(prefix: &str, count: usize, selection: &[Option<String>]) -> Vec<MediaSlotBinding> {
    (0..count)
        .map(|i| MediaSlotBinding {
            slot_key: normalize_str(&indexed(prefix, i)).into_owned(),
            asset_id: selection.get(i).cloned().flatten().filter(|id| !is_blank(Some(id.as_str()))),
            sort_rank: Some(i as i64),
        })
        .collect()
}

/// Replace the collection under `prefix` with `count` slots bound per `selection`.
pub async fn rewrite(
    store: &dyn ContentStore,
    capability: Capability,
    prefix: &str,
    count: usize,
    selection: &[Option<String>],
) -> Result<Vec<MediaSlotBinding>> {
    capability.require_editor("rewrite gallery")?;
    let prefix = canonical_prefix(prefix)?;
    if count > MAX_GALLERY_SLOTS {
        return Err(ContentError::validation("gallery count", format!("{count} exceeds {MAX_GALLERY_SLOTS}")));
    }
    let bindings = plan(&prefix, count, selection);

    store.upsert_text(&count_key(&prefix), TextField::Canonical, &count.to_string()).await?;

    let removed = store.delete_slots_by_prefix(&prefix).await?;
    tracing::debug!(%prefix, removed, count, "cleared gallery slots");

    for (written, b) in bindings.iter().enumerate() {
        if let Err(e) = store.set_slot(&b.slot_key, b.asset_id.as_deref(), b.sort_rank).await {
            tracing::warn!(%prefix, written, count, error = %e, "gallery rewrite failed after delete; collection is incomplete");
            return Err(e);
        }
    }
    Ok(bindings)
}

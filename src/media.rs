use crate::slot_key::normalize_str;
use crate::types::{ContentBundle, ResolvedMediaItem};

/// Slot lookups over an already-fetched bundle.
pub struct MediaSlots<'a> {
    items: &'a [ResolvedMediaItem],
}

impl<'a> MediaSlots<'a> {
    pub fn new(bundle: &'a ContentBundle) -> Self {
        Self { items: &bundle.media }
    }

    pub fn from_items(items: &'a [ResolvedMediaItem]) -> Self {
        Self { items }
    }

    /// First item bound to exactly `slot_key`; earliest wins on duplicates.
    /// When nothing matches exactly, `gallery.images.3` and
    /// `gallery.images.03` are treated as the same slot.
    pub fn by_key(&self, slot_key: &str) -> Option<&'a ResolvedMediaItem> {
        if let Some(item) = self.items.iter().find(|item| item.slot_key == slot_key) {
            return Some(item);
        }
        let key = normalize_str(slot_key);
        self.items.iter().find(|item| normalize_str(&item.slot_key) == key)
    }

    /// Items under `prefix`, ascending by sort rank (unranked last), then by key.
    pub fn by_prefix(&self, prefix: &str) -> Vec<&'a ResolvedMediaItem> {
        let mut out: Vec<&ResolvedMediaItem> = self.items.iter().filter(|item| item.slot_key.starts_with(prefix)).collect();
        out.sort_by(|a, b| {
            let rank = |item: &ResolvedMediaItem| (item.sort_rank.is_none(), item.sort_rank);
            rank(a).cmp(&rank(b)).then_with(|| a.slot_key.cmp(&b.slot_key))
        });
        out
    }

    /// Item at `slot_key` if it can be shown. An empty URL means no media.
    pub fn renderable(&self, slot_key: &str) -> Option<&'a ResolvedMediaItem> {
        self.by_key(slot_key).filter(|item| !item.url.is_empty())
    }
}

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use folio::error::{ContentError, Result};
use folio::memory::MemoryStore;
use folio::storage::ContentStore;
use folio::types::{BundlePayload, ContentRecord, Locale, MediaAsset, MediaKind, SlotRow, TextField};
use tokio::sync::Notify;

/// Wraps a [`MemoryStore`] with call counters, an optional gate on bundle
/// fetches, and injectable failures.
#[derive(Default)]
pub struct InstrumentedStore {
    pub inner: MemoryStore,
    bundle_calls: AtomicUsize,
    fetch_one_calls: AtomicUsize,
    gate: Option<Arc<Notify>>,
    fail_bundles: AtomicUsize,
    fail_fetch_one: AtomicUsize,
    // set_slot succeeds this many more times, then fails
    set_slot_budget: Mutex<Option<usize>>,
}

impl InstrumentedStore {
    pub fn new(inner: MemoryStore) -> Self {
        Self { inner, ..Default::default() }
    }

    pub fn gated(inner: MemoryStore, gate: Arc<Notify>) -> Self {
        Self { inner, gate: Some(gate), ..Default::default() }
    }

    pub fn bundle_calls(&self) -> usize {
        self.bundle_calls.load(Ordering::SeqCst)
    }

    pub fn fetch_one_calls(&self) -> usize {
        self.fetch_one_calls.load(Ordering::SeqCst)
    }

    pub fn fail_next_bundles(&self, n: usize) {
        self.fail_bundles.store(n, Ordering::SeqCst);
    }

    pub fn fail_next_fetch_one(&self, n: usize) {
        self.fail_fetch_one.store(n, Ordering::SeqCst);
    }

    pub fn fail_set_slot_after(&self, successes: usize) {
        *self.set_slot_budget.lock().unwrap() = Some(successes);
    }

    fn take_failure(counter: &AtomicUsize) -> bool {
        counter.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1)).is_ok()
    }
}

#[async_trait]
impl ContentStore for InstrumentedStore {
    async fn fetch_bundle(&self, locale: Locale, text_prefix: &str, media_prefix: &str) -> Result<BundlePayload> {
        self.bundle_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        if Self::take_failure(&self.fail_bundles) {
            return Err(ContentError::Transport("backend unavailable".into()));
        }
        self.inner.fetch_bundle(locale, text_prefix, media_prefix).await
    }

    async fn fetch_one(&self, key: &str) -> Result<Option<ContentRecord>> {
        self.fetch_one_calls.fetch_add(1, Ordering::SeqCst);
        if Self::take_failure(&self.fail_fetch_one) {
            return Err(ContentError::Transport("backend unavailable".into()));
        }
        self.inner.fetch_one(key).await
    }

    async fn list_slots_by_prefix(&self, prefix: &str) -> Result<Vec<SlotRow>> {
        self.inner.list_slots_by_prefix(prefix).await
    }

    async fn upsert_text(&self, key: &str, field: TextField, value: &str) -> Result<()> {
        self.inner.upsert_text(key, field, value).await
    }

    async fn publish(&self, key: &str) -> Result<()> {
        self.inner.publish(key).await
    }

    async fn set_slot(&self, slot_key: &str, asset_id: Option<&str>, sort_rank: Option<i64>) -> Result<()> {
        {
            let mut budget = self.set_slot_budget.lock().unwrap();
            match budget.as_mut() {
                Some(0) => return Err(ContentError::Transport("write rejected".into())),
                Some(n) => *n -= 1,
                None => {}
            }
        }
        self.inner.set_slot(slot_key, asset_id, sort_rank).await
    }

    async fn delete_slots_by_prefix(&self, prefix: &str) -> Result<u64> {
        self.inner.delete_slots_by_prefix(prefix).await
    }

    async fn upsert_asset(&self, asset: &MediaAsset) -> Result<()> {
        self.inner.upsert_asset(asset).await
    }
}

pub fn photo(id: &str) -> MediaAsset {
    MediaAsset {
        id: id.into(),
        title: Some(format!("Photo {id}")),
        bucket: "site".into(),
        object_path: format!("photos/{id}.jpg"),
        is_public: true,
        kind: MediaKind::Photo,
        category: None,
    }
}

pub fn record(key: &str, canonical: &str, draft: Option<&str>, published: Option<&str>, approved: bool) -> ContentRecord {
    ContentRecord {
        key: key.into(),
        value_canonical: Some(canonical.into()),
        value_draft_alt: draft.map(Into::into),
        value_published_alt: published.map(Into::into),
        approved,
        ..Default::default()
    }
}

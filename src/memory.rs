//! In-memory [`ContentStore`] for tests, demos, and embedding without a backend.
//!
//! Uses ordered maps behind `std::sync::RwLock`; every prefix query is a
//! range scan, so results come back in key order.

use std::collections::{BTreeMap, HashMap};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard, PoisonError};

use async_trait::async_trait;

use crate::error::Result;
use crate::storage::ContentStore;
use crate::types::{BundlePayload, ContentRecord, Locale, MediaAsset, MediaSlotBinding, SlotRow, TextField};

#[derive(Default)]
struct State {
    records: BTreeMap<String, ContentRecord>,
    assets: HashMap<String, MediaAsset>,
    slots: BTreeMap<String, MediaSlotBinding>,
    clock: u64,
}

impl State {
    fn tick(&mut self) -> String {
        self.clock += 1;
        format!("{:020}", self.clock)
    }

    fn slot_row(&self, binding: &MediaSlotBinding) -> SlotRow {
        let asset = binding.asset_id.as_ref().and_then(|id| self.assets.get(id)).cloned();
        SlotRow { binding: binding.clone(), asset }
    }

    fn slots_under<'a>(&'a self, prefix: &'a str) -> impl Iterator<Item = &'a MediaSlotBinding> + 'a {
        self.slots.range(prefix.to_string()..).take_while(move |(k, _)| k.starts_with(prefix)).map(|(_, b)| b)
    }
}

/// In-memory store. `updated_at` is a monotonic counter rather than a clock.
#[derive(Default)]
pub struct MemoryStore {
    state: RwLock<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, State> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, State> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Insert or replace a whole record.
    pub fn insert_record(&self, mut record: ContentRecord) {
        let mut state = self.write();
        record.updated_at = Some(state.tick());
        state.records.insert(record.key.clone(), record);
    }

    pub fn insert_asset(&self, asset: MediaAsset) {
        self.write().assets.insert(asset.id.clone(), asset);
    }

    pub fn bind(&self, slot_key: &str, asset_id: Option<&str>, sort_rank: Option<i64>) {
        let binding = MediaSlotBinding { slot_key: slot_key.to_string(), asset_id: asset_id.map(str::to_string), sort_rank };
        self.write().slots.insert(slot_key.to_string(), binding);
    }

    pub fn record(&self, key: &str) -> Option<ContentRecord> {
        self.read().records.get(key).cloned()
    }

    /// Snapshot of every binding, in key order.
    pub fn bindings(&self) -> Vec<MediaSlotBinding> {
        self.read().slots.values().cloned().collect()
    }
}

#[async_trait]
impl ContentStore for MemoryStore {
    async fn fetch_bundle(&self, _locale: Locale, text_prefix: &str, media_prefix: &str) -> Result<BundlePayload> {
        let state = self.read();
        let records = state
            .records
            .range(text_prefix.to_string()..)
            .take_while(|(k, _)| k.starts_with(text_prefix))
            .map(|(_, r)| r.clone())
            .collect();
        let media = state
            .slots_under(media_prefix)
            .map(|b| state.slot_row(b))
            .filter(|row| row.asset.as_ref().is_some_and(|a| a.is_public))
            .collect();
        Ok(BundlePayload { records, media })
    }

    async fn fetch_one(&self, key: &str) -> Result<Option<ContentRecord>> {
        Ok(self.record(key))
    }

    async fn list_slots_by_prefix(&self, prefix: &str) -> Result<Vec<SlotRow>> {
        let state = self.read();
        Ok(state.slots_under(prefix).map(|b| state.slot_row(b)).collect())
    }

    async fn upsert_text(&self, key: &str, field: TextField, value: &str) -> Result<()> {
        let mut state = self.write();
        let now = state.tick();
        let record = state
            .records
            .entry(key.to_string())
            .or_insert_with(|| ContentRecord { key: key.to_string(), ..Default::default() });
        match field {
            TextField::Canonical => record.value_canonical = Some(value.to_string()),
            TextField::DraftAlt => record.value_draft_alt = Some(value.to_string()),
        }
        record.updated_at = Some(now);
        Ok(())
    }

    async fn publish(&self, key: &str) -> Result<()> {
        let mut state = self.write();
        let now = state.tick();
        if let Some(record) = state.records.get_mut(key) {
            record.value_published_alt = record.value_draft_alt.clone();
            record.approved = true;
            record.updated_at = Some(now);
        }
        Ok(())
    }

    async fn set_slot(&self, slot_key: &str, asset_id: Option<&str>, sort_rank: Option<i64>) -> Result<()> {
        self.bind(slot_key, asset_id, sort_rank);
        Ok(())
    }

    async fn delete_slots_by_prefix(&self, prefix: &str) -> Result<u64> {
        let mut state = self.write();
        let before = state.slots.len();
        state.slots.retain(|k, _| !k.starts_with(prefix));
        Ok((before - state.slots.len()) as u64)
    }

    async fn upsert_asset(&self, asset: &MediaAsset) -> Result<()> {
        self.insert_asset(asset.clone());
        Ok(())
    }
}

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{BundlePayload, ContentRecord, Locale, MediaAsset, SlotRow, TextField};

/// Boundary to the managed content backend.
///
/// Implementations own table layout and permissions; the engine only relies
/// on the guarantees documented per method.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Records whose key starts with `text_prefix` and slot rows whose key
    /// starts with `media_prefix`. Only bound slots with public assets are
    /// returned. `locale` lets a backend trim the columns it sends.
    async fn fetch_bundle(&self, locale: Locale, text_prefix: &str, media_prefix: &str) -> Result<BundlePayload>;

    async fn fetch_one(&self, key: &str) -> Result<Option<ContentRecord>>;

    /// Every binding under `prefix`, bound or not, with its asset if any.
    async fn list_slots_by_prefix(&self, prefix: &str) -> Result<Vec<SlotRow>>;

    /// Create the record if needed, then overwrite one text column.
    async fn upsert_text(&self, key: &str, field: TextField, value: &str) -> Result<()>;

    /// Copy the Spanish draft into the published column and mark it approved.
    async fn publish(&self, key: &str) -> Result<()>;

    async fn set_slot(&self, slot_key: &str, asset_id: Option<&str>, sort_rank: Option<i64>) -> Result<()>;

    /// Returns the number of bindings removed.
    async fn delete_slots_by_prefix(&self, prefix: &str) -> Result<u64>;

    async fn upsert_asset(&self, asset: &MediaAsset) -> Result<()>;
}

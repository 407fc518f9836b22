pub mod cache;
pub mod config;
pub mod dao;
pub mod db;
pub mod error;
pub mod gallery;
pub mod mapping;
pub mod media;
pub mod memory;
pub mod overlay;
pub mod page;
pub mod resolver;
pub mod rest;
pub mod sections;
pub mod slot_key;
pub mod storage;
pub mod types;

/// Convenience re-exports for embedders.
pub mod prelude {
    pub use crate::config::Config;
    pub use crate::error::{ContentError, Result};
    pub use crate::media::MediaSlots;
    pub use crate::overlay::{Capability, EditMode, EditState, FieldEditor};
    pub use crate::page::{layout_rows, ComposedPage, ComposedSection, LayoutRow};
    pub use crate::sections::{CardSource, CardVariant, SectionDescriptor, SectionKind};
    pub use crate::storage::ContentStore;
    pub use crate::types::{ContentBundle, ContentRecord, Locale, MediaAsset, MediaKind, ResolvedMediaItem};
    pub use crate::Folio;
}

use std::sync::Arc;

use crate::cache::BundleCache;
use crate::config::Config;
use crate::db::Database;
use crate::error::Result;
use crate::overlay::{Capability, EditMode};
use crate::page::ComposedPage;
use crate::rest::RestStore;
use crate::slot_key::{normalize_str, validate_key, validate_prefix};
use crate::storage::ContentStore;
use crate::types::{ContentBundle, Locale, MediaAsset, MediaSlotBinding, SlotRow};

/// Composition root. Owns the store, the bundle cache, and URL settings.
pub struct Folio {
    store: Arc<dyn ContentStore>,
    cache: BundleCache,
    storage_base_url: Option<String>,
}

impl Folio {
    pub fn new(store: Arc<dyn ContentStore>, config: &Config) -> Self {
        let storage_base_url = config.storage_base_url.clone();
        let cache = BundleCache::new(store.clone(), storage_base_url.clone());
        Self { store, cache, storage_base_url }
    }

    /// Build the configured backend: REST when `[rest]` is set, otherwise
    /// SQLite (migrations are run on connect).
    pub async fn connect(config: &Config) -> anyhow::Result<Self> {
        let store: Arc<dyn ContentStore> = match &config.rest {
            Some(rest) => {
                tracing::info!(url = %rest.url, "using REST content backend");
                Arc::new(RestStore::new(&rest.url, rest.api_key.clone(), rest.access_token.clone())?)
            }
            None => {
                let db = Database::connect(config.database_url.as_deref()).await?;
                db.run_migrations().await?;
                Arc::new(db)
            }
        };
        Ok(Self::new(store, config))
    }

    pub fn store(&self) -> &dyn ContentStore { self.store.as_ref() }

    pub fn cache(&self) -> &BundleCache { &self.cache }

    pub fn storage_base_url(&self) -> Option<&str> { self.storage_base_url.as_deref() }

    /// Cached bundle for `(locale, text_prefix, media_prefix)`.
    pub async fn bundle(&self, locale: Locale, text_prefix: &str, media_prefix: &str) -> Result<Arc<ContentBundle>> {
        self.cache.get_bundle(locale, text_prefix, media_prefix).await
    }

    /// Single ad hoc key, bypassing bundles. Never fails; worst case `fallback`.
    pub async fn text(&self, key: &str, locale: Locale, fallback: &str) -> String {
        resolver::resolve_one(self.store.as_ref(), key, locale, fallback).await
    }

    /// Compose `page` from the bundle with text and media prefix `<page>.`.
    pub async fn compose_page(&self, page: &str, locale: Locale, mode: EditMode) -> Result<ComposedPage> {
        let page = page.trim_end_matches('.');
        let prefix = format!("{page}.");
        let bundle = self.bundle(locale, &prefix, &prefix).await?;
        Ok(page::compose(self.store.as_ref(), &bundle, page, mode).await)
    }

    /// Editor save of one field. Spanish writes the draft only.
    pub async fn save_text(&self, capability: Capability, key: &str, locale: Locale, value: &str) -> Result<()> {
        let mut editor = overlay::FieldEditor::new(key, locale)?;
        editor.begin(value)?;
        editor.save(self.store.as_ref(), capability).await?;
        self.cache.invalidate_text(key);
        Ok(())
    }

    /// Publish the stored Spanish draft of `key`.
    pub async fn publish(&self, capability: Capability, key: &str) -> Result<()> {
        overlay::publish(self.store.as_ref(), capability, key, Locale::Es).await?;
        self.cache.invalidate_text(key);
        Ok(())
    }

    /// Bind (or clear) one slot.
    pub async fn set_slot(&self, capability: Capability, slot_key: &str, asset_id: Option<&str>, sort_rank: Option<i64>) -> Result<()> {
        capability.require_editor("bind media")?;
        validate_key("slot key", slot_key)?;
        let slot_key = normalize_str(slot_key);
        self.store.set_slot(&slot_key, asset_id, sort_rank).await?;
        self.cache.invalidate_media(&slot_key);
        Ok(())
    }

    pub async fn upsert_asset(&self, capability: Capability, asset: &MediaAsset) -> Result<()> {
        capability.require_editor("register media")?;
        self.store.upsert_asset(asset).await?;
        // any bundle may show this asset
        self.cache.clear();
        Ok(())
    }

    /// Every binding under `prefix`, bound or not (editor listing).
    pub async fn slots(&self, prefix: &str) -> Result<Vec<SlotRow>> {
        validate_prefix("slot prefix", prefix)?;
        self.store.list_slots_by_prefix(prefix).await
    }

    /// Full-replace rewrite of a gallery, then drop the bundles that show it.
    ///
    /// Invalidation also runs when the rewrite fails part way, since the
    /// delete may already have happened.
    pub async fn rewrite_gallery(
        &self,
        capability: Capability,
        prefix: &str,
        count: usize,
        selection: &[Option<String>],
    ) -> Result<Vec<MediaSlotBinding>> {
        let result = gallery::rewrite(self.store.as_ref(), capability, prefix, count, selection).await;
        if let Ok(canonical) = gallery::canonical_prefix(prefix) {
            if !matches!(result, Err(error::ContentError::Authorization(_)) | Err(error::ContentError::Validation { .. })) {
                self.cache.invalidate_media(&canonical);
                self.cache.invalidate_text(&gallery::count_key(&canonical));
            }
        }
        result
    }

    /// Drop every cached bundle.
    pub fn invalidate_all(&self) {
        self.cache.clear();
    }
}

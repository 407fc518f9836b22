//! Process-wide bundle cache.
//!
//! Entries are keyed by the full `(locale, text_prefix, media_prefix)` triple
//! and live until explicitly invalidated; there is no TTL. While a fetch is
//! outstanding its entry holds a shared future, so concurrent callers for the
//! same identity wait on one remote call. Failed fetches leave nothing behind.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::future::{BoxFuture, FutureExt, Shared};

use crate::error::Result;
use crate::mapping::bundle_from_payload;
use crate::slot_key::{validate_key, validate_prefix};
use crate::storage::ContentStore;
use crate::types::{BundleId, ContentBundle, Locale};

type SharedFetch = Shared<BoxFuture<'static, Result<Arc<ContentBundle>>>>;

enum Entry {
    Ready(Arc<ContentBundle>),
    // generation tells a finishing fetch whether its entry is still current
    Pending { generation: u64, fetch: SharedFetch },
}

pub struct BundleCache {
    store: Arc<dyn ContentStore>,
    storage_base_url: Option<String>,
    entries: Mutex<HashMap<BundleId, Entry>>,
    generation: AtomicU64,
}

impl BundleCache {
    pub fn new(store: Arc<dyn ContentStore>, storage_base_url: Option<String>) -> Self {
        Self { store, storage_base_url, entries: Mutex::new(HashMap::new()), generation: AtomicU64::new(0) }
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<BundleId, Entry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Fetch (or reuse) the bundle for this identity.
    pub async fn get_bundle(&self, locale: Locale, text_prefix: &str, media_prefix: &str) -> Result<Arc<ContentBundle>> {
        validate_key("text prefix", text_prefix)?;
        validate_prefix("media prefix", media_prefix)?;
        let id = BundleId::new(locale, text_prefix, media_prefix);

        let (generation, fetch) = {
            let mut entries = self.entries();
            match entries.get(&id) {
                Some(Entry::Ready(bundle)) => {
                    tracing::debug!(bundle = %id, "bundle cache hit");
                    return Ok(bundle.clone());
                }
                // a settled failure whose owner has not cleaned up yet is not joined
                Some(Entry::Pending { generation, fetch }) if !matches!(fetch.peek(), Some(Err(_))) => {
                    tracing::debug!(bundle = %id, "joining in-flight bundle fetch");
                    (*generation, fetch.clone())
                }
                _ => {
                    tracing::debug!(bundle = %id, "bundle cache miss");
                    let generation = self.generation.fetch_add(1, Ordering::Relaxed);
                    let fetch = self.start_fetch(id.clone());
                    entries.insert(id.clone(), Entry::Pending { generation, fetch: fetch.clone() });
                    (generation, fetch)
                }
            }
        };

        let result = fetch.await;

        let mut entries = self.entries();
        let current = matches!(entries.get(&id), Some(Entry::Pending { generation: g, .. }) if *g == generation);
        if current {
            match &result {
                Ok(bundle) => {
                    entries.insert(id, Entry::Ready(bundle.clone()));
                }
                Err(e) => {
                    tracing::warn!(bundle = %id, error = %e, "bundle fetch failed");
                    entries.remove(&id);
                }
            }
        }
        result
    }

    fn start_fetch(&self, id: BundleId) -> SharedFetch {
        let store = self.store.clone();
        let base = self.storage_base_url.clone();
        async move {
            let payload = store.fetch_bundle(id.locale, &id.text_prefix, &id.media_prefix).await?;
            Ok(Arc::new(bundle_from_payload(&id, payload, base.as_deref())))
        }
        .boxed()
        .shared()
    }

    /// Drop one entry. An in-flight fetch for it still resolves for its
    /// waiters but is not stored.
    pub fn invalidate(&self, locale: Locale, text_prefix: &str, media_prefix: &str) -> bool {
        self.entries().remove(&BundleId::new(locale, text_prefix, media_prefix)).is_some()
    }

    /// Drop every entry matching `pred`; returns how many were removed.
    pub fn invalidate_where(&self, mut pred: impl FnMut(&BundleId) -> bool) -> usize {
        let mut entries = self.entries();
        let before = entries.len();
        entries.retain(|id, _| !pred(id));
        before - entries.len()
    }

    /// Drop entries that could contain text key `key`.
    pub fn invalidate_text(&self, key: &str) -> usize {
        self.invalidate_where(|id| id.covers_text(key))
    }

    /// Drop entries whose media prefix overlaps `prefix`.
    pub fn invalidate_media(&self, prefix: &str) -> usize {
        self.invalidate_where(|id| id.covers_media(prefix))
    }

    pub fn clear(&self) {
        self.entries().clear();
    }

    /// Number of memoized bundles (in-flight fetches excluded).
    pub fn len(&self) -> usize {
        self.entries().values().filter(|e| matches!(e, Entry::Ready(_))).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for BundleCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BundleCache").field("ready", &self.len()).finish_non_exhaustive()
    }
}

/// Swap a transport failure for an empty bundle so the caller can render
/// defaults. Validation and other errors still surface.
pub fn or_empty(result: Result<Arc<ContentBundle>>) -> Result<Arc<ContentBundle>> {
    match result {
        Err(e) if e.is_retryable() => {
            tracing::warn!(error = %e, "bundle unavailable, rendering defaults");
            Ok(Arc::new(ContentBundle::default()))
        }
        other => other,
    }
}

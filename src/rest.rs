//! HTTP content store for a PostgREST-style managed backend.
//!
//! Tables are reached at `/rest/v1/<table>`, publishing goes through the
//! `publish_content` RPC. Row-level permissions live on the server; a 401/403
//! comes back as [`ContentError::Authorization`].

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::json;
use url::Url;

use crate::error::{ContentError, Result};
use crate::storage::ContentStore;
use crate::types::{BundlePayload, ContentRecord, Locale, MediaAsset, MediaSlotBinding, SlotRow, TextField};

const CONTENT_TABLE: &str = "content";
const SLOTS_TABLE: &str = "media_slots";
const ASSETS_TABLE: &str = "media_assets";

#[derive(Debug, Deserialize)]
struct ContentDto {
    key: String,
    #[serde(default)]
    value_en: Option<String>,
    #[serde(default)]
    value_es_draft: Option<String>,
    #[serde(default)]
    value_es_published: Option<String>,
    #[serde(default)]
    approved: bool,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    updated_at: Option<String>,
}

impl From<ContentDto> for ContentRecord {
    fn from(d: ContentDto) -> Self {
        ContentRecord {
            key: d.key,
            value_canonical: d.value_en,
            value_draft_alt: d.value_es_draft,
            value_published_alt: d.value_es_published,
            approved: d.approved,
            category: d.category,
            updated_at: d.updated_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct AssetDto {
    id: String,
    #[serde(default)]
    title: Option<String>,
    bucket: String,
    object_path: String,
    #[serde(default)]
    is_public: bool,
    #[serde(default)]
    kind: Option<String>,
    #[serde(default)]
    category: Option<String>,
}

impl From<AssetDto> for MediaAsset {
    fn from(d: AssetDto) -> Self {
        MediaAsset {
            id: d.id,
            title: d.title,
            bucket: d.bucket,
            object_path: d.object_path,
            is_public: d.is_public,
            kind: d.kind.and_then(|k| k.parse().ok()).unwrap_or_default(),
            category: d.category,
        }
    }
}

#[derive(Debug, Deserialize)]
struct SlotDto {
    slot_key: String,
    #[serde(default)]
    asset_id: Option<String>,
    #[serde(default)]
    sort_rank: Option<i64>,
    #[serde(default)]
    asset: Option<AssetDto>,
}

impl From<SlotDto> for SlotRow {
    fn from(d: SlotDto) -> Self {
        SlotRow {
            binding: MediaSlotBinding { slot_key: d.slot_key, asset_id: d.asset_id, sort_rank: d.sort_rank },
            asset: d.asset.map(Into::into),
        }
    }
}

/// `like.` filter matching keys that start with `prefix`. `_` is escaped so it
/// matches literally.
pub fn like_prefix(prefix: &str) -> String {
    format!("like.{}*", prefix.replace('_', "\\_"))
}

/// Columns a visitor bundle needs per locale; drafts are never fetched here.
fn bundle_columns(locale: Locale) -> &'static str {
    match locale {
        Locale::En => "key,value_en,category,updated_at",
        Locale::Es => "key,value_en,value_es_published,approved,category,updated_at",
    }
}

pub struct RestStore {
    client: reqwest::Client,
    base: Url,
    api_key: String,
    access_token: Option<String>,
}

impl RestStore {
    pub fn new(base_url: &str, api_key: impl Into<String>, access_token: Option<String>) -> anyhow::Result<Self> {
        let mut base = Url::parse(base_url.trim())?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let client = reqwest::Client::builder().user_agent("folio/0.1").build()?;
        Ok(Self { client, base, api_key: api_key.into(), access_token })
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base.join(&format!("rest/v1/{path}")).map_err(ContentError::transport)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let bearer = self.access_token.as_deref().unwrap_or(&self.api_key);
        self.client.request(method, url).header("apikey", &self.api_key).bearer_auth(bearer)
    }

    async fn send(&self, builder: RequestBuilder) -> Result<Response> {
        let resp = builder.send().await?;
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let body = resp.text().await.unwrap_or_default();
        Err(error_for_status(status, &body))
    }

    async fn get_json<T: for<'de> Deserialize<'de>>(&self, url: Url) -> Result<T> {
        let resp = self.send(self.request(Method::GET, url)).await?;
        Ok(resp.json::<T>().await?)
    }

    async fn upsert(&self, table: &str, conflict: &str, body: serde_json::Value) -> Result<()> {
        let mut url = self.endpoint(table)?;
        url.query_pairs_mut().append_pair("on_conflict", conflict);
        let req = self
            .request(Method::POST, url)
            .header("Prefer", "resolution=merge-duplicates,return=minimal")
            .json(&body);
        self.send(req).await?;
        Ok(())
    }

    fn slots_url(&self, prefix: &str, public_only: bool) -> Result<Url> {
        let mut url = self.endpoint(SLOTS_TABLE)?;
        {
            let mut q = url.query_pairs_mut();
            if public_only {
                q.append_pair("select", "slot_key,asset_id,sort_rank,asset:media_assets!inner(*)");
                q.append_pair("asset.is_public", "eq.true");
            } else {
                q.append_pair("select", "slot_key,asset_id,sort_rank,asset:media_assets(*)");
            }
            q.append_pair("slot_key", &like_prefix(prefix));
            q.append_pair("order", "slot_key.asc");
        }
        Ok(url)
    }

    async fn slots(&self, prefix: &str, public_only: bool) -> Result<Vec<SlotRow>> {
        let rows: Vec<SlotDto> = self.get_json(self.slots_url(prefix, public_only)?).await?;
        Ok(rows.into_iter().filter(|r| r.slot_key.starts_with(prefix)).map(Into::into).collect())
    }
}

fn error_for_status(status: StatusCode, body: &str) -> ContentError {
    let detail = body.chars().take(200).collect::<String>();
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ContentError::Authorization(format!("access backend ({status}): {detail}")),
        _ => ContentError::Transport(format!("backend returned {status}: {detail}")),
    }
}

#[async_trait]
impl ContentStore for RestStore {
    async fn fetch_bundle(&self, locale: Locale, text_prefix: &str, media_prefix: &str) -> Result<BundlePayload> {
        let mut url = self.endpoint(CONTENT_TABLE)?;
        url.query_pairs_mut()
            .append_pair("select", bundle_columns(locale))
            .append_pair("key", &like_prefix(text_prefix))
            .append_pair("order", "key.asc");
        let rows: Vec<ContentDto> = self.get_json(url).await?;
        let records = rows.into_iter().filter(|r| r.key.starts_with(text_prefix)).map(Into::into).collect();
        let media = self.slots(media_prefix, true).await?;
        Ok(BundlePayload { records, media })
    }

    async fn fetch_one(&self, key: &str) -> Result<Option<ContentRecord>> {
        let mut url = self.endpoint(CONTENT_TABLE)?;
        url.query_pairs_mut().append_pair("select", "*").append_pair("key", &format!("eq.{key}")).append_pair("limit", "1");
        let rows: Vec<ContentDto> = self.get_json(url).await?;
        Ok(rows.into_iter().next().map(Into::into))
    }

    async fn list_slots_by_prefix(&self, prefix: &str) -> Result<Vec<SlotRow>> {
        self.slots(prefix, false).await
    }

    async fn upsert_text(&self, key: &str, field: TextField, value: &str) -> Result<()> {
        let mut row = serde_json::Map::new();
        row.insert("key".into(), json!(key));
        row.insert(field.column().into(), json!(value));
        self.upsert(CONTENT_TABLE, "key", serde_json::Value::Object(row)).await
    }

    async fn publish(&self, key: &str) -> Result<()> {
        let url = self.endpoint("rpc/publish_content")?;
        self.send(self.request(Method::POST, url).json(&json!({ "p_key": key }))).await?;
        Ok(())
    }

    async fn set_slot(&self, slot_key: &str, asset_id: Option<&str>, sort_rank: Option<i64>) -> Result<()> {
        let body = json!({ "slot_key": slot_key, "asset_id": asset_id, "sort_rank": sort_rank });
        self.upsert(SLOTS_TABLE, "slot_key", body).await
    }

    async fn delete_slots_by_prefix(&self, prefix: &str) -> Result<u64> {
        let mut url = self.endpoint(SLOTS_TABLE)?;
        url.query_pairs_mut().append_pair("slot_key", &like_prefix(prefix));
        let req = self.request(Method::DELETE, url).header("Prefer", "return=representation");
        let removed: Vec<serde_json::Value> = self.send(req).await?.json().await?;
        Ok(removed.len() as u64)
    }

    async fn upsert_asset(&self, asset: &MediaAsset) -> Result<()> {
        let dto = AssetDto {
            id: asset.id.clone(),
            title: asset.title.clone(),
            bucket: asset.bucket.clone(),
            object_path: asset.object_path.clone(),
            is_public: asset.is_public,
            kind: Some(asset.kind.as_str().to_string()),
            category: asset.category.clone(),
        };
        let body = serde_json::to_value(dto).map_err(ContentError::transport)?;
        self.upsert(ASSETS_TABLE, "id", body).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn like_filter_escapes_underscore() {
        assert_eq!(like_prefix("home.cards."), "like.home.cards.*");
        assert_eq!(like_prefix("about_us."), "like.about\\_us.*");
    }

    #[test]
    fn endpoints_keep_base_path() {
        let store = RestStore::new("https://example.test/api", "anon", None).unwrap();
        assert_eq!(store.endpoint("content").unwrap().as_str(), "https://example.test/api/rest/v1/content");
        let url = store.slots_url("gallery.images.", true).unwrap();
        let pairs: Vec<(String, String)> = url.query_pairs().map(|(k, v)| (k.into_owned(), v.into_owned())).collect();
        assert!(pairs.contains(&("slot_key".into(), "like.gallery.images.*".into())));
        assert!(pairs.contains(&("asset.is_public".into(), "eq.true".into())));
    }

    #[test]
    fn status_mapping() {
        assert!(matches!(error_for_status(StatusCode::FORBIDDEN, "rls"), ContentError::Authorization(_)));
        assert!(matches!(error_for_status(StatusCode::BAD_GATEWAY, ""), ContentError::Transport(_)));
    }

    #[test]
    fn visitor_bundles_never_select_drafts() {
        assert!(!bundle_columns(Locale::En).contains("draft"));
        assert!(!bundle_columns(Locale::Es).contains("draft"));
    }

    #[test]
    fn slot_dto_maps_asset() {
        let raw = r#"[{"slot_key":"home.hero","asset_id":"a","sort_rank":null,
            "asset":{"id":"a","bucket":"site","object_path":"x.jpg","is_public":true,"kind":"video"}}]"#;
        let rows: Vec<SlotDto> = serde_json::from_str(raw).unwrap();
        let row: SlotRow = rows.into_iter().next().unwrap().into();
        let asset = row.asset.unwrap();
        assert_eq!(asset.kind, crate::types::MediaKind::Video);
        assert!(asset.is_public);
    }
}

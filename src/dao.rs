use anyhow::Result;
use sqlx::AnyPool;

use crate::types::{ContentRecord, MediaAsset, MediaSlotBinding, SlotRow, TextField};

// sqlx::any cannot decode NULL into Option<_>, so nullable columns are read
// through COALESCE and mapped back with `non_empty`.
type ContentRow = (String, String, String, String, i64, String, String);

type SlotJoinRow = (String, String, i64, i64, String, String, String, String, i64, String, String);

const CONTENT_COLUMNS: &str = "key, COALESCE(value_en, ''), COALESCE(value_es_draft, ''),
                COALESCE(value_es_published, ''), approved, COALESCE(category, ''), COALESCE(updated_at, '')";

const SLOT_SELECT: &str = "SELECT s.slot_key, COALESCE(s.asset_id, ''), s.sort_rank IS NULL, COALESCE(s.sort_rank, 0),
                COALESCE(a.id, ''), COALESCE(a.title, ''), COALESCE(a.bucket, ''), COALESCE(a.object_path, ''),
                COALESCE(a.is_public, 0), COALESCE(a.kind, ''), COALESCE(a.category, '')
         FROM media_slots s LEFT JOIN media_assets a ON a.id = s.asset_id";

fn non_empty(s: String) -> Option<String> {
    if s.is_empty() { None } else { Some(s) }
}

fn record_from_row(r: ContentRow) -> ContentRecord {
    let (key, canonical, draft, published, approved, category, updated_at) = r;
    ContentRecord {
        key,
        value_canonical: non_empty(canonical),
        value_draft_alt: non_empty(draft),
        value_published_alt: non_empty(published),
        approved: approved != 0,
        category: non_empty(category),
        updated_at: non_empty(updated_at),
    }
}

fn slot_from_row(r: SlotJoinRow) -> SlotRow {
    let (slot_key, asset_id, rank_is_null, rank, a_id, title, bucket, object_path, is_public, kind, category) = r;
    let asset = match (non_empty(a_id), non_empty(bucket), non_empty(object_path)) {
        (Some(id), Some(bucket), Some(object_path)) => Some(MediaAsset {
            id,
            title: non_empty(title),
            bucket,
            object_path,
            is_public: is_public != 0,
            kind: kind.parse().unwrap_or_default(),
            category: non_empty(category),
        }),
        _ => None,
    };
    let sort_rank = if rank_is_null != 0 { None } else { Some(rank) };
    SlotRow { binding: MediaSlotBinding { slot_key, asset_id: non_empty(asset_id), sort_rank }, asset }
}

// Prefix filters use substr rather than LIKE so `_` in keys stays literal.

pub async fn list_content_by_prefix(pool: &AnyPool, prefix: &str) -> Result<Vec<ContentRecord>> {
    let rows = sqlx::query_as::<_, ContentRow>(&format!(
        "SELECT {CONTENT_COLUMNS} FROM content WHERE substr(key, 1, ?) = ? ORDER BY key"
    ))
    .bind(prefix.len() as i64)
    .bind(prefix)
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().map(record_from_row).collect())
}

pub async fn get_content(pool: &AnyPool, key: &str) -> Result<Option<ContentRecord>> {
    let row = sqlx::query_as::<_, ContentRow>(&format!("SELECT {CONTENT_COLUMNS} FROM content WHERE key = ?"))
        .bind(key)
        .fetch_optional(pool)
        .await?;
    Ok(row.map(record_from_row))
}

pub async fn upsert_text(pool: &AnyPool, key: &str, field: TextField, value: &str) -> Result<()> {
    let col = field.column();
    sqlx::query(&format!(
        "INSERT INTO content(key, {col}) VALUES(?, ?)\n         ON CONFLICT(key) DO UPDATE SET {col}=excluded.{col}, updated_at=CURRENT_TIMESTAMP"
    ))
    .bind(key)
    .bind(value)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn publish_content(pool: &AnyPool, key: &str) -> Result<u64> {
    let result = sqlx::query(
        "UPDATE content SET value_es_published = value_es_draft, approved = 1, updated_at=CURRENT_TIMESTAMP WHERE key = ?",
    )
    .bind(key)
    .execute(pool)
    .await?;
    Ok(result.rows_affected())
}

pub async fn list_slots(pool: &AnyPool, prefix: &str, public_only: bool) -> Result<Vec<SlotRow>> {
    let filter = if public_only { " AND a.is_public = 1" } else { "" };
    let rows = sqlx::query_as::<_, SlotJoinRow>(&format!(
        "{SLOT_SELECT}\n         WHERE substr(s.slot_key, 1, ?) = ?{filter}\n         ORDER BY s.slot_key"
    ))
    .bind(prefix.len() as i64)
    .bind(prefix)
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().map(slot_from_row).collect())
}

pub async fn set_slot(pool: &AnyPool, b: &MediaSlotBinding) -> Result<()> {
    sqlx::query(
        "INSERT INTO media_slots(slot_key, asset_id, sort_rank) VALUES(?, ?, ?)\n         ON CONFLICT(slot_key) DO UPDATE SET\n           asset_id=excluded.asset_id, sort_rank=excluded.sort_rank, updated_at=CURRENT_TIMESTAMP",
    )
    .bind(&b.slot_key)
    .bind(&b.asset_id)
    .bind(b.sort_rank)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn delete_slots_by_prefix(pool: &AnyPool, prefix: &str) -> Result<u64> {
    let result = sqlx::query("DELETE FROM media_slots WHERE substr(slot_key, 1, ?) = ?")
        .bind(prefix.len() as i64)
        .bind(prefix)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}

pub async fn upsert_asset(pool: &AnyPool, a: &MediaAsset) -> Result<()> {
    sqlx::query(
        "INSERT INTO media_assets(id, title, bucket, object_path, is_public, kind, category)\n         VALUES(?, ?, ?, ?, ?, ?, ?)\n         ON CONFLICT(id) DO UPDATE SET\n           title=excluded.title, bucket=excluded.bucket, object_path=excluded.object_path,\n           is_public=excluded.is_public, kind=excluded.kind, category=excluded.category",
    )
    .bind(&a.id)
    .bind(&a.title)
    .bind(&a.bucket)
    .bind(&a.object_path)
    .bind(a.is_public as i64)
    .bind(a.kind.as_str())
    .bind(&a.category)
    .execute(pool)
    .await?;
    Ok(())
}

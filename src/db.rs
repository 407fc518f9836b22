use anyhow::{Context, Result};
use async_trait::async_trait;
use directories::ProjectDirs;
use sqlx::{any::AnyConnectOptions, AnyPool, ConnectOptions, migrate::Migrator};
use sqlx::any::AnyPoolOptions;
use std::{path::PathBuf, str::FromStr};
use std::sync::Once;

use crate::dao;
use crate::error::{ContentError, Result as ContentResult};
use crate::storage::ContentStore;
use crate::types::{BundlePayload, ContentRecord, Locale, MediaAsset, MediaSlotBinding, SlotRow, TextField};

// sqlx::any needs its drivers registered once per process
static INSTALL_DRIVERS: Once = Once::new();

static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// SQLite-backed content store.
#[derive(Clone)]
pub struct Database {
    pool: AnyPool,
}

impl Database {
    /// Open a pool on `database_url`, or on `folio.db` in the platform data
    /// directory when none is given.
    pub async fn connect(database_url: Option<&str>) -> Result<Self> {
        INSTALL_DRIVERS.call_once(sqlx::any::install_default_drivers);

        let url = match database_url {
            Some(u) if !u.trim().is_empty() => u.to_string(),
            _ => default_sqlite_url()?,
        };

        let opts = AnyConnectOptions::from_str(&url)
            .with_context(|| format!("invalid database URL: {url}"))?
            .disable_statement_logging();

        let pool = AnyPoolOptions::new()
            .max_connections(10)
            .connect_with(opts)
            .await
            .with_context(|| format!("failed to connect to database: {url}"))?;

        tracing::debug!(%url, "connected to content database");
        Ok(Self { pool })
    }

    pub async fn run_migrations(&self) -> Result<()> {
        MIGRATOR.run(&self.pool).await.context("running migrations")
    }

    pub fn pool(&self) -> &AnyPool { &self.pool }
}

#[async_trait]
impl ContentStore for Database {
    async fn fetch_bundle(&self, _locale: Locale, text_prefix: &str, media_prefix: &str) -> ContentResult<BundlePayload> {
        let records = dao::list_content_by_prefix(&self.pool, text_prefix).await.map_err(ContentError::transport)?;
        let media = dao::list_slots(&self.pool, media_prefix, true).await.map_err(ContentError::transport)?;
        Ok(BundlePayload { records, media })
    }

    async fn fetch_one(&self, key: &str) -> ContentResult<Option<ContentRecord>> {
        dao::get_content(&self.pool, key).await.map_err(ContentError::transport)
    }

    async fn list_slots_by_prefix(&self, prefix: &str) -> ContentResult<Vec<SlotRow>> {
        dao::list_slots(&self.pool, prefix, false).await.map_err(ContentError::transport)
    }

    async fn upsert_text(&self, key: &str, field: TextField, value: &str) -> ContentResult<()> {
        dao::upsert_text(&self.pool, key, field, value).await.map_err(ContentError::transport)
    }

    async fn publish(&self, key: &str) -> ContentResult<()> {
        let updated = dao::publish_content(&self.pool, key).await.map_err(ContentError::transport)?;
        if updated == 0 {
            tracing::debug!(key, "publish matched no record");
        }
        Ok(())
    }

    async fn set_slot(&self, slot_key: &str, asset_id: Option<&str>, sort_rank: Option<i64>) -> ContentResult<()> {
        let binding = MediaSlotBinding { slot_key: slot_key.to_string(), asset_id: asset_id.map(str::to_string), sort_rank };
        dao::set_slot(&self.pool, &binding).await.map_err(ContentError::transport)
    }

    async fn delete_slots_by_prefix(&self, prefix: &str) -> ContentResult<u64> {
        dao::delete_slots_by_prefix(&self.pool, prefix).await.map_err(ContentError::transport)
    }

    async fn upsert_asset(&self, asset: &MediaAsset) -> ContentResult<()> {
        dao::upsert_asset(&self.pool, asset).await.map_err(ContentError::transport)
    }
}

fn default_sqlite_url() -> Result<String> {
    let proj = ProjectDirs::from("dev", "folio", "folio")
        .context("unable to determine data directory for default sqlite path")?;
    let mut path: PathBuf = proj.data_dir().to_path_buf();
    std::fs::create_dir_all(&path).with_context(|| format!("creating data dir: {}", path.display()))?;
    path.push("folio.db");
    Ok(sqlite_url(&path))
}

/// `sqlite://` URL for a file path, created on first open.
pub fn sqlite_url(path: &std::path::Path) -> String {
    // Encode spaces in the path for a valid sqlite URL
    let path_str = path.to_string_lossy().replace(' ', "%20");
    format!("sqlite://{path_str}?mode=rwc")
}

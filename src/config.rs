use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::types::Locale;

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Config {
    /// Base for public media URLs; unset means media renders as "no media".
    pub storage_base_url: Option<String>,
    /// sqlx database URL; defaults to a SQLite file in the data directory.
    pub database_url: Option<String>,
    /// When set, content is read from and written to a REST backend instead.
    pub rest: Option<RestConfig>,
    pub default_locale: Locale,
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct RestConfig {
    pub url: String,
    pub api_key: String,
    #[serde(default)]
    pub access_token: Option<String>,
}

impl Config {
    pub fn from_toml(raw: &str) -> Result<Self> {
        toml::from_str(raw).context("parsing config")
    }

    /// Load from `explicit`, `$FOLIO_CONFIG`, or the platform config dir, then
    /// apply environment overrides. A missing default file yields defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let from_env = std::env::var_os("FOLIO_CONFIG").map(PathBuf::from);
        let path = explicit.map(Path::to_path_buf).or(from_env);
        let mut cfg = match path {
            Some(p) => {
                let raw = std::fs::read_to_string(&p).with_context(|| format!("reading config: {}", p.display()))?;
                Self::from_toml(&raw).with_context(|| format!("in {}", p.display()))?
            }
            None => match default_config_path() {
                Some(p) if p.exists() => {
                    let raw = std::fs::read_to_string(&p).with_context(|| format!("reading config: {}", p.display()))?;
                    Self::from_toml(&raw).with_context(|| format!("in {}", p.display()))?
                }
                _ => Self::default(),
            },
        };
        cfg.apply_env(|name| std::env::var(name).ok());
        Ok(cfg)
    }

    /// Overlay `FOLIO_*` variables read through `lookup`.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        if let Some(v) = var("FOLIO_STORAGE_BASE_URL") { self.storage_base_url = Some(v); }
        if let Some(v) = var("FOLIO_DATABASE_URL") { self.database_url = Some(v); }
        if let Some(v) = var("FOLIO_DEFAULT_LOCALE").and_then(|v| v.parse().ok()) { self.default_locale = v; }

        let url = var("FOLIO_REST_URL");
        let key = var("FOLIO_REST_API_KEY");
        let token = var("FOLIO_REST_ACCESS_TOKEN");
        if let Some(rest) = self.rest.as_mut() {
            if let Some(u) = url { rest.url = u; }
            if let Some(k) = key { rest.api_key = k; }
            if token.is_some() { rest.access_token = token; }
        } else if let (Some(url), Some(api_key)) = (url, key) {
            self.rest = Some(RestConfig { url, api_key, access_token: token });
        }
    }
}

fn default_config_path() -> Option<PathBuf> {
    ProjectDirs::from("dev", "folio", "folio").map(|p| p.config_dir().join("folio.toml"))
}

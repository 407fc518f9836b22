use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Page locale. English is canonical; Spanish goes through draft/publish.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    #[default]
    En,
    Es,
}

impl Locale {
    pub fn as_str(&self) -> &'static str {
        match self {
            Locale::En => "en",
            Locale::Es => "es",
        }
    }

    /// The column an editor save writes to in this locale.
    pub fn draft_field(&self) -> TextField {
        match self {
            Locale::En => TextField::Canonical,
            Locale::Es => TextField::DraftAlt,
        }
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Locale {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "en" | "en-us" | "english" => Ok(Locale::En),
            "es" | "es-es" | "es-mx" | "spanish" => Ok(Locale::Es),
            other => Err(format!("unsupported locale: {other}")),
        }
    }
}

/// Writable text columns of a [`ContentRecord`]. The published Spanish value
/// is only ever written by a publish.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextField {
    Canonical,
    DraftAlt,
}

impl TextField {
    pub fn column(&self) -> &'static str {
        match self {
            TextField::Canonical => "value_en",
            TextField::DraftAlt => "value_es_draft",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ContentRecord {
    pub key: String,
    pub value_canonical: Option<String>,
    pub value_draft_alt: Option<String>,
    pub value_published_alt: Option<String>,
    pub approved: bool,
    pub category: Option<String>,
    pub updated_at: Option<String>, // ISO string
}

impl ContentRecord {
    pub fn new(key: impl Into<String>, canonical: impl Into<String>) -> Self {
        Self { key: key.into(), value_canonical: Some(canonical.into()), ..Default::default() }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    #[default]
    Photo,
    Video,
}

impl MediaKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Photo => "photo",
            MediaKind::Video => "video",
        }
    }
}

impl FromStr for MediaKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "photo" | "image" => Ok(MediaKind::Photo),
            "video" => Ok(MediaKind::Video),
            other => Err(format!("unknown media kind: {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaAsset {
    pub id: String,
    pub title: Option<String>,
    pub bucket: String,
    pub object_path: String,
    pub is_public: bool,
    pub kind: MediaKind,
    pub category: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaSlotBinding {
    pub slot_key: String,
    pub asset_id: Option<String>,
    pub sort_rank: Option<i64>,
}

/// A slot binding joined with its asset, as returned by the storage boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotRow {
    pub binding: MediaSlotBinding,
    pub asset: Option<MediaAsset>,
}

/// A public asset bound to a slot, with its derived URL. An empty `url`
/// means "no media".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedMediaItem {
    pub slot_key: String,
    pub sort_rank: Option<i64>,
    pub asset_id: String,
    pub title: Option<String>,
    pub kind: MediaKind,
    pub url: String,
}

/// Raw material for one bundle: records under the text prefix and public
/// slot rows under the media prefix.
#[derive(Debug, Clone, Default)]
pub struct BundlePayload {
    pub records: Vec<ContentRecord>,
    pub media: Vec<SlotRow>,
}

/// Cache identity of a bundle. All three parts matter.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BundleId {
    pub locale: Locale,
    pub text_prefix: String,
    pub media_prefix: String,
}

impl BundleId {
    pub fn new(locale: Locale, text_prefix: &str, media_prefix: &str) -> Self {
        Self { locale, text_prefix: text_prefix.to_string(), media_prefix: media_prefix.to_string() }
    }

    /// Whether a write to text key `key` could change this bundle.
    pub fn covers_text(&self, key: &str) -> bool {
        key.starts_with(&self.text_prefix)
    }

    /// Whether a write under slot prefix `prefix` could change this bundle.
    pub fn covers_media(&self, prefix: &str) -> bool {
        prefix.starts_with(&self.media_prefix) || self.media_prefix.starts_with(prefix)
    }
}

impl fmt::Display for BundleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}|{}|{}", self.locale, self.text_prefix, self.media_prefix)
    }
}

/// Immutable snapshot produced by one fetch. `strings` is already resolved for
/// `locale`; blank values are absent.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ContentBundle {
    pub locale: Locale,
    pub text_prefix: String,
    pub media_prefix: String,
    pub strings: HashMap<String, String>,
    pub media: Vec<ResolvedMediaItem>,
}

impl ContentBundle {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.strings.get(key).map(String::as_str)
    }
}

//! Editor overlay.
//!
//! Visitors read published text out of cached bundles. An editor with edit
//! mode switched on reads each field straight from the store instead, sees
//! Spanish drafts, and changes fields through a [`FieldEditor`]:
//!
//! ```text
//! Viewing --begin--> Editing --save--> Saving --ok--> Viewing
//!                      ^  |              |
//!                      |  +--cancel--> Viewing
//!                      +-----failed------+
//! ```
//!
//! Save and publish are separate writes. Publish copies whatever draft the
//! store currently holds, which is not necessarily the local unsaved edit.

use crate::error::{ContentError, Result};
use crate::resolver::{is_blank, resolve, resolve_record};
use crate::slot_key::validate_key;
use crate::storage::ContentStore;
use crate::types::{ContentBundle, ContentRecord, Locale};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Capability {
    #[default]
    Visitor,
    Editor,
}

impl Capability {
    pub fn require_editor(&self, action: &str) -> Result<()> {
        match self {
            Capability::Editor => Ok(()),
            Capability::Visitor => Err(ContentError::Authorization(action.to_string())),
        }
    }
}

/// Who is reading and whether the edit overlay is switched on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EditMode {
    pub capability: Capability,
    pub active: bool,
}

impl EditMode {
    pub fn visitor() -> Self {
        Self::default()
    }

    pub fn editor(active: bool) -> Self {
        Self { capability: Capability::Editor, active }
    }

    /// Overlay reads only apply to an editor with edit mode on.
    pub fn bypasses_cache(&self) -> bool {
        self.active && self.capability == Capability::Editor
    }
}

/// What an editor sees for a record: the Spanish draft when there is one,
/// otherwise the public resolution.
pub fn editor_value(record: &ContentRecord, locale: Locale, fallback: &str) -> String {
    if locale == Locale::Es {
        if let Some(draft) = record.value_draft_alt.as_deref().filter(|d| !is_blank(Some(*d))) {
            return draft.to_string();
        }
    }
    resolve_record(record, locale, fallback)
}

/// Resolve one text field, through the overlay when it applies.
///
/// Overlay reads that fail fall back to the bundle so the page still renders.
pub async fn read_field(
    store: &dyn ContentStore,
    mode: EditMode,
    bundle: &ContentBundle,
    key: &str,
    fallback: &str,
) -> String {
    if !mode.bypasses_cache() {
        return resolve(bundle, key, fallback);
    }
    match store.fetch_one(key).await {
        Ok(Some(record)) => editor_value(&record, bundle.locale, fallback),
        Ok(None) => fallback.to_string(),
        Err(e) => {
            tracing::warn!(key, error = %e, "overlay read failed, using bundle value");
            resolve(bundle, key, fallback)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum EditState {
    #[default]
    Viewing,
    Editing { draft: String },
    Saving { draft: String },
}

/// Client-local edit state for one field in one locale.
#[derive(Debug, Clone)]
pub struct FieldEditor {
    key: String,
    locale: Locale,
    state: EditState,
}

impl FieldEditor {
    pub fn new(key: impl Into<String>, locale: Locale) -> Result<Self> {
        let key = key.into();
        validate_key("content key", &key)?;
        Ok(Self { key, locale, state: EditState::Viewing })
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn locale(&self) -> Locale {
        self.locale
    }

    pub fn state(&self) -> &EditState {
        &self.state
    }

    pub fn draft(&self) -> Option<&str> {
        match &self.state {
            EditState::Editing { draft } | EditState::Saving { draft } => Some(draft),
            EditState::Viewing => None,
        }
    }

    /// Start editing with `current` (the value on screen) as the draft.
    pub fn begin(&mut self, current: impl Into<String>) -> Result<()> {
        match self.state {
            EditState::Viewing => {
                self.state = EditState::Editing { draft: current.into() };
                Ok(())
            }
            _ => Err(ContentError::validation("edit state", format!("{} is already being edited", self.key))),
        }
    }

    pub fn set_draft(&mut self, text: impl Into<String>) -> Result<()> {
        match &mut self.state {
            EditState::Editing { draft } => {
                *draft = text.into();
                Ok(())
            }
            _ => Err(ContentError::validation("edit state", format!("{} is not being edited", self.key))),
        }
    }

    /// Drop the local draft.
    pub fn cancel(&mut self) {
        self.state = EditState::Viewing;
    }

    /// Write the draft: English updates the canonical value, Spanish only the
    /// draft column. On failure the editor stays in `Editing` with its draft.
    pub async fn save(&mut self, store: &dyn ContentStore, capability: Capability) -> Result<()> {
        capability.require_editor("save content")?;
        let draft = match std::mem::take(&mut self.state) {
            EditState::Editing { draft } => draft,
            other => {
                self.state = other;
                return Err(ContentError::validation("edit state", format!("{} has no draft to save", self.key)));
            }
        };
        self.state = EditState::Saving { draft: draft.clone() };
        match store.upsert_text(&self.key, self.locale.draft_field(), &draft).await {
            Ok(()) => {
                tracing::debug!(key = %self.key, locale = %self.locale, "saved field");
                self.state = EditState::Viewing;
                Ok(())
            }
            Err(e) => {
                tracing::warn!(key = %self.key, error = %e, "save failed");
                self.state = EditState::Editing { draft };
                Err(e)
            }
        }
    }

    /// Publish the stored Spanish draft. Only meaningful in Spanish; does not
    /// touch local state.
    pub async fn publish(&self, store: &dyn ContentStore, capability: Capability) -> Result<()> {
        publish(store, capability, &self.key, self.locale).await
    }
}

/// Copy the stored Spanish draft of `key` into the published slot and approve it.
pub async fn publish(store: &dyn ContentStore, capability: Capability, key: &str, locale: Locale) -> Result<()> {
    capability.require_editor("publish content")?;
    if locale != Locale::Es {
        return Err(ContentError::validation("locale", "publish is only offered for Spanish"));
    }
    validate_key("content key", key)?;
    store.publish(key).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;
    use crate::types::TextField;

    #[test]
    fn editor_sees_spanish_draft() {
        let mut r = ContentRecord::new("home.title", "Welcome");
        assert_eq!(editor_value(&r, Locale::Es, "fb"), "Welcome");
        r.value_draft_alt = Some("Bienvenido".into());
        assert_eq!(editor_value(&r, Locale::Es, "fb"), "Bienvenido");
        assert_eq!(editor_value(&r, Locale::En, "fb"), "Welcome");
    }

    #[test]
    fn transitions() {
        let mut f = FieldEditor::new("home.title", Locale::En).unwrap();
        assert!(f.set_draft("x").is_err());
        f.begin("Welcome").unwrap();
        assert_eq!(f.draft(), Some("Welcome"));
        assert!(f.begin("again").is_err());
        f.set_draft("Hello").unwrap();
        f.cancel();
        assert_eq!(f.state(), &EditState::Viewing);
        assert!(FieldEditor::new("bad key", Locale::En).is_err());
    }

    #[tokio::test]
    async fn spanish_save_writes_draft_only() {
        let store = MemoryStore::new();
        store.insert_record(ContentRecord::new("home.title", "Welcome"));
        let mut f = FieldEditor::new("home.title", Locale::Es).unwrap();
        f.begin("Welcome").unwrap();
        f.set_draft("Bienvenido").unwrap();
        f.save(&store, Capability::Editor).await.unwrap();
        assert_eq!(f.state(), &EditState::Viewing);

        let r = store.record("home.title").unwrap();
        assert_eq!(r.value_canonical.as_deref(), Some("Welcome"));
        assert_eq!(r.value_draft_alt.as_deref(), Some("Bienvenido"));
        assert_eq!(r.value_published_alt, None);
        assert!(!r.approved);
    }

    #[tokio::test]
    async fn visitors_cannot_write() {
        let store = MemoryStore::new();
        let mut f = FieldEditor::new("home.title", Locale::En).unwrap();
        f.begin("Welcome").unwrap();
        let err = f.save(&store, Capability::Visitor).await.unwrap_err();
        assert!(matches!(err, ContentError::Authorization(_)));
        assert_eq!(f.draft(), Some("Welcome"));
        assert!(store.record("home.title").is_none());

        let err = f.publish(&store, Capability::Visitor).await.unwrap_err();
        assert!(matches!(err, ContentError::Authorization(_)));
    }

    #[tokio::test]
    async fn publish_only_in_spanish() {
        let store = MemoryStore::new();
        let err = publish(&store, Capability::Editor, "home.title", Locale::En).await.unwrap_err();
        assert!(matches!(err, ContentError::Validation { field: "locale", .. }));
    }

    #[tokio::test]
    async fn publish_uses_stored_draft_not_local_edit() {
        let store = MemoryStore::new();
        store.upsert_text("home.title", TextField::DraftAlt, "Hola").await.unwrap();
        let mut f = FieldEditor::new("home.title", Locale::Es).unwrap();
        f.begin("Hola").unwrap();
        f.set_draft("Bienvenido").unwrap();
        f.publish(&store, Capability::Editor).await.unwrap();
        assert_eq!(store.record("home.title").unwrap().value_published_alt.as_deref(), Some("Hola"));
        assert_eq!(f.draft(), Some("Bienvenido"));
    }

    #[tokio::test]
    async fn overlay_reads_bypass_bundle() {
        let store = MemoryStore::new();
        let mut r = ContentRecord::new("home.title", "Welcome");
        r.value_draft_alt = Some("Borrador".into());
        store.insert_record(r);
        let bundle = ContentBundle { locale: Locale::Es, ..Default::default() };

        assert_eq!(read_field(&store, EditMode::visitor(), &bundle, "home.title", "fb").await, "fb");
        assert_eq!(read_field(&store, EditMode::editor(false), &bundle, "home.title", "fb").await, "fb");
        assert_eq!(read_field(&store, EditMode::editor(true), &bundle, "home.title", "fb").await, "Borrador");
        let spoofed = EditMode { capability: Capability::Visitor, active: true };
        assert_eq!(read_field(&store, spoofed, &bundle, "home.title", "fb").await, "fb");
    }
}

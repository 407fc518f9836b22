//! Page composition: sections from the page bundle, each filled with text and
//! media resolved for the bundle's locale (or through the edit overlay).

use std::collections::BTreeSet;

use serde::Serialize;

use crate::media::MediaSlots;
use crate::overlay::{read_field, EditMode};
use crate::sections::{parse_sections, rows_from_bundle, CardSource, CardVariant, SectionDescriptor, SectionKind};
use crate::storage::ContentStore;
use crate::types::{ContentBundle, Locale, ResolvedMediaItem};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Card {
    pub title: String,
    pub body: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<ResolvedMediaItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ComposedSection {
    Hero {
        id: String,
        title: String,
        subtitle: String,
        image: Option<ResolvedMediaItem>,
    },
    RichText {
        id: String,
        body: String,
    },
    Media {
        id: String,
        item: Option<ResolvedMediaItem>,
    },
    CardGroup {
        id: String,
        source: CardSource,
        variant: Option<CardVariant>,
        cards: Vec<Card>,
    },
}

impl ComposedSection {
    pub fn is_card_group(&self) -> bool {
        matches!(self, ComposedSection::CardGroup { .. })
    }

    pub fn id(&self) -> &str {
        match self {
            ComposedSection::Hero { id, .. }
            | ComposedSection::RichText { id, .. }
            | ComposedSection::Media { id, .. }
            | ComposedSection::CardGroup { id, .. } => id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComposedPage {
    pub page: String,
    pub locale: Locale,
    pub sections: Vec<ComposedSection>,
}

/// One rendered row: a lone section, or a run of adjacent card groups.
#[derive(Debug, PartialEq)]
pub enum LayoutRow<'a> {
    Single(&'a ComposedSection),
    Cards(Vec<&'a ComposedSection>),
}

/// Group consecutive card groups into shared rows.
pub fn layout_rows(sections: &[ComposedSection]) -> Vec<LayoutRow<'_>> {
    let mut rows: Vec<LayoutRow<'_>> = Vec::new();
    for section in sections {
        if section.is_card_group() {
            if let Some(LayoutRow::Cards(run)) = rows.last_mut() {
                run.push(section);
                continue;
            }
            rows.push(LayoutRow::Cards(vec![section]));
        } else {
            rows.push(LayoutRow::Single(section));
        }
    }
    rows
}

/// Indices `n` present as `<prefix><n>.<field>` text keys, ascending.
fn card_indices(bundle: &ContentBundle, prefix: &str) -> Vec<u32> {
    let set: BTreeSet<u32> = bundle
        .strings
        .keys()
        .filter_map(|k| k.strip_prefix(prefix)?.split_once('.')?.0.parse().ok())
        .collect();
    set.into_iter().collect()
}

struct Composer<'a> {
    store: &'a dyn ContentStore,
    bundle: &'a ContentBundle,
    mode: EditMode,
    page: &'a str,
}

impl Composer<'_> {
    async fn text(&self, key: &str) -> String {
        read_field(self.store, self.mode, self.bundle, key, "").await
    }

    fn media(&self, slot_key: &str) -> Option<ResolvedMediaItem> {
        MediaSlots::new(self.bundle).renderable(slot_key).cloned()
    }

    async fn cards(&self, source: CardSource) -> Vec<Card> {
        let base = format!("{}.cards.{}.", self.page, source);
        if source.is_media() {
            return MediaSlots::new(self.bundle)
                .by_prefix(&format!("{base}images."))
                .into_iter()
                .filter(|item| !item.url.is_empty())
                .map(|item| Card { title: item.title.clone().unwrap_or_default(), body: String::new(), image: Some(item.clone()) })
                .collect();
        }
        let mut cards = Vec::new();
        for n in card_indices(self.bundle, &base) {
            let card = format!("{base}{n}");
            cards.push(Card {
                title: self.text(&format!("{card}.title")).await,
                body: self.text(&format!("{card}.body")).await,
                image: self.media(&format!("{card}.image")),
            });
        }
        cards
    }

    async fn section(&self, s: SectionDescriptor) -> ComposedSection {
        match s.kind {
            SectionKind::Hero => ComposedSection::Hero {
                title: self.text(&format!("{}.title", s.id)).await,
                subtitle: self.text(&format!("{}.subtitle", s.id)).await,
                image: self.media(&format!("{}.image", s.id)),
                id: s.id,
            },
            SectionKind::RichText { body_key } => ComposedSection::RichText { body: self.text(&body_key).await, id: s.id },
            SectionKind::Media { slot_key } => ComposedSection::Media { item: self.media(&slot_key), id: s.id },
            SectionKind::CardGroup { source, variant } => {
                ComposedSection::CardGroup { cards: self.cards(source).await, id: s.id, source, variant }
            }
        }
    }
}

/// Compose `page` from a bundle fetched with text and media prefix `<page>.`.
pub async fn compose(store: &dyn ContentStore, bundle: &ContentBundle, page: &str, mode: EditMode) -> ComposedPage {
    let composer = Composer { store, bundle, mode, page };
    let descriptors = parse_sections(&rows_from_bundle(bundle, page));
    let mut sections = Vec::with_capacity(descriptors.len());
    for d in descriptors {
        sections.push(composer.section(d).await);
    }
    ComposedPage { page: page.to_string(), locale: bundle.locale, sections }
}

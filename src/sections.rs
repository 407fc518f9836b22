//! Section metadata parsing.
//!
//! Each page section is stored as a row whose text is a JSON object with a
//! `kind` field. Rows are loosely typed and were written by several editor
//! versions, so parsing is tolerant: a row that fails to parse or validate is
//! dropped on its own and never takes the rest of the page with it.
//!
//! Accepted shapes:
//!
//! ```text
//! {"kind": "hero"}
//! {"kind": "richText", "fieldKey": "body"}          fieldKey optional
//! {"kind": "media", "fieldKey": "media"}            fieldKey optional
//! {"kind": "cardGroup", "sourceKey": "services", "variant": "grid"}
//! {"kind": "cardGroup", "fields": {"sourceKey": "services"}}   legacy
//! ```
//!
//! Output is totally ordered by `(sort, id)`, so adjacent card groups can be
//! grouped downstream without surprises.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::{ContentError, Result};
use crate::types::ContentBundle;

/// The only `fieldKey` a rich-text section may name.
pub const RICH_TEXT_FIELD: &str = "body";
/// The only `fieldKey` a media section may name.
pub const MEDIA_FIELD: &str = "media";

/// One raw section row as stored.
#[derive(Debug, Clone, PartialEq)]
pub struct SectionRow {
    /// Natural key of the row, e.g. `home.sections.intro`.
    pub id: String,
    pub raw_meta: String,
    pub sort_hint: Option<Value>,
}

impl SectionRow {
    pub fn new(id: impl Into<String>, raw_meta: impl Into<String>, sort_hint: Option<Value>) -> Self {
        Self { id: id.into(), raw_meta: raw_meta.into(), sort_hint }
    }
}

/// Known card-group sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CardSource {
    Services,
    Testimonials,
    Gallery,
    Team,
    Pricing,
}

impl CardSource {
    pub const ALL: [CardSource; 5] =
        [CardSource::Services, CardSource::Testimonials, CardSource::Gallery, CardSource::Team, CardSource::Pricing];

    pub fn as_str(&self) -> &'static str {
        match self {
            CardSource::Services => "services",
            CardSource::Testimonials => "testimonials",
            CardSource::Gallery => "gallery",
            CardSource::Team => "team",
            CardSource::Pricing => "pricing",
        }
    }

    /// Whether cards come from media slots rather than text keys.
    pub fn is_media(&self) -> bool {
        matches!(self, CardSource::Gallery)
    }
}

impl FromStr for CardSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CardSource::ALL.into_iter().find(|c| c.as_str() == s).ok_or_else(|| format!("unknown card source {s:?}"))
    }
}

impl fmt::Display for CardSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CardVariant {
    Grid,
    Carousel,
    List,
}

impl FromStr for CardVariant {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "grid" => Ok(CardVariant::Grid),
            "carousel" => Ok(CardVariant::Carousel),
            "list" => Ok(CardVariant::List),
            other => Err(format!("unknown card variant {other:?}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum SectionKind {
    Hero,
    #[serde(rename_all = "camelCase")]
    RichText { body_key: String },
    #[serde(rename_all = "camelCase")]
    Media { slot_key: String },
    #[serde(rename_all = "camelCase")]
    CardGroup {
        source: CardSource,
        #[serde(skip_serializing_if = "Option::is_none")]
        variant: Option<CardVariant>,
    },
}

/// One validated page section.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SectionDescriptor {
    pub id: String,
    pub sort: f64,
    #[serde(flatten)]
    pub kind: SectionKind,
}

type Extractor = fn(&Map<String, Value>) -> Option<&Value>;

fn top_level_source(meta: &Map<String, Value>) -> Option<&Value> {
    meta.get("sourceKey")
}

fn legacy_fields_source(meta: &Map<String, Value>) -> Option<&Value> {
    meta.get("fields")?.as_object()?.get("sourceKey")
}

/// Where a card group's `sourceKey` may live, in the order they are tried.
/// The first location holding a non-null value wins.
const SOURCE_KEY_LOCATIONS: &[(&str, Extractor)] =
    &[("sourceKey", top_level_source), ("fields.sourceKey", legacy_fields_source)];

fn extract_source(meta: &Map<String, Value>) -> Option<(&'static str, &Value)> {
    SOURCE_KEY_LOCATIONS
        .iter()
        .find_map(|(path, extract)| extract(meta).filter(|v| !v.is_null()).map(|v| (*path, v)))
}

fn check_field_key(id: &str, meta: &Map<String, Value>, allowed: &str) -> Result<()> {
    match meta.get("fieldKey") {
        None | Some(Value::Null) => Ok(()),
        Some(Value::String(s)) if s == allowed => Ok(()),
        Some(other) => Err(ContentError::malformed(id, format!("fieldKey must be {allowed:?}, got {other}"))),
    }
}

fn card_group(id: &str, meta: &Map<String, Value>) -> Result<SectionKind> {
    let (path, raw) = extract_source(meta).ok_or_else(|| ContentError::malformed(id, "cardGroup without sourceKey"))?;
    let source = raw
        .as_str()
        .ok_or_else(|| ContentError::malformed(id, format!("{path} is not a string")))?
        .parse::<CardSource>()
        .map_err(|e| ContentError::malformed(id, e))?;
    // a bad variant degrades to the default layout instead of dropping the row
    let variant = meta.get("variant").and_then(Value::as_str).and_then(|v| v.parse().ok());
    Ok(SectionKind::CardGroup { source, variant })
}

/// Numeric sort hint; anything absent or non-numeric sorts as 0.
pub fn sort_from_hint(hint: Option<&Value>) -> f64 {
    let sort = match hint {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    match sort {
        Some(v) if v.is_finite() && v != 0.0 => v,
        _ => 0.0,
    }
}

/// Parse and validate a single row.
pub fn parse_row(row: &SectionRow) -> Result<SectionDescriptor> {
    let id = row.id.as_str();
    let value: Value =
        serde_json::from_str(&row.raw_meta).map_err(|e| ContentError::malformed(id, format!("invalid JSON: {e}")))?;
    let meta = value.as_object().ok_or_else(|| ContentError::malformed(id, "meta is not an object"))?;
    let kind = meta.get("kind").and_then(Value::as_str).ok_or_else(|| ContentError::malformed(id, "missing kind"))?;

    let kind = match kind {
        "hero" => SectionKind::Hero,
        "richText" => {
            check_field_key(id, meta, RICH_TEXT_FIELD)?;
            SectionKind::RichText { body_key: format!("{id}.{RICH_TEXT_FIELD}") }
        }
        "media" => {
            check_field_key(id, meta, MEDIA_FIELD)?;
            SectionKind::Media { slot_key: format!("{id}.{MEDIA_FIELD}") }
        }
        "cardGroup" => card_group(id, meta)?,
        other => return Err(ContentError::malformed(id, format!("unknown kind {other:?}"))),
    };

    Ok(SectionDescriptor { id: row.id.clone(), sort: sort_from_hint(row.sort_hint.as_ref()), kind })
}

/// Parse every row, dropping the invalid ones, and order by `(sort, id)`.
pub fn parse_sections(rows: &[SectionRow]) -> Vec<SectionDescriptor> {
    let mut sections: Vec<SectionDescriptor> = rows
        .iter()
        .filter_map(|row| match parse_row(row) {
            Ok(section) => Some(section),
            Err(e) => {
                tracing::debug!(row = %row.id, error = %e, "dropping section row");
                None
            }
        })
        .collect();
    sections.sort_by(|a, b| a.sort.total_cmp(&b.sort).then_with(|| a.id.cmp(&b.id)));
    sections
}

/// Collect the section rows of `page` from its bundle.
///
/// A section named `intro` lives at `<page>.sections.intro.meta`, with an
/// optional sort hint at `<page>.sections.intro.sort`.
pub fn rows_from_bundle(bundle: &ContentBundle, page: &str) -> Vec<SectionRow> {
    let prefix = format!("{page}.sections.");
    let mut rows: Vec<SectionRow> = bundle
        .strings
        .iter()
        .filter_map(|(key, meta)| {
            let name = key.strip_prefix(&prefix)?.strip_suffix(".meta")?;
            if name.is_empty() || name.contains('.') {
                return None;
            }
            let id = format!("{prefix}{name}");
            let sort_hint = bundle.get(&format!("{id}.sort")).map(|s| Value::String(s.to_string()));
            Some(SectionRow { id, raw_meta: meta.clone(), sort_hint })
        })
        .collect();
    rows.sort_by(|a, b| a.id.cmp(&b.id));
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(id: &str, meta: &str, sort: Option<Value>) -> SectionRow {
        SectionRow::new(id, meta, sort)
    }

    #[test]
    fn parses_each_kind() {
        let hero = parse_row(&row("home.sections.top", r#"{"kind":"hero"}"#, Some(json!(1)))).unwrap();
        assert_eq!(hero.kind, SectionKind::Hero);
        assert_eq!(hero.sort, 1.0);

        let text = parse_row(&row("home.sections.intro", r#"{"kind":"richText"}"#, None)).unwrap();
        assert_eq!(text.kind, SectionKind::RichText { body_key: "home.sections.intro.body".into() });

        let media = parse_row(&row("home.sections.pic", r#"{"kind":"media","fieldKey":"media"}"#, None)).unwrap();
        assert_eq!(media.kind, SectionKind::Media { slot_key: "home.sections.pic.media".into() });

        let cards = parse_row(&row("home.sections.c", r#"{"kind":"cardGroup","sourceKey":"team","variant":"list"}"#, None)).unwrap();
        assert_eq!(cards.kind, SectionKind::CardGroup { source: CardSource::Team, variant: Some(CardVariant::List) });
    }

    #[test]
    fn field_key_must_match_literal() {
        assert!(parse_row(&row("a", r#"{"kind":"richText","fieldKey":"body"}"#, None)).is_ok());
        assert!(parse_row(&row("a", r#"{"kind":"richText","fieldKey":null}"#, None)).is_ok());
        assert!(parse_row(&row("a", r#"{"kind":"richText","fieldKey":"title"}"#, None)).is_err());
        assert!(parse_row(&row("a", r#"{"kind":"media","fieldKey":"body"}"#, None)).is_err());
        assert!(parse_row(&row("a", r#"{"kind":"media","fieldKey":3}"#, None)).is_err());
    }

    #[test]
    fn card_group_source_locations() {
        let legacy = parse_row(&row("a", r#"{"kind":"cardGroup","fields":{"sourceKey":"gallery"}}"#, None)).unwrap();
        assert_eq!(legacy.kind, SectionKind::CardGroup { source: CardSource::Gallery, variant: None });

        // top level wins over the legacy location
        let both = parse_row(&row("a", r#"{"kind":"cardGroup","sourceKey":"pricing","fields":{"sourceKey":"gallery"}}"#, None)).unwrap();
        assert_eq!(both.kind, SectionKind::CardGroup { source: CardSource::Pricing, variant: None });

        let null_top = parse_row(&row("a", r#"{"kind":"cardGroup","sourceKey":null,"fields":{"sourceKey":"team"}}"#, None)).unwrap();
        assert_eq!(null_top.kind, SectionKind::CardGroup { source: CardSource::Team, variant: None });

        assert!(parse_row(&row("a", r#"{"kind":"cardGroup"}"#, None)).is_err());
        assert!(parse_row(&row("a", r#"{"kind":"cardGroup","sourceKey":"blog"}"#, None)).is_err());
        assert!(parse_row(&row("a", r#"{"kind":"cardGroup","sourceKey":7}"#, None)).is_err());
    }

    #[test]
    fn invalid_variant_is_omitted() {
        let s = parse_row(&row("a", r#"{"kind":"cardGroup","sourceKey":"services","variant":"masonry"}"#, None)).unwrap();
        assert_eq!(s.kind, SectionKind::CardGroup { source: CardSource::Services, variant: None });
    }

    #[test]
    fn rejects_malformed_rows() {
        for meta in ["", "{", "[1,2]", r#""hero""#, r#"{"type":"hero"}"#, r#"{"kind":"banner"}"#, r#"{"kind":5}"#] {
            let err = parse_row(&row("home.sections.x", meta, None)).unwrap_err();
            assert!(matches!(err, ContentError::MalformedContent { ref key, .. } if key == "home.sections.x"), "{meta}");
        }
    }

    #[test]
    fn sort_hints() {
        assert_eq!(sort_from_hint(None), 0.0);
        assert_eq!(sort_from_hint(Some(&json!(2.5))), 2.5);
        assert_eq!(sort_from_hint(Some(&json!(" -3 "))), -3.0);
        assert_eq!(sort_from_hint(Some(&json!("first"))), 0.0);
        assert_eq!(sort_from_hint(Some(&json!(true))), 0.0);
        assert_eq!(sort_from_hint(Some(&json!("NaN"))), 0.0);
        assert_eq!(sort_from_hint(Some(&json!(-0.0))).to_bits(), 0.0f64.to_bits());
    }

    #[test]
    fn bad_card_source_drops_only_that_row() {
        let rows = vec![
            row("p.sections.a", r#"{"kind":"hero"}"#, Some(json!(0))),
            row("p.sections.b", r#"{"kind":"cardGroup","sourceKey":"nope"}"#, Some(json!(1))),
            row("p.sections.c", r#"{"kind":"cardGroup","sourceKey":"services"}"#, Some(json!(2))),
            row("p.sections.d", "not json", Some(json!(3))),
            row("p.sections.e", r#"{"kind":"richText"}"#, Some(json!(4))),
        ];
        let ids: Vec<_> = parse_sections(&rows).into_iter().map(|s| s.id).collect();
        assert_eq!(ids, ["p.sections.a", "p.sections.c", "p.sections.e"]);
    }

    #[test]
    fn ordering_is_total_and_deterministic() {
        let rows = vec![
            row("p.sections.z", r#"{"kind":"hero"}"#, Some(json!(1))),
            row("p.sections.b", r#"{"kind":"richText"}"#, Some(json!(1))),
            row("p.sections.m", r#"{"kind":"media"}"#, None),
            row("p.sections.a", r#"{"kind":"cardGroup","sourceKey":"team"}"#, Some(json!("x"))),
            row("p.sections.q", r#"{"kind":"hero"}"#, Some(json!(-1))),
        ];
        let first = parse_sections(&rows);
        let ids: Vec<_> = first.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, ["p.sections.q", "p.sections.a", "p.sections.m", "p.sections.b", "p.sections.z"]);

        let mut reversed = rows.clone();
        reversed.reverse();
        assert_eq!(parse_sections(&reversed), first);
        assert_eq!(parse_sections(&rows), first);
    }

    #[test]
    fn serializes_with_kind_tag() {
        let s = parse_row(&row("a", r#"{"kind":"richText"}"#, None)).unwrap();
        assert_eq!(serde_json::to_value(&s).unwrap(), json!({"id": "a", "sort": 0.0, "kind": "richText", "bodyKey": "a.body"}));
    }

    #[test]
    fn rows_are_discovered_from_bundle() {
        let mut bundle = ContentBundle::default();
        for (k, v) in [
            ("home.sections.intro.meta", r#"{"kind":"richText"}"#),
            ("home.sections.intro.sort", "2"),
            ("home.sections.intro.body", "Hello"),
            ("home.sections.top.meta", r#"{"kind":"hero"}"#),
            ("home.sections.deep.er.meta", r#"{"kind":"hero"}"#),
            ("about.sections.x.meta", r#"{"kind":"hero"}"#),
        ] {
            bundle.strings.insert(k.into(), v.into());
        }
        let rows = rows_from_bundle(&bundle, "home");
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].id, "home.sections.intro");
        assert_eq!(rows[0].sort_hint, Some(Value::String("2".into())));
        assert_eq!(rows[1].sort_hint, None);
    }
}

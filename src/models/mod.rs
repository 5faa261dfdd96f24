//! Content model shared by every phase of a clone.
//!
//! An [`Entry`] is the unit of content in the CMS. Its [`Fields`] map a field
//! name to a per-locale value, and each value is a [`FieldValue`]: a scalar,
//! a (possibly nested) list, or a typed [`Link`] to another record. Entry
//! links are the edges of the reference graph that a clone walks.
//!
//! # Wire format
//!
//! Field values serialize to the shape the CMS uses:
//!
//! ```json
//! {
//!   "title":   { "en-US": "Summer Toolkit" },
//!   "modules": { "en-US": [ { "sys": { "type": "Link", "linkType": "Entry", "id": "mod-1" } } ] }
//! }
//! ```
//!
//! Any JSON object that is not exactly a link (rich text documents, location
//! objects, ...) is kept as an opaque scalar.

mod visitor;

use std::borrow::Borrow;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

pub use visitor::{VisitLinks, VisitLinksMut};

/// Identifiers accepted by the CMS: 1-64 characters of letters, digits, `-`, `_` and `.`.
static ENTRY_ID_PATTERN: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9._-]{1,64}$").ok());

/// Identifier of a CMS entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntryId(String);

impl EntryId {
    /// Wrap an identifier without validating it.
    ///
    /// Identifiers coming back from the CMS are trusted as-is; use
    /// [`str::parse`] for user input.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for EntryId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for EntryId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for EntryId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Returned when user input is not a valid CMS entry identifier.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("'{0}' is not a valid entry id (expected 1-64 characters of A-Z, a-z, 0-9, '-', '_' or '.')")]
pub struct InvalidEntryId(pub String);

impl FromStr for EntryId {
    type Err = InvalidEntryId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        // "." and ".." are path segments, never ids
        let dots_only = trimmed.chars().all(|c| c == '.');
        if !dots_only && ENTRY_ID_PATTERN.as_ref().is_some_and(|pattern| pattern.is_match(trimmed)) {
            Ok(Self::new(trimmed))
        } else {
            Err(InvalidEntryId(s.to_string()))
        }
    }
}

/// Kind of record a [`Link`] points at.
///
/// Only [`LinkType::Entry`] links are followed when discovering and relinking;
/// asset links and any other kind are carried through untouched.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum LinkType {
    /// Link to another entry.
    Entry,
    /// Link to a binary asset.
    Asset,
    /// Any other link kind, preserved verbatim.
    Other(String),
}

impl From<String> for LinkType {
    fn from(value: String) -> Self {
        match value.as_str() {
            "Entry" => Self::Entry,
            "Asset" => Self::Asset,
            _ => Self::Other(value),
        }
    }
}

impl From<LinkType> for String {
    fn from(value: LinkType) -> Self {
        match value {
            LinkType::Entry => "Entry".to_string(),
            LinkType::Asset => "Asset".to_string(),
            LinkType::Other(other) => other,
        }
    }
}

/// A typed reference to another CMS record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "LinkRepr", into = "LinkRepr")]
pub struct Link {
    /// What kind of record the link targets.
    pub link_type: LinkType,
    /// Target record id.
    pub id: EntryId,
}

impl Link {
    /// Link to an entry.
    pub fn entry(id: impl Into<EntryId>) -> Self {
        Self {
            link_type: LinkType::Entry,
            id: id.into(),
        }
    }

    /// Link to an asset.
    pub fn asset(id: impl Into<EntryId>) -> Self {
        Self {
            link_type: LinkType::Asset,
            id: id.into(),
        }
    }

    /// Whether this link is an edge of the entry reference graph.
    #[must_use]
    pub fn is_entry(&self) -> bool {
        self.link_type == LinkType::Entry
    }
}

#[derive(Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct LinkRepr {
    sys: LinkSys,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LinkSys {
    #[serde(rename = "type")]
    kind: String,
    link_type: LinkType,
    id: EntryId,
}

impl TryFrom<LinkRepr> for Link {
    type Error = String;

    fn try_from(repr: LinkRepr) -> Result<Self, Self::Error> {
        if repr.sys.kind != "Link" {
            return Err(format!("expected sys.type 'Link', found '{}'", repr.sys.kind));
        }
        Ok(Self {
            link_type: repr.sys.link_type,
            id: repr.sys.id,
        })
    }
}

impl From<Link> for LinkRepr {
    fn from(link: Link) -> Self {
        Self {
            sys: LinkSys {
                kind: "Link".to_string(),
                link_type: link.link_type,
                id: link.id,
            },
        }
    }
}

/// Value of one field in one locale.
///
/// Variant order matters for deserialization: a JSON value is tried as a
/// link first, then as a list, and falls back to an opaque scalar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    /// Typed reference to another record.
    Link(Link),
    /// Ordered values; may nest.
    List(Vec<FieldValue>),
    /// Anything else: strings, numbers, booleans, null, non-link objects.
    Scalar(serde_json::Value),
}

impl FieldValue {
    /// Scalar text value.
    pub fn text(value: impl Into<String>) -> Self {
        Self::Scalar(serde_json::Value::String(value.into()))
    }

    /// The text of a string scalar.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Scalar(serde_json::Value::String(s)) => Some(s),
            _ => None,
        }
    }
}

impl From<Link> for FieldValue {
    fn from(link: Link) -> Self {
        Self::Link(link)
    }
}

/// Locale code → value for a single field.
pub type LocalizedField = BTreeMap<String, FieldValue>;

/// Field name → localized value for an entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fields(BTreeMap<String, LocalizedField>);

impl Fields {
    /// Empty field map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the entry has no fields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether a field is present (in any locale).
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    /// All locales of a field.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&LocalizedField> {
        self.0.get(name)
    }

    /// Value of a field in one locale.
    #[must_use]
    pub fn localized(&self, name: &str, locale: &str) -> Option<&FieldValue> {
        self.0.get(name).and_then(|field| field.get(locale))
    }

    /// Text of a field in one locale, if it is a string scalar.
    #[must_use]
    pub fn text(&self, name: &str, locale: &str) -> Option<&str> {
        self.localized(name, locale).and_then(FieldValue::as_str)
    }

    /// Insert a field with all its locales, returning the previous value.
    pub fn insert(&mut self, name: impl Into<String>, value: LocalizedField) -> Option<LocalizedField> {
        self.0.insert(name.into(), value)
    }

    /// Replace a field with a single value under `locale`.
    ///
    /// Other locales of the field are dropped.
    pub fn set_localized(&mut self, name: impl Into<String>, locale: &str, value: FieldValue) {
        let mut field = LocalizedField::new();
        field.insert(locale.to_string(), value);
        self.0.insert(name.into(), field);
    }

    /// Set a field's value under `locale`, keeping its other locales.
    pub fn update_localized(&mut self, name: impl Into<String>, locale: &str, value: FieldValue) {
        self.0.entry(name.into()).or_default().insert(locale.to_string(), value);
    }

    /// Remove a field in every locale.
    pub fn remove(&mut self, name: &str) -> Option<LocalizedField> {
        self.0.remove(name)
    }

    /// Iterate over `(field name, localized value)` pairs in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &LocalizedField)> {
        self.0.iter()
    }

    /// Every value across every field and locale.
    pub fn values(&self) -> impl Iterator<Item = &FieldValue> {
        self.0.values().flat_map(BTreeMap::values)
    }

    /// Mutable access to every value across every field and locale.
    pub fn values_mut(&mut self) -> impl Iterator<Item = &mut FieldValue> {
        self.0.values_mut().flat_map(BTreeMap::values_mut)
    }

    /// Targets of every entry link in these fields, in field/locale/list order.
    ///
    /// Duplicates are kept; callers that need a set deduplicate themselves.
    #[must_use]
    pub fn entry_link_targets(&self) -> Vec<EntryId> {
        let mut targets = Vec::new();
        self.visit_links(&mut |link: &Link| {
            if link.is_entry() {
                targets.push(link.id.clone());
            }
        });
        targets
    }
}

impl FromIterator<(String, LocalizedField)> for Fields {
    fn from_iter<I: IntoIterator<Item = (String, LocalizedField)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// A structured content record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entry {
    /// Entry id assigned by the CMS.
    pub id: EntryId,
    /// Content type tag; selects the transformation rule.
    pub content_type: String,
    /// Optimistic-concurrency version, required by the CMS for updates.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<u64>,
    /// Locale-keyed field values.
    #[serde(default)]
    pub fields: Fields,
}

impl Entry {
    /// Build an entry without a version.
    pub fn new(id: impl Into<EntryId>, content_type: impl Into<String>, fields: Fields) -> Self {
        Self {
            id: id.into(),
            content_type: content_type.into(),
            version: None,
            fields,
        }
    }
}

//! Entry and graph fixtures.

use crate::constants::DEFAULT_LOCALE;
use crate::models::{Entry, EntryId, FieldValue, Fields, Link};

/// Builds an [`Entry`] field by field under one locale (`en-US` by default).
#[derive(Debug, Clone)]
pub struct EntryBuilder {
    id: EntryId,
    content_type: String,
    locale: String,
    fields: Fields,
}

impl EntryBuilder {
    /// Start an entry with no fields.
    pub fn new(id: impl Into<EntryId>, content_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            content_type: content_type.into(),
            locale: DEFAULT_LOCALE.to_string(),
            fields: Fields::new(),
        }
    }

    /// Locale for the fields added after this call.
    #[must_use]
    pub fn locale(mut self, locale: impl Into<String>) -> Self {
        self.locale = locale.into();
        self
    }

    /// Set a field to any value.
    #[must_use]
    pub fn field(mut self, name: &str, value: FieldValue) -> Self {
        self.fields.update_localized(name, &self.locale, value);
        self
    }

    /// Set a text field.
    #[must_use]
    pub fn text(self, name: &str, value: &str) -> Self {
        self.field(name, FieldValue::text(value))
    }

    /// Set a single entry link.
    #[must_use]
    pub fn link(self, name: &str, target: &str) -> Self {
        self.field(name, FieldValue::Link(Link::entry(target)))
    }

    /// Set a list of entry links.
    #[must_use]
    pub fn links<'a>(self, name: &str, targets: impl IntoIterator<Item = &'a str>) -> Self {
        let links = targets.into_iter().map(|target| FieldValue::Link(Link::entry(target))).collect();
        self.field(name, FieldValue::List(links))
    }

    /// Set an asset link.
    #[must_use]
    pub fn asset(self, name: &str, asset_id: &str) -> Self {
        self.field(name, FieldValue::Link(Link::asset(asset_id)))
    }

    /// Finish the entry.
    #[must_use]
    pub fn build(self) -> Entry {
        Entry::new(self.id, self.content_type, self.fields)
    }
}

/// Builds a link graph of entries from nodes and edges.
///
/// Each node's outgoing edges become one `links` list field, in insertion order.
#[derive(Debug, Clone, Default)]
pub struct GraphBuilder {
    nodes: Vec<(String, String)>,
    edges: Vec<(String, String)>,
}

impl GraphBuilder {
    /// Empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node.
    #[must_use]
    pub fn node(mut self, id: &str, content_type: &str) -> Self {
        self.nodes.push((id.to_string(), content_type.to_string()));
        self
    }

    /// Add a link from `from` to `to`.
    #[must_use]
    pub fn edge(mut self, from: &str, to: &str) -> Self {
        self.edges.push((from.to_string(), to.to_string()));
        self
    }

    /// Materialize the entries.
    #[must_use]
    pub fn build(self) -> Vec<Entry> {
        self.nodes
            .iter()
            .map(|(id, content_type)| {
                let targets = self.edges.iter().filter(|(from, _)| from == id).map(|(_, to)| to.as_str());
                EntryBuilder::new(id.as_str(), content_type.as_str())
                    .text("name", id)
                    .links("links", targets)
                    .build()
            })
            .collect()
    }
}

/// A toolkit tree using every built-in content type.
///
/// `toolkit` → two `contentModule`s → `toolkitAsset` → `imageMetadata`, plus
/// region and language tags shared by the toolkit and one asset. Module
/// `module-2` links back to the toolkit.
#[must_use]
pub fn sample_toolkit() -> Vec<Entry> {
    vec![
        EntryBuilder::new("toolkit", "toolkit")
            .text("title", "Summer Launch")
            .text("description", "Everything for the summer launch")
            .text("synopsis", "Summer")
            .text("slug", "summer-launch")
            .text("launchDate", "2021-06-01")
            .text("sendForLocalization", "yes")
            .asset("titleArt", "art-1")
            .links("modules", ["module-1", "module-2"])
            .links("regions", ["tag-emea"])
            .link("language", "tag-en")
            .build(),
        EntryBuilder::new("module-1", "contentModule")
            .text("contentType", "Hero")
            .text("ctaUrl", "https://example.com/hero")
            .text("video", "https://example.com/video")
            .links("assets", ["asset-1"])
            .build(),
        EntryBuilder::new("module-2", "contentModule")
            .text("contentType", "Two column")
            .text("twoColumnText1", "Left")
            .text("twoColumnText2", "Right")
            .link("toolkit", "toolkit")
            .build(),
        EntryBuilder::new("asset-1", "toolkitAsset")
            .text("name", "Hero banner")
            .text("ctaUrl", "https://example.com/download")
            .text("localizedDate", "2021-05-01")
            .link("metadata", "image-1")
            .links("regions", ["tag-emea"])
            .build(),
        EntryBuilder::new("image-1", "imageMetadata").text("name", "banner.png").build(),
        EntryBuilder::new("tag-emea", "tagRegion").text("name", "EMEA").build(),
        EntryBuilder::new("tag-en", "tagLanguage").text("name", "English").build(),
    ]
}

use std::collections::BTreeMap;
use std::fmt;

use serde::de::{self, MapAccess, Visitor, value::MapAccessDeserializer};
use serde::{Deserialize, Deserializer};
use serde_json::{Number, Value};

/// A node of a document tree: the representation of every descriptive
/// field in the content records.
///
/// The set of variants is closed. Objects whose `type` tag is not one of
/// the known kinds are rejected when the tree is deserialized.
#[derive(Debug, Clone, PartialEq)]
pub enum Entry {
    /// Inline text, possibly containing `{@...}` macros.
    Text(String),
    Block(Block),
    Table(Table),
    List(List),
    Link(Link),
    Quote(Quote),
    Spellcasting(Spellcasting),
    Item(LabeledItem),
    Wrapper(Wrapper),
}

impl Entry {
    pub fn text(s: impl Into<String>) -> Self {
        Entry::Text(s.into())
    }

    /// The node's heading, for the variants that carry one.
    pub fn name(&self) -> Option<&str> {
        match self {
            Entry::Block(block) => block.name.as_deref(),
            Entry::Spellcasting(spellcasting) => spellcasting.name.as_deref(),
            Entry::Item(item) => Some(&item.name),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BlockKind {
    /// `entries`: a plain block.
    #[default]
    Entries,
    /// `inset`: a call-out rendered as a block quote.
    Inset,
    /// `inline`: children run together on one line.
    Inline,
    /// `section`: a titled section.
    Section,
    /// `variant`: a rule-variant call-out.
    Variant,
    /// `variantSub`: a nested block inside a rule variant.
    VariantSub,
    /// `variantInner`
    VariantInner,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Block {
    #[serde(skip)]
    pub kind: BlockKind,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub entries: Vec<Entry>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Table {
    #[serde(default)]
    pub caption: Option<String>,
    #[serde(default)]
    pub col_labels: Vec<String>,
    /// Presentation hints such as `col-2 text-center`.
    #[serde(default)]
    pub col_styles: Vec<String>,
    #[serde(default)]
    pub rows: Vec<Vec<Cell>>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Cell {
    Number(Number),
    Text(String),
    Structured(StructuredCell),
}

/// A table cell carrying a die-roll range and/or a nested entry.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct StructuredCell {
    #[serde(default)]
    pub entry: Option<Box<Entry>>,
    #[serde(default)]
    pub roll: Option<Roll>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Roll {
    #[serde(default)]
    pub exact: Option<Number>,
    #[serde(default)]
    pub min: Option<Number>,
    #[serde(default)]
    pub max: Option<Number>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct List {
    #[serde(default)]
    pub items: Vec<Entry>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Link {
    pub href: Href,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Href {
    /// Only `internal` links are rendered.
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub hash: Option<String>,
    #[serde(default)]
    pub hash_pre_encoded: bool,
}

impl Href {
    pub fn is_internal(&self) -> bool {
        self.kind == "internal"
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Quote {
    #[serde(default)]
    pub entries: Vec<Entry>,
    #[serde(default)]
    pub by: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Spellcasting {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub header_entries: Vec<Entry>,
    /// Keyed by spell level, `0` for cantrips.
    #[serde(default, deserialize_with = "spell_levels")]
    pub spells: BTreeMap<u8, SpellSlots>,
    #[serde(default)]
    pub footer_entries: Vec<Entry>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SpellSlots {
    #[serde(default)]
    pub slots: Option<u32>,
    #[serde(default)]
    pub spells: Vec<String>,
}

// Level keys arrive as JSON strings; integer map keys do not survive the
// buffering serde does for tagged enums, so they are parsed here.
fn spell_levels<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<BTreeMap<u8, SpellSlots>, D::Error> {
    BTreeMap::<String, SpellSlots>::deserialize(deserializer)?
        .into_iter()
        .map(|(level, slots)| {
            level
                .parse::<u8>()
                .map(|level| (level, slots))
                .map_err(|_| de::Error::custom(format!("invalid spell level `{}`", level)))
        })
        .collect()
}

/// A named entry inside a list (`item` and `itemSpell`).
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LabeledItem {
    pub name: String,
    #[serde(default)]
    pub entry: Option<Box<Entry>>,
    #[serde(default)]
    pub entries: Vec<Entry>,
}

/// Upstream scaffolding: metadata around a single wrapped entry.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Wrapper {
    #[serde(default)]
    pub data: Value,
    pub wrapped: Box<Entry>,
}

impl Wrapper {
    /// The tag the upstream item merger attaches to generated wrappers.
    pub fn merged_entry_tag(&self) -> Option<&str> {
        self.data.get("item__mergedEntryTag").and_then(Value::as_str)
    }
}

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
enum TaggedEntry {
    Entries(Block),
    Inset(Block),
    Inline(Block),
    Section(Block),
    Variant(Block),
    VariantSub(Block),
    VariantInner(Block),
    Table(Table),
    List(List),
    Link(Link),
    Quote(Quote),
    Spellcasting(Spellcasting),
    Item(LabeledItem),
    ItemSpell(LabeledItem),
    Wrapper(Wrapper),
}

impl From<TaggedEntry> for Entry {
    fn from(tagged: TaggedEntry) -> Self {
        let block = |kind, fields: Block| Entry::Block(Block { kind, ..fields });
        match tagged {
            TaggedEntry::Entries(b) => block(BlockKind::Entries, b),
            TaggedEntry::Inset(b) => block(BlockKind::Inset, b),
            TaggedEntry::Inline(b) => block(BlockKind::Inline, b),
            TaggedEntry::Section(b) => block(BlockKind::Section, b),
            TaggedEntry::Variant(b) => block(BlockKind::Variant, b),
            TaggedEntry::VariantSub(b) => block(BlockKind::VariantSub, b),
            TaggedEntry::VariantInner(b) => block(BlockKind::VariantInner, b),
            TaggedEntry::Table(table) => Entry::Table(table),
            TaggedEntry::List(list) => Entry::List(list),
            TaggedEntry::Link(link) => Entry::Link(link),
            TaggedEntry::Quote(quote) => Entry::Quote(quote),
            TaggedEntry::Spellcasting(spellcasting) => Entry::Spellcasting(spellcasting),
            TaggedEntry::Item(item) | TaggedEntry::ItemSpell(item) => Entry::Item(item),
            TaggedEntry::Wrapper(wrapper) => Entry::Wrapper(wrapper),
        }
    }
}

impl<'de> Deserialize<'de> for Entry {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct EntryVisitor;

        impl<'de> Visitor<'de> for EntryVisitor {
            type Value = Entry;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a string or an object with a `type` tag")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Entry, E> {
                Ok(Entry::Text(v.to_string()))
            }

            fn visit_string<E: de::Error>(self, v: String) -> Result<Entry, E> {
                Ok(Entry::Text(v))
            }

            fn visit_map<A: MapAccess<'de>>(self, map: A) -> Result<Entry, A::Error> {
                TaggedEntry::deserialize(MapAccessDeserializer::new(map)).map(Entry::from)
            }
        }

        deserializer.deserialize_any(EntryVisitor)
    }
}

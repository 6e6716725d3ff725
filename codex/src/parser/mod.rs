pub mod error;

use std::collections::BTreeMap;
use std::fmt;

use serde::de::{self, IgnoredAny, MapAccess, SeqAccess, Visitor};
use serde::{Deserialize, Deserializer};

pub use error::ParseError;

use crate::record::Record;

/// The records of one data file, grouped by kind (`monster`, `item`,
/// `itemEntry`, ...).
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    collections: BTreeMap<String, Vec<Record>>,
    /// The source file ID (for error reporting with codespan-reporting).
    pub source_id: usize,
}

impl Dataset {
    /// Records of `kind`, in file order. Unknown kinds are empty.
    pub fn records(&self, kind: &str) -> &[Record] {
        self.collections.get(kind).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn kinds(&self) -> impl Iterator<Item = &str> {
        self.collections.keys().map(String::as_str)
    }
}

/// Parser entry point.
pub struct Parser {
    source: String,
    file_id: usize,
}

impl Parser {
    pub fn new(source: String, file_id: usize) -> Self {
        Parser { source, file_id }
    }

    /// Parse a data file: a JSON object whose array members are record
    /// collections. Non-array members such as `_meta` are skipped.
    pub fn parse(&self) -> Result<Dataset, ParseError> {
        let collections: Collections = serde_json::from_str(&self.source)
            .map_err(|e| ParseError::from_json(&e, &self.source, self.file_id))?;
        Ok(Dataset {
            collections: collections.0,
            source_id: self.file_id,
        })
    }
}

struct Collections(BTreeMap<String, Vec<Record>>);

impl<'de> Deserialize<'de> for Collections {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct CollectionsVisitor;

        impl<'de> Visitor<'de> for CollectionsVisitor {
            type Value = Collections;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a JSON object of record collections")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Collections, A::Error> {
                let mut collections: BTreeMap<String, Vec<Record>> = BTreeMap::new();
                while let Some(kind) = map.next_key::<String>()? {
                    if let Collection::Records(records) = map.next_value()? {
                        collections.entry(kind).or_default().extend(records);
                    }
                }
                Ok(Collections(collections))
            }
        }

        deserializer.deserialize_map(CollectionsVisitor)
    }
}

enum Collection {
    Records(Vec<Record>),
    Skipped,
}

impl<'de> Deserialize<'de> for Collection {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct CollectionVisitor;

        impl<'de> Visitor<'de> for CollectionVisitor {
            type Value = Collection;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("an array of records or any other JSON value")
            }

            fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Collection, A::Error> {
                let mut records = Vec::new();
                while let Some(record) = seq.next_element::<Record>()? {
                    records.push(record);
                }
                Ok(Collection::Records(records))
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Collection, A::Error> {
                while map.next_entry::<IgnoredAny, IgnoredAny>()?.is_some() {}
                Ok(Collection::Skipped)
            }

            fn visit_bool<E: de::Error>(self, _: bool) -> Result<Collection, E> {
                Ok(Collection::Skipped)
            }

            fn visit_i64<E: de::Error>(self, _: i64) -> Result<Collection, E> {
                Ok(Collection::Skipped)
            }

            fn visit_u64<E: de::Error>(self, _: u64) -> Result<Collection, E> {
                Ok(Collection::Skipped)
            }

            fn visit_f64<E: de::Error>(self, _: f64) -> Result<Collection, E> {
                Ok(Collection::Skipped)
            }

            fn visit_str<E: de::Error>(self, _: &str) -> Result<Collection, E> {
                Ok(Collection::Skipped)
            }

            fn visit_unit<E: de::Error>(self) -> Result<Collection, E> {
                Ok(Collection::Skipped)
            }
        }

        deserializer.deserialize_any(CollectionVisitor)
    }
}

use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::copy::CopySpec;
use crate::entry::Entry;
use crate::key::EntityKey;

/// Reserved field holding a record's copy specification.
pub const COPY_FIELD: &str = "_copy";

/// An open-ended content record: arbitrary JSON fields plus an optional
/// copy specification lifted out of the `_copy` field.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    fields: Map<String, Value>,
    copy: Option<CopySpec>,
}

impl Record {
    /// Build a record from raw JSON fields, parsing `_copy` if present.
    pub fn from_fields(mut fields: Map<String, Value>) -> Result<Self, serde_json::Error> {
        let copy = match fields.remove(COPY_FIELD) {
            Some(value) => Some(serde_json::from_value(value)?),
            None => None,
        };
        Ok(Record { fields, copy })
    }

    pub fn name(&self) -> Option<&str> {
        self.fields.get("name").and_then(Value::as_str)
    }

    pub fn source(&self) -> Option<&str> {
        self.fields.get("source").and_then(Value::as_str)
    }

    /// The record's identity, when it has both a name and a source.
    pub fn key(&self) -> Option<EntityKey> {
        Some(EntityKey::new(self.name()?, self.source()?))
    }

    /// Name for diagnostics; never empty.
    pub fn label(&self) -> String {
        match (self.name(), self.source()) {
            (Some(name), Some(source)) => format!("{}|{}", name, source),
            (Some(name), None) => name.to_string(),
            _ => "<unnamed record>".to_string(),
        }
    }

    pub fn copy(&self) -> Option<&CopySpec> {
        self.copy.as_ref()
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    pub fn insert(&mut self, field: impl Into<String>, value: Value) -> Option<Value> {
        self.fields.insert(field.into(), value)
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    /// Every source the record appears in besides its own: the union of
    /// `otherSources` and `additionalSources`.
    pub fn other_sources(&self) -> Vec<&str> {
        ["otherSources", "additionalSources"]
            .iter()
            .filter_map(|field| self.fields.get(*field))
            .filter_map(Value::as_array)
            .flatten()
            .filter_map(|reference| reference.get("source").and_then(Value::as_str))
            .collect()
    }

    /// Parse an array-valued field as a document tree. An absent field is
    /// an empty document.
    pub fn entries(&self, field: &str) -> Result<Vec<Entry>, serde_json::Error> {
        match self.fields.get(field) {
            Some(value) => Vec::<Entry>::deserialize(value),
            None => Ok(Vec::new()),
        }
    }
}

impl TryFrom<Map<String, Value>> for Record {
    type Error = serde_json::Error;

    fn try_from(fields: Map<String, Value>) -> Result<Self, Self::Error> {
        Record::from_fields(fields)
    }
}

impl<'de> Deserialize<'de> for Record {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let fields = Map::<String, Value>::deserialize(deserializer)?;
        Record::from_fields(fields).map_err(serde::de::Error::custom)
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let len = self.fields.len() + usize::from(self.copy.is_some());
        let mut map = serializer.serialize_map(Some(len))?;
        for (field, value) in &self.fields {
            map.serialize_entry(field, value)?;
        }
        if let Some(copy) = &self.copy {
            map.serialize_entry(COPY_FIELD, copy)?;
        }
        map.end()
    }
}

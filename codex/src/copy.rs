use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::key::EntityKey;

/// Field name that targets the whole record instead of a single field.
pub const WILDCARD_FIELD: &str = "*";

/// A record's declaration that it derives its fields from another record
/// of the same kind (the `_copy` field).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CopySpec {
    pub name: String,
    pub source: String,
    /// Fields on the copying record that must not be overwritten.
    /// `Some` even when empty: its presence alone changes the merge policy.
    #[serde(rename = "_preserve", default, skip_serializing_if = "Option::is_none")]
    pub preserve: Option<Preserve>,
    #[serde(rename = "_mod", default, skip_serializing_if = "Option::is_none")]
    pub modifications: Option<Modifications>,
}

impl CopySpec {
    /// Key of the record being copied from.
    pub fn target(&self) -> EntityKey {
        EntityKey::new(self.name.clone(), self.source.clone())
    }

    pub fn preserves(&self, field: &str) -> bool {
        self.preserve
            .as_ref()
            .is_some_and(|preserve| preserve.contains(field))
    }
}

/// The set of preserved field names. Serialized as `{"field": true}`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Preserve(BTreeSet<String>);

impl Preserve {
    pub fn contains(&self, field: &str) -> bool {
        self.0.contains(field)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl FromIterator<String> for Preserve {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        Preserve(iter.into_iter().collect())
    }
}

impl<'de> Deserialize<'de> for Preserve {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let flags = BTreeMap::<String, bool>::deserialize(deserializer)?;
        Ok(flags
            .into_iter()
            .filter_map(|(field, keep)| keep.then_some(field))
            .collect())
    }
}

impl Serialize for Preserve {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.0.iter().map(|field| (field, true)))
    }
}

/// Which part of the copied record a modification applies to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldTarget {
    /// The `*` key: the whole record.
    Wildcard,
    Field(String),
}

impl FieldTarget {
    fn parse(key: String) -> Self {
        if key == WILDCARD_FIELD {
            FieldTarget::Wildcard
        } else {
            FieldTarget::Field(key)
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            FieldTarget::Wildcard => WILDCARD_FIELD,
            FieldTarget::Field(name) => name,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldModification {
    pub target: FieldTarget,
    pub operation: Modification,
}

/// The `_mod` map, flattened into application order. Each key may carry a
/// single operation or a list of them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Modifications(Vec<FieldModification>);

impl Modifications {
    pub fn iter(&self) -> std::slice::Iter<'_, FieldModification> {
        self.0.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<'a> IntoIterator for &'a Modifications {
    type Item = &'a FieldModification;
    type IntoIter = std::slice::Iter<'a, FieldModification>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl FromIterator<FieldModification> for Modifications {
    fn from_iter<I: IntoIterator<Item = FieldModification>>(iter: I) -> Self {
        Modifications(iter.into_iter().collect())
    }
}

impl<'de> Deserialize<'de> for Modifications {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let by_field = BTreeMap::<String, OneOrMany<Modification>>::deserialize(deserializer)?;
        Ok(by_field
            .into_iter()
            .flat_map(|(key, operations)| {
                let target = FieldTarget::parse(key);
                operations
                    .into_vec()
                    .into_iter()
                    .map(move |operation| FieldModification {
                        target: target.clone(),
                        operation,
                    })
            })
            .collect())
    }
}

impl Serialize for Modifications {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut by_field: BTreeMap<&str, Vec<&Modification>> = BTreeMap::new();
        for modification in &self.0 {
            by_field
                .entry(modification.target.as_str())
                .or_default()
                .push(&modification.operation);
        }
        serializer.collect_map(by_field)
    }
}

/// A value the upstream format allows either bare or wrapped in a list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    Many(Vec<T>),
    One(T),
}

impl<T> OneOrMany<T> {
    pub fn into_vec(self) -> Vec<T> {
        match self {
            OneOrMany::Many(values) => values,
            OneOrMany::One(value) => vec![value],
        }
    }

    pub fn to_vec(&self) -> Vec<T>
    where
        T: Clone,
    {
        match self {
            OneOrMany::Many(values) => values.clone(),
            OneOrMany::One(value) => vec![value.clone()],
        }
    }
}

impl<T> Default for OneOrMany<T> {
    fn default() -> Self {
        OneOrMany::Many(Vec::new())
    }
}

/// Selects the element a `replaceArr` operation replaces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ReplaceSelector {
    /// The first element whose `name` field equals this string.
    Name(String),
    Index { index: i64 },
}

/// One edit applied while resolving a copy, tagged by `mode`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "camelCase")]
pub enum Modification {
    PrependArr {
        #[serde(default)]
        items: OneOrMany<Value>,
    },
    AppendArr {
        #[serde(default)]
        items: OneOrMany<Value>,
    },
    InsertArr {
        index: i64,
        #[serde(default)]
        items: OneOrMany<Value>,
    },
    ReplaceArr {
        replace: ReplaceSelector,
        #[serde(default)]
        items: OneOrMany<Value>,
    },
    RemoveArr {
        names: OneOrMany<String>,
    },
    /// Global find/replace over every string in the record. Only valid
    /// under the wildcard field.
    ReplaceTxt {
        replace: String,
        with: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        flags: Option<String>,
    },
    /// Any mode this crate does not apply.
    #[serde(other)]
    Unsupported,
}

impl Modification {
    pub fn mode(&self) -> &'static str {
        match self {
            Modification::PrependArr { .. } => "prependArr",
            Modification::AppendArr { .. } => "appendArr",
            Modification::InsertArr { .. } => "insertArr",
            Modification::ReplaceArr { .. } => "replaceArr",
            Modification::RemoveArr { .. } => "removeArr",
            Modification::ReplaceTxt { .. } => "replaceTxt",
            Modification::Unsupported => "unsupported",
        }
    }
}

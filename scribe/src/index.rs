use std::collections::HashMap;

use codex::{EntityKey, Record};
use tracing::debug;

/// Lookup of the raw records of one kind by identity. Read-only once built.
#[derive(Debug, Clone, Default)]
pub struct RecordIndex {
    records: HashMap<EntityKey, Record>,
}

impl RecordIndex {
    /// Index records in order. A later record with the same key replaces
    /// an earlier one; records without a name or source are skipped.
    pub fn from_records<I>(records: I) -> Self
    where
        I: IntoIterator<Item = Record>,
    {
        let mut index = HashMap::new();
        for record in records {
            let Some(key) = record.key() else {
                debug!(record = %record.label(), "record has no name/source; not indexed");
                continue;
            };
            if index.contains_key(&key) {
                debug!(entity = %key, "duplicate key; later record wins");
            }
            index.insert(key, record);
        }
        RecordIndex { records: index }
    }

    pub fn get(&self, key: &EntityKey) -> Option<&Record> {
        self.records.get(key)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &EntityKey> {
        self.records.keys()
    }
}

impl FromIterator<Record> for RecordIndex {
    fn from_iter<I: IntoIterator<Item = Record>>(iter: I) -> Self {
        RecordIndex::from_records(iter)
    }
}

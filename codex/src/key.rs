use std::fmt;

use serde::{Deserialize, Serialize};

/// Identity of a content record within one kind: two records with the same
/// name and source are the same logical entity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityKey {
    pub name: String,
    pub source: String,
}

impl EntityKey {
    pub fn new(name: impl Into<String>, source: impl Into<String>) -> Self {
        EntityKey {
            name: name.into(),
            source: source.into(),
        }
    }
}

/// Rendered as `name|source`, the tag form used by the upstream data.
impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}|{}", self.name, self.source)
    }
}

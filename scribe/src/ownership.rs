use std::collections::HashSet;

use codex::Record;

/// Source abbreviations with this prefix are free publications.
pub const FREE_SOURCE_PREFIX: &str = "ua";

/// Decides whether a resolved record comes from a book the reader owns.
///
/// Source abbreviations compare case-insensitively.
#[derive(Debug, Clone)]
pub struct Ownership {
    owned: HashSet<String>,
    free_sources: bool,
}

impl Ownership {
    pub fn new<I, S>(owned_sources: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Ownership {
            owned: owned_sources
                .into_iter()
                .map(|source| source.as_ref().to_lowercase())
                .collect(),
            free_sources: true,
        }
    }

    /// Whether free sources count as owned. On by default.
    pub fn with_free_sources(mut self, enabled: bool) -> Self {
        self.free_sources = enabled;
        self
    }

    pub fn owns_source(&self, source: &str) -> bool {
        let source = source.to_lowercase();
        (self.free_sources && source.starts_with(FREE_SOURCE_PREFIX))
            || self.owned.contains(&source)
    }

    /// A record is owned when its own source or any source it is also
    /// published in is owned.
    pub fn is_owned(&self, record: &Record) -> bool {
        record
            .source()
            .into_iter()
            .chain(record.other_sources())
            .any(|source| self.owns_source(source))
    }
}

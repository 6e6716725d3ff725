use codex::EntityKey;
use thiserror::Error;

/// Failures while applying copy specifications. None of them is recoverable:
/// each one points at a defect in the input data.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("{referenced_by} copies from {key}, which does not exist")]
    DanglingReference { key: EntityKey, referenced_by: String },

    #[error("illegal _copy._mod for {entity}: `*` key for {mode}")]
    IllegalWildcard { entity: String, mode: &'static str },

    #[error("non-array ({found}) for {mode} in {entity} for {field}")]
    NonArrayTarget {
        entity: String,
        field: String,
        mode: &'static str,
        found: &'static str,
    },

    #[error("circular copy: {}", display_cycle(.cycle))]
    CircularCopy { cycle: Vec<EntityKey> },

    #[error("invalid replaceTxt pattern in {entity}")]
    InvalidPattern {
        entity: String,
        #[source]
        cause: PatternError,
    },
}

/// A `replaceTxt` operation the regex engine cannot express.
#[derive(Debug, Error)]
pub enum PatternError {
    #[error("unsupported flag `{0}`")]
    UnsupportedFlag(char),

    #[error(transparent)]
    Regex(#[from] regex::Error),
}

/// Failures while turning a document tree into text.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("unrecognized entry in `{field}`")]
    UnrecognizedEntry {
        field: String,
        #[source]
        cause: serde_json::Error,
    },

    #[error("unexpected href type encountered: {kind}")]
    NonInternalLink { kind: String },

    #[error("invalid link target `{path}`")]
    InvalidLinkTarget {
        path: String,
        #[source]
        cause: url::ParseError,
    },

    #[error("item entry `{name}` for {entity} not found")]
    UnknownFragment { entity: String, name: String },

    #[error("property `{field}` referenced by a template is missing on {entity}")]
    PlaceholderMiss { entity: String, field: String },
}

/// Either engine's failure, for callers driving both.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error(transparent)]
    Render(#[from] RenderError),
}

fn display_cycle(cycle: &[EntityKey]) -> String {
    cycle
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" -> ")
}

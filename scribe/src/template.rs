//! Shared description fragments referenced from record text.
//!
//! A record's text may embed `{#itemEntry Name}` (optionally `|Source`).
//! The named fragment is rendered to Markdown, its `{{item.field}}`
//! placeholders are filled from the referencing record, and the result
//! replaces the reference before the tree is parsed.

use std::collections::HashMap;
use std::sync::LazyLock;

use codex::{Entry, Record};
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::error::RenderError;
use crate::renderer::Renderer;

/// Field of a fragment record holding its template tree.
pub const TEMPLATE_FIELD: &str = "entriesTemplate";

static FRAGMENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{#itemEntry ([a-zA-Z0-9 '\-]+)\|?[a-zA-Z0-9 '\-]*\}").unwrap());

static PLACEHOLDER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{item\.([a-zA-Z0-9]+)\}\}").unwrap());

/// Fragments by name.
#[derive(Debug, Clone, Default)]
pub struct FragmentTable {
    fragments: HashMap<String, Vec<Entry>>,
}

impl FragmentTable {
    /// Collect every record carrying a template. Later records replace
    /// earlier ones with the same name.
    pub fn from_records<'r, I>(records: I) -> Result<Self, RenderError>
    where
        I: IntoIterator<Item = &'r Record>,
    {
        let mut fragments = HashMap::new();
        for record in records {
            let (Some(name), Some(_)) = (record.name(), record.get(TEMPLATE_FIELD)) else {
                continue;
            };
            let entries = record.entries(TEMPLATE_FIELD).map_err(|cause| {
                RenderError::UnrecognizedEntry {
                    field: format!("{}.{}", record.label(), TEMPLATE_FIELD),
                    cause,
                }
            })?;
            fragments.insert(name.to_string(), entries);
        }
        debug!(fragments = fragments.len(), "indexed template fragments");
        Ok(FragmentTable { fragments })
    }

    pub fn get(&self, name: &str) -> Option<&[Entry]> {
        self.fragments.get(name).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.fragments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    /// Parse `field` of `entity` as a document tree with every fragment
    /// reference replaced by the fragment's filled-in Markdown.
    pub fn expand(
        &self,
        entity: &Record,
        field: &str,
        renderer: &Renderer,
    ) -> Result<Vec<Entry>, RenderError> {
        let mut tree = match entity.get(field) {
            Some(value) => value.clone(),
            None => return Ok(Vec::new()),
        };
        self.expand_value(&mut tree, entity, renderer)?;
        Vec::<Entry>::deserialize(&tree).map_err(|cause| RenderError::UnrecognizedEntry {
            field: field.to_string(),
            cause,
        })
    }

    fn expand_value(
        &self,
        value: &mut Value,
        entity: &Record,
        renderer: &Renderer,
    ) -> Result<(), RenderError> {
        match value {
            Value::String(text) => {
                if FRAGMENT_RE.is_match(text) {
                    *text = self.expand_text(text, entity, renderer)?;
                }
            }
            Value::Array(values) => {
                for value in values {
                    self.expand_value(value, entity, renderer)?;
                }
            }
            Value::Object(fields) => {
                for value in fields.values_mut() {
                    self.expand_value(value, entity, renderer)?;
                }
            }
            Value::Null | Value::Bool(_) | Value::Number(_) => {}
        }
        Ok(())
    }

    fn expand_text(
        &self,
        text: &str,
        entity: &Record,
        renderer: &Renderer,
    ) -> Result<String, RenderError> {
        let mut out = String::with_capacity(text.len());
        let mut last = 0;
        for caps in FRAGMENT_RE.captures_iter(text) {
            let Some(whole) = caps.get(0) else {
                continue;
            };
            let name = &caps[1];
            let fragment = self
                .get(name)
                .ok_or_else(|| RenderError::UnknownFragment {
                    entity: entity.label(),
                    name: name.to_string(),
                })?;
            let rendered = substitute_placeholders(&renderer.render(fragment)?, entity)?;
            out.push_str(&text[last..whole.start()]);
            out.push_str(&rendered);
            last = whole.end();
        }
        out.push_str(&text[last..]);
        Ok(out)
    }
}

/// Fill every `{{item.field}}` in `template` from `entity`. Strings are
/// inserted verbatim, other values in their JSON form.
pub fn substitute_placeholders(template: &str, entity: &Record) -> Result<String, RenderError> {
    let mut out = String::with_capacity(template.len());
    let mut last = 0;
    for caps in PLACEHOLDER_RE.captures_iter(template) {
        let Some(whole) = caps.get(0) else {
            continue;
        };
        let field = &caps[1];
        let value = match entity.get(field) {
            None | Some(Value::Null) => {
                return Err(RenderError::PlaceholderMiss {
                    entity: entity.label(),
                    field: field.to_string(),
                });
            }
            Some(Value::String(text)) => text.clone(),
            Some(other) => other.to_string(),
        };
        out.push_str(&template[last..whole.start()]);
        out.push_str(&value);
        last = whole.end();
    }
    out.push_str(&template[last..]);
    Ok(out)
}

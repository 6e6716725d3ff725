use std::collections::HashMap;

use codex::copy::{CopySpec, FieldTarget, Modification};
use codex::{EntityKey, Record};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::error::ResolveError;
use crate::index::RecordIndex;
use crate::modify;
use crate::rewrite::TextReplacement;

/// Fields always kept from the copying record.
const IDENTITY_FIELDS: [&str; 2] = ["name", "source"];

/// Resolve a single record against `index` with a fresh resolver.
pub fn resolve(record: &Record, index: &RecordIndex) -> Result<Record, ResolveError> {
    Resolver::new(index).resolve(record)
}

/// Resolve every record in order, sharing resolved copy sources.
pub fn resolve_all<'r, I>(records: I, index: &RecordIndex) -> Result<Vec<Record>, ResolveError>
where
    I: IntoIterator<Item = &'r Record>,
{
    let mut resolver = Resolver::new(index);
    records
        .into_iter()
        .map(|record| resolver.resolve(record))
        .collect()
}

/// Applies copy specifications, following chains of copies by recursion.
///
/// Copy sources are memoized by key for the lifetime of the resolver. The
/// keys currently being resolved are kept on a stack so that a copy cycle
/// fails instead of recursing forever.
pub struct Resolver<'a> {
    index: &'a RecordIndex,
    resolved: HashMap<EntityKey, Record>,
    in_progress: Vec<EntityKey>,
}

impl<'a> Resolver<'a> {
    pub fn new(index: &'a RecordIndex) -> Self {
        Resolver {
            index,
            resolved: HashMap::new(),
            in_progress: Vec::new(),
        }
    }

    /// Produce `record` with its copy specification fully applied and
    /// removed. A record without one is returned unchanged.
    pub fn resolve(&mut self, record: &Record) -> Result<Record, ResolveError> {
        let Some(copy) = record.copy() else {
            return Ok(record.clone());
        };

        let key = record.key();
        if let Some(key) = &key {
            if let Some(start) = self.in_progress.iter().position(|k| k == key) {
                let mut cycle = self.in_progress[start..].to_vec();
                cycle.push(key.clone());
                return Err(ResolveError::CircularCopy { cycle });
            }
            self.in_progress.push(key.clone());
        }

        let result = self.apply_copy(record, copy);

        if key.is_some() {
            self.in_progress.pop();
        }
        result
    }

    fn source_of(&mut self, record: &Record, copy: &CopySpec) -> Result<Record, ResolveError> {
        let target = copy.target();
        if let Some(resolved) = self.resolved.get(&target) {
            return Ok(resolved.clone());
        }
        let index = self.index;
        let raw = index
            .get(&target)
            .ok_or_else(|| ResolveError::DanglingReference {
                key: target.clone(),
                referenced_by: record.label(),
            })?;
        let resolved = self.resolve(raw)?;
        self.resolved.insert(target, resolved.clone());
        Ok(resolved)
    }

    fn apply_copy(&mut self, record: &Record, copy: &CopySpec) -> Result<Record, ResolveError> {
        let entity = record.label();
        debug!(entity = %entity, copies = %copy.target(), "resolving copy");

        let source = self.source_of(record, copy)?;
        let mut fields = record.fields().clone();

        // With only `_mod` given, nothing is bulk-copied.
        if copy.preserve.is_some() || copy.modifications.is_none() {
            for (field, value) in source.fields() {
                if IDENTITY_FIELDS.contains(&field.as_str()) || copy.preserves(field) {
                    continue;
                }
                fields.insert(field.clone(), value.clone());
            }
        }

        let mut replacements = Vec::new();
        for modification in copy.modifications.iter().flatten() {
            let operation = &modification.operation;
            match &modification.target {
                FieldTarget::Wildcard => match operation {
                    Modification::ReplaceTxt {
                        replace,
                        with,
                        flags,
                    } => {
                        let replacement = TextReplacement::compile(replace, with, flags.as_deref())
                            .map_err(|cause| ResolveError::InvalidPattern {
                                entity: entity.clone(),
                                cause,
                            })?;
                        replacements.push(replacement);
                    }
                    other => {
                        return Err(ResolveError::IllegalWildcard {
                            entity,
                            mode: other.mode(),
                        });
                    }
                },
                FieldTarget::Field(field) => {
                    modify_field(&mut fields, field, operation, &entity)?;
                }
            }
        }

        for replacement in &replacements {
            let changed: usize = fields.values_mut().map(|v| replacement.apply(v)).sum();
            debug!(entity = %entity, changed, "applied replaceTxt");
        }

        let mut resolved = Record::default();
        for (field, value) in fields {
            resolved.insert(field, value);
        }
        Ok(resolved)
    }
}

fn modify_field(
    fields: &mut Map<String, Value>,
    field: &str,
    operation: &Modification,
    entity: &str,
) -> Result<(), ResolveError> {
    if !modify::is_array_operation(operation) {
        warn!(entity = %entity, field = %field, mode = operation.mode(), "unhandled _mod mode; skipped");
        return Ok(());
    }
    let target = fields
        .entry(field.to_string())
        .or_insert_with(|| Value::Array(Vec::new()));
    let Value::Array(array) = target else {
        return Err(ResolveError::NonArrayTarget {
            entity: entity.to_string(),
            field: field.to_string(),
            mode: operation.mode(),
            found: json_type(target),
        });
    };
    modify::apply(array, operation);
    Ok(())
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

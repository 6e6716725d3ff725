use codex::Record;
use scribe::error::{PatternError, ResolveError};
use scribe::rewrite::TextReplacement;
use scribe::{RecordIndex, Resolver, resolve, resolve_all};
use serde_json::{Value, json};

fn record(value: Value) -> Record {
    serde_json::from_value(value).expect("invalid record fixture")
}

fn index(records: &[Record]) -> RecordIndex {
    records.iter().cloned().collect()
}

fn names(record: &Record, field: &str) -> Vec<String> {
    record
        .get(field)
        .and_then(Value::as_array)
        .expect("field is not an array")
        .iter()
        .map(|element| element["name"].as_str().unwrap_or_default().to_string())
        .collect()
}

fn wolf() -> Record {
    record(json!({
        "name": "Wolf",
        "source": "MM",
        "size": "M",
        "value": 10,
        "action": [{"name": "Bite"}, {"name": "Howl"}],
        "entries": ["A wolf."]
    }))
}

fn copying(copy: Value) -> Record {
    record(json!({"name": "Dire Wolf", "source": "MM", "value": 5, "_copy": copy}))
}

fn resolve_against_wolf(target: &Record) -> Result<Record, ResolveError> {
    let records = [wolf(), target.clone()];
    resolve(target, &index(&records))
}

#[test]
fn record_without_copy_is_unchanged() {
    let plain = wolf();
    let resolved = resolve(&plain, &index(&[plain.clone()])).unwrap();
    assert_eq!(resolved, plain);
}

#[test]
fn bulk_copy_overwrites_but_keeps_identity() {
    let target = copying(json!({"name": "Wolf", "source": "MM"}));
    let resolved = resolve_against_wolf(&target).unwrap();

    assert!(resolved.copy().is_none());
    assert_eq!(resolved.name(), Some("Dire Wolf"));
    assert_eq!(resolved.source(), Some("MM"));
    assert_eq!(resolved.get("value"), Some(&json!(10)));
    assert_eq!(resolved.get("size"), Some(&json!("M")));
}

#[test]
fn preserved_fields_are_not_overwritten() {
    let target = copying(json!({
        "name": "Wolf",
        "source": "MM",
        "_preserve": {"value": true}
    }));
    let resolved = resolve_against_wolf(&target).unwrap();

    assert_eq!(resolved.get("value"), Some(&json!(5)));
    assert_eq!(resolved.get("size"), Some(&json!("M")));
}

#[test]
fn modifications_alone_skip_the_bulk_copy() {
    let target = copying(json!({
        "name": "Wolf",
        "source": "MM",
        "_mod": {"action": {"mode": "appendArr", "items": {"name": "Pounce"}}}
    }));
    let resolved = resolve_against_wolf(&target).unwrap();

    assert_eq!(resolved.get("size"), None);
    assert_eq!(resolved.get("value"), Some(&json!(5)));
    assert_eq!(names(&resolved, "action"), ["Pounce"]);
}

#[test]
fn chained_copies_resolve_through_every_hop() {
    let c = record(json!({"name": "C", "source": "S", "trait": "from c", "value": 1}));
    let b = record(json!({
        "name": "B",
        "source": "S",
        "extra": "from b",
        "_copy": {"name": "C", "source": "S"}
    }));
    let a = record(json!({"name": "A", "source": "S", "_copy": {"name": "B", "source": "S"}}));
    let records = [a.clone(), b, c];

    let resolved = resolve(&a, &index(&records)).unwrap();

    assert!(resolved.copy().is_none());
    assert_eq!(resolved.name(), Some("A"));
    assert_eq!(resolved.get("trait"), Some(&json!("from c")));
    assert_eq!(resolved.get("value"), Some(&json!(1)));
    assert_eq!(resolved.get("extra"), Some(&json!("from b")));
}

#[test]
fn prepend_and_append_keep_order() {
    let target = copying(json!({
        "name": "Wolf",
        "source": "MM",
        "_preserve": {},
        "_mod": {"action": [
            {"mode": "prependArr", "items": {"name": "Charge"}},
            {"mode": "appendArr", "items": [{"name": "Pounce"}, {"name": "Rend"}]}
        ]}
    }));
    let resolved = resolve_against_wolf(&target).unwrap();

    assert_eq!(names(&resolved, "action"), ["Charge", "Bite", "Howl", "Pounce", "Rend"]);
}

#[test]
fn insert_at_index() {
    let target = copying(json!({
        "name": "Wolf",
        "source": "MM",
        "_preserve": {},
        "_mod": {"action": {"mode": "insertArr", "index": 1, "items": {"name": "Pounce"}}}
    }));
    let resolved = resolve_against_wolf(&target).unwrap();

    assert_eq!(names(&resolved, "action"), ["Bite", "Pounce", "Howl"]);
}

#[test]
fn remove_named_elements() {
    let target = copying(json!({
        "name": "Wolf",
        "source": "MM",
        "_preserve": {},
        "_mod": {"action": {"mode": "removeArr", "names": ["Bite", "Missing"]}}
    }));
    let resolved = resolve_against_wolf(&target).unwrap();

    assert_eq!(names(&resolved, "action"), ["Howl"]);
}

fn pack() -> Record {
    record(json!({
        "name": "Wolf",
        "source": "MM",
        "action": [{"name": "A"}, {"name": "B"}, {"name": "C"}, {"name": "D"}]
    }))
}

fn replace_in_pack(selector: Value) -> Vec<String> {
    let target = copying(json!({
        "name": "Wolf",
        "source": "MM",
        "_preserve": {},
        "_mod": {"action": {"mode": "replaceArr", "replace": selector, "items": {"name": "X"}}}
    }));
    let records = [pack(), target.clone()];
    names(&resolve(&target, &index(&records)).unwrap(), "action")
}

#[test]
fn replace_removes_as_many_elements_as_its_index() {
    assert_eq!(replace_in_pack(json!("A")), ["X", "A", "B", "C", "D"]);
    assert_eq!(replace_in_pack(json!({"index": 0})), ["X", "A", "B", "C", "D"]);
    assert_eq!(replace_in_pack(json!("B")), ["A", "X", "C", "D"]);
    assert_eq!(replace_in_pack(json!({"index": 2})), ["A", "B", "X"]);
}

#[test]
fn replace_of_missing_name_inserts_before_last() {
    let target = copying(json!({
        "name": "Wolf",
        "source": "MM",
        "_preserve": {},
        "_mod": {"action": {"mode": "replaceArr", "replace": "Missing", "items": {"name": "Snarl"}}}
    }));
    let resolved = resolve_against_wolf(&target).unwrap();

    assert_eq!(names(&resolved, "action"), ["Bite", "Snarl", "Howl"]);
}

#[test]
fn array_operation_on_absent_field_starts_empty() {
    let target = copying(json!({
        "name": "Wolf",
        "source": "MM",
        "_preserve": {},
        "_mod": {"reaction": {"mode": "appendArr", "items": {"name": "Parry"}}}
    }));
    let resolved = resolve_against_wolf(&target).unwrap();

    assert_eq!(names(&resolved, "reaction"), ["Parry"]);
}

#[test]
fn unsupported_mode_is_skipped() {
    let target = copying(json!({
        "name": "Wolf",
        "source": "MM",
        "_preserve": {},
        "_mod": {"action": {"mode": "scalarAddProp", "prop": "value", "scalar": 2}}
    }));
    let resolved = resolve_against_wolf(&target).unwrap();

    assert_eq!(names(&resolved, "action"), ["Bite", "Howl"]);
}

#[test]
fn non_array_target_fails() {
    let target = copying(json!({
        "name": "Wolf",
        "source": "MM",
        "_preserve": {},
        "_mod": {"size": {"mode": "appendArr", "items": "L"}}
    }));
    let err = resolve_against_wolf(&target).unwrap_err();

    match err {
        ResolveError::NonArrayTarget {
            entity,
            field,
            mode,
            found,
        } => {
            assert_eq!(entity, "Dire Wolf|MM");
            assert_eq!(field, "size");
            assert_eq!(mode, "appendArr");
            assert_eq!(found, "string");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn wildcard_only_accepts_text_replacement() {
    let target = copying(json!({
        "name": "Wolf",
        "source": "MM",
        "_mod": {"*": {"mode": "appendArr", "items": "x"}}
    }));
    let err = resolve_against_wolf(&target).unwrap_err();

    assert!(matches!(
        err,
        ResolveError::IllegalWildcard { mode: "appendArr", .. }
    ));
    assert_eq!(
        err.to_string(),
        "illegal _copy._mod for Dire Wolf|MM: `*` key for appendArr"
    );
}

#[test]
fn dangling_reference_fails() {
    let target = copying(json!({"name": "Winter Wolf", "source": "MM"}));
    let err = resolve_against_wolf(&target).unwrap_err();

    match err {
        ResolveError::DanglingReference { key, referenced_by } => {
            assert_eq!(key.to_string(), "Winter Wolf|MM");
            assert_eq!(referenced_by, "Dire Wolf|MM");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn copy_cycle_is_reported_with_its_path() {
    let a = record(json!({"name": "A", "source": "S", "_copy": {"name": "B", "source": "S"}}));
    let b = record(json!({"name": "B", "source": "S", "_copy": {"name": "A", "source": "S"}}));
    let records = [a.clone(), b];

    let err = resolve(&a, &index(&records)).unwrap_err();

    assert!(matches!(err, ResolveError::CircularCopy { ref cycle } if cycle.len() == 3));
    assert_eq!(err.to_string(), "circular copy: A|S -> B|S -> A|S");
}

#[test]
fn self_copy_is_a_cycle() {
    let a = record(json!({"name": "A", "source": "S", "_copy": {"name": "A", "source": "S"}}));
    let err = resolve(&a, &index(&[a.clone()])).unwrap_err();

    assert_eq!(err.to_string(), "circular copy: A|S -> A|S");
}

#[test]
fn text_replacement_reaches_nested_entries() {
    let source = record(json!({
        "name": "Red Dragon",
        "source": "MM",
        "fireImmune": true,
        "entries": [
            "The dragon breathes fire.",
            {"type": "entries", "name": "Fire Breath", "entries": ["Deals fire damage."]}
        ]
    }));
    let target = record(json!({
        "name": "White Dragon",
        "source": "MM",
        "_copy": {
            "name": "Red Dragon",
            "source": "MM",
            "_preserve": {},
            "_mod": {"*": {"mode": "replaceTxt", "replace": "fire", "with": "cold", "flags": "gi"}}
        }
    }));
    let records = [source, target.clone()];

    let resolved = resolve(&target, &index(&records)).unwrap();

    assert_eq!(
        resolved.get("entries"),
        Some(&json!([
            "The dragon breathes cold.",
            {"type": "entries", "name": "cold Breath", "entries": ["Deals cold damage."]}
        ]))
    );
    assert_eq!(resolved.get("fireImmune"), Some(&json!(true)));
    assert_eq!(resolved.name(), Some("White Dragon"));
}

#[test]
fn text_replacement_runs_after_array_operations() {
    let target = copying(json!({
        "name": "Wolf",
        "source": "MM",
        "_preserve": {},
        "_mod": {
            "*": {"mode": "replaceTxt", "replace": "wolf", "with": "dire wolf"},
            "entries": {"mode": "appendArr", "items": "Every wolf howls."}
        }
    }));
    let resolved = resolve_against_wolf(&target).unwrap();

    assert_eq!(
        resolved.get("entries"),
        Some(&json!(["A dire wolf.", "Every dire wolf howls."]))
    );
}

#[test]
fn text_replacement_group_references() {
    let target = copying(json!({
        "name": "Wolf",
        "source": "MM",
        "_preserve": {},
        "_mod": {
            "entries": {"mode": "appendArr", "items": "Bite: 2d6 damage, $5 fee."},
            "*": {"mode": "replaceTxt", "replace": "(\\d+)d(\\d+)", "with": "[$&] $1 dice of d$2 for $$"}
        }
    }));
    let resolved = resolve_against_wolf(&target).unwrap();

    assert_eq!(
        resolved.get("entries"),
        Some(&json!(["A wolf.", "Bite: [2d6] 2 dice of d6 for $ damage, $5 fee."]))
    );
}

#[test]
fn group_references_beyond_the_pattern_stay_literal() {
    let replacement = TextReplacement::compile("(\\d+)d(\\d+)", "$0|$10|$3|$12|$21", None).unwrap();

    assert_eq!(replacement.replace("2d6"), "$0|20|$3|22|61");
}

#[test]
fn unsupported_flag_fails() {
    let target = copying(json!({
        "name": "Wolf",
        "source": "MM",
        "_mod": {"*": {"mode": "replaceTxt", "replace": "wolf", "with": "x", "flags": "y"}}
    }));
    let err = resolve_against_wolf(&target).unwrap_err();

    assert!(matches!(
        err,
        ResolveError::InvalidPattern {
            cause: PatternError::UnsupportedFlag('y'),
            ..
        }
    ));
}

#[test]
fn pattern_the_engine_cannot_compile_fails() {
    let target = copying(json!({
        "name": "Wolf",
        "source": "MM",
        "_mod": {"*": {"mode": "replaceTxt", "replace": "wolf(?= pack)", "with": "x"}}
    }));
    let err = resolve_against_wolf(&target).unwrap_err();

    assert!(matches!(
        err,
        ResolveError::InvalidPattern {
            cause: PatternError::Regex(_),
            ..
        }
    ));
}

#[test]
fn resolver_reuses_resolved_sources() {
    let base = wolf();
    let first = copying(json!({"name": "Wolf", "source": "MM"}));
    let second = record(json!({
        "name": "Winter Wolf",
        "source": "MM",
        "_copy": {"name": "Dire Wolf", "source": "MM", "_preserve": {"size": true}},
        "size": "L"
    }));
    let records = [base, first, second];
    let index = index(&records);

    let resolved = resolve_all(&records, &index).unwrap();
    assert_eq!(resolved.len(), 3);
    assert_eq!(resolved[2].get("value"), Some(&json!(10)));
    assert_eq!(resolved[2].get("size"), Some(&json!("L")));

    let mut resolver = Resolver::new(&index);
    let again = resolver.resolve(&records[2]).unwrap();
    assert_eq!(again, resolved[2]);
}

#[test]
fn index_keeps_the_last_duplicate() {
    let first = record(json!({"name": "Wolf", "source": "MM", "value": 1}));
    let second = record(json!({"name": "Wolf", "source": "MM", "value": 2}));
    let unnamed = record(json!({"value": 3}));
    let index = index(&[first, second, unnamed]);

    assert_eq!(index.len(), 1);
    let key = codex::EntityKey::new("Wolf", "MM");
    assert_eq!(index.get(&key).and_then(|r| r.get("value")), Some(&json!(2)));
}

use std::io::Write;
use std::path::Path;
use std::process::{Command, Output};

const DATA: &str = r#"{
  "_meta": {"sources": []},
  "monster": [
    {"name": "Wolf", "source": "MM", "size": "M", "entries": ["A {@creature wolf} howls."]},
    {"name": "Dire Wolf", "source": "MM", "_copy": {"name": "Wolf", "source": "MM"}},
    {"name": "Ghost Wolf", "source": "XYZ", "_copy": {"name": "Wolf", "source": "MM"}}
  ],
  "item": [
    {"name": "Chain Mail of Resistance (Fire)", "source": "DMG", "resist": "fire",
     "entries": ["{#itemEntry Armor of Resistance|DMG}"]}
  ],
  "itemEntry": [
    {"name": "Armor of Resistance", "source": "DMG",
     "entriesTemplate": ["You have resistance to {{item.resist}} damage."]}
  ]
}"#;

fn write_file(dir: &Path, name: &str, contents: &str) -> String {
    let path = dir.join(name);
    let mut file = std::fs::File::create(&path).unwrap();
    write!(file, "{}", contents).unwrap();
    path.display().to_string()
}

fn scribe(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_scribe"))
        .current_dir(dir)
        .args(args)
        .arg("--no-color")
        .output()
        .expect("failed to run scribe")
}

fn stdout(output: &Output) -> String {
    String::from_utf8(output.stdout.clone()).unwrap()
}

#[test]
fn resolve_prints_resolved_json() {
    let dir = tempfile::tempdir().expect("failed to create temp dir");
    let data = write_file(dir.path(), "bestiary.json", DATA);

    let output = scribe(dir.path(), &["resolve", &data, "--kind", "monster", "--name", "Dire Wolf"]);
    assert!(output.status.success());

    let resolved: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(
        resolved,
        serde_json::json!([{
            "name": "Dire Wolf",
            "source": "MM",
            "size": "M",
            "entries": ["A {@creature wolf} howls."]
        }])
    );
}

#[test]
fn render_filters_by_owned_sources() {
    let dir = tempfile::tempdir().expect("failed to create temp dir");
    let data = write_file(dir.path(), "bestiary.json", DATA);
    write_file(dir.path(), "scribe.toml", "owned_sources = [\"mm\"]\n");

    let output = scribe(dir.path(), &["render", &data, "--kind", "monster"]);
    assert!(output.status.success());
    assert_eq!(
        stdout(&output).trim_end(),
        "# Wolf\n\nA [[wolf|Wolf]] howls.\n\n# Dire Wolf\n\nA [[wolf|Wolf]] howls."
    );
}

#[test]
fn render_expands_template_fragments() {
    let dir = tempfile::tempdir().expect("failed to create temp dir");
    let data = write_file(dir.path(), "items.json", DATA);

    let output = scribe(
        dir.path(),
        &["render", &data, "--kind", "item", "--fragments", "itemEntry"],
    );
    assert!(output.status.success());
    assert_eq!(
        stdout(&output).trim_end(),
        "# Chain Mail of Resistance (Fire)\n\nYou have resistance to fire damage."
    );
}

#[test]
fn malformed_data_file_fails_with_a_diagnostic() {
    let dir = tempfile::tempdir().expect("failed to create temp dir");
    let data = write_file(dir.path(), "broken.json", "{\"monster\": [\n  {\"name\": }\n]}");

    let output = scribe(dir.path(), &["resolve", &data, "--kind", "monster"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(stderr.contains("broken.json"), "stderr: {stderr}");
}

#[test]
fn explicit_missing_config_is_an_error() {
    let dir = tempfile::tempdir().expect("failed to create temp dir");
    let data = write_file(dir.path(), "bestiary.json", DATA);

    let output = scribe(
        dir.path(),
        &["render", &data, "--kind", "monster", "--config", "nope.toml"],
    );
    assert!(!output.status.success());
    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(stderr.contains("cannot read 'nope.toml'"), "stderr: {stderr}");
}

use super::*;
use crate::error::GenerateError;
use confgen_unit::json;
use std::fs;
use tempfile::{TempDir, tempdir};

fn fixture(files: &[(&str, &str)]) -> TempDir {
    let dir = tempdir().expect("should be able to create temp directory");
    for (name, content) in files {
        let path = dir.path().join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("should be able to create directory");
        }
        fs::write(path, content).expect("should be able to write temporary file");
    }
    dir
}

async fn load_default(dir: &TempDir, name: &str) -> Result<ConfigUnit, GenerateError> {
    load(&dir.path().join(name), &LoadOptions::default()).await
}

#[tokio::test]
async fn toml_definition() {
    let dir = fixture(&[(
        "app.confgen.toml",
        r#"
[schema]
type = "object"

[schema.fields."app.json"]
type = "object"
fields.name = { type = "string" }
fields.port = { type = "integer", default = 8080 }

[data."app.json"]
name = "app"
"#,
    )]);

    let unit = load_default(&dir, "app.confgen.toml")
        .await
        .expect("must load");
    assert_eq!(
        unit.resolve().expect("must resolve"),
        json!({"app.json": {"name": "app", "port": 8080}})
    );
}

#[tokio::test]
async fn extends_in_order() {
    let dir = fixture(&[
        (
            "base/common.confgen.yaml",
            r#"
schema:
  type: object
  fields:
    db:
      type: object
      fields:
        host: { type: string }
        port: { type: integer }
data:
  db: { host: localhost, port: 5432 }
"#,
        ),
        (
            "base/debug.confgen.json",
            r#"{"data": {"debug": true, "db": {"port": 5433}}}"#,
        ),
        (
            "app.confgen.toml",
            r#"
extends = ["base/common.confgen.yaml", "base/debug.confgen.json"]

[data.db]
host = "db.internal"
"#,
        ),
    ]);

    let unit = load_default(&dir, "app.confgen.toml")
        .await
        .expect("must load");

    // the schema of the base is kept, so "debug" is stripped on resolve
    assert_eq!(
        unit.data(),
        Some(&json!({"db": {"host": "db.internal", "port": 5433}, "debug": true}))
    );
    assert_eq!(
        unit.resolve().expect("must resolve"),
        json!({"db": {"host": "db.internal", "port": 5433}})
    );
}

#[tokio::test]
async fn overrides_after_extends() {
    let dir = fixture(&[
        ("base.confgen.json", r#"{"data": {"port": 1, "host": "h"}}"#),
        ("local.json", r#"{"host": "local"}"#),
        (
            "app.confgen.yml",
            r#"
extends: [base.confgen.json]
data:
  port: 2
override:
  - from: data
    value: { port: 3 }
  - from: file
    path: local.json
  - from: file
    path: missing.json
    optional: true
"#,
        ),
    ]);

    let unit = load_default(&dir, "app.confgen.yml")
        .await
        .expect("must load");
    assert_eq!(unit.data(), Some(&json!({"port": 3, "host": "local"})));
}

#[tokio::test]
async fn missing_extends() {
    let dir = fixture(&[("app.confgen.json", r#"{"extends": ["nope.confgen.json"]}"#)]);

    let err = load_default(&dir, "app.confgen.json")
        .await
        .expect_err("must fail");
    assert!(
        matches!(
            err,
            GenerateError::Definition(DefinitionError::MissingExtends { .. })
        ),
        "{err:?}"
    );
}

#[tokio::test]
async fn extends_cycle() {
    let dir = fixture(&[
        ("a.confgen.json", r#"{"extends": ["b.confgen.json"]}"#),
        ("b.confgen.json", r#"{"extends": ["a.confgen.json"]}"#),
    ]);

    let err = load_default(&dir, "a.confgen.json")
        .await
        .expect_err("must fail");
    let GenerateError::Definition(DefinitionError::ExtendsCycle { chain }) = err else {
        panic!("unexpected error: {err:?}");
    };
    let names = chain
        .iter()
        .filter_map(|path| path.file_name()?.to_str())
        .collect::<Vec<_>>();
    assert_eq!(names, ["a.confgen.json", "b.confgen.json", "a.confgen.json"]);
}

#[tokio::test]
async fn shared_base_is_not_a_cycle() {
    let dir = fixture(&[
        ("shared.confgen.json", r#"{"data": {"shared": true}}"#),
        ("a.confgen.json", r#"{"extends": ["shared.confgen.json"], "data": {"a": 1}}"#),
        ("b.confgen.json", r#"{"extends": ["shared.confgen.json"], "data": {"b": 1}}"#),
        (
            "app.confgen.json",
            r#"{"extends": ["a.confgen.json", "b.confgen.json"]}"#,
        ),
    ]);

    let unit = load_default(&dir, "app.confgen.json")
        .await
        .expect("must load");
    assert_eq!(unit.data(), Some(&json!({"shared": true, "a": 1, "b": 1})));
}

#[tokio::test]
async fn conflicting_schemas() {
    let dir = fixture(&[
        (
            "base.confgen.json",
            r#"{"schema": {"type": "object", "fields": {"port": {"type": "integer"}}}}"#,
        ),
        (
            "app.confgen.json",
            r#"{"extends": ["base.confgen.json"], "schema": {"type": "object", "fields": {"port": {"type": "string"}}}}"#,
        ),
    ]);

    let err = load_default(&dir, "app.confgen.json")
        .await
        .expect_err("must fail");
    let GenerateError::Definition(DefinitionError::SchemaConflict { source, .. }) = err else {
        panic!("unexpected error: {err:?}");
    };
    assert_eq!(source.path.to_string(), "port");
}

#[tokio::test]
async fn parse_error() {
    let dir = fixture(&[("app.confgen.json", r#"{"data": "#)]);

    let err = load_default(&dir, "app.confgen.json")
        .await
        .expect_err("must fail");
    assert!(
        matches!(err, GenerateError::Definition(DefinitionError::Parse { .. })),
        "{err:?}"
    );
}

#[tokio::test]
async fn unknown_key() {
    let dir = fixture(&[("app.confgen.json", r#"{"daat": {}}"#)]);

    let err = load_default(&dir, "app.confgen.json")
        .await
        .expect_err("must fail");
    assert!(
        matches!(err, GenerateError::Definition(DefinitionError::Parse { .. })),
        "{err:?}"
    );
}

#[tokio::test]
async fn unsupported_format() {
    let dir = fixture(&[("app.confgen.ini", "")]);

    let err = load_default(&dir, "app.confgen.ini")
        .await
        .expect_err("must fail");
    assert!(
        matches!(
            err,
            GenerateError::Definition(DefinitionError::UnsupportedFormat(_))
        ),
        "{err:?}"
    );
}

#[test]
fn format_from_path() {
    assert_eq!(
        Format::from_path(Path::new("a.confgen.yml")),
        Some(Format::Yaml)
    );
    assert_eq!(Format::from_path(Path::new("a.toml")), Some(Format::Toml));
    assert_eq!(Format::from_path(Path::new("Makefile")), None);
}

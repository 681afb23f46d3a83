//! Runs the confgen binary on small projects.

use anyhow::{Result, ensure};
use std::fs::{create_dir_all, read_to_string, write};
use std::path::Path;
use std::process::{Command, Output};

const CONFGEN_CMD: &str = env!("CARGO_BIN_EXE_confgen");

fn confgen(dir: &Path, args: &[&str]) -> Result<Output> {
    Ok(Command::new(CONFGEN_CMD)
        .current_dir(dir)
        .env_remove("CONFGEN_CONFIG")
        .args(args)
        .output()?)
}

fn project(files: &[(&str, &str)]) -> Result<tempfile::TempDir> {
    let dir = tempfile::tempdir()?;
    for (name, content) in files {
        let path = dir.path().join(name);
        if let Some(parent) = path.parent() {
            create_dir_all(parent)?;
        }
        write(path, content)?;
    }
    Ok(dir)
}

const DEFINITION: &str = r#"
extends = ["shared/base.toml"]

[data."server.json"]
port = 9000
"#;

const BASE: &str = r#"
[schema]
type = "object"

[schema.fields."server.json"]
type = "object"
fields.host = { type = "string", default = "localhost" }
fields.port = { type = "integer", minimum = 1024 }
"#;

#[test]
fn generate_and_clean() -> Result<()> {
    let dir = project(&[
        ("Confgen.toml", "[generate]\nout_dir = \"out\"\n"),
        ("defs/shared/base.toml", BASE),
        ("defs/app.confgen.toml", DEFINITION),
    ])?;
    create_dir_all(dir.path().join("out"))?;

    let output = confgen(dir.path(), &["generate"])?;
    ensure!(
        output.status.success(),
        "generate failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    // the base isn't a definition on its own, it lacks the port
    let content = read_to_string(dir.path().join("out/server.json"))?;
    assert_eq!(content, "{\n  \"host\": \"localhost\",\n  \"port\": 9000\n}\n");

    let output = confgen(dir.path(), &["clean"])?;
    ensure!(
        output.status.success(),
        "clean failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    assert!(!dir.path().join("out/server.json").exists());

    Ok(())
}

#[test]
fn generate_reports_failures() -> Result<()> {
    let dir = project(&[(
        "app.confgen.json",
        r#"{"schema": {"type": "object", "fields": {"port": {"type": "integer"}}}, "data": {}}"#,
    )])?;

    let output = confgen(dir.path(), &["generate"])?;
    assert!(!output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("required field is missing"), "{stdout}");

    Ok(())
}

#[test]
fn print_and_dry_run() -> Result<()> {
    let dir = project(&[("app.confgen.yaml", "data:\n  app.env: { PORT: 80 }\n")])?;

    let output = confgen(dir.path(), &["generate", "--print", "--dry-run"])?;
    ensure!(
        output.status.success(),
        "generate failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("\"PORT\": 80"), "{stdout}");
    assert!(!dir.path().join("app.env").exists());

    Ok(())
}

#[test]
fn config_schema() -> Result<()> {
    let dir = tempfile::tempdir()?;

    let output = confgen(dir.path(), &["config", "schema"])?;
    ensure!(output.status.success(), "config schema failed");

    let schema: serde_json::Value = serde_json::from_slice(&output.stdout)?;
    assert_eq!(schema["title"], "Configuration");
    assert!(schema["properties"]["generate"].is_object());

    Ok(())
}

//! Integration tests for the command-line interface

use std::fs;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

fn kombinator(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_kombinator"))
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .unwrap()
}

/// Helper to create a small project with a recipe
fn setup_project() -> TempDir {
    let dir = TempDir::new().unwrap();
    fs::create_dir_all(dir.path().join("core")).unwrap();
    fs::write(
        dir.path().join("core/TitleCard.vue"),
        "<template>\n  <h2 class=\"title\">{{ title }}</h2>\n</template>\n",
    )
    .unwrap();
    fs::write(
        dir.path().join("recipe.toml"),
        r#"[meta]
name = "cards"
directories = ["out", "core"]

[[mods]]
id = "title-tag"
component = "title-card"

[[mods.steps]]
type = "find-first"

[[mods.steps]]
type = "rename-element"
name = "h3"
"#,
    )
    .unwrap();
    dir
}

fn path_arg(path: &Path) -> &str {
    path.to_str().unwrap()
}

#[test]
fn test_help_lists_subcommands() {
    let output = kombinator(&["--help"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    for command in ["apply", "check", "combine", "list"] {
        assert!(stdout.contains(command), "missing {command} in:\n{stdout}");
    }
}

#[test]
fn test_apply_writes_output() {
    let project = setup_project();
    let recipe = project.path().join("recipe.toml");

    let output = kombinator(&["apply", "--recipe", path_arg(&recipe)]);
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("title-tag"));

    let written = fs::read_to_string(project.path().join("out/TitleCard.vue")).unwrap();
    assert!(written.starts_with("<template>\n<h3 class=\"title\">{{ title }}</h3>\n"));
}

#[test]
fn test_dry_run_writes_nothing() {
    let project = setup_project();
    let recipe = project.path().join("recipe.toml");

    let output = kombinator(&["apply", "--recipe", path_arg(&recipe), "--dry-run", "--diff"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Would write"));
    assert!(stdout.contains("h3"));
    assert!(!project.path().join("out").exists());
}

#[test]
fn test_check_exit_code_reflects_pending_changes() {
    let project = setup_project();
    let recipe = project.path().join("recipe.toml");

    let output = kombinator(&["check", "--recipe", path_arg(&recipe)]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("WOULD CHANGE"));
}

#[test]
fn test_combine_to_stdout_and_file() {
    let dir = TempDir::new().unwrap();
    let source = dir.path().join("a.vue");
    let overlay = dir.path().join("b.vue");
    fs::write(&source, "<style>.a{color:red}</style>").unwrap();
    fs::write(&overlay, "<style>.a{color:blue}</style>").unwrap();

    let output = kombinator(&["combine", path_arg(&source), path_arg(&overlay)]);
    assert!(output.status.success());
    assert_eq!(
        String::from_utf8_lossy(&output.stdout),
        "<style>.a{color:red}\n.a{color:blue}</style>"
    );

    let target = dir.path().join("nested/out.vue");
    let output = kombinator(&[
        "combine",
        path_arg(&source),
        path_arg(&overlay),
        "--tags",
        "script",
        "--output",
        path_arg(&target),
    ]);
    assert!(output.status.success());
    assert_eq!(
        fs::read_to_string(target).unwrap(),
        "<style>.a{color:red}</style>"
    );
}

#[test]
fn test_list_json() {
    let project = setup_project();
    let recipe = project.path().join("recipe.toml");

    let output = kombinator(&["list", "--recipe", path_arg(&recipe), "--json"]);
    assert!(output.status.success());
    let parsed: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(parsed["meta"]["name"], "cards");
    assert_eq!(parsed["mods"][0]["steps"][1]["type"], "rename-element");
}

#[test]
fn test_invalid_recipe_fails() {
    let dir = TempDir::new().unwrap();
    let recipe = dir.path().join("recipe.toml");
    fs::write(&recipe, "[meta]\nname = \"empty\"\n").unwrap();

    let output = kombinator(&["list", "--recipe", path_arg(&recipe)]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("no mods or combines"));
}

//! Integration tests for the `flextool` binary

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const COLORS: &str = r#"#pragma once

namespace colors {

// {gen};{funccall};enum_to_string()
enum class Color { Red, Green, Blue };

} // namespace colors
"#;

const EMPTY_ENUM: &str = r#"// {gen};{funccall};enum_to_string()
enum class Nothing {};
"#;

/// Command running in `dir`, isolated from the caller's configuration
fn flextool(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("flextool").unwrap();
    cmd.current_dir(dir)
        .env_remove("RUST_LOG")
        .env_remove("LOG_FORMAT")
        .env("NO_COLOR", "1");
    cmd
}

fn workspace(files: &[(&str, &str)]) -> TempDir {
    let dir = TempDir::new().unwrap();
    for (name, contents) in files {
        fs::write(dir.path().join(name), contents).unwrap();
    }
    dir
}

#[test]
fn test_list_plugins() {
    let dir = workspace(&[]);
    flextool(dir.path())
        .arg("--list-plugins")
        .assert()
        .success()
        .stdout(predicate::str::contains("flex_enum_plugin"))
        .stdout(predicate::str::contains("enum-to-string"))
        .stdout(predicate::str::contains("inject-pimpl-storage"))
        .stdout(predicate::str::contains("reflection-metadata"));
}

#[test]
fn test_list_selected_plugin_only() {
    let dir = workspace(&[]);
    flextool(dir.path())
        .args(["--load_plugin", "builtin:flex_reflect_plugin", "--list-plugins"])
        .assert()
        .success()
        .stdout(predicate::str::contains("flex_reflect_plugin"))
        .stdout(predicate::str::contains("flex_enum_plugin").not());
}

#[test]
fn test_generates_enum_conversions() {
    let dir = workspace(&[("colors.hpp", COLORS)]);
    flextool(dir.path())
        .args(["--outdir", "gen", "colors.hpp"])
        .assert()
        .success()
        .stderr(predicate::str::contains("1 written"));

    let output = dir.path().join("gen/colors.hpp.enum-to-string.hpp");
    let generated = fs::read_to_string(output).unwrap();
    assert!(generated.contains("// Generated by flextool: flex_enum_plugin"));
    assert!(generated.contains("to_string(colors::Color value)"));

    let manifest = fs::read_to_string(dir.path().join("gen/.flextool-manifest.json")).unwrap();
    let manifest: serde_json::Value = serde_json::from_str(&manifest).unwrap();
    assert_eq!(manifest["entries"].as_array().unwrap().len(), 1);
}

#[test]
fn test_default_outdir_is_under_indir() {
    let dir = workspace(&[]);
    fs::create_dir(dir.path().join("src")).unwrap();
    fs::write(dir.path().join("src/colors.hpp"), COLORS).unwrap();

    flextool(dir.path())
        .args(["--indir", "src", "colors.hpp"])
        .assert()
        .success();

    assert!(dir
        .path()
        .join("src/generated/colors.hpp.enum-to-string.hpp")
        .is_file());
}

#[test]
fn test_unknown_plugin_is_fatal() {
    let dir = workspace(&[("colors.hpp", COLORS)]);
    flextool(dir.path())
        .args(["--load_plugin", "does-not-exist.so", "colors.hpp"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("PluginLoad"));

    assert!(!dir.path().join("generated").exists());
}

#[test]
fn test_rejected_plugin_stops_before_inputs_are_read() {
    let dir = workspace(&[("libfake_plugin.so", "not a shared object")]);
    flextool(dir.path())
        .args(["--load_plugin", "libfake_plugin.so", "missing.hpp"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("PluginLoad"))
        .stderr(predicate::str::contains("missing.hpp").not())
        .stderr(predicate::str::contains("ParseFailure").not());

    assert!(!dir.path().join("generated").exists());
}

#[test]
fn test_json_report() {
    let dir = workspace(&[("colors.hpp", COLORS)]);
    flextool(dir.path())
        .args([
            "--report-format",
            "json",
            "--load_plugin",
            "builtin:no_such_plugin",
            "colors.hpp",
        ])
        .assert()
        .code(1)
        .stderr(predicate::str::contains(r#""kind":"PluginLoad""#))
        .stderr(predicate::str::contains(r#""severity":"fatal""#));
}

#[test]
fn test_warnings_exit_code() {
    let dir = workspace(&[("nothing.hpp", EMPTY_ENUM)]);
    flextool(dir.path())
        .arg("nothing.hpp")
        .assert()
        .success()
        .stderr(predicate::str::contains("warning[GenerationError]"));

    flextool(dir.path())
        .args(["--fail-on-warnings", "nothing.hpp"])
        .assert()
        .code(2);
}

#[test]
fn test_strict_required_capability() {
    let dir = workspace(&[
        ("colors.hpp", COLORS),
        (
            "flextool.toml",
            "[registry]\nstrictCapabilities = true\nrequiredCapabilities = [\"no-such-capability\"]\n",
        ),
    ]);
    flextool(dir.path())
        .arg("colors.hpp")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("UnknownCapability"));

    assert!(!dir.path().join("generated").exists());
}

#[test]
fn test_invalid_config_is_fatal() {
    let dir = workspace(&[("colors.hpp", COLORS)]);
    flextool(dir.path())
        .args(["--jobs", "0", "colors.hpp"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("runtime.jobs cannot be 0"));
}

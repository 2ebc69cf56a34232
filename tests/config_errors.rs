// tests/config_errors.rs

use std::fs;
use std::path::PathBuf;

use tempfile::TempDir;

use sitepipe::config::{ConfigFile, load_and_validate, load_or_default};
use sitepipe::errors::SitepipeError;
use sitepipe::types::StyleVariant;

fn write_config(contents: &str) -> (TempDir, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("Sitepipe.toml");
    fs::write(&path, contents).unwrap();
    (dir, path)
}

#[test]
fn malformed_toml_is_a_toml_error() {
    let (_dir, path) = write_config("[config\nsrc = 'src'");
    let err = load_and_validate(&path).unwrap_err();
    assert!(matches!(err, SitepipeError::TomlError(_)), "{err:?}");
}

#[test]
fn unknown_style_variant_is_rejected() {
    let (_dir, path) = write_config("[config]\nstyle = \"less\"\n");
    let err = load_and_validate(&path).unwrap_err();
    assert!(matches!(err, SitepipeError::TomlError(_)), "{err:?}");
}

#[test]
fn overlapping_layout_is_a_config_error() {
    let (_dir, path) = write_config("[config]\nsrc = \"site\"\ndist = \"site/out\"\n");
    let err = load_and_validate(&path).unwrap_err();
    assert!(matches!(err, SitepipeError::ConfigError(ref m) if m.contains("overlap")), "{err:?}");
}

#[test]
fn zero_queue_length_is_rejected() {
    let (_dir, path) = write_config("[config]\nqueue_length = 0\n");
    let err = load_and_validate(&path).unwrap_err();
    assert!(err.to_string().contains("queue_length"));
}

#[test]
fn explicit_missing_config_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = load_or_default(dir.path().join("nope.toml")).unwrap_err();
    assert!(matches!(err, SitepipeError::IoError(_)), "{err:?}");
}

#[test]
fn partial_config_keeps_remaining_defaults() {
    let (_dir, path) = write_config(
        r#"
[config]
style = "css"
port = 0

[tools.webp]
cmd = "cwebp -q 80 {input} -o {output}"
"#,
    );
    let cfg = load_and_validate(&path).unwrap();
    let defaults = ConfigFile::default();

    assert_eq!(cfg.config_section().style, StyleVariant::Css);
    assert_eq!(cfg.config_section().port, 0);
    assert_eq!(cfg.config_section().dist, "dist");
    assert_eq!(cfg.tools().webp.cmd, "cwebp -q 80 {input} -o {output}");
    assert_eq!(cfg.tools().webp.dev_cmd, None);
    assert_eq!(cfg.tools().sass, defaults.tools().sass);
}

#[test]
fn output_outside_the_project_is_rejected() {
    let (_dir, path) = write_config("[config]\ndist = \"../out\"\n");
    let err = load_and_validate(&path).unwrap_err();
    assert!(matches!(err, SitepipeError::ConfigError(ref m) if m.contains("inside the project root")), "{err:?}");
}

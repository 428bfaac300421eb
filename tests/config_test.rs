//! Tests for layered settings loading

use tempfile::TempDir;

use notemerge::config::{vault_config_path, Settings, VaultConfig};
use notemerge::domain::{ConflictPolicy, HeadingLevel, SortMode};

fn write_vault_config(dir: &TempDir, content: &str) {
    std::fs::write(vault_config_path(dir.path()), content).expect("write config");
}

#[test]
fn given_vault_config_when_loading_then_overrides_scalars() {
    // Arrange
    let temp = TempDir::new().unwrap();
    write_vault_config(
        &temp,
        r#"
[merge]
sort_mode = "creationDate"
include_nested_folders = true
separator = "\n---\n"
output_name = "Book"
headings = 2
on_conflict = "overwrite"
"#,
    );

    // Act
    let settings = Settings::load(Some(temp.path())).unwrap();

    // Assert
    assert_eq!(settings.merge.sort_mode, SortMode::CreationDate);
    assert!(settings.merge.include_nested_folders);
    assert_eq!(settings.merge.separator, "\n---\n");
    assert_eq!(settings.merge.output_name, "Book");
    assert_eq!(settings.merge.headings, Some(HeadingLevel::new(2).unwrap()));
    assert_eq!(settings.merge.on_conflict, ConflictPolicy::Overwrite);
}

#[test]
fn given_unknown_sort_mode_in_config_when_loading_then_falls_back_to_alphabetical() {
    let temp = TempDir::new().unwrap();
    write_vault_config(&temp, "[merge]\nsort_mode = \"random\"\n");

    let settings = Settings::load(Some(temp.path())).unwrap();

    assert_eq!(settings.merge.sort_mode, SortMode::Alphabetical);
}

#[test]
fn given_heading_level_out_of_range_when_loading_then_config_error() {
    let temp = TempDir::new().unwrap();
    write_vault_config(&temp, "[merge]\nheadings = 9\n");

    let err = Settings::load(Some(temp.path())).unwrap_err();

    assert!(err.to_string().starts_with("config error"));
}

#[test]
fn given_malformed_toml_when_loading_then_config_error_names_file() {
    let temp = TempDir::new().unwrap();
    write_vault_config(&temp, "[merge\n");

    let err = Settings::load(Some(temp.path())).unwrap_err();

    assert!(err.to_string().contains(".notemerge.toml"));
}

#[test]
fn given_negated_extension_when_merging_arrays_then_item_removed() {
    let base = vec!["md".to_string(), "markdown".to_string()];
    let overlay = vec!["txt".to_string(), "!md".to_string()];

    let merged = VaultConfig::merge_array(&base, &overlay);

    assert_eq!(merged, vec!["markdown".to_string(), "txt".to_string()]);
}

#[test]
fn given_settings_when_rendering_toml_then_roundtrips_sort_mode_name() {
    let mut settings = Settings::default();
    settings.merge.sort_mode = SortMode::CreationDate;

    let rendered = settings.to_toml().unwrap();

    assert!(rendered.contains("sort_mode = \"creationDate\""));
    let parsed: Settings = toml::from_str(&rendered).unwrap();
    assert_eq!(parsed, settings);
}

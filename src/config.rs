//! Configuration management with layered loading
//!
//! Precedence (lowest to highest):
//! 1. Compiled defaults
//! 2. Global config: `$XDG_CONFIG_HOME/notemerge/notemerge.toml`
//! 3. Local config: `<vault_dir>/.notemerge.toml`
//! 4. Environment variables: `NOTEMERGE_*` prefix
//!
//! Command-line flags are applied on top by the CLI layer.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use config::{Config, ConfigError, Environment};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::application::ApplicationError;
use crate::domain::{expand_env_vars, ConflictPolicy, HeadingLevel, SortMode};

/// Vault layout settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct VaultConfig {
    /// Vault root (default: current directory)
    pub dir: Option<PathBuf>,
    /// File extensions treated as notes
    pub extensions: Vec<String>,
    /// Folder names never descended into (dot-folders are always skipped)
    pub ignore_dirs: Vec<String>,
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            dir: None,
            extensions: vec!["md".into()],
            ignore_dirs: vec!["node_modules".into()],
        }
    }
}

/// Raw vault config for intermediate parsing (arrays are Option to detect "not specified").
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawVaultConfig {
    pub dir: Option<PathBuf>,
    pub extensions: Option<Vec<String>>,
    pub ignore_dirs: Option<Vec<String>>,
}

impl VaultConfig {
    /// Merge arrays with union semantics and negation support.
    ///
    /// - Items from overlay are added to base
    /// - Items prefixed with `!` remove the corresponding item from the result
    /// - Duplicates are de-duplicated
    ///
    /// # Examples
    /// ```ignore
    /// merge_array(&["md", "txt"], &["markdown"])  // → ["markdown", "md", "txt"]
    /// merge_array(&["md", "txt"], &["!txt"])      // → ["md"]
    /// ```
    pub fn merge_array(base: &[String], overlay: &[String]) -> Vec<String> {
        let mut result: HashSet<String> = base.iter().cloned().collect();

        for pattern in overlay {
            if let Some(negated) = pattern.strip_prefix('!') {
                result.remove(negated);
            } else {
                result.insert(pattern.clone());
            }
        }

        // Convert to sorted Vec for deterministic output
        let mut vec: Vec<String> = result.into_iter().collect();
        vec.sort();
        vec
    }

    /// Merge vault-local overlay: arrays UNION with negation.
    pub fn merge(&self, overlay: &RawVaultConfig) -> Self {
        Self {
            dir: overlay.dir.clone().or_else(|| self.dir.clone()),
            extensions: overlay
                .extensions
                .as_ref()
                .map(|o| Self::merge_array(&self.extensions, o))
                .unwrap_or_else(|| self.extensions.clone()),
            ignore_dirs: overlay
                .ignore_dirs
                .as_ref()
                .map(|o| Self::merge_array(&self.ignore_dirs, o))
                .unwrap_or_else(|| self.ignore_dirs.clone()),
        }
    }

    /// Apply global config onto defaults: arrays REPLACE.
    pub fn apply_global(&self, global: &RawVaultConfig) -> Self {
        Self {
            dir: global.dir.clone().or_else(|| self.dir.clone()),
            extensions: global
                .extensions
                .clone()
                .unwrap_or_else(|| self.extensions.clone()),
            ignore_dirs: global
                .ignore_dirs
                .clone()
                .unwrap_or_else(|| self.ignore_dirs.clone()),
        }
    }
}

/// Defaults for merge runs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct MergeDefaults {
    /// alphabetical | creationDate | logical (unknown values fall back to alphabetical)
    pub sort_mode: SortMode,
    pub include_nested_folders: bool,
    /// Text between two notes
    pub separator: String,
    /// Output file name, relative to the vault root
    pub output_name: String,
    /// Heading level for per-note headings (none when unset)
    pub headings: Option<HeadingLevel>,
    pub on_conflict: ConflictPolicy,
    /// Index note defining logical order (vault-relative or absolute)
    pub order_file: Option<PathBuf>,
    /// Regex with one capture group for the numeric index in note names
    pub index_pattern: Option<String>,
}

impl Default for MergeDefaults {
    fn default() -> Self {
        Self {
            sort_mode: SortMode::Alphabetical,
            include_nested_folders: false,
            separator: "\n\n".into(),
            output_name: "Merged Notes".into(),
            headings: None,
            on_conflict: ConflictPolicy::Rename,
            order_file: None,
            index_pattern: None,
        }
    }
}

/// Raw merge defaults for intermediate parsing.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawMergeDefaults {
    pub sort_mode: Option<SortMode>,
    pub include_nested_folders: Option<bool>,
    pub separator: Option<String>,
    pub output_name: Option<String>,
    pub headings: Option<HeadingLevel>,
    pub on_conflict: Option<ConflictPolicy>,
    pub order_file: Option<PathBuf>,
    pub index_pattern: Option<String>,
}

impl MergeDefaults {
    /// Overlay wins for every field it specifies.
    pub fn merge(&self, overlay: &RawMergeDefaults) -> Self {
        Self {
            sort_mode: overlay.sort_mode.unwrap_or(self.sort_mode),
            include_nested_folders: overlay
                .include_nested_folders
                .unwrap_or(self.include_nested_folders),
            separator: overlay
                .separator
                .clone()
                .unwrap_or_else(|| self.separator.clone()),
            output_name: overlay
                .output_name
                .clone()
                .unwrap_or_else(|| self.output_name.clone()),
            headings: overlay.headings.or(self.headings),
            on_conflict: overlay.on_conflict.unwrap_or(self.on_conflict),
            order_file: overlay
                .order_file
                .clone()
                .or_else(|| self.order_file.clone()),
            index_pattern: overlay
                .index_pattern
                .clone()
                .or_else(|| self.index_pattern.clone()),
        }
    }
}

/// Raw settings for intermediate parsing.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawSettings {
    pub vault: RawVaultConfig,
    pub merge: RawMergeDefaults,
}

/// Unified configuration for notemerge.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default)]
pub struct Settings {
    pub vault: VaultConfig,
    pub merge: MergeDefaults,
}

/// Get the XDG config directory for notemerge.
pub fn global_config_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "notemerge").map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the global config file.
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("notemerge.toml"))
}

/// Get the path to the local config file in a vault directory.
pub fn vault_config_path(vault_dir: &Path) -> PathBuf {
    vault_dir.join(".notemerge.toml")
}

/// Load a TOML file into RawSettings for manual merging.
fn load_raw_settings(path: &Path) -> Result<RawSettings, ApplicationError> {
    let content = std::fs::read_to_string(path).map_err(|e| ApplicationError::Config {
        message: format!("read {}: {}", path.display(), e),
    })?;
    toml::from_str(&content).map_err(|e| ApplicationError::Config {
        message: format!("parse {}: {}", path.display(), e),
    })
}

impl Settings {
    /// Vault root: configured directory, or the current directory.
    pub fn vault_dir(&self) -> PathBuf {
        self.vault
            .dir
            .clone()
            .unwrap_or_else(|| PathBuf::from("."))
    }

    /// Expand shell variables and tilde in path-like fields.
    fn expand_paths(&mut self) {
        if let Some(dir) = &self.vault.dir {
            self.vault.dir = Some(PathBuf::from(expand_env_vars(&dir.to_string_lossy())));
        }
        if let Some(file) = &self.merge.order_file {
            self.merge.order_file = Some(PathBuf::from(expand_env_vars(&file.to_string_lossy())));
        }
    }

    fn merge_with(&self, overlay: &RawSettings) -> Self {
        Self {
            vault: self.vault.merge(&overlay.vault),
            merge: self.merge.merge(&overlay.merge),
        }
    }

    fn apply_global(&self, global: &RawSettings) -> Self {
        Self {
            vault: self.vault.apply_global(&global.vault),
            merge: self.merge.merge(&global.merge),
        }
    }

    /// Load settings with layered precedence.
    ///
    /// # Arguments
    /// * `vault_dir` - Optional vault directory for local config
    ///
    /// # Array Merge Semantics
    /// - Defaults → Global: REPLACE (global defines the real baseline)
    /// - Global → Vault: UNION with negation support
    /// - Any → Env vars: REPLACE (explicit user override)
    pub fn load(vault_dir: Option<&Path>) -> Result<Self, ApplicationError> {
        let mut current = Self::default();

        if let Some(global_path) = global_config_path() {
            if global_path.exists() {
                let raw = load_raw_settings(&global_path)?;
                current = current.apply_global(&raw);
            }
        }

        if let Some(vault) = vault_dir {
            let local_path = vault_config_path(vault);
            if local_path.exists() {
                let raw = load_raw_settings(&local_path)?;
                current = current.merge_with(&raw);
            }
        }

        current = Self::apply_env_overrides(current)?;
        current.expand_paths();

        Ok(current)
    }

    /// Apply NOTEMERGE_* environment variables as explicit overrides.
    ///
    /// e.g. `NOTEMERGE_MERGE__SORT_MODE=logical`, `NOTEMERGE_VAULT__EXTENSIONS=md,txt`
    fn apply_env_overrides(mut settings: Self) -> Result<Self, ApplicationError> {
        let builder = Config::builder().add_source(
            Environment::with_prefix("NOTEMERGE")
                .prefix_separator("_")
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("vault.extensions")
                .with_list_parse_key("vault.ignore_dirs")
                .try_parsing(true),
        );

        let config = builder.build().map_err(config_err)?;

        if let Ok(val) = config.get_string("vault.dir") {
            settings.vault.dir = Some(PathBuf::from(val));
        }
        if let Ok(val) = config.get::<Vec<String>>("vault.extensions") {
            settings.vault.extensions = val;
        }
        if let Ok(val) = config.get::<Vec<String>>("vault.ignore_dirs") {
            settings.vault.ignore_dirs = val;
        }
        if let Ok(val) = config.get_string("merge.sort_mode") {
            settings.merge.sort_mode = SortMode::parse_or_default(&val);
        }
        if let Ok(val) = config.get_bool("merge.include_nested_folders") {
            settings.merge.include_nested_folders = val;
        }
        if let Ok(val) = config.get_string("merge.separator") {
            settings.merge.separator = val;
        }
        if let Ok(val) = config.get_string("merge.output_name") {
            settings.merge.output_name = val;
        }
        if let Ok(val) = config.get_int("merge.headings") {
            settings.merge.headings = Some(HeadingLevel::try_from(val)?);
        }
        if let Ok(val) = config.get_string("merge.on_conflict") {
            settings.merge.on_conflict = val.parse()?;
        }
        if let Ok(val) = config.get_string("merge.order_file") {
            settings.merge.order_file = Some(PathBuf::from(val));
        }
        if let Ok(val) = config.get_string("merge.index_pattern") {
            settings.merge.index_pattern = Some(val);
        }

        Ok(settings)
    }

    /// Show the effective configuration as TOML.
    pub fn to_toml(&self) -> Result<String, ApplicationError> {
        toml::to_string_pretty(self).map_err(|e| ApplicationError::Config {
            message: format!("serialize config: {e}"),
        })
    }

    /// Generate a template config file.
    pub fn template() -> String {
        r#"# notemerge configuration
#
# Locations (by precedence, lowest to highest):
#   Global: ~/.config/notemerge/notemerge.toml  (defines your baseline)
#   Local:  <vault_dir>/.notemerge.toml         (vault-specific additions)
#   Env:    NOTEMERGE_* environment variables   (explicit overrides)
#
# Array Merge Semantics:
#   Global config REPLACES compiled defaults.
#   Local/vault config UNIONS with global.
#   Use "!item" in local config to REMOVE an inherited item:
#     extensions = ["txt", "!md"]

[vault]
# Vault root (default: current directory)
# dir = "~/notes"

# File extensions treated as notes
# extensions = ["md"]

# Folder names never descended into (dot-folders are always skipped)
# ignore_dirs = ["node_modules"]

[merge]
# alphabetical | creationDate | logical
# sort_mode = "alphabetical"

# Descend into sub-folders of selected folders
# include_nested_folders = false

# Text between two notes
# separator = "\n\n"

# Output file name, relative to the vault root (.md is appended if missing)
# output_name = "Merged Notes"

# Insert each note's name as a heading of this level (1-6)
# headings = 2

# When the output exists: rename | overwrite | fail
# on_conflict = "rename"

# Logical order: index note listing notes or [[links]] in order
# order_file = "Index.md"

# Logical order: regex capturing a numeric index in note names
# index_pattern = '^(\d+)'
"#
        .to_string()
    }
}

fn config_err(e: ConfigError) -> ApplicationError {
    ApplicationError::Config {
        message: e.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_no_config_when_loading_then_uses_defaults() {
        let settings = Settings::load(None).expect("load defaults");
        assert!(settings.vault.extensions.contains(&"md".to_string()));
        assert_eq!(settings.merge.separator, "\n\n");
    }

    #[test]
    fn given_template_when_parsing_then_yields_defaults() {
        let raw: RawSettings = toml::from_str(&Settings::template()).expect("parse template");
        let settings = Settings::default().merge_with(&raw);
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn given_tilde_in_vault_dir_when_expand_paths_then_expands_to_home() {
        let mut settings = Settings::default();
        settings.vault.dir = Some(PathBuf::from("~/notes"));

        settings.expand_paths();

        let home = std::env::var("HOME").expect("HOME should be set");
        let dir = settings.vault.dir.expect("dir set");
        assert!(dir.to_string_lossy().starts_with(&home));
        assert!(!dir.to_string_lossy().contains('~'));
    }

    #[test]
    fn test_merge_array_negation() {
        let base = vec!["md".to_string(), "txt".to_string()];
        let overlay = vec!["!txt".to_string(), "markdown".to_string()];
        let result = VaultConfig::merge_array(&base, &overlay);

        assert_eq!(result, vec!["markdown".to_string(), "md".to_string()]);
    }

    #[test]
    fn test_apply_global_replaces_arrays() {
        let base = VaultConfig::default();
        let global = RawVaultConfig {
            dir: None,
            extensions: Some(vec!["txt".to_string()]),
            ignore_dirs: None,
        };

        let result = base.apply_global(&global);

        assert_eq!(result.extensions, vec!["txt".to_string()]);
        assert_eq!(result.ignore_dirs, VaultConfig::default().ignore_dirs);
    }

    #[test]
    fn test_merge_defaults_overlay_wins_when_specified() {
        let base = MergeDefaults::default();
        let overlay = RawMergeDefaults {
            sort_mode: Some(SortMode::CreationDate),
            headings: Some(HeadingLevel::new(2).unwrap()),
            ..Default::default()
        };

        let result = base.merge(&overlay);

        assert_eq!(result.sort_mode, SortMode::CreationDate);
        assert_eq!(result.headings.map(|h| h.level()), Some(2));
        assert_eq!(result.separator, base.separator);
        assert_eq!(result.on_conflict, ConflictPolicy::Rename);
    }
}

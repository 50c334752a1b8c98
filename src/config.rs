//! Pipeline configuration describing the asset-tree grammar and filter rules.

use std::fs;
use std::path::Path;

use regex::Regex;
use serde::Deserialize;
use thiserror::Error;

const DEFAULT_CONFIG_FILE: &str = "modpack.config.json";

/// Discoverable configuration describing where content lives in the project tree
/// and which assets are filtered out before classification.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Root of the whole project asset tree.
    pub project_root: String,
    /// Prefix under which per-module content trees live.
    pub mods_root: String,
    /// Prefix under which external packages live; package names map to modules
    /// through the registry.
    pub package_root: String,
    /// Content root for assets that belong directly to the main package.
    pub plain_content_root: String,
    /// Directory segment that marks the content root inside a module tree.
    pub content_dir: String,
    /// Directory segment that introduces a distribution fork inside a content root.
    pub dist_dir: String,
    /// File extensions (with leading dot) that are never packaged.
    pub ignored_extensions: Vec<String>,
    /// File extensions (with leading dot) treated as code rather than content.
    pub script_extensions: Vec<String>,
    /// Serialized-asset type names that are editor-only and never packaged.
    pub ignored_scriptable_types: Vec<String>,
    /// Regex patterns for project-specific ignore rules.
    pub ignore_patterns: Vec<String>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            project_root: "Assets/".into(),
            mods_root: "Assets/Mods/".into(),
            package_root: "Packages/".into(),
            plain_content_root: "Assets/CapsRes/".into(),
            content_dir: "CapsRes/".into(),
            dist_dir: "dist/".into(),
            ignored_extensions: vec![".cginc".into(), ".hlsl".into()],
            script_extensions: vec![".cs".into()],
            ignored_scriptable_types: vec!["LightingDataAsset".into()],
            ignore_patterns: Vec::new(),
        }
    }
}

/// Errors raised while turning configured filter rules into matchers.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A configured ignore pattern is not a valid regular expression.
    #[error("invalid ignore pattern `{pattern}`: {source}")]
    InvalidPattern {
        /// The offending pattern as written in the configuration.
        pattern: String,
        /// Underlying regex compile error.
        source: regex::Error,
    },
}

impl PipelineConfig {
    /// Attempt to load configuration from the provided directory.
    ///
    /// When the configuration file does not exist or fails to parse we fallback to default
    /// values so downstream callers can continue operating with sensible assumptions.
    pub fn discover(project_dir: &Path) -> Self {
        let candidate = project_dir.join(DEFAULT_CONFIG_FILE);
        Self::from_path(&candidate).unwrap_or_default()
    }

    /// Read configuration from a specific JSON file.
    pub fn from_path(path: &Path) -> Option<Self> {
        let content = fs::read_to_string(path).ok()?;
        serde_json::from_str(&content).ok()
    }

    /// Compile the configured ignore patterns into matchers.
    pub fn compile_ignore_patterns(&self) -> Result<Vec<Regex>, ConfigError> {
        self.ignore_patterns
            .iter()
            .map(|pattern| {
                Regex::new(pattern).map_err(|source| ConfigError::InvalidPattern {
                    pattern: pattern.clone(),
                    source,
                })
            })
            .collect()
    }

    /// The extension of an asset path, including the leading dot.
    pub fn extension_of(asset: &str) -> Option<&str> {
        let name_start = asset.rfind(['/', '\\']).map_or(0, |index| index + 1);
        let name = &asset[name_start..];
        name.rfind('.').map(|index| &name[index..])
    }

    /// Whether the asset's extension is in the never-packaged set.
    pub fn has_ignored_extension(&self, asset: &str) -> bool {
        Self::extension_of(asset)
            .is_some_and(|ext| self.ignored_extensions.iter().any(|known| known == ext))
    }

    /// Whether the asset is code rather than content.
    pub fn is_script(&self, asset: &str) -> bool {
        Self::extension_of(asset)
            .is_some_and(|ext| self.script_extensions.iter().any(|known| known == ext))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn extension_includes_leading_dot() {
        assert_eq!(
            PipelineConfig::extension_of("Assets/CapsRes/a.prefab"),
            Some(".prefab")
        );
        assert_eq!(PipelineConfig::extension_of("Assets/CapsRes/a"), None);
        assert_eq!(
            PipelineConfig::extension_of("Assets/dir.with.dot/file"),
            None
        );
    }

    #[test]
    fn recognises_scripts_and_ignored_extensions() {
        let config = PipelineConfig::default();
        assert!(config.is_script("Assets/Scripts/Main.cs"));
        assert!(!config.is_script("Assets/CapsRes/a.prefab"));
        assert!(config.has_ignored_extension("Assets/CapsRes/lighting.hlsl"));
        assert!(!config.has_ignored_extension("Assets/CapsRes/tex.png"));
    }

    #[test]
    fn discover_falls_back_to_defaults() {
        let temp = tempdir().expect("failed to create temp dir");
        let config = PipelineConfig::discover(temp.path());
        assert_eq!(config.mods_root, "Assets/Mods/");
        assert_eq!(config.content_dir, "CapsRes/");
    }

    #[test]
    fn discover_reads_overrides() {
        let temp = tempdir().expect("failed to create temp dir");
        fs::write(
            temp.path().join(DEFAULT_CONFIG_FILE),
            r#"{"mods_root": "Content/Mods/", "ignore_patterns": ["(?i)/editoronly/"]}"#,
        )
        .expect("failed to write config");

        let config = PipelineConfig::discover(temp.path());
        assert_eq!(config.mods_root, "Content/Mods/");
        assert_eq!(config.package_root, "Packages/");

        let patterns = config.compile_ignore_patterns().expect("patterns compile");
        assert_eq!(patterns.len(), 1);
        assert!(patterns[0].is_match("Assets/CapsRes/EditorOnly/tool.png"));
    }

    #[test]
    fn invalid_pattern_is_reported() {
        let config = PipelineConfig {
            ignore_patterns: vec!["(".into()],
            ..PipelineConfig::default()
        };
        let err = config.compile_ignore_patterns().unwrap_err();
        assert!(err.to_string().contains("invalid ignore pattern"));
    }
}

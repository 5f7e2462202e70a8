//! composer.json document model.
//!
//! The manifest keeps typed fields for everything the build mutates and
//! passes every other field through untouched, so regenerated manifests
//! lose nothing the resolver might care about.

use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::util::fs as fsutil;

/// Canonical manifest file name.
pub const MANIFEST_NAME: &str = "composer.json";

/// A parsed composer.json document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ComposerManifest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    /// Package identifier -> version constraint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub require: Option<Map<String, Value>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub autoload: Option<Autoload>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repositories: Option<Vec<Value>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra: Option<Value>,

    /// Everything else (scripts, autoload-dev, config, ...) passes through.
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

/// The autoload section. psr-0 and psr-4 are the styles the build
/// rewrites; `files`, `classmap` and the rest pass through.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Autoload {
    #[serde(rename = "psr-0", default, skip_serializing_if = "Option::is_none")]
    pub psr0: Option<Map<String, Value>>,

    #[serde(rename = "psr-4", default, skip_serializing_if = "Option::is_none")]
    pub psr4: Option<Map<String, Value>>,

    #[serde(flatten)]
    pub other: Map<String, Value>,
}

impl ComposerManifest {
    /// Load a manifest from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            bail!("composer file missing at {}", path.display());
        }
        let content = fsutil::read_to_string(path)?;
        Self::parse(&content).with_context(|| format!("failed to parse {}", path.display()))
    }

    /// Parse manifest content.
    pub fn parse(content: &str) -> Result<Self> {
        serde_json::from_str(content).context("invalid composer.json")
    }

    /// Write the manifest as pretty-printed JSON.
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("failed to serialize manifest")?;
        fsutil::write_string(path, &format!("{json}\n"))
    }

    /// The require map, created on first use.
    pub fn require_mut(&mut self) -> &mut Map<String, Value> {
        self.require.get_or_insert_with(Map::new)
    }

    /// Drop the development branch alias; it is meaningless after the
    /// package has been renamed.
    pub fn strip_branch_alias(&mut self) {
        if let Some(extra) = self.extra.as_mut().and_then(Value::as_object_mut) {
            if let Some(alias) = extra.get_mut("branch-alias").and_then(Value::as_object_mut) {
                alias.remove("dev-master");
            }
        }
    }

    /// Every path mapped by the autoload section, with trailing slashes
    /// trimmed: psr-0/psr-4 target directories plus `files`/`classmap`
    /// entries. This is the root project's source universe.
    pub fn autoload_resources(&self) -> Vec<String> {
        let mut resources = Vec::new();
        let Some(autoload) = &self.autoload else {
            return resources;
        };

        let mut push = |value: &Value| match value {
            Value::String(path) => {
                resources.push(path.trim_end_matches('/').to_string());
            }
            Value::Array(paths) => {
                for path in paths.iter().filter_map(Value::as_str) {
                    resources.push(path.trim_end_matches('/').to_string());
                }
            }
            _ => {}
        };

        for map in [&autoload.psr0, &autoload.psr4].into_iter().flatten() {
            for value in map.values() {
                push(value);
            }
        }
        for value in autoload.other.values() {
            push(value);
        }

        resources
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_basic_manifest() {
        let content = r#"{
            "name": "vendor/lib",
            "version": "1.2.3",
            "require": {"php": ">=7.4", "vendor/dep": "^2.0"},
            "autoload": {"psr-4": {"Vendor\\Lib\\": "src/"}}
        }"#;

        let manifest = ComposerManifest::parse(content).unwrap();
        assert_eq!(manifest.name.as_deref(), Some("vendor/lib"));
        assert_eq!(manifest.version.as_deref(), Some("1.2.3"));
        assert_eq!(manifest.require.as_ref().unwrap().len(), 2);
        let autoload = manifest.autoload.as_ref().unwrap();
        assert!(autoload.psr4.as_ref().unwrap().contains_key("Vendor\\Lib\\"));
    }

    #[test]
    fn test_unknown_fields_round_trip() {
        let content = r#"{
            "name": "vendor/lib",
            "scripts": {"test": "phpunit"},
            "minimum-stability": "dev"
        }"#;

        let manifest = ComposerManifest::parse(content).unwrap();
        assert!(manifest.other.contains_key("scripts"));

        let json = serde_json::to_string(&manifest).unwrap();
        assert!(json.contains("phpunit"));
        assert!(json.contains("minimum-stability"));
    }

    #[test]
    fn test_load_missing_file() {
        let tmp = TempDir::new().unwrap();
        let result = ComposerManifest::load(&tmp.path().join(MANIFEST_NAME));
        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("composer file missing"));
    }

    #[test]
    fn test_save_and_reload() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(MANIFEST_NAME);

        let mut manifest = ComposerManifest::default();
        manifest.name = Some("acme-vendor/lib".to_string());
        manifest
            .require_mut()
            .insert("php".to_string(), Value::String(">=8.0".to_string()));
        manifest.save(&path).unwrap();

        let reloaded = ComposerManifest::load(&path).unwrap();
        assert_eq!(reloaded.name.as_deref(), Some("acme-vendor/lib"));
        assert!(reloaded.require.unwrap().contains_key("php"));
    }

    #[test]
    fn test_strip_branch_alias() {
        let content = r#"{
            "name": "vendor/lib",
            "extra": {"branch-alias": {"dev-master": "2.x-dev"}, "other": true}
        }"#;

        let mut manifest = ComposerManifest::parse(content).unwrap();
        manifest.strip_branch_alias();

        let extra = manifest.extra.as_ref().unwrap().as_object().unwrap();
        assert!(extra["branch-alias"].as_object().unwrap().is_empty());
        assert_eq!(extra["other"], Value::Bool(true));
    }

    #[test]
    fn test_autoload_resources() {
        let content = r#"{
            "name": "app/root",
            "autoload": {
                "psr-4": {"App\\": "src/", "App\\Tests\\": ["tests/", "spec/"]},
                "psr-0": {"Legacy_": "legacy/"},
                "files": ["helpers.php"],
                "classmap": ["lib/Compat.php"]
            }
        }"#;

        let manifest = ComposerManifest::parse(content).unwrap();
        let mut resources = manifest.autoload_resources();
        resources.sort();
        assert_eq!(
            resources,
            vec![
                "helpers.php",
                "legacy",
                "lib/Compat.php",
                "spec",
                "src",
                "tests"
            ]
        );
    }
}

//! Lifecycle hooks and the package blacklist.
//!
//! A run carries six ordered lists of callbacks, one per pipeline stage.
//! Stages execute in registration order; every callback receives the
//! payload and returns it, possibly modified. An empty stage is the
//! identity. Callback errors are not caught here; they propagate and
//! abort the run.
//!
//! The hook configuration file is TOML and contributes the blacklist:
//!
//! ```toml
//! blacklist = ["ext-*", "lib-*", "php", "composer-plugin-api"]
//! ```
//!
//! Packages matching any blacklist pattern keep their identifier and are
//! not scanned for namespaces, but their sources are still rewritten when
//! they reference namespaces of non-blacklisted packages.

use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::core::manifest::ComposerManifest;
use crate::util::wildcard;

/// Called once per package before its manifest is mutated.
pub type BeforeBuildFn =
    Box<dyn Fn(&str, ComposerManifest, &Path, &str) -> Result<ComposerManifest>>;

/// Called once per package after its files are copied.
pub type AfterBuildFn = Box<dyn Fn(&str, &Path, &str) -> Result<()>>;

/// Called once per file: (source, current namespace, prefix, package, file).
pub type FileStageFn = Box<dyn Fn(String, Option<&str>, &str, &str, &Path) -> Result<String>>;

/// Called once per namespace per file:
/// (source, namespace, current namespace, prefix, package, file).
pub type NamespaceStageFn =
    Box<dyn Fn(String, &str, Option<&str>, &str, &str, &Path) -> Result<String>>;

#[derive(Debug, Default, Deserialize)]
struct HookConfig {
    #[serde(default)]
    blacklist: Vec<String>,
}

/// Registry of lifecycle callbacks and the blacklist.
#[derive(Default)]
pub struct HookRegistry {
    blacklist: Vec<String>,
    before_build: Vec<BeforeBuildFn>,
    after_build: Vec<AfterBuildFn>,
    start: Vec<FileStageFn>,
    before: Vec<NamespaceStageFn>,
    after: Vec<NamespaceStageFn>,
    end: Vec<FileStageFn>,
}

impl HookRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the registry from a configuration file; `None` yields an
    /// empty registry.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::new());
        };
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read hook configuration: {}", path.display()))?;
        let config: HookConfig = toml::from_str(&content)
            .with_context(|| format!("failed to parse hook configuration: {}", path.display()))?;
        Ok(Self::with_blacklist(config.blacklist))
    }

    pub fn with_blacklist(blacklist: Vec<String>) -> Self {
        HookRegistry {
            blacklist,
            ..Self::default()
        }
    }

    pub fn blacklist(&self) -> &[String] {
        &self.blacklist
    }

    /// Whether any blacklist pattern matches the package identifier.
    pub fn is_blacklisted(&self, package: &str) -> bool {
        self.blacklist
            .iter()
            .any(|pattern| wildcard::match_wildcard(pattern, package))
    }

    pub fn on_before_build(
        &mut self,
        f: impl Fn(&str, ComposerManifest, &Path, &str) -> Result<ComposerManifest> + 'static,
    ) {
        self.before_build.push(Box::new(f));
    }

    pub fn on_after_build(&mut self, f: impl Fn(&str, &Path, &str) -> Result<()> + 'static) {
        self.after_build.push(Box::new(f));
    }

    pub fn on_start(
        &mut self,
        f: impl Fn(String, Option<&str>, &str, &str, &Path) -> Result<String> + 'static,
    ) {
        self.start.push(Box::new(f));
    }

    pub fn on_before(
        &mut self,
        f: impl Fn(String, &str, Option<&str>, &str, &str, &Path) -> Result<String> + 'static,
    ) {
        self.before.push(Box::new(f));
    }

    pub fn on_after(
        &mut self,
        f: impl Fn(String, &str, Option<&str>, &str, &str, &Path) -> Result<String> + 'static,
    ) {
        self.after.push(Box::new(f));
    }

    pub fn on_end(
        &mut self,
        f: impl Fn(String, Option<&str>, &str, &str, &Path) -> Result<String> + 'static,
    ) {
        self.end.push(Box::new(f));
    }

    pub fn before_build(
        &self,
        package: &str,
        mut manifest: ComposerManifest,
        input: &Path,
        prefix: &str,
    ) -> Result<ComposerManifest> {
        for hook in &self.before_build {
            manifest = hook(package, manifest, input, prefix)?;
        }
        Ok(manifest)
    }

    pub fn after_build(&self, package: &str, output: &Path, prefix: &str) -> Result<()> {
        for hook in &self.after_build {
            hook(package, output, prefix)?;
        }
        Ok(())
    }

    pub fn start(
        &self,
        mut source: String,
        current: Option<&str>,
        prefix: &str,
        package: &str,
        file: &Path,
    ) -> Result<String> {
        for hook in &self.start {
            source = hook(source, current, prefix, package, file)?;
        }
        Ok(source)
    }

    pub fn before(
        &self,
        mut source: String,
        namespace: &str,
        current: Option<&str>,
        prefix: &str,
        package: &str,
        file: &Path,
    ) -> Result<String> {
        for hook in &self.before {
            source = hook(source, namespace, current, prefix, package, file)?;
        }
        Ok(source)
    }

    pub fn after(
        &self,
        mut source: String,
        namespace: &str,
        current: Option<&str>,
        prefix: &str,
        package: &str,
        file: &Path,
    ) -> Result<String> {
        for hook in &self.after {
            source = hook(source, namespace, current, prefix, package, file)?;
        }
        Ok(source)
    }

    pub fn end(
        &self,
        mut source: String,
        current: Option<&str>,
        prefix: &str,
        package: &str,
        file: &Path,
    ) -> Result<String> {
        for hook in &self.end {
            source = hook(source, current, prefix, package, file)?;
        }
        Ok(source)
    }
}

//! The dependency graph and the two-phase build it drives.
//!
//! Phase 1 (`DependencyGraph::build`) stages every package and collects
//! the global namespace set. Phase 2 (`BuiltGraph::rewrite_all`) rewrites
//! every staged file against that completed set. The phases are separate
//! types: a rewriter can only be constructed from a `BuiltGraph`, so no
//! file is ever rewritten against a partial namespace set.

use std::collections::HashMap;
use std::path::Path;

use anyhow::{bail, Result};
use indicatif::ProgressBar;
use serde_json::{Map, Value};

use crate::core::lockfile::Lockfile;
use crate::core::package::{BuiltPackage, PackageUnit};
use crate::core::Prefixes;
use crate::hooks::HookRegistry;
use crate::rewrite::discover::NamespaceSet;
use crate::rewrite::engine::Rewriter;

/// Require keys that are dropped outright during remapping: they bind to
/// the resolver itself or to packages that are meaningless after rename.
const REMOVED_REQUIRES: &[&str] = &["composer-plugin-api", "kylekatarnls/update-helper"];

/// One unit per locked package, indexed by identifier.
#[derive(Debug)]
pub struct DependencyGraph {
    packages: Vec<PackageUnit>,
    index: HashMap<String, usize>,
}

impl DependencyGraph {
    /// Build the graph from the lockfile. Input paths follow the
    /// convention `<source>/vendor/<identifier>`.
    pub fn from_lockfile(
        lockfile: &Lockfile,
        source_root: &Path,
        library_dir: &Path,
        hooks: &HookRegistry,
    ) -> Self {
        let mut packages = Vec::with_capacity(lockfile.len());
        let mut index = HashMap::with_capacity(lockfile.len());

        for locked in lockfile.packages() {
            let input = source_root.join("vendor").join(&locked.name);
            let unit = PackageUnit::new(
                locked.name.clone(),
                locked.version.clone(),
                input,
                library_dir.to_path_buf(),
                hooks,
            );
            index.insert(locked.name.clone(), packages.len());
            packages.push(unit);
        }

        DependencyGraph { packages, index }
    }

    /// An empty graph, for callers that resolve nothing.
    pub fn empty() -> Self {
        DependencyGraph {
            packages: Vec::new(),
            index: HashMap::new(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&PackageUnit> {
        self.index.get(name).map(|&i| &self.packages[i])
    }

    pub fn packages(&self) -> &[PackageUnit] {
        &self.packages
    }

    pub fn len(&self) -> usize {
        self.packages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }

    /// Remap a require map in place.
    ///
    /// Platform requirements (`php`, `ext-*`, `lib-*`) stay untouched,
    /// resolver-bound requirements are removed, and everything else is
    /// re-keyed to the dependency's renamed identifier pinned at its
    /// locked version. In strict mode an unresolvable key is fatal; the
    /// lenient mode skips it (the root manifest may require dev-only
    /// packages absent from the lockfile's package list).
    pub fn remap_requires(
        &self,
        require: &mut Map<String, Value>,
        package_prefix: &str,
        strict: bool,
        owner: &str,
    ) -> Result<()> {
        let renamed_marker = format!("{package_prefix}-");
        let names: Vec<String> = require.keys().cloned().collect();

        for name in names {
            if name == "php" || name.starts_with("ext-") || name.starts_with("lib-") {
                continue;
            }
            if !strict && name.starts_with(&renamed_marker) {
                continue;
            }
            if REMOVED_REQUIRES.contains(&name.as_str()) {
                require.remove(&name);
                continue;
            }

            let Some(dependency) = self.get(&name) else {
                if strict {
                    bail!("cannot find related package {name} for {owner}");
                }
                continue;
            };

            require.remove(&name);
            require.insert(
                dependency.renamed(package_prefix),
                Value::String(dependency.version().to_string()),
            );
        }

        Ok(())
    }

    /// Phase 1: stage every package and merge the discovered namespaces
    /// into the global set.
    pub fn build(
        &self,
        prefixes: &Prefixes,
        hooks: &HookRegistry,
        progress: Option<&ProgressBar>,
    ) -> Result<BuiltGraph> {
        let mut namespaces = NamespaceSet::new();
        let mut packages = Vec::with_capacity(self.packages.len());

        for unit in &self.packages {
            if let Some(bar) = progress {
                bar.set_message(unit.name().to_string());
            }
            tracing::debug!("processing package {}", unit.name());

            let built = unit.build(self, prefixes, hooks)?;
            namespaces.extend(built.namespaces.iter().cloned());
            packages.push(built);

            if let Some(bar) = progress {
                bar.inc(1);
            }
        }

        Ok(BuiltGraph {
            packages,
            namespaces,
        })
    }
}

/// The completed phase-1 result: every package staged, the namespace set
/// final. Immutable input to the rewrite phase.
#[derive(Debug)]
pub struct BuiltGraph {
    pub packages: Vec<BuiltPackage>,
    pub namespaces: NamespaceSet,
}

impl BuiltGraph {
    /// Total number of staged source files.
    pub fn source_file_count(&self) -> usize {
        self.packages.iter().map(|p| p.files.len()).sum()
    }

    /// Phase 2: rewrite every staged file of every package against the
    /// global namespace set. Excluded packages keep their declarations
    /// but still have references to renamed namespaces updated.
    pub fn rewrite_all(&self, rewriter: &Rewriter, progress: Option<&ProgressBar>) -> Result<()> {
        for package in &self.packages {
            tracing::debug!("re-namespacing package {}", package.name);
            for file in &package.files {
                rewriter.rewrite_file(file, &package.name, !package.excluded)?;
                if let Some(bar) = progress {
                    bar.inc(1);
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn fixture(tmp: &TempDir) -> (PathBuf, PathBuf) {
        let source = tmp.path().join("source");
        let library = tmp.path().join("library");

        for (name, manifest, file, contents) in [
            (
                "vendor/lib",
                r#"{"name": "vendor/lib"}"#,
                "src/Helper.php",
                "<?php\n\nnamespace Vendor\\Lib;\n\nclass Helper {}\n",
            ),
            (
                "other/util",
                r#"{"name": "other/util"}"#,
                "src/Util.php",
                "<?php\n\nnamespace Other\\Util;\n\nuse Vendor\\Lib\\Helper;\n\nclass Util {}\n",
            ),
        ] {
            let pkg = source.join("vendor").join(name);
            fs::create_dir_all(pkg.join("src")).unwrap();
            fs::write(pkg.join("composer.json"), manifest).unwrap();
            fs::write(pkg.join(file), contents).unwrap();
        }

        fs::write(
            source.join("composer.lock"),
            r#"{"packages": [
                {"name": "vendor/lib", "version": "1.0.0"},
                {"name": "other/util", "version": "2.0.0"}
            ]}"#,
        )
        .unwrap();

        (source, library)
    }

    #[test]
    fn test_graph_from_lockfile() {
        let tmp = TempDir::new().unwrap();
        let (source, library) = fixture(&tmp);
        let lockfile = Lockfile::load(&source.join("composer.lock")).unwrap();
        let hooks = HookRegistry::new();

        let graph = DependencyGraph::from_lockfile(&lockfile, &source, &library, &hooks);
        assert_eq!(graph.len(), 2);
        assert!(graph.get("vendor/lib").is_some());
        assert!(graph.get("missing/pkg").is_none());
        assert_eq!(graph.get("other/util").unwrap().version(), "2.0.0");
    }

    #[test]
    fn test_two_phase_build_and_rewrite() {
        let tmp = TempDir::new().unwrap();
        let (source, library) = fixture(&tmp);
        let lockfile = Lockfile::load(&source.join("composer.lock")).unwrap();
        let hooks = std::sync::Arc::new(HookRegistry::new());
        let prefixes = Prefixes::new("acme", "Acme\\");

        let graph = DependencyGraph::from_lockfile(&lockfile, &source, &library, &hooks);
        let built = graph.build(&prefixes, &hooks, None).unwrap();

        // Phase 1 collected namespaces from every package before any
        // rewrite touched a file.
        assert_eq!(built.namespaces.len(), 2);
        assert!(built.namespaces.contains("Vendor\\Lib"));
        assert!(built.namespaces.contains("Other\\Util"));
        assert_eq!(built.source_file_count(), 2);

        let rewriter =
            Rewriter::new(&built.namespaces, &prefixes.namespace, hooks.clone()).unwrap();
        built.rewrite_all(&rewriter, None).unwrap();

        // Cross-package reference: other/util imports vendor/lib's
        // namespace and both get the prefix.
        let util = fs::read_to_string(
            library.join("acme-other/util/src/Util.php"),
        )
        .unwrap();
        assert!(util.contains("namespace Acme\\Other\\Util;"));
        assert!(util.contains("use Acme\\Vendor\\Lib\\Helper;"));

        let helper = fs::read_to_string(
            library.join("acme-vendor/lib/src/Helper.php"),
        )
        .unwrap();
        assert!(helper.contains("namespace Acme\\Vendor\\Lib;"));
    }

    #[test]
    fn test_remap_requires_lenient_skips_unknown() {
        let graph = DependencyGraph::empty();
        let mut require = Map::new();
        require.insert("vendor/dev-only".to_string(), Value::String("^1.0".into()));
        require.insert("php".to_string(), Value::String(">=8.0".into()));

        graph
            .remap_requires(&mut require, "acme", false, "root")
            .unwrap();

        assert_eq!(require["vendor/dev-only"], "^1.0");
        assert_eq!(require["php"], ">=8.0");
    }

    #[test]
    fn test_remap_requires_strict_fails_on_unknown() {
        let graph = DependencyGraph::empty();
        let mut require = Map::new();
        require.insert("vendor/ghost".to_string(), Value::String("^1.0".into()));

        let err = graph
            .remap_requires(&mut require, "acme", true, "vendor/app")
            .unwrap_err();
        assert!(err
            .to_string()
            .contains("cannot find related package vendor/ghost for vendor/app"));
    }

    #[test]
    fn test_remap_requires_skips_already_renamed_in_lenient_mode() {
        let graph = DependencyGraph::empty();
        let mut require = Map::new();
        require.insert(
            "acme-vendor/lib".to_string(),
            Value::String("1.0.0".into()),
        );

        graph
            .remap_requires(&mut require, "acme", false, "root")
            .unwrap();
        assert_eq!(require["acme-vendor/lib"], "1.0.0");
    }
}

//! A single dependency package staged for isolation.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde_json::Value;

use crate::core::graph::DependencyGraph;
use crate::core::manifest::{ComposerManifest, MANIFEST_NAME};
use crate::core::Prefixes;
use crate::hooks::HookRegistry;
use crate::rewrite::discover;
use crate::util::fs as fsutil;

/// One locked dependency package.
///
/// Exclusion is decided once at construction: a package matching any
/// blacklist pattern keeps its identifier and contributes no namespaces,
/// though its sources are still rewritten against the global set.
#[derive(Debug)]
pub struct PackageUnit {
    name: String,
    version: String,
    input: PathBuf,
    output_root: PathBuf,
    excluded: bool,
}

/// The immutable result of building one package: its staged output tree,
/// the source files found there, and the namespaces they declare.
#[derive(Debug)]
pub struct BuiltPackage {
    pub name: String,
    pub renamed: String,
    pub output: PathBuf,
    pub excluded: bool,
    pub files: Vec<PathBuf>,
    pub namespaces: Vec<String>,
}

impl PackageUnit {
    pub fn new(
        name: impl Into<String>,
        version: impl Into<String>,
        input: PathBuf,
        output_root: PathBuf,
        hooks: &HookRegistry,
    ) -> Self {
        let name = name.into();
        let excluded = hooks.is_blacklisted(&name);
        PackageUnit {
            name,
            version: version.into(),
            input,
            output_root,
            excluded,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn is_excluded(&self) -> bool {
        self.excluded
    }

    /// The identifier the package is vendored under.
    pub fn renamed(&self, package_prefix: &str) -> String {
        if self.excluded {
            self.name.clone()
        } else {
            format!("{package_prefix}-{}", self.name)
        }
    }

    fn output_dir(&self, package_prefix: &str) -> PathBuf {
        self.output_root.join(self.renamed(package_prefix))
    }

    /// Stage the package: copy its tree, remap its manifest, rewrite its
    /// autoload map, and discover its source files and namespaces.
    pub fn build(
        &self,
        graph: &DependencyGraph,
        prefixes: &Prefixes,
        hooks: &HookRegistry,
    ) -> Result<BuiltPackage> {
        let output = self.output_dir(&prefixes.package);
        fsutil::copy_dir_all(&self.input, &output)
            .with_context(|| format!("failed to stage package {}", self.name))?;

        let manifest_path = self.input.join(MANIFEST_NAME);
        if !manifest_path.exists() {
            bail!("missing composer.json for package {}", self.name);
        }
        let manifest = ComposerManifest::load(&manifest_path)?;
        let mut manifest =
            hooks.before_build(&self.name, manifest, &self.input, &prefixes.namespace)?;

        manifest.name = Some(self.renamed(&prefixes.package));
        manifest.version = Some(self.version.clone());

        if let Some(require) = manifest.require.as_mut() {
            graph.remap_requires(require, &prefixes.package, true, &self.name)?;
        }

        manifest.strip_branch_alias();

        hooks.after_build(&self.name, &output, &prefixes.namespace)?;

        if !self.excluded {
            self.rewrite_autoload(&mut manifest, &output, &prefixes.namespace)?;
        }

        manifest.save(&output.join(MANIFEST_NAME))?;

        let files = fsutil::find_php_files(&output)?;
        let namespaces = if self.excluded {
            Vec::new()
        } else {
            discover_package_namespaces(&files)?
        };

        Ok(BuiltPackage {
            name: self.name.clone(),
            renamed: self.renamed(&prefixes.package),
            output,
            excluded: self.excluded,
            files,
            namespaces,
        })
    }

    /// Prefix the autoload map keys. psr-4 entries only need the key
    /// rewritten; the legacy psr-0 style resolves the full namespace to a
    /// directory path, so its files must also move into a subdirectory
    /// matching the inserted prefix segments.
    fn rewrite_autoload(
        &self,
        manifest: &mut ComposerManifest,
        output: &Path,
        ns_prefix: &str,
    ) -> Result<()> {
        let Some(autoload) = manifest.autoload.as_mut() else {
            return Ok(());
        };

        if let Some(psr0) = autoload.psr0.as_mut() {
            let entries: Vec<(String, Value)> =
                psr0.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
            psr0.clear();
            for (namespace, directory) in entries {
                if let Some(dir) = directory.as_str() {
                    relocate_psr0_sources(output, dir, ns_prefix)
                        .with_context(|| format!("failed to relocate psr-0 sources of {}", self.name))?;
                }
                psr0.insert(format!("{ns_prefix}{namespace}"), directory);
            }
        }

        if let Some(psr4) = autoload.psr4.as_mut() {
            let entries: Vec<(String, Value)> =
                psr4.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
            psr4.clear();
            for (namespace, directory) in entries {
                psr4.insert(format!("{ns_prefix}{namespace}"), directory);
            }
        }

        Ok(())
    }
}

/// Move the contents of a psr-0 directory into `<dir>/<prefix-path>/`.
///
/// Staged through a temporary sibling because the target lives inside the
/// directory being emptied.
fn relocate_psr0_sources(output: &Path, directory: &str, ns_prefix: &str) -> Result<()> {
    let source = output.join(directory);
    if !source.exists() {
        return Ok(());
    }

    let staging = output.join("tmp");
    fsutil::move_dir_entries(&source, &staging)?;

    let prefix_path = ns_prefix.replace('\\', "/");
    let target = source.join(prefix_path.trim_matches('/'));
    fsutil::move_dir_entries(&staging, &target)?;

    let _ = std::fs::remove_dir(&staging);
    Ok(())
}

fn discover_package_namespaces(files: &[PathBuf]) -> Result<Vec<String>> {
    let mut namespaces = Vec::new();
    let mut seen = std::collections::HashSet::new();
    for file in files {
        let source = fsutil::read_to_string(file)?;
        for ns in discover::declared_namespaces(&source) {
            if seen.insert(ns.clone()) {
                namespaces.push(ns);
            }
        }
    }
    Ok(namespaces)
}

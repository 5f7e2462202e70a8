//! Root manifest regeneration and resolver invocation.
//!
//! Every staged package becomes a path repository, the root require map
//! is remapped to the renamed identifiers, and the external resolver is
//! run against the consolidated manifest to materialize the merged
//! vendor tree.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde_json::json;

use crate::core::graph::DependencyGraph;
use crate::core::manifest::{ComposerManifest, MANIFEST_NAME};
use crate::core::Prefixes;
use crate::util::fs as fsutil;
use crate::util::process::{find_composer, ProcessBuilder};

pub struct ComposerBuilder<'a> {
    manifest: ComposerManifest,
    graph: &'a DependencyGraph,
    prefixes: &'a Prefixes,
    library_dir: PathBuf,
    build_dir: PathBuf,
    composer_bin: PathBuf,
    composer_flags: Vec<String>,
}

impl<'a> ComposerBuilder<'a> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        manifest: ComposerManifest,
        graph: &'a DependencyGraph,
        prefixes: &'a Prefixes,
        library_dir: PathBuf,
        build_dir: PathBuf,
        composer_bin: PathBuf,
        composer_flags: Vec<String>,
    ) -> Self {
        ComposerBuilder {
            manifest,
            graph,
            prefixes,
            library_dir,
            build_dir,
            composer_bin,
            composer_flags,
        }
    }

    /// Regenerate the root manifest, run the resolver, and prune
    /// tool-only artifacts. Returns the merged vendor tree.
    pub fn build(mut self) -> Result<PathBuf> {
        fsutil::ensure_dir(&self.build_dir)?;

        let repositories = self
            .graph
            .packages()
            .iter()
            .map(|pkg| self.repository_entry(&pkg.renamed(&self.prefixes.package)))
            .collect::<Vec<_>>();
        self.manifest
            .repositories
            .get_or_insert_with(Vec::new)
            .extend(repositories);

        let owner = self.manifest.name.clone().unwrap_or_else(|| "<root>".to_string());
        if let Some(require) = self.manifest.require.as_mut() {
            self.graph
                .remap_requires(require, &self.prefixes.package, false, &owner)?;
        }

        self.manifest.save(&self.build_dir.join(MANIFEST_NAME))?;

        run_resolver(
            &self.composer_bin,
            &self.composer_flags,
            &self.build_dir,
        )?;

        let vendor = self.build_dir.join("vendor");
        fsutil::remove_dir_all_if_exists(&vendor.join("bin"))?;

        Ok(vendor)
    }

    /// A path-type repository pointing at the staged package, relative to
    /// the directory the resolver runs in.
    fn repository_entry(&self, renamed: &str) -> serde_json::Value {
        let base = pathdiff::diff_paths(&self.library_dir, &self.build_dir)
            .unwrap_or_else(|| self.library_dir.clone());
        let url = base.join(renamed).to_string_lossy().replace('\\', "/");

        json!({
            "type": "path",
            "url": url,
            "options": {"symlink": false},
        })
    }
}

/// Run `composer update` in `dir`, blocking until it exits.
///
/// The exit status is deliberately not fatal: resolution failures are
/// logged and the run continues, preserving the tool's lenient contract.
/// A failure to spawn (missing executable) is still an error.
pub fn run_resolver(bin: &Path, flags: &[String], dir: &Path) -> Result<()> {
    let program = find_composer(bin)?;
    let builder = ProcessBuilder::new(&program)
        .arg("update")
        .args(flags)
        .cwd(dir);

    tracing::info!("running `{}`", builder.display_command());
    let output = builder
        .exec()
        .with_context(|| format!("failed to run `{}`", builder.display_command()))?;

    tracing::debug!("resolver stdout: {}", String::from_utf8_lossy(&output.stdout));
    tracing::debug!("resolver stderr: {}", String::from_utf8_lossy(&output.stderr));

    if !output.status.success() {
        tracing::warn!(
            "resolver exited with {:?}; continuing anyway",
            output.status.code()
        );
    }

    Ok(())
}

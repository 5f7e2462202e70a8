//! The root project unit.
//!
//! The project itself is never renamed, and unlike a dependency package
//! its file set is not a whole-directory copy: only the resources its own
//! autoload section maps are staged, each copied individually into the
//! workspace's codebase tree. The staged files then go through the same
//! rewrite pass as every package, with declaration rewriting disabled, so
//! the project's references to renamed dependency namespaces are updated
//! while its own namespaces stay put.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::core::manifest::ComposerManifest;
use crate::rewrite::engine::Rewriter;
use crate::util::fs as fsutil;

#[derive(Debug)]
pub struct RootProject {
    manifest: ComposerManifest,
    input: PathBuf,
    output: PathBuf,
}

impl RootProject {
    pub fn new(manifest: ComposerManifest, input: PathBuf, output: PathBuf) -> Self {
        RootProject {
            manifest,
            input,
            output,
        }
    }

    pub fn name(&self) -> &str {
        self.manifest.name.as_deref().unwrap_or("<root>")
    }

    pub fn output(&self) -> &Path {
        &self.output
    }

    /// Copy every autoloaded resource into the codebase tree and return
    /// the staged PHP files.
    pub fn stage(&self) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();

        for resource in self.manifest.autoload_resources() {
            let from = self.input.join(&resource);
            let to = self.output.join(&resource);

            if from.is_dir() {
                fsutil::copy_dir_all(&from, &to)?;
                files.extend(fsutil::find_php_files(&to)?);
            } else if from.is_file() {
                if let Some(parent) = to.parent() {
                    fsutil::ensure_dir(parent)?;
                }
                std::fs::copy(&from, &to).with_context(|| {
                    format!("failed to copy {} to {}", from.display(), to.display())
                })?;
                files.push(to);
            } else {
                tracing::warn!("autoloaded resource {} does not exist, skipping", resource);
            }
        }

        files.sort();
        files.dedup();
        Ok(files)
    }

    /// Rewrite the staged files against the global namespace set. The
    /// project's own declarations are never prefixed.
    pub fn rewrite(&self, files: &[PathBuf], rewriter: &Rewriter) -> Result<()> {
        for file in files {
            rewriter.rewrite_file(file, self.name(), false)?;
        }
        Ok(())
    }
}

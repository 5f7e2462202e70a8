//! The ephemeral build workspace.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tempfile::TempDir;

/// Scratch directory tree for one isolation run.
///
/// Holds the intermediate package copies, the regenerated manifest, and
/// the merged resolver output. The whole tree is removed when the value
/// is dropped, on success and failure alike; removal is best-effort.
#[derive(Debug)]
pub struct BuildWorkspace {
    root: TempDir,
}

impl BuildWorkspace {
    pub fn new() -> Result<Self> {
        let root = tempfile::Builder::new()
            .prefix("isopack-")
            .tempdir()
            .context("failed to create build workspace")?;
        Ok(BuildWorkspace { root })
    }

    pub fn path(&self) -> &Path {
        self.root.path()
    }

    /// Scratch project used when resolving from a bare manifest.
    pub fn project_dir(&self) -> PathBuf {
        self.root.path().join("project")
    }

    /// Where re-prefixed dependency packages are staged.
    pub fn library_dir(&self) -> PathBuf {
        self.root.path().join("library")
    }

    /// Where the consolidated manifest is written and the resolver runs.
    pub fn build_dir(&self) -> PathBuf {
        self.root.path().join("build")
    }

    /// Where the root project's autoloaded sources are staged.
    pub fn codebase_dir(&self) -> PathBuf {
        self.root.path().join("codebase")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_workspace_removed_on_drop() {
        let path;
        {
            let ws = BuildWorkspace::new().unwrap();
            path = ws.path().to_path_buf();
            assert!(path.exists());
            assert!(ws.library_dir().starts_with(&path));
        }
        assert!(!path.exists());
    }
}

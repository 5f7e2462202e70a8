//! composer.lock reading.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

/// Errors raised while loading the lockfile.
#[derive(Debug, Error)]
pub enum LockfileError {
    #[error("composer lock file missing at {path}")]
    Missing { path: PathBuf },

    #[error("failed to parse {path}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("no installed packages in {path}")]
    NoPackages { path: PathBuf },
}

/// One pinned entry of the lockfile's package list.
#[derive(Debug, Clone, Deserialize)]
pub struct LockedPackage {
    pub name: String,
    pub version: String,
}

#[derive(Debug, Deserialize)]
struct RawLockfile {
    packages: Option<Vec<LockedPackage>>,
}

/// The resolved dependency set pinned by composer.lock.
#[derive(Debug)]
pub struct Lockfile {
    packages: Vec<LockedPackage>,
}

impl Lockfile {
    /// Canonical lockfile file name.
    pub const FILE_NAME: &'static str = "composer.lock";

    /// Load and validate the lockfile at `path`.
    pub fn load(path: &Path) -> Result<Self, LockfileError> {
        let content = std::fs::read_to_string(path).map_err(|_| LockfileError::Missing {
            path: path.to_path_buf(),
        })?;

        let raw: RawLockfile =
            serde_json::from_str(&content).map_err(|source| LockfileError::Parse {
                path: path.to_path_buf(),
                source,
            })?;

        let packages = raw.packages.ok_or_else(|| LockfileError::NoPackages {
            path: path.to_path_buf(),
        })?;

        Ok(Lockfile { packages })
    }

    pub fn packages(&self) -> &[LockedPackage] {
        &self.packages
    }

    pub fn len(&self) -> usize {
        self.packages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }
}

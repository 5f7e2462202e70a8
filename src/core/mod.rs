//! Core data structures for isopack.
//!
//! - Manifest and lockfile documents
//! - The per-package build unit and the dependency graph
//! - The root project unit

pub mod graph;
pub mod lockfile;
pub mod manifest;
pub mod package;
pub mod root;

pub use graph::{BuiltGraph, DependencyGraph};
pub use lockfile::{Lockfile, LockfileError};
pub use manifest::{ComposerManifest, MANIFEST_NAME};
pub use package::{BuiltPackage, PackageUnit};
pub use root::RootProject;

/// The two prefixes driving a run.
///
/// The namespace prefix always carries exactly one trailing separator.
#[derive(Debug, Clone)]
pub struct Prefixes {
    /// Inserted into package identifiers: `{package}-{id}`.
    pub package: String,

    /// Inserted into namespaces: `{namespace}{ns}`, e.g. `Iso\`.
    pub namespace: String,
}

impl Prefixes {
    pub fn new(package: impl Into<String>, namespace: &str) -> Self {
        Prefixes {
            package: package.into(),
            namespace: format!("{}\\", namespace.trim_end_matches('\\')),
        }
    }
}

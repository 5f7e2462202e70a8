//! Isopack - vendors an isolated copy of a Composer dependency tree.
//!
//! This crate rewrites every namespace declaration, import, and
//! fully-qualified reference across a resolved dependency tree (and the
//! project's own sources), inserting a unique prefix into every package
//! identifier and every discovered namespace. The result can live next
//! to an unprefixed copy of the same libraries without symbol collision.

pub mod core;
pub mod hooks;
pub mod ops;
pub mod rewrite;
pub mod util;

pub use crate::core::{
    BuiltGraph, BuiltPackage, ComposerManifest, DependencyGraph, Lockfile, PackageUnit, Prefixes,
    RootProject,
};
pub use crate::hooks::HookRegistry;
pub use crate::ops::{isolate, IsolateOptions};
pub use crate::rewrite::{NamespaceSet, Rewriter};

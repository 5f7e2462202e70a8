//! Namespace discovery and source rewriting.

pub mod discover;
pub mod engine;

pub use discover::NamespaceSet;
pub use engine::Rewriter;

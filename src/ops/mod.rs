//! High-level operations.

pub mod composer;
pub mod isolate;

pub use composer::ComposerBuilder;
pub use isolate::{isolate, IsolateOptions};

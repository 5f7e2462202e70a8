//! Shared utilities.

pub mod fs;
pub mod process;
pub mod wildcard;
pub mod workspace;

pub use process::ProcessBuilder;
pub use wildcard::{match_wildcard, match_wildcard_with, MatchOptions};
pub use workspace::BuildWorkspace;

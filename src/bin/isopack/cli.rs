//! CLI definitions using clap.

use std::path::PathBuf;

use clap::{ArgGroup, Parser};

/// Isopack - vendor an isolated copy of a Composer dependency tree
#[derive(Parser)]
#[command(name = "isopack")]
#[command(author, version, about, long_about = None)]
#[command(group(ArgGroup::new("input").required(true).args(["source", "composer"])))]
pub struct Cli {
    /// The path to save the isolated project to
    pub dest: PathBuf,

    /// Directory containing composer.json, composer.lock and an
    /// installed vendor tree
    #[arg(long)]
    pub source: Option<PathBuf>,

    /// Path to a bare composer.json; dependencies are resolved into a
    /// scratch project first
    #[arg(long)]
    pub composer: Option<PathBuf>,

    /// The prefix to add to package identifiers
    #[arg(long = "package")]
    pub package_prefix: String,

    /// The prefix to add to namespaces (trailing backslash optional)
    #[arg(long = "namespace")]
    pub namespace_prefix: String,

    /// Hook configuration file (TOML) carrying the blacklist
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Name of the folder the isolated packages are stored under
    #[arg(long, default_value = "vendor")]
    pub vendor_dir: String,

    /// Composer executable used for dependency resolution
    #[arg(long, default_value = "composer", env = "ISOPACK_COMPOSER")]
    pub composer_bin: PathBuf,

    /// Skip packages listed in require-dev when resolving
    #[arg(long)]
    pub no_dev: bool,

    /// Pass --quiet to the resolver
    #[arg(long)]
    pub quiet: bool,

    /// Assume yes for the overwrite confirmation
    #[arg(short = 'y', long)]
    pub yes: bool,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// Flags forwarded verbatim to the resolver subprocess.
    pub fn composer_flags(&self) -> Vec<String> {
        let mut flags = Vec::new();
        if self.quiet {
            flags.push("--quiet".to_string());
        }
        if self.no_dev {
            flags.push("--no-dev".to_string());
        }
        flags
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minimal() {
        let cli = Cli::try_parse_from([
            "isopack",
            "out/",
            "--source",
            "project/",
            "--package",
            "acme",
            "--namespace",
            "Acme\\",
        ])
        .unwrap();

        assert_eq!(cli.dest, PathBuf::from("out/"));
        assert_eq!(cli.package_prefix, "acme");
        assert_eq!(cli.vendor_dir, "vendor");
        assert!(cli.composer_flags().is_empty());
    }

    #[test]
    fn test_input_mode_required() {
        let result = Cli::try_parse_from([
            "isopack",
            "out/",
            "--package",
            "acme",
            "--namespace",
            "Acme\\",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_prefixes_required() {
        let result = Cli::try_parse_from(["isopack", "out/", "--source", "project/"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_composer_flags_forwarded() {
        let cli = Cli::try_parse_from([
            "isopack",
            "out/",
            "--composer",
            "composer.json",
            "--package",
            "acme",
            "--namespace",
            "Acme\\",
            "--no-dev",
            "--quiet",
        ])
        .unwrap();

        assert_eq!(cli.composer_flags(), vec!["--quiet", "--no-dev"]);
    }
}

//! Isopack CLI - vendor an isolated copy of a Composer dependency tree

use anyhow::{bail, Result};
use clap::Parser;
use dialoguer::Confirm;
use tracing_subscriber::EnvFilter;

use isopack::hooks::HookRegistry;
use isopack::ops::isolate::{isolate, IsolateOptions};

mod cli;

use cli::Cli;

fn main() {
    if let Err(e) = run() {
        eprintln!("error: {:#}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("isopack=debug")
    } else {
        EnvFilter::new("isopack=info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .init();

    let allow_same_path = cli.yes || confirm_overwrite(&cli)?;

    let hooks = HookRegistry::load(cli.config.as_deref())?;

    let opts = IsolateOptions {
        dest: cli.dest.clone(),
        source: cli.source.clone(),
        composer_json: cli.composer.clone(),
        package_prefix: cli.package_prefix.clone(),
        namespace_prefix: cli.namespace_prefix.clone(),
        vendor_dir: cli.vendor_dir.clone(),
        composer_bin: cli.composer_bin.clone(),
        composer_flags: cli.composer_flags(),
        allow_same_path,
    };

    isolate(&opts, hooks)
}

/// When the destination is the source directory, the run overwrites the
/// sources in place. Ask before doing something that cannot be undone.
fn confirm_overwrite(cli: &Cli) -> Result<bool> {
    let Some(source) = &cli.source else {
        return Ok(false);
    };

    let same = normalized(source) == normalized(&cli.dest);
    if !same {
        return Ok(false);
    }

    let confirmed = Confirm::new()
        .with_prompt(
            "Destination and source are the same path; source files will be overwritten \
             and this cannot be undone. Continue?",
        )
        .default(false)
        .interact()?;

    if !confirmed {
        bail!("aborted");
    }
    Ok(true)
}

fn normalized(path: &std::path::Path) -> std::path::PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}

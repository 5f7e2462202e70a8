//! End-to-end isolation run.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use indicatif::{ProgressBar, ProgressStyle};

use crate::core::graph::DependencyGraph;
use crate::core::lockfile::Lockfile;
use crate::core::manifest::{ComposerManifest, MANIFEST_NAME};
use crate::core::root::RootProject;
use crate::core::Prefixes;
use crate::hooks::HookRegistry;
use crate::ops::composer::{run_resolver, ComposerBuilder};
use crate::rewrite::engine::Rewriter;
use crate::util::fs as fsutil;
use crate::util::workspace::BuildWorkspace;

/// Options for an isolation run.
#[derive(Debug, Clone)]
pub struct IsolateOptions {
    /// Final destination of the isolated tree.
    pub dest: PathBuf,

    /// An already-resolved project directory (composer.json,
    /// composer.lock, installed vendor tree).
    pub source: Option<PathBuf>,

    /// A bare composer.json; dependencies are resolved into the
    /// workspace first.
    pub composer_json: Option<PathBuf>,

    /// Prefix inserted into package identifiers.
    pub package_prefix: String,

    /// Prefix inserted into namespaces; trailing separator optional.
    pub namespace_prefix: String,

    /// Directory name the isolated packages are vendored under.
    pub vendor_dir: String,

    /// Resolver executable.
    pub composer_bin: PathBuf,

    /// Flags forwarded verbatim to the resolver.
    pub composer_flags: Vec<String>,

    /// Confirmed permission to overwrite when destination equals source.
    pub allow_same_path: bool,
}

impl IsolateOptions {
    pub fn new(dest: impl Into<PathBuf>, package_prefix: &str, namespace_prefix: &str) -> Self {
        IsolateOptions {
            dest: dest.into(),
            source: None,
            composer_json: None,
            package_prefix: package_prefix.to_string(),
            namespace_prefix: namespace_prefix.to_string(),
            vendor_dir: "vendor".to_string(),
            composer_bin: PathBuf::from("composer"),
            composer_flags: Vec::new(),
            allow_same_path: false,
        }
    }
}

/// Run the whole pipeline: stage and rename every locked package, rewrite
/// all sources against the global namespace set, stage and rewrite the
/// root project, regenerate the root manifest through the resolver, and
/// merge the results into the destination.
pub fn isolate(opts: &IsolateOptions, hooks: HookRegistry) -> Result<()> {
    let prefixes = Prefixes::new(&opts.package_prefix, &opts.namespace_prefix);
    let workspace = BuildWorkspace::new()?;
    let hooks = Arc::new(hooks);

    let source_root = prepare_source(opts, &workspace)?;
    check_destination(opts, &source_root)?;

    let manifest = ComposerManifest::load(&source_root.join(MANIFEST_NAME))?;
    let lockfile = Lockfile::load(&source_root.join(Lockfile::FILE_NAME))?;
    let graph = DependencyGraph::from_lockfile(&lockfile, &source_root, &workspace.library_dir(), &hooks);

    tracing::info!("package prefix: {}", prefixes.package);
    tracing::info!("namespace prefix: {}", prefixes.namespace);
    tracing::info!("source: {}", source_root.display());
    tracing::info!("destination: {}", opts.dest.display());
    tracing::info!("processing {} packages", graph.len());

    // Phase 1: stage every package and discover the global namespace set.
    let bar = progress_bar(graph.len() as u64);
    let built = graph.build(&prefixes, &hooks, Some(&bar))?;
    bar.finish_and_clear();
    tracing::info!(
        "found {} namespaces in {} source files",
        built.namespaces.len(),
        built.source_file_count()
    );

    // Phase 2: rewrite everything against the completed set.
    let rewriter = Rewriter::new(&built.namespaces, &prefixes.namespace, Arc::clone(&hooks))?;
    let bar = progress_bar(built.source_file_count() as u64);
    built.rewrite_all(&rewriter, Some(&bar))?;
    bar.finish_and_clear();

    // The root project's own sources.
    let root = RootProject::new(manifest.clone(), source_root.clone(), workspace.codebase_dir());
    let root_files = root.stage()?;
    root.rewrite(&root_files, &rewriter)?;
    tracing::info!("re-namespaced {} project files", root_files.len());

    // Regenerate the root manifest and let the resolver merge the tree.
    let builder = ComposerBuilder::new(
        manifest,
        &graph,
        &prefixes,
        workspace.library_dir(),
        workspace.build_dir(),
        opts.composer_bin.clone(),
        opts.composer_flags.clone(),
    );
    let vendor_out = builder.build()?;

    merge_into_destination(opts, &vendor_out, root.output())?;

    tracing::info!("finished: {}", opts.dest.display());
    Ok(())
}

/// Materialize the source tree the run reads from.
fn prepare_source(opts: &IsolateOptions, workspace: &BuildWorkspace) -> Result<PathBuf> {
    if let Some(composer_json) = &opts.composer_json {
        if !composer_json.exists() {
            bail!("composer file does not exist at {}", composer_json.display());
        }

        let project = workspace.project_dir();
        fsutil::ensure_dir(&project)?;
        std::fs::copy(composer_json, project.join(MANIFEST_NAME)).with_context(|| {
            format!("failed to copy {}", composer_json.display())
        })?;

        tracing::info!("creating project from {}", composer_json.display());
        run_resolver(&opts.composer_bin, &opts.composer_flags, &project)?;
        return Ok(project);
    }

    if let Some(source) = &opts.source {
        if !source.exists() {
            bail!("input directory {} does not exist", source.display());
        }
        return Ok(source.clone());
    }

    bail!("either a source directory or a composer manifest must be given");
}

/// Refuse to overwrite the source in place without explicit confirmation.
fn check_destination(opts: &IsolateOptions, source_root: &Path) -> Result<()> {
    let dest = normalize(&opts.dest);
    if dest == normalize(source_root) && !opts.allow_same_path {
        bail!(
            "destination {} is the source directory; this would overwrite the sources in place \
             (pass --yes to confirm)",
            opts.dest.display()
        );
    }
    Ok(())
}

fn normalize(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}

/// Merge the resolver output and the rewritten codebase into the
/// destination. A vendor tree left over from a previous run is removed
/// first.
fn merge_into_destination(opts: &IsolateOptions, vendor_out: &Path, codebase: &Path) -> Result<()> {
    let vendor_dest = opts.dest.join(&opts.vendor_dir);
    if opts.dest.exists() {
        fsutil::remove_dir_all_if_exists(&vendor_dest)?;
    } else {
        fsutil::ensure_dir(&opts.dest)?;
    }

    if vendor_out.exists() {
        fsutil::copy_dir_all(vendor_out, &vendor_dest)?;
    } else {
        tracing::warn!("resolver produced no vendor tree; nothing to merge");
    }

    if codebase.exists() {
        fsutil::copy_dir_all(codebase, &opts.dest)?;
    }

    Ok(())
}

fn progress_bar(len: u64) -> ProgressBar {
    let style = ProgressStyle::with_template("{msg:30!} [{bar:50}] {pos}/{len}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("=> ");
    ProgressBar::new(len).with_style(style)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn project_fixture(tmp: &TempDir) -> PathBuf {
        let source = tmp.path().join("project");
        let lib = source.join("vendor/vendor-lib");
        fs::create_dir_all(lib.join("src")).unwrap();
        fs::create_dir_all(source.join("src")).unwrap();

        fs::write(
            source.join("composer.json"),
            r#"{
                "name": "app/root",
                "version": "1.0.0",
                "require": {"vendor-lib": "^1.0"},
                "autoload": {"psr-4": {"App\\": "src/"}}
            }"#,
        )
        .unwrap();
        fs::write(
            source.join("composer.lock"),
            r#"{"packages": [{"name": "vendor-lib", "version": "1.2.0"}]}"#,
        )
        .unwrap();
        fs::write(
            source.join("src/App.php"),
            "<?php\n\nnamespace App;\n\nuse Vendor\\Lib\\Helper;\n\nclass App {}\n",
        )
        .unwrap();

        fs::write(
            lib.join("composer.json"),
            r#"{"name": "vendor-lib", "autoload": {"psr-4": {"Vendor\\Lib\\": "src/"}}}"#,
        )
        .unwrap();
        fs::write(
            lib.join("src/Helper.php"),
            "<?php\n\nnamespace Vendor\\Lib;\n\nclass Helper {}\n",
        )
        .unwrap();

        source
    }

    fn options(tmp: &TempDir, source: &Path) -> IsolateOptions {
        let mut opts = IsolateOptions::new(tmp.path().join("dest"), "acme", "Acme\\");
        opts.source = Some(source.to_path_buf());
        opts.composer_bin = PathBuf::from("true");
        opts
    }

    #[cfg(unix)]
    #[test]
    fn test_isolate_rewrites_project_sources() {
        let tmp = TempDir::new().unwrap();
        let source = project_fixture(&tmp);
        let opts = options(&tmp, &source);

        isolate(&opts, HookRegistry::new()).unwrap();

        let app = fs::read_to_string(tmp.path().join("dest/src/App.php")).unwrap();
        assert!(app.contains("namespace App;"));
        assert!(app.contains("use Acme\\Vendor\\Lib\\Helper;"));
    }

    #[test]
    fn test_isolate_requires_lockfile() {
        let tmp = TempDir::new().unwrap();
        let source = project_fixture(&tmp);
        fs::remove_file(source.join("composer.lock")).unwrap();
        let opts = options(&tmp, &source);

        let err = isolate(&opts, HookRegistry::new()).unwrap_err();
        assert!(err.to_string().contains("composer lock file missing"));
    }

    #[test]
    fn test_isolate_refuses_same_path_without_confirmation() {
        let tmp = TempDir::new().unwrap();
        let source = project_fixture(&tmp);
        let mut opts = options(&tmp, &source);
        opts.dest = source.clone();

        let err = isolate(&opts, HookRegistry::new()).unwrap_err();
        assert!(err.to_string().contains("overwrite"));
    }

    #[test]
    fn test_isolate_missing_source_directory() {
        let tmp = TempDir::new().unwrap();
        let mut opts = IsolateOptions::new(tmp.path().join("dest"), "acme", "Acme\\");
        opts.source = Some(tmp.path().join("nope"));

        let err = isolate(&opts, HookRegistry::new()).unwrap_err();
        assert!(err.to_string().contains("does not exist"));
    }

    #[test]
    fn test_isolate_without_input_mode() {
        let tmp = TempDir::new().unwrap();
        let opts = IsolateOptions::new(tmp.path().join("dest"), "acme", "Acme\\");

        let err = isolate(&opts, HookRegistry::new()).unwrap_err();
        assert!(err.to_string().contains("source directory"));
    }
}
